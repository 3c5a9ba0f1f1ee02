//! Cleaning and merging of the raw offer snapshot: JSON-lines ingestion, the
//! per-table cleaners and the event-level merge.

pub mod ingest;
pub mod merge;
pub mod portfolio;
pub mod profile;
pub mod transcript;

pub use ingest::{load_json_lines, read_json_lines};
pub use merge::{merge_datasets, EventTable, MergedEvent};
pub use portfolio::{prepare_portfolio, Offer, Portfolio, RawOffer};
pub use profile::{parse_signup_date, prepare_profile, Customer, Profile, RawProfile};
pub use transcript::{prepare_transcript, PayloadKind, RawEvent, Transcript, TranscriptEvent};
