pub mod config;
pub mod demographics;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use demographics::{income_group, round_age, round_income};
pub use error::{InsightsError, InsightsResult};
pub use types::{Channel, ChannelSet, EventKind, Gender, OfferCode, OfferType};
