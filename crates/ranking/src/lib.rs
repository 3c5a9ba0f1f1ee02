//! Offer ranking by robust net expense, with optional demographic filtering.

pub mod filter;
pub mod quantile;
pub mod ranker;

pub use filter::DemographicFilter;
pub use quantile::quantile;
pub use ranker::{OfferRanker, OfferRanking};
