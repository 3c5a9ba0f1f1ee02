use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root application configuration. Loaded from environment variables
/// with the prefix `OFFER_INSIGHTS__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

/// Locations of the raw JSON-lines snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_portfolio_path")]
    pub portfolio_path: String,
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
    #[serde(default = "default_transcript_path")]
    pub transcript_path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MergeConfig {
    #[serde(default)]
    pub unknown_offer_policy: UnknownOfferPolicy,
}

/// What the merger does with an offer identifier missing from the remap table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOfferPolicy {
    /// Fail the merge with a data-quality error.
    #[default]
    Reject,
    /// Leave the offer code absent and keep going.
    Null,
}

impl FromStr for UnknownOfferPolicy {
    type Err = crate::InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(UnknownOfferPolicy::Reject),
            "null" => Ok(UnknownOfferPolicy::Null),
            other => Err(crate::InsightsError::Config(format!(
                "unknown offer policy must be reject or null, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_n_top")]
    pub n_top: usize,
    #[serde(default = "default_quantile")]
    pub quantile: f64,
    /// Minimum number of transactions for a customer to enter a net-expense cohort.
    #[serde(default = "default_min_transactions")]
    pub min_transactions: u32,
}

// Default functions
fn default_portfolio_path() -> String {
    "data/portfolio.json".to_string()
}
fn default_profile_path() -> String {
    "data/profile.json".to_string()
}
fn default_transcript_path() -> String {
    "data/transcript.json".to_string()
}
fn default_n_top() -> usize {
    2
}
fn default_quantile() -> f64 {
    0.5
}
fn default_min_transactions() -> u32 {
    5
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            portfolio_path: default_portfolio_path(),
            profile_path: default_profile_path(),
            transcript_path: default_transcript_path(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            n_top: default_n_top(),
            quantile: default_quantile(),
            min_transactions: default_min_transactions(),
        }
    }
}

impl RankingConfig {
    /// Reject quantiles outside `[0, 1]`.
    pub fn validate(&self) -> crate::InsightsResult<()> {
        if !(0.0..=1.0).contains(&self.quantile) {
            return Err(crate::InsightsError::Config(format!(
                "ranking.quantile must be within [0, 1], got {}",
                self.quantile
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("OFFER_INSIGHTS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
