//! Static aggregation schema: the scopes a funnel is computed over and the
//! metrics each scope carries.

use std::fmt;
use std::str::FromStr;

use insights_core::{EventKind, InsightsError, OfferCode, OfferType};
use insights_preprocessing::MergedEvent;
use serde::{Deserialize, Serialize};

/// Slice of the event log a funnel is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Overall,
    Type(OfferType),
    Offer(OfferCode),
}

impl Scope {
    /// Every scope in column order: overall, the three offer types, the ten offers.
    pub const ALL: [Scope; 14] = [
        Scope::Overall,
        Scope::Type(OfferType::Bogo),
        Scope::Type(OfferType::Discount),
        Scope::Type(OfferType::Informational),
        Scope::Offer(OfferCode::B1),
        Scope::Offer(OfferCode::B2),
        Scope::Offer(OfferCode::B3),
        Scope::Offer(OfferCode::B4),
        Scope::Offer(OfferCode::D1),
        Scope::Offer(OfferCode::D2),
        Scope::Offer(OfferCode::D3),
        Scope::Offer(OfferCode::D4),
        Scope::Offer(OfferCode::I1),
        Scope::Offer(OfferCode::I2),
    ];

    /// Whether offers in this scope can be completed (and so pay rewards).
    pub fn has_completion(&self) -> bool {
        match self {
            Scope::Overall => true,
            Scope::Type(t) => t.has_completion(),
            Scope::Offer(code) => code.has_completion(),
        }
    }

    pub fn matches(&self, event: &MergedEvent) -> bool {
        match self {
            Scope::Overall => true,
            Scope::Type(t) => event.offer_type() == Some(*t),
            Scope::Offer(code) => event.offer_id == Some(*code),
        }
    }

    /// Metrics this scope carries; completion metrics are absent for
    /// informational scopes.
    pub fn metrics(&self) -> &'static [Metric] {
        if self.has_completion() {
            &Metric::ALL
        } else {
            &Metric::WITHOUT_COMPLETION
        }
    }

    /// Column name for a metric in this scope, e.g. `viewed`, `bogo_reward`, `B1_received`.
    pub fn column(&self, metric: Metric) -> String {
        match self {
            Scope::Overall => metric.as_str().to_string(),
            Scope::Type(t) => format!("{}_{}", t.as_str(), metric.as_str()),
            Scope::Offer(code) => format!("{}_{}", code.as_str(), metric.as_str()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Overall => f.write_str("overall"),
            Scope::Type(t) => f.write_str(t.as_str()),
            Scope::Offer(code) => f.write_str(code.as_str()),
        }
    }
}

impl FromStr for Scope {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "overall" {
            return Ok(Scope::Overall);
        }
        if let Ok(t) = s.parse::<OfferType>() {
            return Ok(Scope::Type(t));
        }
        s.parse::<OfferCode>()
            .map(Scope::Offer)
            .map_err(|_| InsightsError::Validation(format!("unknown scope: {s}")))
    }
}

impl From<OfferCode> for Scope {
    fn from(code: OfferCode) -> Self {
        Scope::Offer(code)
    }
}

impl From<OfferType> for Scope {
    fn from(offer_type: OfferType) -> Self {
        Scope::Type(offer_type)
    }
}

/// Per-scope funnel metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Received,
    Viewed,
    Completed,
    Reward,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Received, Metric::Viewed, Metric::Completed, Metric::Reward];
    pub const WITHOUT_COMPLETION: [Metric; 2] = [Metric::Received, Metric::Viewed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Received => "received",
            Metric::Viewed => "viewed",
            Metric::Completed => "completed",
            Metric::Reward => "reward",
        }
    }

    /// Count metric fed by an event kind. Transactions feed no funnel metric.
    pub fn counted_by(kind: EventKind) -> Option<Metric> {
        match kind {
            EventKind::OfferReceived => Some(Metric::Received),
            EventKind::OfferViewed => Some(Metric::Viewed),
            EventKind::OfferCompleted => Some(Metric::Completed),
            EventKind::Transaction => None,
        }
    }
}
