use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InsightsError;

// ─── Offer Types ─────────────────────────────────────────────────────

/// Promotional mechanic of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferType {
    Bogo,
    Discount,
    Informational,
}

impl OfferType {
    pub const ALL: [OfferType; 3] = [OfferType::Bogo, OfferType::Discount, OfferType::Informational];

    pub fn as_str(&self) -> &'static str {
        match self {
            OfferType::Bogo => "bogo",
            OfferType::Discount => "discount",
            OfferType::Informational => "informational",
        }
    }

    /// Informational offers are never completed and never pay a reward.
    pub fn has_completion(&self) -> bool {
        !matches!(self, OfferType::Informational)
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferType {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bogo" => Ok(OfferType::Bogo),
            "discount" => Ok(OfferType::Discount),
            "informational" => Ok(OfferType::Informational),
            other => Err(InsightsError::Validation(format!("unknown offer type: {other}"))),
        }
    }
}

// ─── Offer Codes ─────────────────────────────────────────────────────

/// Short mnemonic code for one of the ten catalog offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OfferCode {
    B1,
    B2,
    B3,
    B4,
    D1,
    D2,
    D3,
    D4,
    I1,
    I2,
}

/// Long-form catalog identifiers and their mnemonic codes.
const REMAP_TABLE: [(&str, OfferCode); 10] = [
    ("ae264e3637204a6fb9bb56bc8210ddfd", OfferCode::B1),
    ("4d5c57ea9a6940dd891ad53e9dbe8da0", OfferCode::B2),
    ("9b98b8c7a33c4b65b9aebfe6a799e6d9", OfferCode::B3),
    ("f19421c1d4aa40978ebb69ca19b0e20d", OfferCode::B4),
    ("0b1e1539f2cc45b7b9fa7c272da2e1d7", OfferCode::D1),
    ("2298d6c36e964ae4a3e7e9706d1fb8c2", OfferCode::D2),
    ("fafdcd668e3743c1bb461111dcafc2a4", OfferCode::D3),
    ("2906b810c7d4411798c6938adc9daaa5", OfferCode::D4),
    ("3f207df678b143eea3cee63160fa8bed", OfferCode::I1),
    ("5a8bc65990b245e5a138643cd4eb9837", OfferCode::I2),
];

impl OfferCode {
    pub const ALL: [OfferCode; 10] = [
        OfferCode::B1,
        OfferCode::B2,
        OfferCode::B3,
        OfferCode::B4,
        OfferCode::D1,
        OfferCode::D2,
        OfferCode::D3,
        OfferCode::D4,
        OfferCode::I1,
        OfferCode::I2,
    ];

    /// Candidate order used when ranking without an explicit offer list.
    pub const RANKING_ORDER: [OfferCode; 10] = [
        OfferCode::I1,
        OfferCode::I2,
        OfferCode::B1,
        OfferCode::B2,
        OfferCode::B3,
        OfferCode::B4,
        OfferCode::D1,
        OfferCode::D2,
        OfferCode::D3,
        OfferCode::D4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OfferCode::B1 => "B1",
            OfferCode::B2 => "B2",
            OfferCode::B3 => "B3",
            OfferCode::B4 => "B4",
            OfferCode::D1 => "D1",
            OfferCode::D2 => "D2",
            OfferCode::D3 => "D3",
            OfferCode::D4 => "D4",
            OfferCode::I1 => "I1",
            OfferCode::I2 => "I2",
        }
    }

    pub fn offer_type(&self) -> OfferType {
        match self {
            OfferCode::B1 | OfferCode::B2 | OfferCode::B3 | OfferCode::B4 => OfferType::Bogo,
            OfferCode::D1 | OfferCode::D2 | OfferCode::D3 | OfferCode::D4 => OfferType::Discount,
            OfferCode::I1 | OfferCode::I2 => OfferType::Informational,
        }
    }

    pub fn has_completion(&self) -> bool {
        self.offer_type().has_completion()
    }

    /// Map a long-form catalog identifier to its code.
    pub fn from_long_id(long_id: &str) -> Option<OfferCode> {
        REMAP_TABLE
            .iter()
            .find(|(id, _)| *id == long_id)
            .map(|(_, code)| *code)
    }

    pub fn long_id(&self) -> &'static str {
        REMAP_TABLE
            .iter()
            .find(|(_, code)| code == self)
            .map(|(id, _)| *id)
            .unwrap_or_default()
    }
}

impl fmt::Display for OfferCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferCode {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OfferCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| InsightsError::Validation(format!("unknown offer code: {s}")))
    }
}

// ─── Channels ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Mobile,
    Social,
    Web,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Email, Channel::Mobile, Channel::Social, Channel::Web];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Mobile => "mobile",
            Channel::Social => "social",
            Channel::Web => "web",
        }
    }

    fn bit(&self) -> u8 {
        match self {
            Channel::Email => 0b0001,
            Channel::Mobile => 0b0010,
            Channel::Social => 0b0100,
            Channel::Web => 0b1000,
        }
    }
}

impl FromStr for Channel {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| InsightsError::Validation(format!("unknown channel: {s}")))
    }
}

/// Set of delivery channels, stored as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelSet(u8);

impl ChannelSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, channel: Channel) {
        self.0 |= channel.bit();
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn union(&self, other: ChannelSet) -> ChannelSet {
        ChannelSet(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut set = ChannelSet::empty();
        for channel in iter {
            set.insert(channel);
        }
        set
    }
}

// ─── Demographics ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
    O,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::M, Gender::F, Gender::O];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
            Gender::O => "O",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Gender::M),
            "F" => Ok(Gender::F),
            "O" => Ok(Gender::O),
            other => Err(InsightsError::Validation(format!("unknown gender: {other}"))),
        }
    }
}

// ─── Event Kinds ─────────────────────────────────────────────────────

/// Kind of a transcript row. Exactly one per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OfferReceived,
    OfferViewed,
    OfferCompleted,
    Transaction,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::OfferReceived,
        EventKind::OfferViewed,
        EventKind::OfferCompleted,
        EventKind::Transaction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OfferReceived => "offer_received",
            EventKind::OfferViewed => "offer_viewed",
            EventKind::OfferCompleted => "offer_completed",
            EventKind::Transaction => "transaction",
        }
    }

    /// Name of the indicator column for this kind, e.g. `event_offer_viewed`.
    pub fn indicator(&self) -> String {
        format!("event_{}", self.as_str())
    }

    /// Parse a raw kind label, treating whitespace as underscores
    /// (`"offer received"` and `"offer_received"` are the same kind).
    pub fn from_raw(raw: &str) -> Result<Self, InsightsError> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        EventKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| InsightsError::Validation(format!("unknown event kind: {raw}")))
    }

    pub fn is_offer_event(&self) -> bool {
        !matches!(self, EventKind::Transaction)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
