//! Event transcript cleaning.

use insights_core::{EventKind, InsightsError, InsightsResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One transcript row as it appears in the raw table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub person: String,
    pub event: String,
    pub value: serde_json::Map<String, serde_json::Value>,
    pub time: u32,
}

/// Which field the payload carries, decided by its first key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    OfferId,
    Amount,
    Unrecognized,
}

impl PayloadKind {
    pub fn from_key(key: &str) -> Self {
        match key {
            "offer id" | "offer_id" => PayloadKind::OfferId,
            "amount" => PayloadKind::Amount,
            _ => PayloadKind::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub customer_id: String,
    pub kind: EventKind,
    pub time: u32,
    pub payload: PayloadKind,
    /// Long-form offer identifier, present only for offer-id payloads.
    pub offer_id: Option<String>,
    /// Transaction amount rounded to cents, present only for amount payloads.
    pub amount: Option<f64>,
}

impl TranscriptEvent {
    /// Kind indicator column value for this row.
    pub fn indicator(&self, kind: EventKind) -> bool {
        self.kind == kind
    }
}

/// Cleaned transcript plus the event kinds observed.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    events: Vec<TranscriptEvent>,
    kinds: Vec<EventKind>,
}

impl Transcript {
    pub fn events(&self) -> &[TranscriptEvent] {
        &self.events
    }

    pub fn observed_kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Decode a payload into its kind and the two optional typed fields.
/// Only the first key is consulted; unrecognized keys leave both fields absent.
fn decode_payload(
    value: &serde_json::Map<String, serde_json::Value>,
) -> InsightsResult<(PayloadKind, Option<String>, Option<f64>)> {
    let Some((key, field)) = value.iter().next() else {
        return Ok((PayloadKind::Unrecognized, None, None));
    };

    match PayloadKind::from_key(key) {
        PayloadKind::OfferId => {
            let offer_id = field.as_str().ok_or_else(|| {
                InsightsError::Validation(format!("offer id payload is not a string: {field}"))
            })?;
            Ok((PayloadKind::OfferId, Some(offer_id.to_string()), None))
        }
        PayloadKind::Amount => {
            let amount = field.as_f64().ok_or_else(|| {
                InsightsError::Validation(format!("amount payload is not a number: {field}"))
            })?;
            Ok((PayloadKind::Amount, None, Some(round_cents(amount))))
        }
        PayloadKind::Unrecognized => Ok((PayloadKind::Unrecognized, None, None)),
    }
}

/// Clean the raw transcript: decode kinds and payloads, rename `person` to `customer_id`.
pub fn prepare_transcript(raw: &[RawEvent]) -> InsightsResult<Transcript> {
    let mut events = Vec::with_capacity(raw.len());
    let mut kinds = Vec::new();
    let mut unrecognized = 0usize;

    for entry in raw {
        let kind = EventKind::from_raw(&entry.event)?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }

        let (payload, offer_id, amount) = decode_payload(&entry.value)?;
        if payload == PayloadKind::Unrecognized {
            unrecognized += 1;
            metrics::counter!("preprocessing.payload_unrecognized").increment(1);
        }

        events.push(TranscriptEvent {
            customer_id: entry.person.clone(),
            kind,
            time: entry.time,
            payload,
            offer_id,
            amount,
        });
    }

    kinds.sort();
    if unrecognized > 0 {
        warn!(rows = unrecognized, "transcript rows with unrecognized payload keys");
    }
    info!(events = events.len(), kinds = kinds.len(), "transcript cleaned");

    Ok(Transcript { events, kinds })
}
