//! Event-level merge of the three cleaned tables.

use std::collections::BTreeSet;

use insights_core::config::UnknownOfferPolicy;
use insights_core::{EventKind, InsightsError, InsightsResult, OfferCode, OfferType};
use tracing::{info, warn};

use crate::portfolio::{Offer, Portfolio};
use crate::profile::{Customer, Profile};
use crate::transcript::Transcript;

/// One transcript row joined with its customer and offer attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEvent {
    pub customer_id: String,
    pub kind: EventKind,
    pub time: u32,
    pub amount: Option<f64>,
    /// Mnemonic offer code; absent for transactions.
    pub offer_id: Option<OfferCode>,
    /// Catalog attributes; absent when the row has no matching offer.
    pub offer: Option<Offer>,
    /// Demographics; absent when the customer is missing from the profile.
    pub customer: Option<Customer>,
}

impl MergedEvent {
    pub fn offer_type(&self) -> Option<OfferType> {
        self.offer.as_ref().map(|o| o.offer_type)
    }

    /// Reward paid by the offer on this row, if any.
    pub fn reward(&self) -> Option<f64> {
        self.offer.as_ref().map(|o| o.reward)
    }
}

/// The merged event log, the aggregator's input.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    events: Vec<MergedEvent>,
}

impl EventTable {
    pub fn new(events: Vec<MergedEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[MergedEvent] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &MergedEvent> {
        self.events.iter()
    }

    /// Distinct customer identifiers with at least one event, sorted.
    pub fn customer_ids(&self) -> BTreeSet<&str> {
        self.events.iter().map(|e| e.customer_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Left-join transcript rows to profile and portfolio, then remap long offer
/// identifiers to mnemonic codes.
pub fn merge_datasets(
    portfolio: &Portfolio,
    profile: &Profile,
    transcript: &Transcript,
    policy: UnknownOfferPolicy,
) -> InsightsResult<EventTable> {
    let mut events = Vec::with_capacity(transcript.len());
    let mut unknown_offers = 0usize;
    let mut missing_customers = 0usize;

    for row in transcript.events() {
        let customer = profile.get(&row.customer_id).cloned();
        if customer.is_none() {
            missing_customers += 1;
        }

        let offer = row
            .offer_id
            .as_deref()
            .and_then(|id| portfolio.get(id))
            .cloned();

        let offer_id = match row.offer_id.as_deref() {
            None => None,
            Some(long_id) => match OfferCode::from_long_id(long_id) {
                Some(code) => Some(code),
                None => {
                    metrics::counter!("preprocessing.unknown_offer").increment(1);
                    match policy {
                        UnknownOfferPolicy::Reject => {
                            return Err(InsightsError::UnknownOffer(long_id.to_string()))
                        }
                        UnknownOfferPolicy::Null => {
                            unknown_offers += 1;
                            None
                        }
                    }
                }
            },
        };

        events.push(MergedEvent {
            customer_id: row.customer_id.clone(),
            kind: row.kind,
            time: row.time,
            amount: row.amount,
            offer_id,
            offer,
            customer,
        });
    }

    if unknown_offers > 0 {
        warn!(rows = unknown_offers, "offer identifiers outside the remap table left empty");
    }
    if missing_customers > 0 {
        warn!(rows = missing_customers, "transcript rows without a matching profile");
    }
    info!(events = events.len(), "datasets merged");

    Ok(EventTable::new(events))
}
