//! Fold the merged event log into one aggregate row per customer.

use std::collections::BTreeMap;

use insights_core::demographics::{income_group, round_age};
use insights_core::EventKind;
use insights_preprocessing::{EventTable, MergedEvent, Profile};
use tracing::{debug, info};

use crate::aggregate::{CustomerAggregate, CustomerTable, FunnelSet};
use crate::scope::{Metric, Scope};

/// Running totals for one customer.
#[derive(Debug, Default)]
struct Accumulator {
    total_expense: f64,
    total_transactions: u32,
    funnels: FunnelSet,
}

impl Accumulator {
    fn record(&mut self, event: &MergedEvent) {
        let Some(metric) = Metric::counted_by(event.kind) else {
            if let Some(amount) = event.amount {
                self.total_expense += amount;
                self.total_transactions += 1;
            }
            return;
        };

        for scope in Scope::ALL {
            if !scope.matches(event) {
                continue;
            }
            let funnel = self.funnels.get_mut(scope);
            // Rows whose offer id fell outside the remap table are not counted.
            let counted = event.offer_id.is_some();
            match metric {
                Metric::Received if counted => funnel.received += 1,
                Metric::Viewed if counted => funnel.viewed += 1,
                Metric::Completed => {
                    if let Some(completed) = funnel.completed.as_mut() {
                        if counted {
                            *completed += 1;
                        }
                    }
                    if let (Some(reward), Some(paid)) = (funnel.reward.as_mut(), event.reward()) {
                        *reward += paid;
                    }
                }
                _ => {}
            }
        }
    }
}

/// Build the customer table from the merged events and the cleaned profile.
///
/// A customer gets a row only when they have at least one event and appear
/// in the profile. Missing series are zero; completion metrics stay absent
/// for informational scopes.
pub fn aggregate_customers(events: &EventTable, profile: &Profile) -> CustomerTable {
    let mut accumulators: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for event in events.iter() {
        accumulators
            .entry(event.customer_id.as_str())
            .or_default()
            .record(event);
    }

    let mut rows = Vec::with_capacity(accumulators.len());
    let mut without_profile = 0usize;

    for (customer_id, acc) in accumulators {
        let Some(customer) = profile.get(customer_id) else {
            without_profile += 1;
            continue;
        };

        let reward = acc.funnels.get(Scope::Overall).reward_or_zero();
        rows.push(CustomerAggregate {
            customer_id: customer_id.to_string(),
            total_expense: acc.total_expense,
            total_transactions: acc.total_transactions,
            net_expense: acc.total_expense - reward,
            funnels: acc.funnels,
            became_member_on: customer.became_member_on,
            gender: customer.gender,
            age: customer.age,
            income: customer.income,
            valid: customer.valid,
            age_group: round_age(customer.age),
            income_group: income_group(customer.income),
        });
    }

    let transactions = events
        .iter()
        .filter(|e| e.kind == EventKind::Transaction)
        .count();
    debug!(transactions, without_profile, "aggregation inputs");
    info!(
        customers = rows.len(),
        profile_customers = profile.len(),
        "customer table built"
    );

    CustomerTable::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use insights_core::{ChannelSet, Gender, OfferCode, OfferType};
    use insights_preprocessing::{prepare_profile, Customer, Offer, RawProfile};
    use proptest::prelude::*;

    fn profile(ids: &[(&str, u32)]) -> Profile {
        let raw: Vec<RawProfile> = ids
            .iter()
            .map(|(id, age)| RawProfile {
                id: id.to_string(),
                became_member_on: 20170101,
                gender: Some("M".to_string()),
                age: *age,
                income: Some(64_000.0),
            })
            .collect();
        prepare_profile(&raw).unwrap()
    }

    fn offer(code: OfferCode) -> Offer {
        Offer {
            offer_id: code.long_id().to_string(),
            offer_type: code.offer_type(),
            channels: ChannelSet::empty(),
            difficulty: 10,
            reward: match code.offer_type() {
                OfferType::Bogo => 5.0,
                OfferType::Discount => 2.0,
                OfferType::Informational => 0.0,
            },
            duration: 7,
        }
    }

    fn customer(id: &str) -> Customer {
        Customer {
            customer_id: id.to_string(),
            became_member_on: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
            gender: Some(Gender::M),
            age: 40,
            income: Some(64_000.0),
            valid: true,
        }
    }

    fn offer_event(id: &str, kind: EventKind, code: OfferCode) -> MergedEvent {
        MergedEvent {
            customer_id: id.to_string(),
            kind,
            time: 0,
            amount: None,
            offer_id: Some(code),
            offer: Some(offer(code)),
            customer: Some(customer(id)),
        }
    }

    fn transaction(id: &str, amount: f64) -> MergedEvent {
        MergedEvent {
            customer_id: id.to_string(),
            kind: EventKind::Transaction,
            time: 0,
            amount: Some(amount),
            offer_id: None,
            offer: None,
            customer: Some(customer(id)),
        }
    }

    #[test]
    fn test_received_never_viewed() {
        let events = EventTable::new(vec![offer_event("c1", EventKind::OfferReceived, OfferCode::B1)]);
        let table = aggregate_customers(&events, &profile(&[("c1", 40)]));
        let row = table.get("c1").unwrap();

        assert_eq!(row.funnel(OfferCode::B1).received, 1);
        assert_eq!(row.funnel(OfferCode::B1).viewed, 0);
        assert_eq!(row.funnel(OfferCode::B1).completed, Some(0));
        assert_eq!(row.funnel(OfferType::Bogo).received, 1);
        assert_eq!(row.overall().received, 1);
        assert_eq!(row.funnel(OfferCode::B2).received, 0);
    }

    #[test]
    fn test_completion_rewards_and_net_expense() {
        let events = EventTable::new(vec![
            offer_event("c1", EventKind::OfferReceived, OfferCode::B1),
            offer_event("c1", EventKind::OfferViewed, OfferCode::B1),
            offer_event("c1", EventKind::OfferCompleted, OfferCode::B1),
            offer_event("c1", EventKind::OfferCompleted, OfferCode::D2),
            transaction("c1", 20.0),
            transaction("c1", 12.5),
        ]);
        let table = aggregate_customers(&events, &profile(&[("c1", 40)]));
        let row = table.get("c1").unwrap();

        assert_eq!(row.total_expense, 32.5);
        assert_eq!(row.total_transactions, 2);
        assert_eq!(row.overall().completed, Some(2));
        assert_eq!(row.overall().reward, Some(7.0));
        assert_eq!(row.funnel(OfferType::Bogo).reward, Some(5.0));
        assert_eq!(row.funnel(OfferType::Discount).reward, Some(2.0));
        assert_eq!(row.funnel(OfferCode::D2).completed, Some(1));
        assert_eq!(row.net_expense, 25.5);
        assert_eq!(row.age_group, 35);
        assert_eq!(row.income_group, 60_000);
    }

    #[test]
    fn test_informational_has_no_completion() {
        let events = EventTable::new(vec![
            offer_event("c1", EventKind::OfferReceived, OfferCode::I1),
            offer_event("c1", EventKind::OfferViewed, OfferCode::I1),
        ]);
        let table = aggregate_customers(&events, &profile(&[("c1", 40)]));
        let row = table.get("c1").unwrap();

        assert_eq!(row.funnel(OfferCode::I1).viewed, 1);
        assert_eq!(row.funnel(OfferCode::I1).completed, None);
        assert_eq!(row.funnel(OfferCode::I1).reward, None);
        assert_eq!(row.funnel(OfferType::Informational).received, 1);
        assert_eq!(row.funnel(OfferType::Informational).reward, None);
        assert!(row.column("I1_completed").is_none());
        assert!(row.column("informational_reward").is_none());
    }

    #[test]
    fn test_zero_transactions() {
        let events = EventTable::new(vec![offer_event("c1", EventKind::OfferReceived, OfferCode::D1)]);
        let table = aggregate_customers(&events, &profile(&[("c1", 40)]));
        let row = table.get("c1").unwrap();

        assert_eq!(row.total_expense, 0.0);
        assert_eq!(row.total_transactions, 0);
        assert_eq!(row.average_expense(), 0.0);
    }

    #[test]
    fn test_inner_join_with_profile() {
        let events = EventTable::new(vec![transaction("c1", 5.0), transaction("ghost", 9.0)]);
        let table = aggregate_customers(&events, &profile(&[("c1", 40), ("idle", 30)]));

        assert_eq!(table.len(), 1);
        assert!(table.get("c1").is_some());
        assert!(table.get("ghost").is_none());
        assert!(table.get("idle").is_none());
    }

    #[test]
    fn test_unknown_offer_rows_not_counted() {
        let mut event = offer_event("c1", EventKind::OfferReceived, OfferCode::B3);
        event.offer_id = None;
        event.offer = None;
        let table = aggregate_customers(&EventTable::new(vec![event]), &profile(&[("c1", 40)]));
        let row = table.get("c1").unwrap();
        assert_eq!(row.overall().received, 0);
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let events = EventTable::new(vec![
            transaction("c2", 3.33),
            offer_event("c1", EventKind::OfferReceived, OfferCode::D4),
            offer_event("c2", EventKind::OfferCompleted, OfferCode::B2),
            transaction("c1", 1.1),
        ]);
        let profile = profile(&[("c1", 40), ("c2", 118)]);

        let first = aggregate_customers(&events, &profile).to_json_lines().unwrap();
        let second = aggregate_customers(&events, &profile).to_json_lines().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("{\"customer_id\":\"c1\""));
    }

    fn arb_event() -> impl Strategy<Value = MergedEvent> {
        let customers = prop_oneof![Just("c1"), Just("c2"), Just("c3")];
        let codes = proptest::sample::select(OfferCode::ALL.to_vec());
        let kinds = proptest::sample::select(vec![
            EventKind::OfferReceived,
            EventKind::OfferViewed,
            EventKind::OfferCompleted,
        ]);
        prop_oneof![
            (customers.clone(), kinds, codes).prop_map(|(c, k, code)| offer_event(c, k, code)),
            (customers, 0.0f64..50.0).prop_map(|(c, amount)| transaction(c, amount)),
        ]
    }

    proptest! {
        #[test]
        fn aggregate_invariants_hold(events in proptest::collection::vec(arb_event(), 0..60)) {
            let table = aggregate_customers(
                &EventTable::new(events),
                &profile(&[("c1", 20), ("c2", 60), ("c3", 118)]),
            );
            for row in table.iter() {
                let overall = row.overall();
                prop_assert!((row.net_expense - (row.total_expense - overall.reward_or_zero())).abs() < 1e-9);

                let by_type: u32 = OfferType::ALL.iter().map(|t| row.funnel(*t).received).sum();
                let by_offer: u32 = OfferCode::ALL.iter().map(|c| row.funnel(*c).received).sum();
                prop_assert_eq!(by_type, overall.received);
                prop_assert_eq!(by_offer, overall.received);

                for scope in Scope::ALL {
                    let funnel = row.funnel(scope);
                    prop_assert_eq!(funnel.completed.is_some(), scope.has_completion());
                    prop_assert_eq!(funnel.reward.is_some(), scope.has_completion());
                }
            }
        }
    }
}
