//! Stage report for one offer scope, as printed by the `report` command.

use std::collections::BTreeMap;

use insights_analytics::{CustomerTable, Scope};
use serde::Serialize;
use tracing::info;

use crate::grouped::{average_expense_by, offer_stat_by, Aggregation, GroupBy, GroupKey};
use crate::stages::{average_expense, offer_stat, StageSeries, Stat};

/// Chosen statistic and average expense per stage, keyed by customer id or by
/// group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport<K: Ord> {
    pub scope: String,
    pub stat: Stat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by: Option<GroupBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    pub values: StageSeries<BTreeMap<K, f64>>,
    pub average_expense: StageSeries<BTreeMap<K, f64>>,
}

impl StageReport<String> {
    pub fn per_customer(customers: &CustomerTable, stat: Stat, scope: Scope) -> Self {
        let report = Self {
            scope: scope.to_string(),
            stat,
            by: None,
            aggregation: None,
            values: offer_stat(customers, stat, scope),
            average_expense: average_expense(customers, scope),
        };
        info!(
            scope = %scope,
            stat = %stat,
            received = report.values.received.len(),
            viewed = report.values.viewed.len(),
            "stage report built"
        );
        report
    }
}

impl StageReport<GroupKey> {
    pub fn grouped(
        customers: &CustomerTable,
        stat: Stat,
        scope: Scope,
        by: GroupBy,
        aggregation: Aggregation,
    ) -> Self {
        let report = Self {
            scope: scope.to_string(),
            stat,
            by: Some(by),
            aggregation: Some(aggregation),
            values: offer_stat_by(customers, stat, scope, by, aggregation),
            average_expense: average_expense_by(customers, scope, by),
        };
        info!(
            scope = %scope,
            stat = %stat,
            by = %by,
            aggregation = %aggregation,
            "grouped stage report built"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::tests::customer;
    use insights_core::{Gender, OfferCode};

    fn table() -> CustomerTable {
        let b2 = Scope::Offer(OfferCode::B2);
        CustomerTable::new(vec![
            customer("a", 27, Some(Gender::F), (30.0, 3), b2, (1, 0, 0)),
            customer("b", 41, Some(Gender::M), (80.0, 4), b2, (1, 1, 1)),
        ])
    }

    #[test]
    fn test_per_customer_report_json() {
        let report = StageReport::per_customer(&table(), Stat::NetExpense, OfferCode::B2.into());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["scope"], "B2");
        assert_eq!(json["stat"], "net_expense");
        assert!(json.get("by").is_none());
        assert_eq!(json["values"]["received"]["a"], 25.0);
        assert_eq!(json["values"]["completed"]["b"], 75.0);
        assert_eq!(json["average_expense"]["completed"]["b"], 20.0);
    }

    #[test]
    fn test_grouped_report_json() {
        let report = StageReport::grouped(
            &table(),
            Stat::TotalExpense,
            Scope::Overall,
            GroupBy::Gender,
            Aggregation::Mean,
        );
        assert_eq!(report.scope, "overall");
        // The funnels were set on B2 only, so the overall scope is empty.
        assert!(report.values.received.is_empty());

        let report = StageReport::grouped(
            &table(),
            Stat::TotalExpense,
            OfferCode::B2.into(),
            GroupBy::Gender,
            Aggregation::Mean,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["by"], "gender");
        assert_eq!(json["aggregation"], "mean");
        assert_eq!(json["values"]["received"]["F"], 30.0);
        assert_eq!(json["average_expense"]["completed"]["M"], 20.0);
    }
}
