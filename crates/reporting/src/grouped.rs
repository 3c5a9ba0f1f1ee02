//! Stage statistics grouped by a demographic column.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use insights_analytics::{CustomerAggregate, CustomerTable, Scope};
use insights_core::{Gender, InsightsError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stages::{in_stage, CompletedRule, Stage, StageSeries, Stat};

// ─── Grouping ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    AgeGroup,
    IncomeGroup,
    Gender,
}

impl GroupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupBy::AgeGroup => "age_group",
            GroupBy::IncomeGroup => "income_group",
            GroupBy::Gender => "gender",
        }
    }

    /// Group of a customer; `None` when the customer has no value for the
    /// grouping column.
    pub fn key(&self, customer: &CustomerAggregate) -> Option<GroupKey> {
        match self {
            GroupBy::AgeGroup => Some(GroupKey::Bucket(customer.age_group)),
            GroupBy::IncomeGroup => Some(GroupKey::Bucket(customer.income_group)),
            GroupBy::Gender => customer.gender.map(GroupKey::Gender),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "age_group" => Ok(GroupBy::AgeGroup),
            "income_group" => Ok(GroupBy::IncomeGroup),
            "gender" => Ok(GroupBy::Gender),
            other => Err(InsightsError::Validation(format!("unknown grouping column: {other}"))),
        }
    }
}

/// Value of a grouping column. Serializes as the bare bucket or gender code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Bucket(u32),
    Gender(Gender),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Bucket(bucket) => write!(f, "{bucket}"),
            GroupKey::Gender(gender) => write!(f, "{gender}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
        }
    }

    fn finish(&self, sum: f64, count: usize) -> f64 {
        match self {
            Aggregation::Sum => sum,
            Aggregation::Mean if count > 0 => sum / count as f64,
            Aggregation::Mean => 0.0,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            other => Err(InsightsError::Validation(format!("unknown aggregation: {other}"))),
        }
    }
}

// ─── Grouped Statistics ──────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
struct GroupTotals {
    expense: f64,
    transactions: f64,
    stat: f64,
    customers: usize,
}

/// Totals per group for the customers in one stage. In the grouped view the
/// completed cohort does not require a view.
fn group_stage(
    customers: &CustomerTable,
    scope: Scope,
    stage: Stage,
    by: GroupBy,
    stat: Stat,
) -> BTreeMap<GroupKey, GroupTotals> {
    let mut groups: BTreeMap<GroupKey, GroupTotals> = BTreeMap::new();
    let mut skipped = 0usize;

    for customer in customers
        .iter()
        .filter(|c| in_stage(c, scope, stage, CompletedRule::CompletedOnly))
    {
        let Some(key) = by.key(customer) else {
            skipped += 1;
            continue;
        };
        let totals = groups.entry(key).or_default();
        totals.expense += customer.total_expense;
        totals.transactions += f64::from(customer.total_transactions);
        totals.stat += stat.value(customer);
        totals.customers += 1;
    }

    debug!(
        scope = %scope,
        stage = ?stage,
        by = %by,
        groups = groups.len(),
        skipped,
        "stage grouped"
    );
    groups
}

/// `stat` per group for each stage of `scope`, summed or averaged over the
/// customers of the group.
pub fn offer_stat_by(
    customers: &CustomerTable,
    stat: Stat,
    scope: Scope,
    by: GroupBy,
    aggregation: Aggregation,
) -> StageSeries<BTreeMap<GroupKey, f64>> {
    StageSeries::build(scope, |stage| {
        group_stage(customers, scope, stage, by, stat)
            .into_iter()
            .map(|(key, totals)| (key, aggregation.finish(totals.stat, totals.customers)))
            .collect()
    })
}

/// Summed expense over summed transactions per group for each stage of
/// `scope`. Groups without transactions report 0.
pub fn average_expense_by(
    customers: &CustomerTable,
    scope: Scope,
    by: GroupBy,
) -> StageSeries<BTreeMap<GroupKey, f64>> {
    StageSeries::build(scope, |stage| {
        group_stage(customers, scope, stage, by, Stat::TotalExpense)
            .into_iter()
            .map(|(key, totals)| {
                let average = if totals.transactions > 0.0 {
                    totals.expense / totals.transactions
                } else {
                    0.0
                };
                (key, average)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::tests::customer;
    use insights_core::OfferCode;

    fn table() -> CustomerTable {
        let d2 = Scope::Offer(OfferCode::D2);
        CustomerTable::new(vec![
            customer("a", 30, Some(Gender::F), (40.0, 4), d2, (1, 0, 0)),
            customer("b", 33, Some(Gender::M), (20.0, 1), d2, (1, 0, 0)),
            customer("c", 50, Some(Gender::F), (60.0, 0), d2, (1, 0, 0)),
            customer("d", 52, None, (90.0, 6), d2, (1, 1, 1)),
            customer("e", 70, Some(Gender::O), (30.0, 3), d2, (1, 0, 2)),
            customer("f", 118, Some(Gender::F), (999.0, 9), d2, (1, 0, 0)),
        ])
    }

    #[test]
    fn test_sum_and_mean_by_age_group() {
        let scope = Scope::Offer(OfferCode::D2);
        let sum = offer_stat_by(&table(), Stat::TotalExpense, scope, GroupBy::AgeGroup, Aggregation::Sum);
        assert_eq!(sum.received.get(&GroupKey::Bucket(25)), Some(&60.0));
        assert_eq!(sum.received.get(&GroupKey::Bucket(45)), Some(&60.0));
        assert_eq!(sum.received.get(&GroupKey::Bucket(65)), Some(&30.0));
        assert!(sum.received.get(&GroupKey::Bucket(0)).is_none());
        assert!(sum.viewed.is_empty());

        let mean = offer_stat_by(&table(), Stat::TotalExpense, scope, GroupBy::AgeGroup, Aggregation::Mean);
        assert_eq!(mean.received.get(&GroupKey::Bucket(25)), Some(&30.0));
    }

    #[test]
    fn test_grouped_completion_does_not_require_view() {
        let scope = Scope::Offer(OfferCode::D2);
        let series = offer_stat_by(&table(), Stat::TotalExpense, scope, GroupBy::AgeGroup, Aggregation::Sum);
        let completed = series.completed.unwrap();
        assert_eq!(completed.get(&GroupKey::Bucket(45)), Some(&90.0));
        assert_eq!(completed.get(&GroupKey::Bucket(65)), Some(&30.0));
    }

    #[test]
    fn test_gender_grouping_skips_missing() {
        let scope = Scope::Offer(OfferCode::D2);
        let series = offer_stat_by(&table(), Stat::TotalTransactions, scope, GroupBy::Gender, Aggregation::Sum);
        let completed = series.completed.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed.get(&GroupKey::Gender(Gender::O)), Some(&3.0));
        assert_eq!(series.received.get(&GroupKey::Gender(Gender::F)), Some(&4.0));
    }

    #[test]
    fn test_average_expense_by_ratio_of_sums() {
        let scope = Scope::Offer(OfferCode::D2);
        let series = average_expense_by(&table(), scope, GroupBy::AgeGroup);
        // (40 + 20) / (4 + 1)
        assert_eq!(series.received.get(&GroupKey::Bucket(25)), Some(&12.0));
        // Only customer c, who has no transactions.
        assert_eq!(series.received.get(&GroupKey::Bucket(45)), Some(&0.0));
        assert_eq!(series.completed.unwrap().get(&GroupKey::Bucket(45)), Some(&15.0));
    }

    #[test]
    fn test_group_keys_serialize_bare() {
        let scope = Scope::Offer(OfferCode::D2);
        let series = offer_stat_by(&table(), Stat::NetExpense, scope, GroupBy::Gender, Aggregation::Sum);
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["received"]["M"], 15.0);
        assert_eq!(json["completed"]["O"], 25.0);

        let series = average_expense_by(&table(), scope, GroupBy::AgeGroup);
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["received"]["25"], 12.0);
    }

    #[test]
    fn test_parse_grouping_options() {
        assert_eq!("income_group".parse::<GroupBy>().unwrap(), GroupBy::IncomeGroup);
        assert_eq!("mean".parse::<Aggregation>().unwrap(), Aggregation::Mean);
        assert!("median".parse::<Aggregation>().is_err());
        assert_eq!(GroupKey::Bucket(35).to_string(), "35");
        assert_eq!(GroupKey::Gender(Gender::F).to_string(), "F");
    }
}
