//! Stage cohorts of one offer scope and the per-customer statistics reported
//! over them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use insights_analytics::{CustomerAggregate, CustomerTable, Scope};
use insights_core::InsightsError;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ─── Statistics ──────────────────────────────────────────────────────

/// Customer column a stage report is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    TotalExpense,
    TotalTransactions,
    NetExpense,
}

impl Stat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::TotalExpense => "total_expense",
            Stat::TotalTransactions => "total_transactions",
            Stat::NetExpense => "net_expense",
        }
    }

    pub fn value(&self, customer: &CustomerAggregate) -> f64 {
        match self {
            Stat::TotalExpense => customer.total_expense,
            Stat::TotalTransactions => f64::from(customer.total_transactions),
            Stat::NetExpense => customer.net_expense,
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total_expense" => Ok(Stat::TotalExpense),
            "total_transactions" => Ok(Stat::TotalTransactions),
            "net_expense" => Ok(Stat::NetExpense),
            other => Err(InsightsError::Validation(format!("unknown statistic: {other}"))),
        }
    }
}

// ─── Stages ──────────────────────────────────────────────────────────

/// Furthest point a customer reached in an offer funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Received but never viewed.
    Received,
    /// Viewed, and for scopes with completion, never completed.
    Viewed,
    /// Completed. Only defined for scopes with completion.
    Completed,
}

/// How the completed cohort is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletedRule {
    ViewedAndCompleted,
    CompletedOnly,
}

/// Whether a customer belongs to `stage` of `scope`. Invalid customers never
/// belong to any stage.
pub(crate) fn in_stage(
    customer: &CustomerAggregate,
    scope: Scope,
    stage: Stage,
    rule: CompletedRule,
) -> bool {
    if !customer.valid {
        return false;
    }
    let funnel = customer.funnel(scope);
    match stage {
        Stage::Received => funnel.received > 0 && funnel.viewed == 0,
        Stage::Viewed => funnel.viewed > 0 && funnel.completed_or_zero() == 0,
        Stage::Completed => {
            let completed = scope.has_completion() && funnel.completed_or_zero() > 0;
            match rule {
                CompletedRule::ViewedAndCompleted => completed && funnel.viewed > 0,
                CompletedRule::CompletedOnly => completed,
            }
        }
    }
}

/// One value per stage. `completed` is absent for scopes without completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSeries<T> {
    pub received: T,
    pub viewed: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<T>,
}

impl<T> StageSeries<T> {
    pub(crate) fn build(scope: Scope, mut f: impl FnMut(Stage) -> T) -> Self {
        let received = f(Stage::Received);
        let viewed = f(Stage::Viewed);
        let completed = scope.has_completion().then(|| f(Stage::Completed));
        Self {
            received,
            viewed,
            completed,
        }
    }

    pub fn get(&self, stage: Stage) -> Option<&T> {
        match stage {
            Stage::Received => Some(&self.received),
            Stage::Viewed => Some(&self.viewed),
            Stage::Completed => self.completed.as_ref(),
        }
    }
}

// ─── Per-Customer Statistics ─────────────────────────────────────────

fn per_customer(
    customers: &CustomerTable,
    scope: Scope,
    value: impl Fn(&CustomerAggregate) -> f64,
) -> StageSeries<BTreeMap<String, f64>> {
    let series = StageSeries::build(scope, |stage| {
        customers
            .iter()
            .filter(|c| in_stage(c, scope, stage, CompletedRule::ViewedAndCompleted))
            .map(|c| (c.customer_id.clone(), value(c)))
            .collect::<BTreeMap<_, _>>()
    });
    debug!(
        scope = %scope,
        received = series.received.len(),
        viewed = series.viewed.len(),
        completed = series.completed.as_ref().map(BTreeMap::len),
        "stage cohorts selected"
    );
    series
}

/// `stat` for every valid customer in each stage of `scope`, keyed by
/// customer id. The completed cohort requires a view.
pub fn offer_stat(
    customers: &CustomerTable,
    stat: Stat,
    scope: Scope,
) -> StageSeries<BTreeMap<String, f64>> {
    per_customer(customers, scope, |c| stat.value(c))
}

/// Average transaction value per customer in each stage of `scope`.
/// Customers without transactions report 0.
pub fn average_expense(customers: &CustomerTable, scope: Scope) -> StageSeries<BTreeMap<String, f64>> {
    per_customer(customers, scope, CustomerAggregate::average_expense)
}
