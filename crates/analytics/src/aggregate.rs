//! Customer aggregate rows and the customer table.

use chrono::NaiveDate;
use insights_core::{Gender, OfferCode, OfferType};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::scope::{Metric, Scope};

// ─── Funnel Counts ───────────────────────────────────────────────────

/// Funnel metrics for one scope. `completed` and `reward` are `None` when the
/// scope has no completion, which is different from zero completions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunnelCounts {
    pub received: u32,
    pub viewed: u32,
    pub completed: Option<u32>,
    pub reward: Option<f64>,
}

impl FunnelCounts {
    pub fn empty(has_completion: bool) -> Self {
        Self {
            received: 0,
            viewed: 0,
            completed: has_completion.then_some(0),
            reward: has_completion.then_some(0.0),
        }
    }

    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Received => Some(f64::from(self.received)),
            Metric::Viewed => Some(f64::from(self.viewed)),
            Metric::Completed => self.completed.map(f64::from),
            Metric::Reward => self.reward,
        }
    }

    pub fn completed_or_zero(&self) -> u32 {
        self.completed.unwrap_or(0)
    }

    pub fn reward_or_zero(&self) -> f64 {
        self.reward.unwrap_or(0.0)
    }
}

/// Funnels for every scope of the static schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelSet {
    overall: FunnelCounts,
    by_type: [FunnelCounts; 3],
    by_offer: [FunnelCounts; 10],
}

impl FunnelSet {
    pub fn new() -> Self {
        Self {
            overall: FunnelCounts::empty(true),
            by_type: OfferType::ALL.map(|t| FunnelCounts::empty(t.has_completion())),
            by_offer: OfferCode::ALL.map(|c| FunnelCounts::empty(c.has_completion())),
        }
    }

    pub fn get(&self, scope: Scope) -> &FunnelCounts {
        match scope {
            Scope::Overall => &self.overall,
            Scope::Type(t) => &self.by_type[t as usize],
            Scope::Offer(code) => &self.by_offer[code as usize],
        }
    }

    pub fn get_mut(&mut self, scope: Scope) -> &mut FunnelCounts {
        match scope {
            Scope::Overall => &mut self.overall,
            Scope::Type(t) => &mut self.by_type[t as usize],
            Scope::Offer(code) => &mut self.by_offer[code as usize],
        }
    }
}

impl Default for FunnelSet {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Customer Aggregate ──────────────────────────────────────────────

/// One row of the customer table.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerAggregate {
    pub customer_id: String,
    pub total_expense: f64,
    pub total_transactions: u32,
    pub funnels: FunnelSet,
    pub became_member_on: NaiveDate,
    pub gender: Option<Gender>,
    pub age: u32,
    pub income: Option<f64>,
    pub valid: bool,
    pub age_group: u32,
    pub income_group: u32,
    /// Spend minus rewards collected across all offers.
    pub net_expense: f64,
}

impl CustomerAggregate {
    pub fn funnel(&self, scope: impl Into<Scope>) -> &FunnelCounts {
        self.funnels.get(scope.into())
    }

    pub fn overall(&self) -> &FunnelCounts {
        self.funnels.get(Scope::Overall)
    }

    /// Average transaction value; 0 when the customer has no transactions.
    pub fn average_expense(&self) -> f64 {
        if self.total_transactions > 0 {
            self.total_expense / f64::from(self.total_transactions)
        } else {
            0.0
        }
    }

    /// Flat column view, in table column order. Absent metrics have no column.
    pub fn columns(&self) -> Vec<(String, Value)> {
        let mut columns = Vec::with_capacity(64);
        columns.push(("customer_id".to_string(), Value::from(self.customer_id.clone())));
        columns.push(("total_expense".to_string(), Value::from(self.total_expense)));
        columns.push(("total_transactions".to_string(), Value::from(self.total_transactions)));

        for scope in Scope::ALL {
            let funnel = self.funnels.get(scope);
            for metric in scope.metrics() {
                let value = match metric {
                    Metric::Received => Some(Value::from(funnel.received)),
                    Metric::Viewed => Some(Value::from(funnel.viewed)),
                    Metric::Completed => funnel.completed.map(Value::from),
                    Metric::Reward => funnel.reward.map(Value::from),
                };
                if let Some(value) = value {
                    columns.push((scope.column(*metric), value));
                }
            }
        }

        columns.push((
            "became_member_on".to_string(),
            Value::from(self.became_member_on.format("%Y-%m-%d").to_string()),
        ));
        columns.push((
            "gender".to_string(),
            self.gender.map_or(Value::Null, |g| Value::from(g.as_str())),
        ));
        columns.push(("age".to_string(), Value::from(self.age)));
        columns.push(("income".to_string(), self.income.map_or(Value::Null, Value::from)));
        columns.push(("valid".to_string(), Value::from(self.valid)));
        columns.push(("age_group".to_string(), Value::from(self.age_group)));
        columns.push(("income_group".to_string(), Value::from(self.income_group)));
        columns.push(("net_expense".to_string(), Value::from(self.net_expense)));
        columns
    }

    /// Look up a single column by name.
    pub fn column(&self, name: &str) -> Option<Value> {
        self.columns().into_iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl Serialize for CustomerAggregate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let columns = self.columns();
        let mut map = serializer.serialize_map(Some(columns.len()))?;
        for (name, value) in &columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ─── Customer Table ──────────────────────────────────────────────────

/// One row per qualifying customer, sorted by customer id.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct CustomerTable {
    rows: Vec<CustomerAggregate>,
}

impl CustomerTable {
    pub fn new(mut rows: Vec<CustomerAggregate>) -> Self {
        rows.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
        Self { rows }
    }

    pub fn rows(&self) -> &[CustomerAggregate] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomerAggregate> {
        self.rows.iter()
    }

    pub fn get(&self, customer_id: &str) -> Option<&CustomerAggregate> {
        self.rows
            .binary_search_by(|row| row.customer_id.as_str().cmp(customer_id))
            .ok()
            .map(|i| &self.rows[i])
    }

    /// New table holding the rows that satisfy `predicate`.
    pub fn filter(&self, predicate: impl Fn(&CustomerAggregate) -> bool) -> CustomerTable {
        CustomerTable {
            rows: self.rows.iter().filter(|row| predicate(row)).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names of the table schema, independent of the rows present.
    pub fn column_names() -> Vec<String> {
        let mut names = vec![
            "customer_id".to_string(),
            "total_expense".to_string(),
            "total_transactions".to_string(),
        ];
        for scope in Scope::ALL {
            names.extend(scope.metrics().iter().map(|m| scope.column(*m)));
        }
        names.extend(
            [
                "became_member_on",
                "gender",
                "age",
                "income",
                "valid",
                "age_group",
                "income_group",
                "net_expense",
            ]
            .map(String::from),
        );
        names
    }

    /// Serialize as JSON lines, one customer per line.
    pub fn to_json_lines(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl<'a> IntoIterator for &'a CustomerTable {
    type Item = &'a CustomerAggregate;
    type IntoIter = std::slice::Iter<'a, CustomerAggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str) -> CustomerAggregate {
        CustomerAggregate {
            customer_id: id.to_string(),
            total_expense: 0.0,
            total_transactions: 0,
            funnels: FunnelSet::new(),
            became_member_on: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            gender: Some(Gender::F),
            age: 40,
            income: Some(50_000.0),
            valid: true,
            age_group: 35,
            income_group: 50_000,
            net_expense: 0.0,
        }
    }

    #[test]
    fn test_empty_funnels_distinguish_absent_from_zero() {
        let funnels = FunnelSet::new();
        assert_eq!(funnels.get(Scope::Overall).completed, Some(0));
        assert_eq!(funnels.get(Scope::Type(OfferType::Bogo)).reward, Some(0.0));
        assert_eq!(funnels.get(Scope::Type(OfferType::Informational)).completed, None);
        assert_eq!(funnels.get(Scope::Offer(OfferCode::I1)).reward, None);
        assert_eq!(funnels.get(Scope::Offer(OfferCode::I2)).value(Metric::Completed), None);
    }

    #[test]
    fn test_funnel_set_addresses_each_scope() {
        let mut funnels = FunnelSet::new();
        for (i, scope) in Scope::ALL.into_iter().enumerate() {
            funnels.get_mut(scope).received = i as u32;
        }
        for (i, scope) in Scope::ALL.into_iter().enumerate() {
            assert_eq!(funnels.get(scope).received, i as u32);
        }
    }

    #[test]
    fn test_average_expense_zero_transactions() {
        let mut customer = row("c1");
        assert_eq!(customer.average_expense(), 0.0);
        customer.total_expense = 30.0;
        customer.total_transactions = 4;
        assert_eq!(customer.average_expense(), 7.5);
    }

    #[test]
    fn test_columns_match_schema() {
        let customer = row("c1");
        let names: Vec<String> = customer.columns().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, CustomerTable::column_names());
        assert!(!names.contains(&"I1_completed".to_string()));
        assert!(!names.contains(&"informational_reward".to_string()));
        assert!(names.contains(&"B1_completed".to_string()));
        assert_eq!(customer.column("B2_received"), Some(Value::from(0u64)));
        assert_eq!(customer.column("I2_reward"), None);
    }

    #[test]
    fn test_table_sorted_and_lookup() {
        let table = CustomerTable::new(vec![row("c3"), row("c1"), row("c2")]);
        let ids: Vec<&str> = table.iter().map(|r| r.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert!(table.get("c2").is_some());
        assert!(table.get("c9").is_none());

        let filtered = table.filter(|r| r.customer_id != "c2");
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_json_lines_preserve_column_order() {
        let table = CustomerTable::new(vec![row("c1")]);
        let line = table.to_json_lines().unwrap();
        assert!(line.starts_with("{\"customer_id\":\"c1\",\"total_expense\":0.0,"));
        assert!(line.ends_with("\"net_expense\":0.0}\n"));
    }
}
