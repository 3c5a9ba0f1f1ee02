//! Demographic predicate applied before ranking.

use insights_analytics::{CustomerAggregate, CustomerTable};
use insights_core::{round_age, round_income, Gender};
use serde::{Deserialize, Serialize};

/// Restricts the customer table to valid customers in a demographic slice.
/// Income and age are rounded to their buckets; a value that rounds to
/// bucket 0 applies no filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicFilter {
    pub income: Option<f64>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
}

impl DemographicFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn income(mut self, income: f64) -> Self {
        self.income = Some(income);
        self
    }

    pub fn age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    fn income_bucket(&self) -> Option<u32> {
        self.income.map(round_income).filter(|g| *g > 0)
    }

    fn age_bucket(&self) -> Option<u32> {
        self.age.map(round_age).filter(|g| *g > 0)
    }

    pub fn matches(&self, customer: &CustomerAggregate) -> bool {
        customer.valid
            && self.income_bucket().map_or(true, |g| customer.income_group == g)
            && self.age_bucket().map_or(true, |g| customer.age_group == g)
            && self.gender.map_or(true, |g| customer.gender == Some(g))
    }

    pub fn apply(&self, customers: &CustomerTable) -> CustomerTable {
        customers.filter(|c| self.matches(c))
    }
}
