//! Customer demographics cleaning.

use std::collections::HashMap;

use chrono::NaiveDate;
use insights_core::demographics::UNKNOWN_AGE;
use insights_core::{Gender, InsightsError, InsightsResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One customer as it appears in the raw demographics table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProfile {
    pub id: String,
    /// Signup date encoded as a `YYYYMMDD` integer.
    pub became_member_on: i64,
    pub gender: Option<String>,
    pub age: u32,
    pub income: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub became_member_on: NaiveDate,
    pub gender: Option<Gender>,
    pub age: u32,
    pub income: Option<f64>,
    /// True when the customer shared demographic data (age is not the 118 sentinel).
    pub valid: bool,
}

impl Customer {
    pub fn is_gender(&self, gender: Gender) -> bool {
        self.gender == Some(gender)
    }
}

/// Cleaned demographics plus the genders observed across all customers.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    customers: Vec<Customer>,
    genders: Vec<Gender>,
    index: HashMap<String, usize>,
}

impl Profile {
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn observed_genders(&self) -> &[Gender] {
        &self.genders
    }

    pub fn get(&self, customer_id: &str) -> Option<&Customer> {
        self.index.get(customer_id).map(|&i| &self.customers[i])
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

/// Parse an 8-digit `YYYYMMDD` integer into a calendar date.
pub fn parse_signup_date(value: i64) -> InsightsResult<NaiveDate> {
    let invalid = || InsightsError::InvalidSignupDate { value };
    if !(10_000_000..=99_999_999).contains(&value) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(&value.to_string(), "%Y%m%d").map_err(|_| invalid())
}

/// Clean the raw demographics: parse dates and genders, flag valid rows,
/// rename `id` to `customer_id`.
pub fn prepare_profile(raw: &[RawProfile]) -> InsightsResult<Profile> {
    let mut customers = Vec::with_capacity(raw.len());
    let mut index = HashMap::with_capacity(raw.len());
    let mut genders = Vec::new();

    for entry in raw {
        let gender = entry
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()?;
        if let Some(g) = gender {
            if !genders.contains(&g) {
                genders.push(g);
            }
        }

        if index.insert(entry.id.clone(), customers.len()).is_some() {
            return Err(InsightsError::Validation(format!(
                "duplicate customer id in profile: {}",
                entry.id
            )));
        }

        customers.push(Customer {
            customer_id: entry.id.clone(),
            became_member_on: parse_signup_date(entry.became_member_on)?,
            gender,
            age: entry.age,
            income: entry.income,
            valid: entry.age != UNKNOWN_AGE,
        });
    }

    genders.sort();
    let valid = customers.iter().filter(|c| c.valid).count();
    debug!(genders = ?genders, "profile gender indicators");
    info!(customers = customers.len(), valid, "profile cleaned");

    Ok(Profile {
        customers,
        genders,
        index,
    })
}
