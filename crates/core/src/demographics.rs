//! Demographic bucketing shared by the aggregator, the ranker and reporting.

/// Age recorded for customers who did not share demographic data.
pub const UNKNOWN_AGE: u32 = 118;

/// Round an age down to its decade bucket (15, 25, ..., 105).
/// Returns 0 for ages below 15 or at/above 115, which covers the 118 sentinel.
pub fn round_age(age: u32) -> u32 {
    if (15..115).contains(&age) {
        15 + (age - 15) / 10 * 10
    } else {
        0
    }
}

/// Round an income down to the nearest 10,000 within [30,000, 120,000).
/// Returns 0 outside that range.
pub fn round_income(income: f64) -> u32 {
    if (30_000.0..120_000.0).contains(&income) {
        (income / 10_000.0).floor() as u32 * 10_000
    } else {
        0
    }
}

/// Income bucket for an optional income; absent income lands in bucket 0.
pub fn income_group(income: Option<f64>) -> u32 {
    income.map(round_income).unwrap_or(0)
}
