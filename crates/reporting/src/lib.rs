//! Offer stage reporting: how customers who received, viewed or completed an
//! offer spend, per customer or grouped by a demographic column.

pub mod grouped;
pub mod report;
pub mod stages;

pub use grouped::{average_expense_by, offer_stat_by, Aggregation, GroupBy, GroupKey};
pub use report::StageReport;
pub use stages::{average_expense, offer_stat, Stage, StageSeries, Stat};
