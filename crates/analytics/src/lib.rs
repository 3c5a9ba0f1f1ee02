//! Per-customer aggregation of the merged event log: funnel counts,
//! rewards and spend, overall and sliced by offer type and offer id.

pub mod aggregate;
pub mod engine;
pub mod scope;

pub use aggregate::{CustomerAggregate, CustomerTable, FunnelCounts, FunnelSet};
pub use engine::aggregate_customers;
pub use scope::{Metric, Scope};
