//! Totals aggregation
//!
//! Turns raw activity payloads into hierarchical [`ShiftTotals`].
//!
//! [`ShiftTotals`]: minetally_domain::ShiftTotals

pub mod aggregator;

pub use aggregator::aggregate;
