//! Monthly reconciliation
//!
//! Compares the month's shift totals with an externally confirmed figure and
//! spreads the difference across calendar days.

pub mod allocator;
pub mod ports;
pub mod service;

pub use allocator::allocate;
pub use ports::{ReconciliationRepository, ReconciliationTransaction};
pub use service::{actual_total, ReconciliationService};
