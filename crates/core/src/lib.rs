//! # Minetally Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The deterministic shift-totals aggregator
//! - The validation snapshot state machine
//! - The monthly reconciliation allocator
//! - The conversion-factor solver
//!
//! ## Architecture Principles
//! - Only depends on `minetally-domain`
//! - No database or platform code
//! - All persistence via repository traits (ports) with explicit
//!   transactions
//! - Pure, testable business logic

pub mod factors;
pub mod reconciliation;
pub mod totals;
pub mod validation;

pub use factors::ports::{FactorRepository, FactorTransaction, MonthActivity};
pub use factors::FactorService;
pub use reconciliation::ports::{ReconciliationRepository, ReconciliationTransaction};
pub use reconciliation::ReconciliationService;
pub use totals::aggregate;
pub use validation::ports::{ShiftRepository, ShiftTransaction};
pub use validation::ValidationService;
