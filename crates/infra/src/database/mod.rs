//! Database implementations

mod columns;
pub mod factor_repository;
pub mod manager;
pub mod reconciliation_repository;
pub mod shift_repository;

pub use factor_repository::*;
pub use manager::*;
pub use reconciliation_repository::*;
pub use shift_repository::*;
