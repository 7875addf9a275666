//! # Minetally Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite repositories for shifts, reconciliations and conversion factors
//! - The canonical schema and the [`DbManager`] that owns the pool
//! - Configuration loading from environment variables and files
//! - Tracing initialisation and outcome logging
//! - [`AppContext`], which wires repositories into the core services
//!
//! ## Architecture
//! - Implements traits defined in `minetally-core`
//! - Depends on `minetally-common` for pooling and write transactions
//! - Contains all "impure" code (I/O, environment)

pub mod config;
pub mod context;
pub mod database;
pub mod errors;
pub mod observability;

// Re-export commonly used items
pub use context::AppContext;
pub use database::{
    DbManager, SqliteFactorRepository, SqliteReconciliationRepository, SqliteShiftRepository,
};
pub use errors::InfraError;
pub use observability::{init_tracing, log_operation_outcome, LogFormat};
