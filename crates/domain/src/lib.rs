//! # Minetally Domain
//!
//! Business domain types and models for the mine-site production reporting
//! pipeline.
//!
//! This crate contains:
//! - Activity payloads, shift totals and validation snapshot types
//! - Reconciliation records and daily allocations
//! - Conversion-factor groups and monthly factor results
//! - Domain error types and Result definitions
//! - Configuration structures and domain constants
//!
//! ## Architecture
//! - No dependencies on other Minetally crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
