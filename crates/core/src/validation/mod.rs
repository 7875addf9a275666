//! Validation snapshot store
//!
//! Lifecycle of per-operator shift records: capture, validation sign-off,
//! and re-opening of a whole day.

pub mod ports;
pub mod service;

pub use ports::{ShiftRepository, ShiftTransaction};
pub use service::ValidationService;
