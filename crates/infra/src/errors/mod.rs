//! Error conversions at the storage boundary

mod conversions;

pub use conversions::InfraError;
pub(crate) use conversions::db_error;
