//! Storage primitives for SQLite databases
//!
//! Connection pooling, pragmas, owned write transactions, storage errors and
//! metrics.

pub mod config;
pub mod error;
pub mod metrics;
pub mod sqlite;
pub mod types;

pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use metrics::StorageMetrics;
pub use sqlite::{
    apply_connection_pragmas, SqliteConnection, SqlitePool, SqlitePoolConfig, WriteTransaction,
};
pub use types::{HealthStatus, PoolMetrics};
