//! SQLite backend implementation
//!
//! Provides an r2d2-based connection pool for SQLite databases and an owned
//! write transaction that holds the writer lock from its first statement.

pub mod config;
pub mod connection;
pub mod pool;
pub mod pragmas;
pub mod transaction;

pub use config::SqlitePoolConfig;
pub use connection::SqliteConnection;
pub use pool::SqlitePool;
pub use pragmas::apply_connection_pragmas;
pub use transaction::WriteTransaction;
