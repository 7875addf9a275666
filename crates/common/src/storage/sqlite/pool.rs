//! SQLite connection pool
//!
//! Provides r2d2-based connection pooling with per-connection pragmas and
//! structured logging of acquisition failures.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::SqlitePoolConfig;
use super::connection::SqliteConnection;
use super::pragmas::apply_connection_pragmas;
use super::transaction::WriteTransaction;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::metrics::StorageMetrics;
use crate::storage::types::HealthStatus;

/// Pool of SQLite connections to one database file.
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: SqlitePoolConfig,
    metrics: Arc<StorageMetrics>,
}

impl SqlitePool {
    /// Open (creating if needed) the database at `path`.
    ///
    /// One connection is checked out before returning so that an unusable
    /// path fails here rather than on first use.
    #[instrument(skip(config), fields(db_path = ?path, pool_size = config.max_size))]
    pub fn open(path: &Path, config: SqlitePoolConfig) -> StorageResult<Self> {
        info!("Creating SQLite connection pool");

        let metrics = Arc::new(StorageMetrics::new(config.max_size));

        let pool_config = config.clone();
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            apply_connection_pragmas(conn, &pool_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.max_size.max(1))
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| {
                warn!("Failed to create connection pool: {}", e);
                StorageError::Connection(format!("Failed to create pool: {}", e))
            })?;

        drop(pool.get().map_err(|e| {
            StorageError::Connection(format!("Failed to get test connection: {}", e))
        })?);

        info!("SQLite pool created with {} connections", config.max_size);

        Ok(Self { pool, config, metrics })
    }

    pub fn metrics(&self) -> &Arc<StorageMetrics> {
        &self.metrics
    }

    #[instrument(skip(self), fields(pool_size = self.config.max_size))]
    fn acquire(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        let start = Instant::now();

        match self.pool.get() {
            Ok(conn) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                self.metrics.record_connection_acquired(duration_ms);
                debug!("Connection acquired in {}ms", duration_ms);
                Ok(conn)
            }
            Err(e) => {
                if e.to_string().to_lowercase().contains("timed out") {
                    self.metrics.record_connection_timeout();
                    warn!("Connection timeout after {:?}", self.config.connection_timeout);
                    Err(StorageError::Timeout(self.config.connection_timeout.as_secs()))
                } else {
                    self.metrics.record_connection_error();
                    warn!("Connection error: {}", e);
                    Err(StorageError::Connection(format!("Failed to get connection: {}", e)))
                }
            }
        }
    }

    /// Connection for reads and schema work.
    pub fn get_connection(&self) -> StorageResult<SqliteConnection> {
        self.acquire().map(SqliteConnection::new)
    }

    /// Open a write transaction on a fresh pooled connection.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        let conn = self.acquire()?;
        WriteTransaction::begin(conn, Arc::clone(&self.metrics))
    }

    pub fn health_check(&self) -> HealthStatus {
        let state = self.pool.state();

        match self.pool.get() {
            Ok(_conn) => HealthStatus::healthy(
                state.connections as usize,
                state.idle_connections as usize,
                self.config.max_size as usize,
            ),
            Err(e) => HealthStatus::unhealthy(format!("Pool unhealthy: {}", e)),
        }
    }
}
