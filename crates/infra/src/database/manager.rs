//! Database connection manager backed by the shared SQLite pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use minetally_common::storage::{
    HealthStatus, SqliteConnection, SqlitePool, SqlitePoolConfig, StorageConfig,
    WriteTransaction,
};
use minetally_domain::{DatabaseConfig, MinetallyError, Result};
use rusqlite::params;
use tracing::{info, warn};

use crate::errors::db_error;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Database manager that wraps an [`SqlitePool`].
pub struct DbManager {
    pool: Arc<SqlitePool>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size and default pragmas.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let config = StorageConfig::new(db_path.as_ref()).with_pool_size(pool_size.max(1));
        Self::with_storage_config(&config)
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(&config.path, config.pool_size)
    }

    /// Create a manager from a full storage configuration (timeouts, WAL,
    /// foreign keys).
    pub fn with_storage_config(config: &StorageConfig) -> Result<Self> {
        config.validate().map_err(db_error("database.config"))?;

        let path = config.path.clone();
        let pool = SqlitePool::open(&path, SqlitePoolConfig::from(config))
            .map_err(db_error("database.open"))?;

        info!(
            db_path = %path.display(),
            max_connections = config.pool_size,
            "sqlite pool initialised"
        );

        Ok(Self { pool: Arc::new(pool), path })
    }

    /// Borrow the underlying SQLite pool.
    pub fn pool(&self) -> &Arc<SqlitePool> {
        &self.pool
    }

    /// Acquire a connection for reads.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get_connection().map_err(db_error("database.connection"))
    }

    /// Open a `BEGIN IMMEDIATE` transaction; it rolls back unless committed.
    pub fn begin_write(&self) -> Result<WriteTransaction> {
        self.pool.begin_write().map_err(db_error("database.begin"))
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)?;
        info!(version = SCHEMA_VERSION, "schema ensured");
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Report pool health, then run a trivial query on a fresh connection.
    ///
    /// The pool counters are logged alongside the result.
    pub fn health_check(&self) -> Result<HealthStatus> {
        let status = self.pool.health_check();
        let metrics = self.pool.metrics().snapshot();

        if !status.healthy {
            let message = status.message.unwrap_or_else(|| "pool unhealthy".to_string());
            warn!(
                connections_timeout = metrics.connections_timeout,
                connections_error = metrics.connections_error,
                %message,
                "database health check failed"
            );
            return Err(MinetallyError::Database(format!("database.health_check: {message}")));
        }

        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", &[], |row| row.get::<_, i32>(0))
            .map_err(db_error("database.health_check"))?;

        info!(
            active_connections = status.active_connections,
            idle_connections = status.idle_connections,
            max_connections = status.max_connections,
            connections_acquired = metrics.connections_acquired,
            transactions_committed = metrics.transactions_committed,
            transactions_rolled_back = metrics.transactions_rolled_back,
            "database healthy"
        );
        Ok(status)
    }
}

fn create_schema(conn: &SqliteConnection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(db_error("schema.create"))?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, CAST(strftime('%s','now') AS INTEGER))",
        params![SCHEMA_VERSION],
    )
    .map_err(db_error("schema.version"))?;
    Ok(())
}
