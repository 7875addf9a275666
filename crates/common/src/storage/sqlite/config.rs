//! SQLite connection pool configuration

use std::time::Duration;

use crate::storage::config::StorageConfig;

/// Configuration for [`super::SqlitePool`].
#[derive(Debug, Clone)]
pub struct SqlitePoolConfig {
    /// Maximum pooled connections.
    pub max_size: u32,

    /// Time to wait for a free connection.
    pub connection_timeout: Duration,

    /// Time SQLite waits on a held lock before returning BUSY.
    pub busy_timeout: Duration,

    pub enable_wal: bool,

    pub enable_foreign_keys: bool,
}

impl From<&StorageConfig> for SqlitePoolConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_size: config.pool_size,
            connection_timeout: config.connection_timeout(),
            busy_timeout: config.busy_timeout(),
            enable_wal: config.enable_wal,
            enable_foreign_keys: config.enable_foreign_keys,
        }
    }
}

impl Default for SqlitePoolConfig {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_config() {
        let storage_config = StorageConfig {
            pool_size: 3,
            busy_timeout_ms: 250,
            enable_wal: false,
            ..StorageConfig::new("site.db")
        };

        let pool_config = SqlitePoolConfig::from(&storage_config);

        assert_eq!(pool_config.max_size, 3);
        assert_eq!(pool_config.busy_timeout, Duration::from_millis(250));
        assert_eq!(pool_config.connection_timeout, Duration::from_secs(5));
        assert!(!pool_config.enable_wal);
        assert!(pool_config.enable_foreign_keys);
    }
}
