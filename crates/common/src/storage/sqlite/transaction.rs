//! Owned write transaction
//!
//! Unlike `rusqlite::Transaction`, a [`WriteTransaction`] owns its pooled
//! connection, so it can be boxed behind a repository port and outlive the
//! call that opened it. It starts with `BEGIN IMMEDIATE`, taking SQLite's
//! writer lock before the first read, and rolls back on drop unless
//! committed.

use std::ops::Deref;
use std::sync::Arc;

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::storage::error::StorageResult;
use crate::storage::metrics::StorageMetrics;

pub struct WriteTransaction {
    conn: PooledConnection<SqliteConnectionManager>,
    metrics: Arc<StorageMetrics>,
    finished: bool,
}

impl WriteTransaction {
    pub(crate) fn begin(
        conn: PooledConnection<SqliteConnectionManager>,
        metrics: Arc<StorageMetrics>,
    ) -> StorageResult<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Self { conn, metrics, finished: false })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Commit. On failure the transaction is still open and is rolled back
    /// when `self` drops.
    pub fn commit(mut self) -> StorageResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        self.metrics.record_commit();
        debug!("write transaction committed");
        Ok(())
    }

    pub fn rollback(mut self) -> StorageResult<()> {
        self.finished = true;
        self.metrics.record_rollback();
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Deref for WriteTransaction {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.metrics.record_rollback();
        if let Err(err) = self.conn.execute_batch("ROLLBACK") {
            warn!(error = %err, "rollback of abandoned write transaction failed");
        } else {
            debug!("uncommitted write transaction rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::storage::sqlite::{SqlitePool, SqlitePoolConfig};

    fn pool(dir: &TempDir) -> SqlitePool {
        let pool =
            SqlitePool::open(&dir.path().join("tx.db"), SqlitePoolConfig::default()).unwrap();
        pool.get_connection()
            .unwrap()
            .execute_batch("CREATE TABLE t (v INTEGER)")
            .unwrap();
        pool
    }

    fn count(pool: &SqlitePool) -> i64 {
        pool.get_connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM t", &[], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn commit_persists() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir);

        let tx = pool.begin_write().unwrap();
        tx.execute("INSERT INTO t (v) VALUES (1)", []).unwrap();
        tx.commit().unwrap();

        assert_eq!(count(&pool), 1);
        assert_eq!(pool.metrics().snapshot().transactions_committed, 1);
    }

    #[test]
    fn drop_rolls_back() {
        let dir = TempDir::new().unwrap();
        let pool = pool(&dir);

        {
            let tx = pool.begin_write().unwrap();
            tx.execute("INSERT INTO t (v) VALUES (1)", []).unwrap();
        }

        assert_eq!(count(&pool), 0);
        assert_eq!(pool.metrics().snapshot().transactions_rolled_back, 1);

        // The connection went back to the pool without an open transaction.
        let tx = pool.begin_write().unwrap();
        tx.execute("INSERT INTO t (v) VALUES (2)", []).unwrap();
        tx.commit().unwrap();
        assert_eq!(count(&pool), 1);
    }
}
