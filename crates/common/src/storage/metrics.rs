//! Storage metrics tracking
//!
//! Lock-free counters for pool and transaction activity.

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::PoolMetrics;

/// Counters shared by a pool and every transaction it hands out.
#[derive(Debug)]
pub struct StorageMetrics {
    pub connections_acquired: AtomicU64,
    pub connections_timeout: AtomicU64,
    pub connections_error: AtomicU64,
    total_connection_time_ms: AtomicU64,
    pub transactions_committed: AtomicU64,
    pub transactions_rolled_back: AtomicU64,
    max_pool_size: u32,
}

impl StorageMetrics {
    pub fn new(max_pool_size: u32) -> Self {
        Self {
            connections_acquired: AtomicU64::new(0),
            connections_timeout: AtomicU64::new(0),
            connections_error: AtomicU64::new(0),
            total_connection_time_ms: AtomicU64::new(0),
            transactions_committed: AtomicU64::new(0),
            transactions_rolled_back: AtomicU64::new(0),
            max_pool_size,
        }
    }

    pub fn record_connection_acquired(&self, duration_ms: u64) {
        self.connections_acquired.fetch_add(1, Ordering::Relaxed);
        self.total_connection_time_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    pub fn record_connection_timeout(&self) {
        self.connections_timeout.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_error(&self) {
        self.connections_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_connection_time_ms(&self) -> u64 {
        let total = self.total_connection_time_ms.load(Ordering::Relaxed);
        let count = self.connections_acquired.load(Ordering::Relaxed);

        if count == 0 {
            0
        } else {
            total / count
        }
    }

    pub fn max_pool_size(&self) -> u32 {
        self.max_pool_size
    }

    pub fn snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            connections_acquired: self.connections_acquired.load(Ordering::Relaxed),
            connections_timeout: self.connections_timeout.load(Ordering::Relaxed),
            connections_error: self.connections_error.load(Ordering::Relaxed),
            avg_acquisition_time_ms: self.avg_connection_time_ms(),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_acquired() {
        let metrics = StorageMetrics::new(10);
        metrics.record_connection_acquired(100);
        metrics.record_connection_acquired(200);

        assert_eq!(metrics.connections_acquired.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.avg_connection_time_ms(), 150);
    }

    #[test]
    fn test_avg_with_no_connections() {
        let metrics = StorageMetrics::new(10);
        assert_eq!(metrics.avg_connection_time_ms(), 0);
        assert_eq!(metrics.max_pool_size(), 10);
    }

    #[test]
    fn test_transaction_outcomes() {
        let metrics = StorageMetrics::new(4);
        metrics.record_commit();
        metrics.record_commit();
        metrics.record_rollback();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.transactions_committed, 2);
        assert_eq!(snapshot.transactions_rolled_back, 1);
    }
}
