#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use minetally_common::testing::TempDir;
use minetally_domain::{
    ActivityPayload, HaulLoad, MetricKey, ReconciliationKey, ReportingMonth, ShiftKey,
};
use minetally_infra::database::DbManager;

pub const SITE: &str = "site-1";

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a new temporary database with the schema applied.
    pub fn new() -> Self {
        let temp_dir = TempDir::new("infra-test").expect("temp dir should be created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    /// Count rows of `table`.
    pub fn count(&self, table: &str) -> i64 {
        let conn = self.manager.get_connection().expect("connection should be available");
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), &[], |row| row.get(0))
            .expect("count query should succeed")
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn march() -> ReportingMonth {
    ReportingMonth::new(2025, 3).unwrap()
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

pub fn shift_key(d: u32, shift: &str, operator: &str) -> ShiftKey {
    ShiftKey::new(SITE, day(d), shift, operator)
}

pub fn hauling(sub: &str, unit: &str, weights: &[f64]) -> ActivityPayload {
    weights.iter().fold(
        ActivityPayload::new("Hauling", sub).with_value("Equipment", unit).with_value("Distance", 1.5),
        |payload, &w| payload.with_load(HaulLoad::new(w).with_material("Ore")),
    )
}

pub fn loading(sub: &str, unit: &str, buckets: f64) -> ActivityPayload {
    ActivityPayload::new("Loading", sub).with_value("Equipment", unit).with_value("Buckets", buckets)
}

pub fn weight_key(sub: &str) -> ReconciliationKey {
    ReconciliationKey::new(SITE, march(), MetricKey::new("Hauling", sub, "Weight"))
}

pub fn tonnes_key(sub: &str) -> ReconciliationKey {
    ReconciliationKey::new(SITE, march(), MetricKey::new("Loading", sub, "Tonnes"))
}
