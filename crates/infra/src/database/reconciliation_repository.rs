//! SQLite-backed implementation of the `ReconciliationRepository` port.
//!
//! Decimal quantities round-trip through their text form so stored
//! allocations keep summing exactly to the stored delta.

use std::sync::Arc;

use minetally_common::storage::WriteTransaction;
use minetally_core::{ReconciliationRepository, ReconciliationTransaction};
use minetally_domain::{
    DailyAllocation, ReconciliationKey, ReconciliationRecord, ReportingMonth, Result,
    ValidatedShift,
};
use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use super::columns;
use super::manager::DbManager;
use super::shift_repository::month_shifts;
use crate::errors::db_error;

/// SQLite-backed repository for monthly reconciliation records.
pub struct SqliteReconciliationRepository {
    db: Arc<DbManager>,
}

impl SqliteReconciliationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

impl ReconciliationRepository for SqliteReconciliationRepository {
    fn begin(&self) -> Result<Box<dyn ReconciliationTransaction + '_>> {
        Ok(Box::new(SqliteReconciliationTransaction { tx: self.db.begin_write()? }))
    }

    fn find(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>> {
        let conn = self.db.get_connection()?;
        load_record(&conn, key)
    }

    fn month_shifts(&self, site_id: &str, month: ReportingMonth) -> Result<Vec<ValidatedShift>> {
        let conn = self.db.get_connection()?;
        month_shifts(&conn, site_id, month)
    }
}

pub struct SqliteReconciliationTransaction {
    tx: WriteTransaction,
}

impl ReconciliationTransaction for SqliteReconciliationTransaction {
    fn month_shifts(&self, site_id: &str, month: ReportingMonth) -> Result<Vec<ValidatedShift>> {
        month_shifts(&self.tx, site_id, month)
    }

    fn find(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>> {
        load_record(&self.tx, key)
    }

    fn save(&mut self, record: &ReconciliationRecord) -> Result<()> {
        let key = &record.key;
        let month = key.month.to_string();
        let metric = key.metric_key.to_string();
        let reconciled = record.reconciled_total.to_string();
        let basis = record.basis.to_string();
        let method = record.method.to_string();
        let actual = record.actual_total_snapshot.to_string();
        let delta = record.delta_snapshot.to_string();
        let params: [&dyn ToSql; 10] = [
            &key.site_id,
            &month,
            &metric,
            &reconciled,
            &basis,
            &method,
            &record.is_locked,
            &actual,
            &delta,
            &record.updated_at,
        ];

        self.tx
            .execute(RECORD_UPSERT_SQL, params.as_slice())
            .map_err(db_error("reconciliation.save"))?;

        let scope: [&dyn ToSql; 3] = [&key.site_id, &month, &metric];
        self.tx
            .execute(ALLOCATIONS_DELETE_SQL, scope.as_slice())
            .map_err(db_error("reconciliation.save.clear_allocations"))?;

        let mut insert = self
            .tx
            .prepare(ALLOCATION_INSERT_SQL)
            .map_err(db_error("reconciliation.save.allocations"))?;
        for allocation in &record.allocations {
            let date = columns::date_text(allocation.date);
            let value = allocation.allocated_value.to_string();
            let params: [&dyn ToSql; 5] = [&key.site_id, &month, &metric, &date, &value];
            insert
                .execute(params.as_slice())
                .map_err(db_error("reconciliation.save.allocations"))?;
        }

        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let Self { tx } = *self;
        tx.commit().map_err(db_error("reconciliation.commit"))
    }
}

/// Record plus its allocations ordered by date.
pub(crate) fn load_record(
    conn: &Connection,
    key: &ReconciliationKey,
) -> Result<Option<ReconciliationRecord>> {
    let month = key.month.to_string();
    let metric = key.metric_key.to_string();
    let scope: [&dyn ToSql; 3] = [&key.site_id, &month, &metric];

    let record = conn
        .query_row(RECORD_QUERY, scope.as_slice(), map_record_row)
        .optional()
        .map_err(db_error("reconciliation.find"))?;
    let Some(mut record) = record else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(ALLOCATIONS_QUERY).map_err(db_error("reconciliation.allocations"))?;
    record.allocations = stmt
        .query_map(scope.as_slice(), map_allocation_row)
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(db_error("reconciliation.allocations"))?;

    Ok(Some(record))
}

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<ReconciliationRecord> {
    Ok(ReconciliationRecord {
        key: ReconciliationKey {
            site_id: row.get(0)?,
            month: columns::parsed(row, 1)?,
            metric_key: columns::parsed(row, 2)?,
        },
        reconciled_total: columns::parsed(row, 3)?,
        basis: columns::parsed(row, 4)?,
        method: columns::parsed(row, 5)?,
        is_locked: row.get(6)?,
        actual_total_snapshot: columns::parsed(row, 7)?,
        delta_snapshot: columns::parsed(row, 8)?,
        allocations: Vec::new(),
        updated_at: row.get(9)?,
    })
}

fn map_allocation_row(row: &Row<'_>) -> rusqlite::Result<DailyAllocation> {
    Ok(DailyAllocation { date: columns::date(row, 0)?, allocated_value: columns::parsed(row, 1)? })
}

const RECORD_UPSERT_SQL: &str = "INSERT INTO reconciliation_records (
        site_id, month, metric_key, reconciled_total, basis, method, is_locked,
        actual_total_snapshot, delta_snapshot, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT (site_id, month, metric_key) DO UPDATE SET
        reconciled_total = excluded.reconciled_total,
        basis = excluded.basis,
        method = excluded.method,
        is_locked = excluded.is_locked,
        actual_total_snapshot = excluded.actual_total_snapshot,
        delta_snapshot = excluded.delta_snapshot,
        updated_at = excluded.updated_at";

const RECORD_QUERY: &str = "SELECT site_id, month, metric_key, reconciled_total, basis, method,
        is_locked, actual_total_snapshot, delta_snapshot, updated_at
    FROM reconciliation_records
    WHERE site_id = ?1 AND month = ?2 AND metric_key = ?3";

const ALLOCATIONS_QUERY: &str = "SELECT date, allocated_value
    FROM daily_allocations
    WHERE site_id = ?1 AND month = ?2 AND metric_key = ?3
    ORDER BY date";

const ALLOCATIONS_DELETE_SQL: &str =
    "DELETE FROM daily_allocations WHERE site_id = ?1 AND month = ?2 AND metric_key = ?3";

const ALLOCATION_INSERT_SQL: &str = "INSERT INTO daily_allocations (
        site_id, month, metric_key, date, allocated_value
    ) VALUES (?1, ?2, ?3, ?4, ?5)";
