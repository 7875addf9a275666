//! SQLite-backed implementation of the `FactorRepository` port.

use std::collections::BTreeMap;
use std::sync::Arc;

use minetally_common::storage::WriteTransaction;
use minetally_core::{FactorRepository, FactorTransaction, MonthActivity};
use minetally_domain::{
    ConfigGroup, EquipmentKind, MonthlyFactorResult, ReconciliationKey, ReconciliationRecord,
    ReportingMonth, Result,
};
use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use super::columns;
use super::manager::DbManager;
use super::reconciliation_repository::load_record;
use crate::errors::db_error;

/// SQLite-backed repository for config groups, unit assignments and solved
/// monthly factors.
pub struct SqliteFactorRepository {
    db: Arc<DbManager>,
}

impl SqliteFactorRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

impl FactorRepository for SqliteFactorRepository {
    fn begin(&self) -> Result<Box<dyn FactorTransaction + '_>> {
        Ok(Box::new(SqliteFactorTransaction { tx: self.db.begin_write()? }))
    }

    fn saved_results(
        &self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
    ) -> Result<Vec<MonthlyFactorResult>> {
        let conn = self.db.get_connection()?;
        let month = month.to_string();
        let kind = kind.to_string();

        let mut stmt = conn.prepare(RESULTS_QUERY).map_err(db_error("factor.saved_results"))?;
        let params: [&dyn ToSql; 3] = [&site_id, &month, &kind];
        stmt.query_map(params.as_slice(), map_result_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(db_error("factor.saved_results"))
    }

    fn config_groups(&self, site_id: &str, kind: EquipmentKind) -> Result<Vec<ConfigGroup>> {
        let conn = self.db.get_connection()?;
        config_groups(&conn, site_id, kind)
    }
}

/// Write transaction for one solve.
pub struct SqliteFactorTransaction {
    tx: WriteTransaction,
}

impl FactorTransaction for SqliteFactorTransaction {
    fn month_activities(
        &self,
        site_id: &str,
        month: ReportingMonth,
        activity: &str,
    ) -> Result<Vec<MonthActivity>> {
        let first = columns::date_text(month.first_day());
        let last = columns::date_text(month.last_day());
        let params: [&dyn ToSql; 4] = [&site_id, &first, &last, &activity];

        let mut stmt =
            self.tx.prepare(MONTH_ACTIVITIES_QUERY).map_err(db_error("factor.month_activities"))?;
        stmt.query_map(params.as_slice(), |row| {
            Ok(MonthActivity {
                date: columns::date(row, 0)?,
                validated: row.get(1)?,
                payload: columns::json(row, 2)?,
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(db_error("factor.month_activities"))
    }

    fn find_target(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>> {
        load_record(&self.tx, key)
    }

    fn config_groups(&self, site_id: &str, kind: EquipmentKind) -> Result<Vec<ConfigGroup>> {
        config_groups(&self.tx, site_id, kind)
    }

    fn month_assignments(
        &self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
    ) -> Result<BTreeMap<String, String>> {
        let month = month.to_string();
        let kind = kind.to_string();
        let params: [&dyn ToSql; 3] = [&site_id, &month, &kind];

        let mut stmt = self.tx.prepare(ASSIGNMENTS_QUERY).map_err(db_error("factor.assignments"))?;
        stmt.query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))
            .and_then(|rows| rows.collect::<rusqlite::Result<BTreeMap<_, _>>>())
            .map_err(db_error("factor.assignments"))
    }

    fn latest_factor_before(
        &self,
        site_id: &str,
        kind: EquipmentKind,
        code: &str,
        month: ReportingMonth,
    ) -> Result<Option<f64>> {
        let kind = kind.to_string();
        let month = month.to_string();
        let params: [&dyn ToSql; 4] = [&site_id, &kind, &code, &month];

        self.tx
            .query_row(LATEST_FACTOR_QUERY, params.as_slice(), |row| row.get(0))
            .optional()
            .map_err(db_error("factor.latest_before"))
    }

    fn upsert_config_group(&mut self, group: &ConfigGroup) -> Result<()> {
        let kind = group.equipment_kind.to_string();
        let params: [&dyn ToSql; 7] = [
            &group.site_id,
            &kind,
            &group.code,
            &group.estimate_factor,
            &group.min_factor,
            &group.max_factor,
            &group.locked,
        ];

        self.tx
            .execute(GROUP_UPSERT_SQL, params.as_slice())
            .map_err(db_error("factor.upsert_group"))?;
        Ok(())
    }

    fn replace_assignments(
        &mut self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
        assignments: &BTreeMap<String, String>,
    ) -> Result<()> {
        let month = month.to_string();
        let kind = kind.to_string();
        let scope: [&dyn ToSql; 3] = [&site_id, &month, &kind];

        self.tx
            .execute(ASSIGNMENTS_DELETE_SQL, scope.as_slice())
            .map_err(db_error("factor.replace_assignments"))?;

        let mut insert =
            self.tx.prepare(ASSIGNMENT_INSERT_SQL).map_err(db_error("factor.replace_assignments"))?;
        for (unit_id, code) in assignments {
            let params: [&dyn ToSql; 5] = [&site_id, &month, &kind, unit_id, code];
            insert.execute(params.as_slice()).map_err(db_error("factor.replace_assignments"))?;
        }
        Ok(())
    }

    fn replace_results(
        &mut self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
        results: &[MonthlyFactorResult],
    ) -> Result<()> {
        let month = month.to_string();
        let kind = kind.to_string();
        let scope: [&dyn ToSql; 3] = [&site_id, &month, &kind];

        self.tx
            .execute(RESULTS_DELETE_SQL, scope.as_slice())
            .map_err(db_error("factor.replace_results"))?;

        let mut insert =
            self.tx.prepare(RESULT_INSERT_SQL).map_err(db_error("factor.replace_results"))?;
        for result in results {
            let params: [&dyn ToSql; 10] = [
                &site_id,
                &month,
                &kind,
                &result.unit_id,
                &result.config_code,
                &result.factor,
                &result.prod_count,
                &result.dev_count,
                &result.prod_tonnes_pred,
                &result.dev_tonnes_pred,
            ];
            insert.execute(params.as_slice()).map_err(db_error("factor.replace_results"))?;
        }
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let Self { tx } = *self;
        tx.commit().map_err(db_error("factor.commit"))
    }
}

fn config_groups(conn: &Connection, site_id: &str, kind: EquipmentKind) -> Result<Vec<ConfigGroup>> {
    let kind = kind.to_string();
    let params: [&dyn ToSql; 2] = [&site_id, &kind];

    let mut stmt = conn.prepare(GROUPS_QUERY).map_err(db_error("factor.config_groups"))?;
    stmt.query_map(params.as_slice(), map_group_row)
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(db_error("factor.config_groups"))
}

fn map_group_row(row: &Row<'_>) -> rusqlite::Result<ConfigGroup> {
    Ok(ConfigGroup {
        site_id: row.get(0)?,
        equipment_kind: columns::parsed(row, 1)?,
        code: row.get(2)?,
        estimate_factor: row.get(3)?,
        min_factor: row.get(4)?,
        max_factor: row.get(5)?,
        locked: row.get(6)?,
    })
}

fn map_result_row(row: &Row<'_>) -> rusqlite::Result<MonthlyFactorResult> {
    Ok(MonthlyFactorResult {
        site_id: row.get(0)?,
        month: columns::parsed(row, 1)?,
        equipment_kind: columns::parsed(row, 2)?,
        unit_id: row.get(3)?,
        config_code: row.get(4)?,
        factor: row.get(5)?,
        prod_count: row.get(6)?,
        dev_count: row.get(7)?,
        prod_tonnes_pred: row.get(8)?,
        dev_tonnes_pred: row.get(9)?,
    })
}

const MONTH_ACTIVITIES_QUERY: &str = "SELECT s.date, s.validated, a.payload_json
    FROM validated_activities a
    JOIN validated_shifts s ON s.id = a.shift_id
    WHERE s.site_id = ?1 AND s.date >= ?2 AND s.date <= ?3 AND a.activity = ?4
    ORDER BY s.date, s.shift, s.operator_id, a.seq";

const GROUPS_QUERY: &str = "SELECT site_id, equipment_kind, code, estimate_factor, min_factor,
        max_factor, locked
    FROM config_groups
    WHERE site_id = ?1 AND equipment_kind = ?2
    ORDER BY code";

const GROUP_UPSERT_SQL: &str = "INSERT INTO config_groups (
        site_id, equipment_kind, code, estimate_factor, min_factor, max_factor, locked
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT (site_id, equipment_kind, code) DO UPDATE SET
        estimate_factor = excluded.estimate_factor,
        min_factor = excluded.min_factor,
        max_factor = excluded.max_factor,
        locked = excluded.locked";

const ASSIGNMENTS_QUERY: &str = "SELECT unit_id, config_code
    FROM config_assignments
    WHERE site_id = ?1 AND month = ?2 AND equipment_kind = ?3";

const ASSIGNMENTS_DELETE_SQL: &str =
    "DELETE FROM config_assignments WHERE site_id = ?1 AND month = ?2 AND equipment_kind = ?3";

const ASSIGNMENT_INSERT_SQL: &str = "INSERT INTO config_assignments (
        site_id, month, equipment_kind, unit_id, config_code
    ) VALUES (?1, ?2, ?3, ?4, ?5)";

// Month text is YYYY-MM, so string order is chronological.
const LATEST_FACTOR_QUERY: &str = "SELECT factor
    FROM monthly_factor_results
    WHERE site_id = ?1 AND equipment_kind = ?2 AND config_code = ?3 AND month < ?4
    ORDER BY month DESC
    LIMIT 1";

const RESULTS_QUERY: &str = "SELECT site_id, month, equipment_kind, unit_id, config_code, factor,
        prod_count, dev_count, prod_tonnes_pred, dev_tonnes_pred
    FROM monthly_factor_results
    WHERE site_id = ?1 AND month = ?2 AND equipment_kind = ?3
    ORDER BY unit_id";

const RESULTS_DELETE_SQL: &str =
    "DELETE FROM monthly_factor_results WHERE site_id = ?1 AND month = ?2 AND equipment_kind = ?3";

const RESULT_INSERT_SQL: &str = "INSERT INTO monthly_factor_results (
        site_id, month, equipment_kind, unit_id, config_code, factor, prod_count, dev_count,
        prod_tonnes_pred, dev_tonnes_pred
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";
