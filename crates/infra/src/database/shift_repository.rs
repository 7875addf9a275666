//! SQLite-backed implementation of the `ShiftRepository` port.
//!
//! Reads go through a pooled connection; every mutation runs inside a
//! [`SqliteShiftTransaction`] holding SQLite's writer lock. Dates are stored
//! as `YYYY-MM-DD` text so month ranges are plain inclusive text predicates.

use std::sync::Arc;

use chrono::NaiveDate;
use minetally_common::storage::WriteTransaction;
use minetally_core::{ShiftRepository, ShiftTransaction};
use minetally_domain::{
    ReportingMonth, Result, ShiftKey, ValidatedActivity, ValidatedShift,
};
use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use super::columns;
use super::manager::DbManager;
use crate::errors::db_error;

/// SQLite-backed repository for validated shifts and their activities.
pub struct SqliteShiftRepository {
    db: Arc<DbManager>,
}

impl SqliteShiftRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

impl ShiftRepository for SqliteShiftRepository {
    fn begin(&self) -> Result<Box<dyn ShiftTransaction + '_>> {
        Ok(Box::new(SqliteShiftTransaction { tx: self.db.begin_write()? }))
    }

    fn find_shift(&self, key: &ShiftKey) -> Result<Option<ValidatedShift>> {
        let conn = self.db.get_connection()?;
        find_shift(&conn, key)
    }

    fn list_day(&self, site_id: &str, date: NaiveDate) -> Result<Vec<ValidatedShift>> {
        let conn = self.db.get_connection()?;
        shifts_for_day(&conn, site_id, date)
    }

    fn list_activities(&self, shift_id: &str) -> Result<Vec<ValidatedActivity>> {
        let conn = self.db.get_connection()?;
        activities(&conn, shift_id)
    }
}

/// Write transaction over shifts and activities.
pub struct SqliteShiftTransaction {
    tx: WriteTransaction,
}

impl ShiftTransaction for SqliteShiftTransaction {
    fn find_shift(&self, key: &ShiftKey) -> Result<Option<ValidatedShift>> {
        find_shift(&self.tx, key)
    }

    fn shift_by_id(&self, shift_id: &str) -> Result<Option<ValidatedShift>> {
        self.tx
            .query_row(SHIFT_BY_ID_QUERY, [shift_id], map_shift_row)
            .optional()
            .map_err(db_error("shift.by_id"))
    }

    fn find_activity(&self, activity_id: &str) -> Result<Option<ValidatedActivity>> {
        self.tx
            .query_row(ACTIVITY_BY_ID_QUERY, [activity_id], map_activity_row)
            .optional()
            .map_err(db_error("activity.find"))
    }

    fn shifts_for_day(&self, site_id: &str, date: NaiveDate) -> Result<Vec<ValidatedShift>> {
        shifts_for_day(&self.tx, site_id, date)
    }

    fn activities(&self, shift_id: &str) -> Result<Vec<ValidatedActivity>> {
        activities(&self.tx, shift_id)
    }

    fn insert_shift(&mut self, shift: &ValidatedShift) -> Result<()> {
        let totals = serde_json::to_string(&shift.totals).map_err(db_error("shift.insert.totals"))?;
        let date = columns::date_text(shift.key.date);
        let params: [&dyn ToSql; 9] = [
            &shift.id,
            &shift.key.site_id,
            &date,
            &shift.key.shift,
            &shift.key.operator_id,
            &shift.validated,
            &totals,
            &shift.created_at,
            &shift.updated_at,
        ];

        self.tx.execute(SHIFT_INSERT_SQL, params.as_slice()).map_err(db_error("shift.insert"))?;
        Ok(())
    }

    fn update_shift(&mut self, shift: &ValidatedShift) -> Result<()> {
        let totals = serde_json::to_string(&shift.totals).map_err(db_error("shift.update.totals"))?;
        let params: [&dyn ToSql; 4] = [&shift.id, &shift.validated, &totals, &shift.updated_at];

        self.tx.execute(SHIFT_UPDATE_SQL, params.as_slice()).map_err(db_error("shift.update"))?;
        Ok(())
    }

    fn delete_shift(&mut self, shift_id: &str) -> Result<()> {
        // Activities follow through ON DELETE CASCADE.
        self.tx
            .execute("DELETE FROM validated_shifts WHERE id = ?1", [shift_id])
            .map_err(db_error("shift.delete"))?;
        Ok(())
    }

    fn insert_activity(&mut self, activity: &ValidatedActivity) -> Result<()> {
        let payload =
            serde_json::to_string(&activity.payload).map_err(db_error("activity.insert.payload"))?;
        let params: [&dyn ToSql; 6] = [
            &activity.id,
            &activity.shift_id,
            &activity.activity,
            &activity.sub_activity,
            &payload,
            &activity.created_at,
        ];

        self.tx
            .execute(ACTIVITY_INSERT_SQL, params.as_slice())
            .map_err(db_error("activity.insert"))?;
        Ok(())
    }

    fn update_activity(&mut self, activity: &ValidatedActivity) -> Result<()> {
        let payload =
            serde_json::to_string(&activity.payload).map_err(db_error("activity.update.payload"))?;
        let params: [&dyn ToSql; 4] =
            [&activity.id, &activity.activity, &activity.sub_activity, &payload];

        self.tx
            .execute(ACTIVITY_UPDATE_SQL, params.as_slice())
            .map_err(db_error("activity.update"))?;
        Ok(())
    }

    fn delete_activity(&mut self, activity_id: &str) -> Result<()> {
        self.tx
            .execute("DELETE FROM validated_activities WHERE id = ?1", [activity_id])
            .map_err(db_error("activity.delete"))?;
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let Self { tx } = *self;
        tx.commit().map_err(db_error("shift.commit"))
    }
}

pub(crate) fn find_shift(conn: &Connection, key: &ShiftKey) -> Result<Option<ValidatedShift>> {
    let date = columns::date_text(key.date);
    let params: [&dyn ToSql; 4] = [&key.site_id, &date, &key.shift, &key.operator_id];

    conn.query_row(SHIFT_BY_KEY_QUERY, params.as_slice(), map_shift_row)
        .optional()
        .map_err(db_error("shift.find"))
}

fn shifts_for_day(conn: &Connection, site_id: &str, date: NaiveDate) -> Result<Vec<ValidatedShift>> {
    let date = columns::date_text(date);
    query_shifts(conn, SHIFTS_BY_DAY_QUERY, &[&site_id, &date]).map_err(db_error("shift.list_day"))
}

/// Every shift of the site within `month`, ordered by date, designator and
/// operator.
pub(crate) fn month_shifts(
    conn: &Connection,
    site_id: &str,
    month: ReportingMonth,
) -> Result<Vec<ValidatedShift>> {
    let first = columns::date_text(month.first_day());
    let last = columns::date_text(month.last_day());
    query_shifts(conn, SHIFTS_BETWEEN_QUERY, &[&site_id, &first, &last])
        .map_err(db_error("shift.month_shifts"))
}

fn activities(conn: &Connection, shift_id: &str) -> Result<Vec<ValidatedActivity>> {
    let mut stmt = conn.prepare(ACTIVITIES_BY_SHIFT_QUERY).map_err(db_error("activity.list"))?;
    let rows = stmt.query_map([shift_id], map_activity_row).map_err(db_error("activity.list"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_error("activity.list"))
}

fn query_shifts(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> rusqlite::Result<Vec<ValidatedShift>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map_shift_row)?;
    rows.collect()
}

fn map_shift_row(row: &Row<'_>) -> rusqlite::Result<ValidatedShift> {
    Ok(ValidatedShift {
        id: row.get(0)?,
        key: ShiftKey {
            site_id: row.get(1)?,
            date: columns::date(row, 2)?,
            shift: row.get(3)?,
            operator_id: row.get(4)?,
        },
        validated: row.get(5)?,
        totals: columns::json(row, 6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_activity_row(row: &Row<'_>) -> rusqlite::Result<ValidatedActivity> {
    Ok(ValidatedActivity {
        id: row.get(0)?,
        shift_id: row.get(1)?,
        activity: row.get(2)?,
        sub_activity: row.get(3)?,
        payload: columns::json(row, 4)?,
        created_at: row.get(5)?,
    })
}

const SHIFT_INSERT_SQL: &str = "INSERT INTO validated_shifts (
        id, site_id, date, shift, operator_id, validated, totals_json, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const SHIFT_UPDATE_SQL: &str = "UPDATE validated_shifts
    SET validated = ?2, totals_json = ?3, updated_at = ?4
    WHERE id = ?1";

const SHIFT_BY_KEY_QUERY: &str = "SELECT id, site_id, date, shift, operator_id, validated,
        totals_json, created_at, updated_at
    FROM validated_shifts
    WHERE site_id = ?1 AND date = ?2 AND shift = ?3 AND operator_id = ?4";

const SHIFT_BY_ID_QUERY: &str = "SELECT id, site_id, date, shift, operator_id, validated,
        totals_json, created_at, updated_at
    FROM validated_shifts
    WHERE id = ?1";

const SHIFTS_BY_DAY_QUERY: &str = "SELECT id, site_id, date, shift, operator_id, validated,
        totals_json, created_at, updated_at
    FROM validated_shifts
    WHERE site_id = ?1 AND date = ?2
    ORDER BY shift, operator_id";

const SHIFTS_BETWEEN_QUERY: &str = "SELECT id, site_id, date, shift, operator_id, validated,
        totals_json, created_at, updated_at
    FROM validated_shifts
    WHERE site_id = ?1 AND date >= ?2 AND date <= ?3
    ORDER BY date, shift, operator_id";

const ACTIVITY_INSERT_SQL: &str = "INSERT INTO validated_activities (
        id, shift_id, activity, sub_activity, payload_json, created_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const ACTIVITY_UPDATE_SQL: &str = "UPDATE validated_activities
    SET activity = ?2, sub_activity = ?3, payload_json = ?4
    WHERE id = ?1";

const ACTIVITY_BY_ID_QUERY: &str = "SELECT id, shift_id, activity, sub_activity, payload_json,
        created_at
    FROM validated_activities
    WHERE id = ?1";

const ACTIVITIES_BY_SHIFT_QUERY: &str = "SELECT id, shift_id, activity, sub_activity,
        payload_json, created_at
    FROM validated_activities
    WHERE shift_id = ?1
    ORDER BY seq";
