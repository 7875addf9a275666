//! Validation snapshot service - shift lifecycle business logic
//!
//! `Absent -> Captured -> Validated -> Captured (re-opened)`. Totals are
//! recomputed from the stored activities on every mutation and once more
//! when a shift is validated, so the snapshot that becomes immutable is
//! always fresh.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use minetally_domain::{
    ActivityPayload, MinetallyError, Result, ShiftKey, ShiftSelector, ValidatedActivity,
    ValidatedShift,
};
use tracing::{info, instrument, warn};

use super::ports::{ShiftRepository, ShiftTransaction};
use crate::totals::aggregate;

/// Shift capture and validation service
pub struct ValidationService {
    repository: Arc<dyn ShiftRepository>,
}

impl ValidationService {
    pub fn new(repository: Arc<dyn ShiftRepository>) -> Self {
        Self { repository }
    }

    /// Return the shift for `key`, creating an empty captured one if absent.
    #[instrument(skip(self), fields(shift = %key))]
    pub fn create_or_get_shift(&self, key: &ShiftKey) -> Result<ValidatedShift> {
        check_key(key)?;
        let mut tx = self.repository.begin()?;
        let shift = get_or_create(&mut *tx, key)?;
        tx.commit()?;
        Ok(shift)
    }

    /// Capture one activity, creating the shift if needed.
    #[instrument(skip(self, payload), fields(shift = %key, activity = %payload.activity))]
    pub fn add_activity(&self, key: &ShiftKey, payload: ActivityPayload) -> Result<ValidatedActivity> {
        check_key(key)?;
        check_payload(&payload)?;
        let now = Utc::now().timestamp();

        let mut tx = self.repository.begin()?;
        let mut shift = get_or_create(&mut *tx, key)?;
        guard(&shift)?;

        let activity = ValidatedActivity::new(&shift.id, payload, now);
        tx.insert_activity(&activity)?;
        refresh(&mut *tx, &mut shift, false, now)?;
        tx.commit()?;

        info!(activity_id = %activity.id, "activity captured");
        Ok(activity)
    }

    /// Operator finalize: capture a whole shift's activities at once.
    #[instrument(skip(self, payloads), fields(shift = %key, count = payloads.len()))]
    pub fn finalize_shift(
        &self,
        key: &ShiftKey,
        payloads: Vec<ActivityPayload>,
    ) -> Result<ValidatedShift> {
        check_key(key)?;
        payloads.iter().try_for_each(check_payload)?;
        let now = Utc::now().timestamp();

        let mut tx = self.repository.begin()?;
        let mut shift = get_or_create(&mut *tx, key)?;
        guard(&shift)?;

        for payload in payloads {
            tx.insert_activity(&ValidatedActivity::new(&shift.id, payload, now))?;
        }
        refresh(&mut *tx, &mut shift, false, now)?;
        tx.commit()?;

        info!("shift finalized");
        Ok(shift)
    }

    /// Replace the payload of one captured activity.
    #[instrument(skip(self, payload))]
    pub fn edit_activity(&self, activity_id: &str, payload: ActivityPayload) -> Result<ValidatedShift> {
        check_payload(&payload)?;
        let now = Utc::now().timestamp();

        let mut tx = self.repository.begin()?;
        let mut activity = tx
            .find_activity(activity_id)?
            .ok_or_else(|| MinetallyError::NotFound(format!("activity {activity_id}")))?;
        let mut shift = owning_shift(&*tx, &activity)?;
        guard(&shift)?;

        activity.replace_payload(payload);
        tx.update_activity(&activity)?;
        refresh(&mut *tx, &mut shift, false, now)?;
        tx.commit()?;

        info!(shift = %shift.key, "activity edited");
        Ok(shift)
    }

    #[instrument(skip(self))]
    pub fn delete_activity(&self, activity_id: &str) -> Result<ValidatedShift> {
        let now = Utc::now().timestamp();

        let mut tx = self.repository.begin()?;
        let activity = tx
            .find_activity(activity_id)?
            .ok_or_else(|| MinetallyError::NotFound(format!("activity {activity_id}")))?;
        let mut shift = owning_shift(&*tx, &activity)?;
        guard(&shift)?;

        tx.delete_activity(activity_id)?;
        refresh(&mut *tx, &mut shift, false, now)?;
        tx.commit()?;

        info!(shift = %shift.key, "activity deleted");
        Ok(shift)
    }

    /// Remove a shift and its activities. Every remaining shift of the same
    /// site and day is reset to unvalidated; returns how many were reset.
    #[instrument(skip(self), fields(shift = %key))]
    pub fn delete_shift(&self, key: &ShiftKey) -> Result<usize> {
        let now = Utc::now().timestamp();

        let mut tx = self.repository.begin()?;
        let shift = tx
            .find_shift(key)?
            .ok_or_else(|| MinetallyError::NotFound(format!("shift {key}")))?;
        guard(&shift)?;

        tx.delete_shift(&shift.id)?;
        let reopened = reopen_day(&mut *tx, &key.site_id, key.date, now)?;
        tx.commit()?;

        info!(reopened, "shift deleted");
        Ok(reopened)
    }

    /// Recompute totals for every matching shift of the day, then mark them
    /// validated.
    #[instrument(skip(self))]
    pub fn validate(
        &self,
        site_id: &str,
        date: NaiveDate,
        selector: &ShiftSelector,
    ) -> Result<Vec<ValidatedShift>> {
        let now = Utc::now().timestamp();

        let mut tx = self.repository.begin()?;
        let mut shifts: Vec<ValidatedShift> = tx
            .shifts_for_day(site_id, date)?
            .into_iter()
            .filter(|shift| selector.matches(&shift.key))
            .collect();
        if shifts.is_empty() {
            return Err(MinetallyError::NoData(format!("no shifts to validate for {site_id} on {date}")));
        }

        for shift in &mut shifts {
            refresh(&mut *tx, shift, true, now)?;
        }
        tx.commit()?;

        info!(count = shifts.len(), "shifts validated");
        Ok(shifts)
    }

    /// Re-open a whole day for editing; returns how many shifts changed.
    #[instrument(skip(self))]
    pub fn unvalidate(&self, site_id: &str, date: NaiveDate) -> Result<usize> {
        let now = Utc::now().timestamp();

        let mut tx = self.repository.begin()?;
        let reopened = reopen_day(&mut *tx, site_id, date, now)?;
        tx.commit()?;

        info!(reopened, "day unvalidated");
        Ok(reopened)
    }

    pub fn get_shift(&self, key: &ShiftKey) -> Result<ValidatedShift> {
        self.repository
            .find_shift(key)?
            .ok_or_else(|| MinetallyError::NotFound(format!("shift {key}")))
    }

    pub fn list_day(&self, site_id: &str, date: NaiveDate) -> Result<Vec<ValidatedShift>> {
        self.repository.list_day(site_id, date)
    }

    pub fn list_activities(&self, key: &ShiftKey) -> Result<Vec<ValidatedActivity>> {
        let shift = self.get_shift(key)?;
        self.repository.list_activities(&shift.id)
    }
}

fn check_key(key: &ShiftKey) -> Result<()> {
    let blank = [&key.site_id, &key.shift, &key.operator_id].iter().any(|s| s.trim().is_empty());
    if blank {
        return Err(MinetallyError::InvalidInput(format!(
            "shift key needs a site, shift designator and operator, got {key}"
        )));
    }
    Ok(())
}

fn check_payload(payload: &ActivityPayload) -> Result<()> {
    if payload.activity.trim().is_empty() || payload.sub_activity.trim().is_empty() {
        return Err(MinetallyError::InvalidInput(
            "activity payload needs an activity and sub-activity".into(),
        ));
    }
    Ok(())
}

fn guard(shift: &ValidatedShift) -> Result<()> {
    shift.ensure_mutable().inspect_err(|_| {
        warn!(shift = %shift.key, "mutation rejected: shift is validated");
    })
}

fn get_or_create(tx: &mut (dyn ShiftTransaction + '_), key: &ShiftKey) -> Result<ValidatedShift> {
    if let Some(shift) = tx.find_shift(key)? {
        return Ok(shift);
    }
    let shift = ValidatedShift::captured(key.clone(), Utc::now().timestamp());
    tx.insert_shift(&shift)?;
    info!(shift = %key, shift_id = %shift.id, "shift created");
    Ok(shift)
}

fn owning_shift(
    tx: &(dyn ShiftTransaction + '_),
    activity: &ValidatedActivity,
) -> Result<ValidatedShift> {
    tx.shift_by_id(&activity.shift_id)?.ok_or_else(|| {
        MinetallyError::Internal(format!(
            "activity {} references missing shift {}",
            activity.id, activity.shift_id
        ))
    })
}

/// Recompute `shift.totals` from its stored activities and persist it with
/// the given validation flag.
fn refresh(
    tx: &mut (dyn ShiftTransaction + '_),
    shift: &mut ValidatedShift,
    validated: bool,
    now: i64,
) -> Result<()> {
    let activities = tx.activities(&shift.id)?;
    shift.totals = aggregate(activities.iter().map(|a| &a.payload));
    shift.validated = validated;
    shift.updated_at = now;
    tx.update_shift(shift)
}

fn reopen_day(
    tx: &mut (dyn ShiftTransaction + '_),
    site_id: &str,
    date: NaiveDate,
    now: i64,
) -> Result<usize> {
    let mut reopened = 0;
    for mut shift in tx.shifts_for_day(site_id, date)? {
        if shift.validated {
            shift.validated = false;
            shift.updated_at = now;
            tx.update_shift(&shift)?;
            reopened += 1;
        }
    }
    Ok(reopened)
}
