//! Monthly reconciliation service
//!
//! Ties the month's shift totals back to an externally confirmed figure and
//! books the difference against individual days. A locked record is never
//! recomputed or rewritten until it is unlocked.

use std::sync::Arc;

use chrono::Utc;
use minetally_domain::constants::ACTUAL_TOTAL_DP;
use minetally_domain::{
    AllocationMethod, DailyAllocation, MetricKey, MinetallyError, MonthSummary, ReconciledFigure,
    ReconciliationBasis, ReconciliationConfig, ReconciliationKey, ReconciliationOutcome,
    ReconciliationRecord, Result, ValidatedShift,
};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use super::allocator;
use super::ports::{ReconciliationRepository, ReconciliationTransaction};

pub struct ReconciliationService {
    repository: Arc<dyn ReconciliationRepository>,
    config: ReconciliationConfig,
}

impl ReconciliationService {
    pub fn new(repository: Arc<dyn ReconciliationRepository>) -> Self {
        Self::with_config(repository, ReconciliationConfig::default())
    }

    pub fn with_config(
        repository: Arc<dyn ReconciliationRepository>,
        config: ReconciliationConfig,
    ) -> Self {
        Self { repository, config }
    }

    /// Record a confirmed monthly total and allocate the delta against the
    /// current actual total. Without a method the configured default applies.
    #[instrument(skip(self), fields(key = %key))]
    pub fn reconcile(
        &self,
        key: &ReconciliationKey,
        basis: ReconciliationBasis,
        method: Option<AllocationMethod>,
        reconciled_total: Decimal,
    ) -> Result<ReconciliationOutcome> {
        let method = method.unwrap_or(self.config.default_method);
        let mut tx = self.repository.begin()?;
        let existing = tx.find(key)?;
        if let Some(record) = &existing {
            guard(record)?;
        }
        let previous = existing.map(|record| record.allocations).unwrap_or_default();

        let record = self.compute(&*tx, key, reconciled_total, basis, method, &previous)?;
        tx.save(&record)?;
        tx.commit()?;

        info!(
            actual = %record.actual_total_snapshot,
            delta = %record.delta_snapshot,
            method = %method,
            "month reconciled"
        );
        Ok(ReconciliationOutcome::from(&record))
    }

    /// Re-run a stored reconciliation against the current shift totals.
    #[instrument(skip(self), fields(key = %key))]
    pub fn recalculate(&self, key: &ReconciliationKey) -> Result<ReconciliationOutcome> {
        let mut tx = self.repository.begin()?;
        let existing = require(tx.find(key)?, key)?;
        guard(&existing)?;

        let record = self.compute(
            &*tx,
            key,
            existing.reconciled_total,
            existing.basis,
            existing.method,
            &existing.allocations,
        )?;
        tx.save(&record)?;
        tx.commit()?;

        info!(delta = %record.delta_snapshot, "reconciliation recalculated");
        Ok(ReconciliationOutcome::from(&record))
    }

    pub fn lock(&self, key: &ReconciliationKey) -> Result<ReconciliationRecord> {
        self.set_locked(key, true)
    }

    pub fn unlock(&self, key: &ReconciliationKey) -> Result<ReconciliationRecord> {
        self.set_locked(key, false)
    }

    /// Replace the allocations with manually edited values and switch the
    /// record to the custom method.
    #[instrument(skip(self, allocations), fields(key = %key, count = allocations.len()))]
    pub fn set_custom_allocations(
        &self,
        key: &ReconciliationKey,
        allocations: &[DailyAllocation],
    ) -> Result<ReconciliationRecord> {
        let mut tx = self.repository.begin()?;
        let mut record = require(tx.find(key)?, key)?;
        guard(&record)?;

        record.allocations = allocator::validate_custom(key.month, record.delta_snapshot, allocations)?;
        record.method = AllocationMethod::Custom;
        record.updated_at = Utc::now().timestamp();
        tx.save(&record)?;
        tx.commit()?;

        info!("custom allocations saved");
        Ok(record)
    }

    /// Read-only view of the month. The actual total is always recomputed;
    /// `basis` falls back to the stored record's, then the configured default.
    pub fn month_summary(
        &self,
        key: &ReconciliationKey,
        basis: Option<ReconciliationBasis>,
    ) -> Result<MonthSummary> {
        let record = self.repository.find(key)?;
        let basis = basis
            .or_else(|| record.as_ref().map(|r| r.basis))
            .unwrap_or(self.config.default_basis);

        let shifts = self.repository.month_shifts(&key.site_id, key.month)?;
        let actual = actual_total(&shifts, &key.metric_key, basis)?;

        let reconciled = record.as_ref().map(|r| ReconciledFigure {
            total: r.reconciled_total,
            basis: r.basis,
            method: r.method,
            is_locked: r.is_locked,
        });
        Ok(MonthSummary {
            key: key.clone(),
            basis,
            actual_total: actual,
            delta: reconciled.as_ref().map(|figure| figure.total - actual),
            reconciled,
            allocations: record.map(|r| r.allocations).unwrap_or_default(),
        })
    }

    fn set_locked(&self, key: &ReconciliationKey, locked: bool) -> Result<ReconciliationRecord> {
        let mut tx = self.repository.begin()?;
        let mut record = require(tx.find(key)?, key)?;
        if record.is_locked != locked {
            record.is_locked = locked;
            record.updated_at = Utc::now().timestamp();
            tx.save(&record)?;
            tx.commit()?;
            info!(key = %key, locked, "reconciliation lock changed");
        }
        Ok(record)
    }

    fn compute(
        &self,
        tx: &(dyn ReconciliationTransaction + '_),
        key: &ReconciliationKey,
        reconciled_total: Decimal,
        basis: ReconciliationBasis,
        method: AllocationMethod,
        previous: &[DailyAllocation],
    ) -> Result<ReconciliationRecord> {
        let shifts = tx.month_shifts(&key.site_id, key.month)?;
        let actual = actual_total(&shifts, &key.metric_key, basis)?;
        let delta = reconciled_total - actual;
        debug!(shifts = shifts.len(), %actual, %delta, "actual total computed");

        Ok(ReconciliationRecord {
            key: key.clone(),
            reconciled_total,
            basis,
            method,
            is_locked: false,
            actual_total_snapshot: actual,
            delta_snapshot: delta,
            allocations: allocator::allocate(method, key.month, delta, self.config.rounding_dp, previous),
            updated_at: Utc::now().timestamp(),
        })
    }
}

/// Sum `metric` over the shifts admitted by `basis`.
///
/// Each shift's value is rounded to a fixed number of places before it is
/// summed, which keeps the result independent of shift order.
pub fn actual_total(
    shifts: &[ValidatedShift],
    metric: &MetricKey,
    basis: ReconciliationBasis,
) -> Result<Decimal> {
    shifts
        .iter()
        .filter(|shift| basis.includes(shift.validated))
        .map(|shift| {
            let value = shift.totals.metric(metric);
            Decimal::try_from(value)
                .map(|d| d.round_dp(ACTUAL_TOTAL_DP))
                .map_err(|_| {
                    MinetallyError::Internal(format!(
                        "shift {} has a non-representable {metric} total {value}",
                        shift.key
                    ))
                })
        })
        .sum()
}

fn require(record: Option<ReconciliationRecord>, key: &ReconciliationKey) -> Result<ReconciliationRecord> {
    record.ok_or_else(|| MinetallyError::NotFound(format!("reconciliation {key}")))
}

fn guard(record: &ReconciliationRecord) -> Result<()> {
    record.ensure_unlocked().inspect_err(|_| {
        warn!(key = %record.key, "mutation rejected: reconciliation is locked");
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use minetally_domain::{ShiftKey, ValidatedShift};
    use rust_decimal_macros::dec;

    use super::*;

    fn shift(operator: &str, validated: bool, weight: f64) -> ValidatedShift {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let mut shift = ValidatedShift::captured(ShiftKey::new("site-1", date, "D", operator), 0);
        shift.totals.add("Hauling", "Production", "Weight", weight);
        shift.totals.add("Hauling", "Development", "Weight", 1.0);
        shift.validated = validated;
        shift
    }

    #[test]
    fn actual_total_respects_basis() {
        let shifts = vec![shift("op-1", true, 100.25), shift("op-2", false, 50.0)];
        let metric = MetricKey::new("Hauling", "Production", "Weight");

        assert_eq!(
            actual_total(&shifts, &metric, ReconciliationBasis::ValidatedOnly).unwrap(),
            dec!(100.25)
        );
        assert_eq!(
            actual_total(&shifts, &metric, ReconciliationBasis::CapturedAll).unwrap(),
            dec!(150.25)
        );
    }

    #[test]
    fn actual_total_with_wildcard_sub_activity() {
        let shifts = vec![shift("op-1", true, 10.0)];
        let metric = MetricKey::any_sub_activity("Hauling", "Weight");

        assert_eq!(
            actual_total(&shifts, &metric, ReconciliationBasis::ValidatedOnly).unwrap(),
            dec!(11)
        );
    }

    #[test]
    fn actual_total_of_no_shifts_is_zero() {
        let metric = MetricKey::new("Hauling", "Production", "Weight");
        assert!(actual_total(&[], &metric, ReconciliationBasis::CapturedAll).unwrap().is_zero());
    }
}
