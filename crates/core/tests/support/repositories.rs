//! In-memory repository implementations for testing
//!
//! One [`InMemoryStore`] backs every port. A transaction holds the store
//! mutex for its whole lifetime (mirroring SQLite's writer lock) and works on
//! a copy of the state that is written back only on commit, so dropping a
//! transaction discards its changes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use minetally_core::{
    FactorRepository, FactorTransaction, MonthActivity, ReconciliationRepository,
    ReconciliationTransaction, ShiftRepository, ShiftTransaction,
};
use minetally_domain::{
    ConfigGroup, EquipmentKind, MonthlyFactorResult, ReconciliationKey, ReconciliationRecord,
    ReportingMonth, Result, ShiftKey, ValidatedActivity, ValidatedShift,
};
use parking_lot::{Mutex, MutexGuard};

type MonthScope = (String, ReportingMonth, EquipmentKind);

#[derive(Debug, Clone, Default)]
struct State {
    shifts: BTreeMap<String, ValidatedShift>,
    /// Insertion order.
    activities: Vec<ValidatedActivity>,
    records: BTreeMap<ReconciliationKey, ReconciliationRecord>,
    groups: BTreeMap<(String, EquipmentKind, String), ConfigGroup>,
    assignments: BTreeMap<MonthScope, BTreeMap<String, String>>,
    results: BTreeMap<MonthScope, Vec<MonthlyFactorResult>>,
}

impl State {
    fn find_shift(&self, key: &ShiftKey) -> Option<ValidatedShift> {
        self.shifts.values().find(|s| s.key == *key).cloned()
    }

    fn shifts_where(&self, keep: impl Fn(&ValidatedShift) -> bool) -> Vec<ValidatedShift> {
        let mut shifts: Vec<_> = self.shifts.values().filter(|s| keep(s)).cloned().collect();
        shifts.sort_by(|a, b| a.key.cmp(&b.key));
        shifts
    }

    fn day(&self, site_id: &str, date: NaiveDate) -> Vec<ValidatedShift> {
        self.shifts_where(|s| s.key.site_id == site_id && s.key.date == date)
    }

    fn month(&self, site_id: &str, month: ReportingMonth) -> Vec<ValidatedShift> {
        self.shifts_where(|s| s.key.site_id == site_id && month.contains(s.key.date))
    }

    fn activities(&self, shift_id: &str) -> Vec<ValidatedActivity> {
        self.activities.iter().filter(|a| a.shift_id == shift_id).cloned().collect()
    }

    fn groups(&self, site_id: &str, kind: EquipmentKind) -> Vec<ConfigGroup> {
        self.groups
            .values()
            .filter(|g| g.site_id == site_id && g.equipment_kind == kind)
            .cloned()
            .collect()
    }

    fn results(&self, site_id: &str, month: ReportingMonth, kind: EquipmentKind) -> Vec<MonthlyFactorResult> {
        self.results.get(&(site_id.to_string(), month, kind)).cloned().unwrap_or_default()
    }
}

/// In-memory implementation of every core repository port.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    commits: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed transactions so far.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Store a reconciliation record directly, bypassing the services.
    pub fn seed_record(&self, record: ReconciliationRecord) {
        self.state.lock().records.insert(record.key.clone(), record);
    }

    pub fn seed_group(&self, group: ConfigGroup) {
        self.state
            .lock()
            .groups
            .insert((group.site_id.clone(), group.equipment_kind, group.code.clone()), group);
    }

    pub fn seed_results(&self, results: Vec<MonthlyFactorResult>) {
        let mut state = self.state.lock();
        for result in results {
            let scope = (result.site_id.clone(), result.month, result.equipment_kind);
            state.results.entry(scope).or_default().push(result);
        }
    }

    pub fn record(&self, key: &ReconciliationKey) -> Option<ReconciliationRecord> {
        self.state.lock().records.get(key).cloned()
    }

    pub fn assignments(
        &self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
    ) -> BTreeMap<String, String> {
        self.state
            .lock()
            .assignments
            .get(&(site_id.to_string(), month, kind))
            .cloned()
            .unwrap_or_default()
    }

    fn transaction(&self) -> InMemoryTransaction<'_> {
        let guard = self.state.lock();
        let working = guard.clone();
        InMemoryTransaction { guard, working, commits: &self.commits }
    }
}

pub struct InMemoryTransaction<'a> {
    guard: MutexGuard<'a, State>,
    working: State,
    commits: &'a AtomicUsize,
}

impl InMemoryTransaction<'_> {
    fn finish(mut self: Box<Self>) -> Result<()> {
        *self.guard = std::mem::take(&mut self.working);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ShiftRepository for InMemoryStore {
    fn begin(&self) -> Result<Box<dyn ShiftTransaction + '_>> {
        Ok(Box::new(self.transaction()))
    }

    fn find_shift(&self, key: &ShiftKey) -> Result<Option<ValidatedShift>> {
        Ok(self.state.lock().find_shift(key))
    }

    fn list_day(&self, site_id: &str, date: NaiveDate) -> Result<Vec<ValidatedShift>> {
        Ok(self.state.lock().day(site_id, date))
    }

    fn list_activities(&self, shift_id: &str) -> Result<Vec<ValidatedActivity>> {
        Ok(self.state.lock().activities(shift_id))
    }
}

impl ShiftTransaction for InMemoryTransaction<'_> {
    fn find_shift(&self, key: &ShiftKey) -> Result<Option<ValidatedShift>> {
        Ok(self.working.find_shift(key))
    }

    fn shift_by_id(&self, shift_id: &str) -> Result<Option<ValidatedShift>> {
        Ok(self.working.shifts.get(shift_id).cloned())
    }

    fn find_activity(&self, activity_id: &str) -> Result<Option<ValidatedActivity>> {
        Ok(self.working.activities.iter().find(|a| a.id == activity_id).cloned())
    }

    fn shifts_for_day(&self, site_id: &str, date: NaiveDate) -> Result<Vec<ValidatedShift>> {
        Ok(self.working.day(site_id, date))
    }

    fn activities(&self, shift_id: &str) -> Result<Vec<ValidatedActivity>> {
        Ok(self.working.activities(shift_id))
    }

    fn insert_shift(&mut self, shift: &ValidatedShift) -> Result<()> {
        self.working.shifts.insert(shift.id.clone(), shift.clone());
        Ok(())
    }

    fn update_shift(&mut self, shift: &ValidatedShift) -> Result<()> {
        self.working.shifts.insert(shift.id.clone(), shift.clone());
        Ok(())
    }

    fn delete_shift(&mut self, shift_id: &str) -> Result<()> {
        self.working.shifts.remove(shift_id);
        self.working.activities.retain(|a| a.shift_id != shift_id);
        Ok(())
    }

    fn insert_activity(&mut self, activity: &ValidatedActivity) -> Result<()> {
        self.working.activities.push(activity.clone());
        Ok(())
    }

    fn update_activity(&mut self, activity: &ValidatedActivity) -> Result<()> {
        if let Some(slot) = self.working.activities.iter_mut().find(|a| a.id == activity.id) {
            *slot = activity.clone();
        }
        Ok(())
    }

    fn delete_activity(&mut self, activity_id: &str) -> Result<()> {
        self.working.activities.retain(|a| a.id != activity_id);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.finish()
    }
}

impl ReconciliationRepository for InMemoryStore {
    fn begin(&self) -> Result<Box<dyn ReconciliationTransaction + '_>> {
        Ok(Box::new(self.transaction()))
    }

    fn find(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>> {
        Ok(self.record(key))
    }

    fn month_shifts(&self, site_id: &str, month: ReportingMonth) -> Result<Vec<ValidatedShift>> {
        Ok(self.state.lock().month(site_id, month))
    }
}

impl ReconciliationTransaction for InMemoryTransaction<'_> {
    fn month_shifts(&self, site_id: &str, month: ReportingMonth) -> Result<Vec<ValidatedShift>> {
        Ok(self.working.month(site_id, month))
    }

    fn find(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>> {
        Ok(self.working.records.get(key).cloned())
    }

    fn save(&mut self, record: &ReconciliationRecord) -> Result<()> {
        self.working.records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.finish()
    }
}

impl FactorRepository for InMemoryStore {
    fn begin(&self) -> Result<Box<dyn FactorTransaction + '_>> {
        Ok(Box::new(self.transaction()))
    }

    fn saved_results(
        &self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
    ) -> Result<Vec<MonthlyFactorResult>> {
        Ok(self.state.lock().results(site_id, month, kind))
    }

    fn config_groups(&self, site_id: &str, kind: EquipmentKind) -> Result<Vec<ConfigGroup>> {
        Ok(self.state.lock().groups(site_id, kind))
    }
}

impl FactorTransaction for InMemoryTransaction<'_> {
    fn month_activities(
        &self,
        site_id: &str,
        month: ReportingMonth,
        activity: &str,
    ) -> Result<Vec<MonthActivity>> {
        let state = &self.working;
        Ok(state
            .month(site_id, month)
            .into_iter()
            .flat_map(|shift| {
                state
                    .activities(&shift.id)
                    .into_iter()
                    .filter(|a| a.activity == activity)
                    .map(move |a| MonthActivity {
                        date: shift.key.date,
                        validated: shift.validated,
                        payload: a.payload,
                    })
            })
            .collect())
    }

    fn find_target(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>> {
        Ok(self.working.records.get(key).cloned())
    }

    fn config_groups(&self, site_id: &str, kind: EquipmentKind) -> Result<Vec<ConfigGroup>> {
        Ok(self.working.groups(site_id, kind))
    }

    fn month_assignments(
        &self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
    ) -> Result<BTreeMap<String, String>> {
        Ok(self
            .working
            .assignments
            .get(&(site_id.to_string(), month, kind))
            .cloned()
            .unwrap_or_default())
    }

    fn latest_factor_before(
        &self,
        site_id: &str,
        kind: EquipmentKind,
        code: &str,
        month: ReportingMonth,
    ) -> Result<Option<f64>> {
        Ok(self
            .working
            .results
            .iter()
            .filter(|((site, m, k), _)| site == site_id && *k == kind && *m < month)
            .rev()
            .find_map(|(_, rows)| rows.iter().find(|r| r.config_code == code).map(|r| r.factor)))
    }

    fn upsert_config_group(&mut self, group: &ConfigGroup) -> Result<()> {
        self.working
            .groups
            .insert((group.site_id.clone(), group.equipment_kind, group.code.clone()), group.clone());
        Ok(())
    }

    fn replace_assignments(
        &mut self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
        assignments: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.working.assignments.insert((site_id.to_string(), month, kind), assignments.clone());
        Ok(())
    }

    fn replace_results(
        &mut self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
        results: &[MonthlyFactorResult],
    ) -> Result<()> {
        self.working.results.insert((site_id.to_string(), month, kind), results.to_vec());
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.finish()
    }
}
