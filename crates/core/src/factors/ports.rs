//! Port interfaces for the conversion-factor solver

use std::collections::BTreeMap;

use chrono::NaiveDate;
use minetally_domain::{
    ActivityPayload, ConfigGroup, EquipmentKind, MonthlyFactorResult, ReconciliationKey,
    ReconciliationRecord, ReportingMonth, Result,
};

/// One stored activity of the month with the state of its shift.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthActivity {
    pub date: NaiveDate,
    pub validated: bool,
    pub payload: ActivityPayload,
}

pub trait FactorRepository: Send + Sync {
    /// Start a write transaction; dropping it without commit rolls back.
    fn begin(&self) -> Result<Box<dyn FactorTransaction + '_>>;

    fn saved_results(
        &self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
    ) -> Result<Vec<MonthlyFactorResult>>;

    fn config_groups(&self, site_id: &str, kind: EquipmentKind) -> Result<Vec<ConfigGroup>>;
}

/// Unit of work for one solve. Reads and the optional save share it so the
/// target lock check and the write cannot interleave with another writer.
pub trait FactorTransaction {
    /// Activities of the month whose activity label is `activity`.
    fn month_activities(
        &self,
        site_id: &str,
        month: ReportingMonth,
        activity: &str,
    ) -> Result<Vec<MonthActivity>>;

    fn find_target(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>>;

    fn config_groups(&self, site_id: &str, kind: EquipmentKind) -> Result<Vec<ConfigGroup>>;

    /// Saved `unit_id -> config_code` table of the month.
    fn month_assignments(
        &self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
    ) -> Result<BTreeMap<String, String>>;

    /// Factor saved for `code` in the most recent month strictly before
    /// `month`.
    fn latest_factor_before(
        &self,
        site_id: &str,
        kind: EquipmentKind,
        code: &str,
        month: ReportingMonth,
    ) -> Result<Option<f64>>;

    fn upsert_config_group(&mut self, group: &ConfigGroup) -> Result<()>;

    fn replace_assignments(
        &mut self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
        assignments: &BTreeMap<String, String>,
    ) -> Result<()>;

    fn replace_results(
        &mut self,
        site_id: &str,
        month: ReportingMonth,
        kind: EquipmentKind,
        results: &[MonthlyFactorResult],
    ) -> Result<()>;

    fn commit(self: Box<Self>) -> Result<()>;
}
