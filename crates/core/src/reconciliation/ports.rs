//! Port interfaces for reconciliation persistence

use minetally_domain::{
    ReconciliationKey, ReconciliationRecord, ReportingMonth, Result, ValidatedShift,
};

pub trait ReconciliationRepository: Send + Sync {
    /// Start a write transaction; dropping it without commit rolls back.
    fn begin(&self) -> Result<Box<dyn ReconciliationTransaction + '_>>;

    fn find(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>>;

    /// Every shift of the site whose date falls in `month`.
    fn month_shifts(&self, site_id: &str, month: ReportingMonth) -> Result<Vec<ValidatedShift>>;
}

/// Unit of work over reconciliation records.
pub trait ReconciliationTransaction {
    fn month_shifts(&self, site_id: &str, month: ReportingMonth) -> Result<Vec<ValidatedShift>>;

    fn find(&self, key: &ReconciliationKey) -> Result<Option<ReconciliationRecord>>;

    /// Upsert the record and fully replace its daily allocations.
    fn save(&mut self, record: &ReconciliationRecord) -> Result<()>;

    fn commit(self: Box<Self>) -> Result<()>;
}
