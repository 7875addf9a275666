//! Port interfaces for shift persistence
//!
//! Every mutation runs through a [`ShiftTransaction`] so the immutability
//! check and the write it guards commit (or roll back) together.

use chrono::NaiveDate;
use minetally_domain::{Result, ShiftKey, ValidatedActivity, ValidatedShift};

/// Read access to shifts plus a way to open a write transaction.
pub trait ShiftRepository: Send + Sync {
    /// Start a write transaction. It holds the store's writer lock until it
    /// is committed or dropped; dropping without commit rolls back.
    fn begin(&self) -> Result<Box<dyn ShiftTransaction + '_>>;

    fn find_shift(&self, key: &ShiftKey) -> Result<Option<ValidatedShift>>;

    /// Every shift of one site and date, ordered by shift designator then
    /// operator.
    fn list_day(&self, site_id: &str, date: NaiveDate) -> Result<Vec<ValidatedShift>>;

    /// Activities of a shift in insertion order.
    fn list_activities(&self, shift_id: &str) -> Result<Vec<ValidatedActivity>>;
}

/// Unit of work over shifts and their activities.
pub trait ShiftTransaction {
    fn find_shift(&self, key: &ShiftKey) -> Result<Option<ValidatedShift>>;

    fn shift_by_id(&self, shift_id: &str) -> Result<Option<ValidatedShift>>;

    fn find_activity(&self, activity_id: &str) -> Result<Option<ValidatedActivity>>;

    fn shifts_for_day(&self, site_id: &str, date: NaiveDate) -> Result<Vec<ValidatedShift>>;

    fn activities(&self, shift_id: &str) -> Result<Vec<ValidatedActivity>>;

    fn insert_shift(&mut self, shift: &ValidatedShift) -> Result<()>;

    /// Persist `validated`, `totals` and `updated_at`.
    fn update_shift(&mut self, shift: &ValidatedShift) -> Result<()>;

    /// Remove a shift together with its activities.
    fn delete_shift(&mut self, shift_id: &str) -> Result<()>;

    fn insert_activity(&mut self, activity: &ValidatedActivity) -> Result<()>;

    fn update_activity(&mut self, activity: &ValidatedActivity) -> Result<()>;

    fn delete_activity(&mut self, activity_id: &str) -> Result<()>;

    fn commit(self: Box<Self>) -> Result<()>;
}
