//! Domain types and models
//!
//! Leaf-first: payloads feed totals, totals live on validated shifts, month
//! roll-ups of shift totals feed reconciliation, and reconciled targets feed
//! the conversion-factor solver.

pub mod factors;
pub mod month;
pub mod payload;
pub mod reconciliation;
pub mod shift;
pub mod totals;

pub use factors::{
    ConfigGroup, ConfigOverride, EquipmentKind, FactorPair, FactorSolution,
    MonthlyFactorResult, SolveRequest, SolvedConfig, UnitCounts,
};
pub use month::ReportingMonth;
pub use payload::{ActivityPayload, HaulLoad, PayloadValue};
pub use reconciliation::{
    AllocationMethod, DailyAllocation, MonthSummary, ReconciledFigure, ReconciliationBasis,
    ReconciliationKey, ReconciliationOutcome, ReconciliationRecord,
};
pub use shift::{ShiftKey, ShiftSelector, ShiftState, ValidatedActivity, ValidatedShift};
pub use totals::{MetricKey, ShiftTotals};
