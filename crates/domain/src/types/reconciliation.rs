//! Monthly reconciliation records and their daily allocations

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::month::ReportingMonth;
use super::totals::MetricKey;
use crate::errors::{MinetallyError, Result};

/// Which shifts contribute to the actual total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationBasis {
    /// Only administrator-validated shifts.
    #[default]
    ValidatedOnly,
    /// Every captured shift regardless of validation state.
    CapturedAll,
}

crate::impl_domain_status_conversions!(ReconciliationBasis {
    ValidatedOnly => "validated_only",
    CapturedAll => "captured_all",
});

impl ReconciliationBasis {
    pub fn includes(&self, validated: bool) -> bool {
        match self {
            Self::ValidatedOnly => validated,
            Self::CapturedAll => true,
        }
    }
}

/// How the monthly delta is spread across days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    #[default]
    SpreadDaily,
    MonthEnd,
    /// Manually edited allocations.
    Custom,
}

crate::impl_domain_status_conversions!(AllocationMethod {
    SpreadDaily => "spread_daily",
    MonthEnd => "month_end",
    Custom => "custom",
});

/// Identity of a reconciliation: one per site, month and metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReconciliationKey {
    pub site_id: String,
    pub month: ReportingMonth,
    pub metric_key: MetricKey,
}

impl ReconciliationKey {
    pub fn new(site_id: impl Into<String>, month: ReportingMonth, metric_key: MetricKey) -> Self {
        Self { site_id: site_id.into(), month, metric_key }
    }
}

impl std::fmt::Display for ReconciliationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.site_id, self.month, self.metric_key)
    }
}

/// Portion of the monthly delta booked against one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAllocation {
    pub date: NaiveDate,
    pub allocated_value: Decimal,
}

impl DailyAllocation {
    pub fn new(date: NaiveDate, allocated_value: Decimal) -> Self {
        Self { date, allocated_value }
    }
}

/// Stored reconciliation of one metric for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub key: ReconciliationKey,
    /// Externally confirmed total.
    pub reconciled_total: Decimal,
    pub basis: ReconciliationBasis,
    pub method: AllocationMethod,
    pub is_locked: bool,
    pub actual_total_snapshot: Decimal,
    pub delta_snapshot: Decimal,
    /// Ordered by date; sums exactly to `delta_snapshot`.
    pub allocations: Vec<DailyAllocation>,
    pub updated_at: i64,
}

impl ReconciliationRecord {
    /// Guard every mutating operation must pass first.
    pub fn ensure_unlocked(&self) -> Result<()> {
        if self.is_locked {
            return Err(MinetallyError::LockedReconciliation(format!(
                "reconciliation {} is locked; unlock it before changing it",
                self.key
            )));
        }
        Ok(())
    }

    pub fn allocation_sum(&self) -> Decimal {
        self.allocations.iter().map(|a| a.allocated_value).sum()
    }
}

/// Result of a reconcile or recalculate call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub actual_total: Decimal,
    pub delta: Decimal,
    pub allocations: Vec<DailyAllocation>,
}

impl From<&ReconciliationRecord> for ReconciliationOutcome {
    fn from(record: &ReconciliationRecord) -> Self {
        Self {
            actual_total: record.actual_total_snapshot,
            delta: record.delta_snapshot,
            allocations: record.allocations.clone(),
        }
    }
}

/// The confirmed side of a month summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledFigure {
    pub total: Decimal,
    pub basis: ReconciliationBasis,
    pub method: AllocationMethod,
    pub is_locked: bool,
}

/// Read-only view of a month: fresh actual total against the stored target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub key: ReconciliationKey,
    pub basis: ReconciliationBasis,
    pub actual_total: Decimal,
    pub reconciled: Option<ReconciledFigure>,
    pub delta: Option<Decimal>,
    pub allocations: Vec<DailyAllocation>,
}
