//! Validation snapshot types: shifts and their activities

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payload::ActivityPayload;
use super::totals::ShiftTotals;
use crate::errors::{MinetallyError, Result};

/// Identifies one operator's shift: `(site, date, shift designator, operator)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShiftKey {
    pub site_id: String,
    pub date: NaiveDate,
    /// Shift designator ("dn"), typically day or night.
    pub shift: String,
    pub operator_id: String,
}

impl ShiftKey {
    pub fn new(
        site_id: impl Into<String>,
        date: NaiveDate,
        shift: impl Into<String>,
        operator_id: impl Into<String>,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            date,
            shift: shift.into(),
            operator_id: operator_id.into(),
        }
    }
}

impl fmt::Display for ShiftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.site_id, self.date, self.shift, self.operator_id)
    }
}

/// Optional narrowing of a day-level operation to one designator and/or
/// operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<String>,
}

impl ShiftSelector {
    pub fn matches(&self, key: &ShiftKey) -> bool {
        self.shift.as_ref().map_or(true, |s| *s == key.shift)
            && self.operator_id.as_ref().map_or(true, |o| *o == key.operator_id)
    }
}

/// Lifecycle state of a stored shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftState {
    Captured,
    Validated,
}

crate::impl_domain_status_conversions!(ShiftState {
    Captured => "captured",
    Validated => "validated",
});

/// Snapshot of one shift with its computed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedShift {
    pub id: String,
    pub key: ShiftKey,
    pub validated: bool,
    pub totals: ShiftTotals,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ValidatedShift {
    /// Fresh, empty, unvalidated shift.
    pub fn captured(key: ShiftKey, now: i64) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            key,
            validated: false,
            totals: ShiftTotals::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> ShiftState {
        if self.validated {
            ShiftState::Validated
        } else {
            ShiftState::Captured
        }
    }

    /// Guard every mutating operation must pass first.
    pub fn ensure_mutable(&self) -> Result<()> {
        if self.validated {
            return Err(MinetallyError::ImmutableShift(format!(
                "shift {} is validated; unvalidate {} before editing",
                self.key, self.key.date
            )));
        }
        Ok(())
    }
}

/// One captured activity belonging to a shift.
///
/// `activity`/`sub_activity` duplicate the payload's labels so the store can
/// filter on them without decoding payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedActivity {
    pub id: String,
    pub shift_id: String,
    pub activity: String,
    pub sub_activity: String,
    pub payload: ActivityPayload,
    pub created_at: i64,
}

impl ValidatedActivity {
    pub fn new(shift_id: &str, payload: ActivityPayload, now: i64) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            shift_id: shift_id.to_string(),
            activity: payload.activity.clone(),
            sub_activity: payload.sub_activity.clone(),
            payload,
            created_at: now,
        }
    }

    /// Swap in an edited payload, keeping identity and denormalized labels in
    /// step.
    pub fn replace_payload(&mut self, payload: ActivityPayload) {
        self.activity = payload.activity.clone();
        self.sub_activity = payload.sub_activity.clone();
        self.payload = payload;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ShiftKey {
        ShiftKey::new("site-1", NaiveDate::from_ymd_opt(2025, 3, 4).unwrap(), "DS", "op-7")
    }

    #[test]
    fn captured_shift_is_mutable() {
        let shift = ValidatedShift::captured(key(), 1_700_000_000);
        assert_eq!(shift.state(), ShiftState::Captured);
        assert!(shift.ensure_mutable().is_ok());
        assert!(shift.totals.is_empty());
    }

    #[test]
    fn validated_shift_rejects_mutation() {
        let mut shift = ValidatedShift::captured(key(), 1_700_000_000);
        shift.validated = true;
        let err = shift.ensure_mutable().unwrap_err();
        assert!(matches!(err, MinetallyError::ImmutableShift(_)));
        assert!(err.to_string().contains("unvalidate 2025-03-04"));
    }

    #[test]
    fn selector_matching() {
        let k = key();
        assert!(ShiftSelector::default().matches(&k));
        assert!(ShiftSelector { shift: Some("DS".into()), operator_id: None }.matches(&k));
        assert!(!ShiftSelector { shift: Some("NS".into()), operator_id: None }.matches(&k));
        assert!(!ShiftSelector { shift: None, operator_id: Some("op-8".into()) }.matches(&k));
    }

    #[test]
    fn replace_payload_updates_labels() {
        let payload = ActivityPayload::new("Hauling", "Production");
        let mut activity = ValidatedActivity::new("shift-1", payload, 1);
        activity.replace_payload(ActivityPayload::new("Hauling", "Development"));
        assert_eq!(activity.sub_activity, "Development");
        assert_eq!(activity.payload.sub_activity, "Development");
    }
}
