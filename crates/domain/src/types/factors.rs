//! Conversion-factor configuration and solver results
//!
//! A conversion factor turns a primary count into tonnes: tonnes per bucket
//! for loaders, tonnes per truckload for trucks. Units sharing a
//! configuration share a factor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::month::ReportingMonth;
use crate::errors::{MinetallyError, Result};

/// Equipment class a factor applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    /// Buckets loaded.
    Loader,
    /// Truckloads hauled.
    Truck,
}

crate::impl_domain_status_conversions!(EquipmentKind {
    Loader => "loader",
    Truck => "truck",
});

/// Site-level defaults for one configuration code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigGroup {
    pub site_id: String,
    pub code: String,
    pub equipment_kind: EquipmentKind,
    pub estimate_factor: Option<f64>,
    pub min_factor: Option<f64>,
    /// `None` means unbounded above.
    pub max_factor: Option<f64>,
    /// Pins the factor to its estimate.
    #[serde(default)]
    pub locked: bool,
}

impl ConfigGroup {
    pub fn new(site_id: impl Into<String>, code: impl Into<String>, kind: EquipmentKind) -> Self {
        Self {
            site_id: site_id.into(),
            code: code.into(),
            equipment_kind: kind,
            estimate_factor: None,
            min_factor: None,
            max_factor: None,
            locked: false,
        }
    }

    pub fn with_estimate(mut self, estimate: f64) -> Self {
        self.estimate_factor = Some(estimate);
        self
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_factor = Some(min);
        self.max_factor = Some(max);
        self
    }

    /// Apply the non-empty fields of a per-request override.
    pub fn apply(&mut self, o: &ConfigOverride) {
        if o.estimate_factor.is_some() {
            self.estimate_factor = o.estimate_factor;
        }
        if o.min_factor.is_some() {
            self.min_factor = o.min_factor;
        }
        if o.max_factor.is_some() {
            self.max_factor = o.max_factor;
        }
        if let Some(locked) = o.locked {
            self.locked = locked;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |what: &str| {
            MinetallyError::InvalidBounds(format!("config {}: {what}", self.code))
        };
        for value in [self.estimate_factor, self.min_factor, self.max_factor].into_iter().flatten() {
            if !value.is_finite() {
                return Err(bad("factors must be finite"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_factor, self.max_factor) {
            if min > max {
                return Err(bad(&format!("min {min} exceeds max {max}")));
            }
        }
        Ok(())
    }
}

/// Per-request adjustment of a configuration; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverride {
    pub code: String,
    #[serde(default)]
    pub estimate_factor: Option<f64>,
    #[serde(default)]
    pub min_factor: Option<f64>,
    #[serde(default)]
    pub max_factor: Option<f64>,
    #[serde(default)]
    pub locked: Option<bool>,
}

impl ConfigOverride {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into(), ..Self::default() }
    }
}

/// Primary counts extracted for one unit in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCounts {
    pub unit_id: String,
    pub prod_count: f64,
    pub dev_count: f64,
}

impl UnitCounts {
    pub fn new(unit_id: impl Into<String>, prod_count: f64, dev_count: f64) -> Self {
        Self { unit_id: unit_id.into(), prod_count, dev_count }
    }
}

/// A production/development pair of tonnages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorPair {
    pub production: f64,
    pub development: f64,
}

impl FactorPair {
    pub fn new(production: f64, development: f64) -> Self {
        Self { production, development }
    }

    pub fn minus(&self, other: &Self) -> Self {
        Self::new(self.production - other.production, self.development - other.development)
    }
}

/// Input to a solve for one site, month and equipment kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub site_id: String,
    pub month: ReportingMonth,
    pub kind: EquipmentKind,
    /// Explicit `unit_id -> config_code` assignments; these win over saved ones.
    #[serde(default)]
    pub assignments: BTreeMap<String, String>,
    #[serde(default)]
    pub overrides: Vec<ConfigOverride>,
    /// Overrides the configured regularization weight.
    #[serde(default)]
    pub regularization: Option<f64>,
    #[serde(default)]
    pub save: bool,
}

impl SolveRequest {
    pub fn preview(site_id: impl Into<String>, month: ReportingMonth, kind: EquipmentKind) -> Self {
        Self {
            site_id: site_id.into(),
            month,
            kind,
            assignments: BTreeMap::new(),
            overrides: Vec::new(),
            regularization: None,
            save: false,
        }
    }

    pub fn assign(mut self, unit_id: impl Into<String>, code: impl Into<String>) -> Self {
        self.assignments.insert(unit_id.into(), code.into());
        self
    }

    pub fn with_override(mut self, o: ConfigOverride) -> Self {
        self.overrides.push(o);
        self
    }

    pub fn saving(mut self) -> Self {
        self.save = true;
        self
    }
}

/// Solved factor for one configuration, with the bounds and prior it used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedConfig {
    pub code: String,
    pub factor: f64,
    pub prior: f64,
    pub min_factor: f64,
    pub max_factor: Option<f64>,
    pub locked: bool,
    pub unit_ids: Vec<String>,
    pub prod_count: f64,
    pub dev_count: f64,
}

/// Saved per-unit factor row; overwritten on every saved solve of the month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFactorResult {
    pub site_id: String,
    pub month: ReportingMonth,
    pub unit_id: String,
    pub equipment_kind: EquipmentKind,
    pub config_code: String,
    pub factor: f64,
    pub prod_count: f64,
    pub dev_count: f64,
    pub prod_tonnes_pred: f64,
    pub dev_tonnes_pred: f64,
}

/// Full solver output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSolution {
    pub site_id: String,
    pub month: ReportingMonth,
    pub kind: EquipmentKind,
    pub configs: Vec<SolvedConfig>,
    pub units: Vec<MonthlyFactorResult>,
    pub targets: FactorPair,
    pub predicted: FactorPair,
    /// `predicted - targets`.
    pub residuals: FactorPair,
    /// More configurations than the two constraints can pin down.
    pub underdetermined: bool,
    pub iterations: usize,
    pub converged: bool,
    pub saved: bool,
}

impl FactorSolution {
    pub fn factor_for(&self, code: &str) -> Option<f64> {
        self.configs.iter().find(|c| c.code == code).map(|c| c.factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_replaces_only_given_fields() {
        let mut group = ConfigGroup::new("site-1", "CAT-990", EquipmentKind::Loader)
            .with_estimate(12.0)
            .with_bounds(5.0, 20.0);
        let o = ConfigOverride { max_factor: Some(15.0), locked: Some(true), ..ConfigOverride::new("CAT-990") };

        group.apply(&o);

        assert_eq!(group.estimate_factor, Some(12.0));
        assert_eq!(group.min_factor, Some(5.0));
        assert_eq!(group.max_factor, Some(15.0));
        assert!(group.locked);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let group = ConfigGroup::new("site-1", "A", EquipmentKind::Truck).with_bounds(30.0, 10.0);
        assert!(matches!(group.validate(), Err(MinetallyError::InvalidBounds(_))));

        let nan = ConfigGroup::new("site-1", "A", EquipmentKind::Truck).with_estimate(f64::NAN);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn kind_text_form() {
        assert_eq!(EquipmentKind::Loader.to_string(), "loader");
        assert_eq!("Truck".parse::<EquipmentKind>().unwrap(), EquipmentKind::Truck);
    }

    #[test]
    fn request_builder() {
        let month = ReportingMonth::new(2025, 3).unwrap();
        let request = SolveRequest::preview("site-1", month, EquipmentKind::Loader)
            .assign("LDR-1", "A")
            .with_override(ConfigOverride::new("A"))
            .saving();
        assert!(request.save);
        assert_eq!(request.assignments.get("LDR-1").map(String::as_str), Some("A"));
    }

    #[test]
    fn residual_pair() {
        let predicted = FactorPair::new(1510.0, 990.0);
        let target = FactorPair::new(1500.0, 1000.0);
        assert_eq!(predicted.minus(&target), FactorPair::new(10.0, -10.0));
    }
}
