//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    ALLOCATION_ROUNDING_DP, DEFAULT_MAX_ITERATIONS, DEFAULT_REGULARIZATION,
    DEFAULT_SOLVER_TOLERANCE,
};
use crate::errors::{MinetallyError, Result};
use crate::types::{AllocationMethod, EquipmentKind, MetricKey, ReconciliationBasis};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub solver: SolverConfig,
    pub reconciliation: ReconciliationConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(MinetallyError::Config("database.path must not be empty".into()));
        }
        if self.database.pool_size == 0 {
            return Err(MinetallyError::Config("database.pool_size must be at least 1".into()));
        }
        self.solver.validate()
    }
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "minetally.db".to_string(), pool_size: 8 }
    }
}

/// Target metrics for one equipment kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub production: MetricKey,
    pub development: MetricKey,
}

/// Conversion-factor solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// λ in `‖Ax − b‖² + λ‖x − prior‖²`.
    pub regularization: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Which shifts the per-unit counts are read from.
    pub count_basis: ReconciliationBasis,
    pub loader_targets: TargetMetrics,
    pub truck_targets: TargetMetrics,
}

impl SolverConfig {
    pub fn targets_for(&self, kind: EquipmentKind) -> &TargetMetrics {
        match kind {
            EquipmentKind::Loader => &self.loader_targets,
            EquipmentKind::Truck => &self.truck_targets,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(MinetallyError::Config(format!(
                "solver.regularization must be a non-negative number, got {}",
                self.regularization
            )));
        }
        if self.max_iterations == 0 {
            return Err(MinetallyError::Config("solver.max_iterations must be at least 1".into()));
        }
        if !(self.tolerance > 0.0) {
            return Err(MinetallyError::Config("solver.tolerance must be positive".into()));
        }
        Ok(())
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            regularization: DEFAULT_REGULARIZATION,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_SOLVER_TOLERANCE,
            count_basis: ReconciliationBasis::ValidatedOnly,
            loader_targets: TargetMetrics {
                production: MetricKey::new("Loading", "Production", "Tonnes"),
                development: MetricKey::new("Loading", "Development", "Tonnes"),
            },
            truck_targets: TargetMetrics {
                production: MetricKey::new("Hauling", "Production", "Weight"),
                development: MetricKey::new("Hauling", "Development", "Weight"),
            },
        }
    }
}

/// Reconciliation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub default_basis: ReconciliationBasis,
    pub default_method: AllocationMethod,
    /// Decimal places of a `spread_daily` per-day share.
    pub rounding_dp: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            default_basis: ReconciliationBasis::ValidatedOnly,
            default_method: AllocationMethod::SpreadDaily,
            rounding_dp: ALLOCATION_ROUNDING_DP,
        }
    }
}
