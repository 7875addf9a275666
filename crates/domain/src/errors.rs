//! Error types used throughout the pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Minetally
///
/// The first five variants form the recoverable taxonomy the routing layer
/// maps to specific user-facing rejections. The remaining variants cover
/// lookups, input validation and infrastructure failures.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum MinetallyError {
    /// A mutation was attempted on a validated shift.
    #[error("Shift is validated and immutable: {0}")]
    ImmutableShift(String),

    /// A mutation was attempted on a locked reconciliation.
    #[error("Reconciliation is locked: {0}")]
    LockedReconciliation(String),

    /// The solver was invoked without both production and development targets.
    #[error("Missing reconciled target: {0}")]
    MissingTarget(String),

    /// Aggregation or solve was invoked with zero relevant records.
    #[error("No data: {0}")]
    NoData(String),

    /// A config group ended up with `min_factor > max_factor`.
    #[error("Invalid factor bounds: {0}")]
    InvalidBounds(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MinetallyError {
    /// Stable label suitable for structured logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ImmutableShift(_) => "immutable_shift",
            Self::LockedReconciliation(_) => "locked_reconciliation",
            Self::MissingTarget(_) => "missing_target",
            Self::NoData(_) => "no_data",
            Self::InvalidBounds(_) => "invalid_bounds",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    ///
    /// Only storage failures qualify; every domain rejection is deterministic
    /// and will fail again until the caller changes state (unvalidate,
    /// unlock, supply targets, fix bounds).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Result type alias for Minetally operations
pub type Result<T> = std::result::Result<T, MinetallyError>;
