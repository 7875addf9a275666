//! Error classification shared by the storage layer and the higher crates
//!
//! Module-specific error enums implement [`ErrorClassification`] so callers
//! can decide how to log and whether to retry without matching on concrete
//! variants:
//!
//! ```rust,ignore
//! if err.is_critical() {
//!     error!(severity = %err.severity(), "storage failure");
//! }
//! ```

use std::fmt;
use std::time::Duration;

/// Standard interface for classifying errors
pub trait ErrorClassification {
    /// Transient failures (lock contention, busy database, timeouts) that may
    /// succeed when attempted again.
    fn is_retryable(&self) -> bool;

    /// Used for logging and alerting decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Data corruption, schema problems and internal invariant violations.
    fn is_critical(&self) -> bool;

    /// Suggested retry delay, when one is known.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
