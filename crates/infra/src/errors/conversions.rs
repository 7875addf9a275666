//! Conversions from storage errors into domain errors.

use minetally_common::storage::StorageError;
use minetally_common::ErrorClassification;
use minetally_domain::MinetallyError;
use rusqlite::Error as SqlError;
use tracing::{error, warn};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub MinetallyError);

impl From<InfraError> for MinetallyError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<MinetallyError> for InfraError {
    fn from(value: MinetallyError) -> Self {
        InfraError(value)
    }
}

trait IntoMinetallyError {
    fn into_minetally(self) -> MinetallyError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → MinetallyError */
/* -------------------------------------------------------------------------- */

impl IntoMinetallyError for SqlError {
    fn into_minetally(self) -> MinetallyError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        MinetallyError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        MinetallyError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        MinetallyError::InvalidInput(format!("duplicate row: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => MinetallyError::InvalidInput(
                        format!("foreign key constraint violation: {message}"),
                    ),
                    _ => MinetallyError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => MinetallyError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(column, _, cause) => {
                MinetallyError::Database(format!("corrupt value in column {column}: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                MinetallyError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::Utf8Error(_) => {
                MinetallyError::Database("invalid UTF-8 returned from sqlite".into())
            }
            other => MinetallyError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_minetally())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → MinetallyError */
/* -------------------------------------------------------------------------- */

impl IntoMinetallyError for StorageError {
    fn into_minetally(self) -> MinetallyError {
        if self.is_critical() {
            error!(error = %self, severity = ?self.severity(), "critical storage failure");
        }

        match self {
            StorageError::Rusqlite(err) => err.into_minetally(),
            StorageError::InvalidConfig(message) => MinetallyError::Config(message),
            StorageError::SerdeJson(err) => {
                MinetallyError::Internal(format!("payload serialization failed: {err}"))
            }
            other if other.is_retryable() => {
                MinetallyError::Database(format!("{other} (retryable)"))
            }
            other => MinetallyError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_minetally())
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(StorageError::from(value).into_minetally())
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(MinetallyError::Internal(format!("payload serialization failed: {value}")))
    }
}

/// Error mapper for one labelled repository operation.
///
/// Storage failures get the operation prefixed to their message; domain
/// rejections pass through unchanged.
pub(crate) fn db_error<E>(operation: &'static str) -> impl FnOnce(E) -> MinetallyError
where
    E: Into<InfraError>,
{
    move |err| {
        let InfraError(mapped) = err.into();
        warn!(operation, error = %mapped, label = mapped.label(), "database operation failed");
        match mapped {
            MinetallyError::Database(message) => {
                MinetallyError::Database(format!("{operation}: {message}"))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::ffi;

    use super::*;

    fn sqlite_failure(code: i32) -> SqlError {
        SqlError::SqliteFailure(ffi::Error::new(code), Some("boom".into()))
    }

    #[test]
    fn sqlite_busy_maps_to_retryable_database_error() {
        let InfraError(err) = InfraError::from(sqlite_failure(ffi::SQLITE_BUSY));
        assert_eq!(err, MinetallyError::Database("database is busy".into()));
        assert!(err.is_retryable());
    }

    #[test]
    fn unique_violation_maps_to_invalid_input() {
        let InfraError(err) = InfraError::from(sqlite_failure(2067));
        assert!(matches!(err, MinetallyError::InvalidInput(_)));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let InfraError(err) = InfraError::from(SqlError::QueryReturnedNoRows);
        assert!(matches!(err, MinetallyError::NotFound(_)));
    }

    #[test]
    fn storage_timeout_is_retryable() {
        let InfraError(err) = InfraError::from(StorageError::Timeout(5));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("retryable"));
    }

    #[test]
    fn storage_config_error_maps_to_config() {
        let InfraError(err) = InfraError::from(StorageError::InvalidConfig("pool".into()));
        assert_eq!(err, MinetallyError::Config("pool".into()));
    }

    #[test]
    fn db_error_prefixes_operation() {
        let err = db_error("shift.insert")(StorageError::Query("bad".into()));
        assert!(matches!(&err, MinetallyError::Database(m) if m.starts_with("shift.insert: ")));

        let passthrough = db_error("shift.find")(SqlError::QueryReturnedNoRows);
        assert!(matches!(passthrough, MinetallyError::NotFound(_)));
    }
}
