//! Tracing initialisation and structured outcome logging
//!
//! Services emit `tracing` events; this module installs the subscriber that
//! renders them and offers a helper that logs the outcome of one operation
//! with stable fields (`operation`, `duration_ms`, `error_label`).

use std::time::{Duration, Instant};

use minetally_domain::{MinetallyError, Result};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of the global subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

minetally_domain::impl_domain_status_conversions!(LogFormat {
    Plain => "plain",
    Json => "json",
});

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `directives` when set; unparsable directives fall
/// back to `info`.
///
/// # Errors
/// Returns `MinetallyError::Config` if a global subscriber is already set.
pub fn init_tracing(directives: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Plain => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(true)).try_init(),
    };

    installed.map_err(|e| MinetallyError::Config(format!("tracing already initialised: {e}")))
}

/// Log the outcome of one service operation with structured fields.
///
/// Callers must not put sensitive values in `operation`.
#[inline]
pub fn log_operation_outcome<T>(operation: &str, elapsed: Duration, result: &Result<T>) {
    let duration_ms = elapsed.as_millis() as u64;

    match result {
        Ok(_) => info!(operation, duration_ms, "operation_success"),
        Err(err) => warn!(
            operation,
            duration_ms,
            error_label = err.label(),
            retryable = err.is_retryable(),
            error = %err,
            "operation_failure"
        ),
    }
}

/// Run `f`, log its outcome through [`log_operation_outcome`] and return its
/// result unchanged.
pub fn timed<T>(operation: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let started = Instant::now();
    let result = f();
    log_operation_outcome(operation, started.elapsed(), &result);
    result
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured(f: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = capture.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn success_is_logged_at_info() {
        let output = captured(|| {
            let result: Result<()> = Ok(());
            log_operation_outcome("reconciliation.lock", Duration::from_millis(12), &result);
        });

        assert!(output.contains("INFO"));
        assert!(output.contains("operation=\"reconciliation.lock\""));
        assert!(output.contains("duration_ms=12"));
        assert!(output.contains("operation_success"));
    }

    #[test]
    fn failure_carries_stable_label() {
        let output = captured(|| {
            let result = timed("validation.add_activity", || -> Result<()> {
                Err(MinetallyError::ImmutableShift("site-1/2025-03-04/D/op".into()))
            });
            assert!(result.is_err());
        });

        assert!(output.contains("WARN"));
        assert!(output.contains("error_label=\"immutable_shift\""));
        assert!(output.contains("retryable=false"));
    }

    #[test]
    fn log_format_parses() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::default().to_string(), "plain");
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
