//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `MINETALLY_DB_PATH` is not set, falls back to loading from file
//! 3. Searches standard locations for a config file
//! 4. Supports JSON and TOML formats; omitted sections take their defaults
//!
//! ## Environment Variables
//! - `MINETALLY_DB_PATH`: Database file path (required)
//! - `MINETALLY_DB_POOL_SIZE`: Connection pool size
//! - `MINETALLY_SOLVER_LAMBDA`: Solver regularization weight
//! - `MINETALLY_SOLVER_MAX_ITERATIONS`: Solver iteration cap
//!
//! ## File Locations
//! The loader checks the following paths (in order):
//! 1. `./minetally.{json,toml}` then `./config.{json,toml}` (current working
//!    directory)
//! 2. The same names in the parent and grandparent directories
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use minetally_domain::{Config, DatabaseConfig, MinetallyError, Result, SolverConfig};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["minetally.json", "minetally.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If that fails, falls
/// back to loading from a config file.
///
/// # Errors
/// Returns `MinetallyError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - The resulting configuration does not validate
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `MINETALLY_DB_PATH` is required; every other setting falls back to
/// its default.
///
/// # Errors
/// Returns `MinetallyError::Config` if the path is missing or a variable
/// holds an unparsable value.
pub fn load_from_env() -> Result<Config> {
    let path = env_var("MINETALLY_DB_PATH")?;
    let defaults = Config::default();

    let config = Config {
        database: DatabaseConfig {
            path,
            pool_size: env_parse("MINETALLY_DB_POOL_SIZE")?
                .unwrap_or(defaults.database.pool_size),
        },
        solver: SolverConfig {
            regularization: env_parse("MINETALLY_SOLVER_LAMBDA")?
                .unwrap_or(defaults.solver.regularization),
            max_iterations: env_parse("MINETALLY_SOLVER_MAX_ITERATIONS")?
                .unwrap_or(defaults.solver.max_iterations),
            ..defaults.solver
        },
        reconciliation: defaults.reconciliation,
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, the standard locations are searched.
///
/// # Errors
/// Returns `MinetallyError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The configuration does not validate
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MinetallyError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => find_config_path().ok_or_else(|| {
            MinetallyError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MinetallyError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content, detecting the format from the
/// file extension.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MinetallyError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MinetallyError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(MinetallyError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing configuration file among the standard locations
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn find_config_path() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        MinetallyError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse an optional environment variable; unset is `None`, unparsable is an
/// error.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| MinetallyError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const VARS: [&str; 4] = [
        "MINETALLY_DB_PATH",
        "MINETALLY_DB_POOL_SIZE",
        "MINETALLY_SOLVER_LAMBDA",
        "MINETALLY_SOLVER_MAX_ITERATIONS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn temp_config(contents: &str, extension: &str) -> (NamedTempFile, PathBuf) {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        (temp_file, path)
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("MINETALLY_DB_PATH", "/tmp/minetally-test.db");
        std::env::set_var("MINETALLY_DB_POOL_SIZE", "5");
        std::env::set_var("MINETALLY_SOLVER_LAMBDA", "0.25");
        std::env::set_var("MINETALLY_SOLVER_MAX_ITERATIONS", "1200");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config loads from env vars");
        assert_eq!(config.database.path, "/tmp/minetally-test.db");
        assert_eq!(config.database.pool_size, 5);
        assert_eq!(config.solver.regularization, 0.25);
        assert_eq!(config.solver.max_iterations, 1200);
        assert_eq!(config.solver.tolerance, Config::default().solver.tolerance);
    }

    #[test]
    fn test_load_from_env_defaults_optional_vars() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("MINETALLY_DB_PATH", "site.db");

        let result = load_from_env();
        clear_env();

        let config = result.expect("config loads");
        assert_eq!(config.database.pool_size, DatabaseConfig::default().pool_size);
        assert_eq!(config.solver, Config::default().solver);
    }

    #[test]
    fn test_load_from_env_missing_path() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, MinetallyError::Config(_)), "Should be a Config error");
        assert!(err.to_string().contains("MINETALLY_DB_PATH"));
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("MINETALLY_DB_PATH", "/tmp/test.db");
        std::env::set_var("MINETALLY_DB_POOL_SIZE", "not-a-number");

        let result = load_from_env();
        clear_env();

        assert!(matches!(result, Err(MinetallyError::Config(_))));
    }

    #[test]
    fn test_load_from_env_rejects_negative_lambda() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("MINETALLY_DB_PATH", "/tmp/test.db");
        std::env::set_var("MINETALLY_SOLVER_LAMBDA", "-1");

        let result = load_from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("regularization"));
    }

    #[test]
    fn test_load_from_file_json() {
        let (_file, path) = temp_config(
            r#"{ "database": { "path": "test.db", "pool_size": 4 } }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).expect("loads JSON config");
        assert_eq!(config.database.path, "test.db");
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.reconciliation, Config::default().reconciliation);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let (_file, path) = temp_config(
            "[database]\npath = \"toml.db\"\n\n[solver]\nregularization = 0.1\n",
            "toml",
        );

        let config = load_from_file(Some(path.clone())).expect("loads TOML config");
        assert_eq!(config.database.path, "toml.db");
        assert_eq!(config.solver.regularization, 0.1);
        assert_eq!(config.solver.max_iterations, 600);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let err = load_from_file(Some(PathBuf::from("/nonexistent/minetally.toml"))).unwrap_err();
        assert!(matches!(err, MinetallyError::Config(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = parse_config("", Path::new("config.yaml")).unwrap_err();
        assert!(err.to_string().contains("Unsupported config format"));
    }

    #[test]
    fn test_invalid_file_config_is_rejected() {
        let (_file, path) =
            temp_config(r#"{ "database": { "path": "x.db", "pool_size": 0 } }"#, "json");

        let err = load_from_file(Some(path.clone())).unwrap_err();
        assert!(err.to_string().contains("pool_size"));

        std::fs::remove_file(path).ok();
    }
}
