//! Configuration loader
//!
//! Loads the resilience configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! Environment configuration sets the `[defaults]` section, so every resource
//! shares it. Required:
//! - `BULWARK_FAILURE_RATE_THRESHOLD`: breaker threshold, percent
//! - `BULWARK_SLIDING_WINDOW_SIZE`: breaker window, calls
//! - `BULWARK_MINIMUM_CALLS`: calls before the failure rate counts
//! - `BULWARK_MAX_CONCURRENT_CALLS`: bulkhead slots
//! - `BULWARK_MAX_ATTEMPTS`: attempts including the first
//!
//! Optional:
//! - `BULWARK_LOG_LEVEL`, `BULWARK_LOG_FORMAT` (`pretty`/`json`)
//! - `BULWARK_WAIT_DURATION_OPEN_MS`, `BULWARK_PERMITTED_CALLS_HALF_OPEN`
//! - `BULWARK_MAX_WAIT_DURATION_MS`: bulkhead queueing time
//! - `BULWARK_RETRY_WAIT_MS`, `BULWARK_RETRY_BACKOFF` (`fixed`/`exponential`)
//! - `BULWARK_TIMEOUT_MS`: per-attempt limit, none when unset
//! - `BULWARK_FAILURE_PROBABILITY`: simulated upstream failure rate
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./bulwark.{toml,json}` or `./config.{toml,json}` (current working
//!    directory)
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bulwark_domain::constants::ENV_PREFIX;
use bulwark_domain::{
    BulkheadSettings, BulwarkError, CircuitBreakerSettings, Config, LoggingConfig,
    ResourceDefaults, Result, RetrySettings, TimeLimiterSettings,
};

const CONFIG_FILE_NAMES: [&str; 4] = ["bulwark.toml", "bulwark.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `BulwarkError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
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

/// Like [`load`], but a missing file yields [`Config::default`]
///
/// An environment or file that is present but invalid is still an error.
///
/// # Errors
/// Returns `BulwarkError::Config` if a config source exists but cannot be
/// parsed.
pub fn load_or_default() -> Result<Config> {
    if let Ok(config) = load_from_env() {
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }
    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No config file found, using built-in defaults");
            Ok(Config::default())
        }
    }
}

/// Load configuration from environment variables
///
/// All required environment variables must be present. The named resource
/// sections are left empty; every resource uses the environment defaults.
///
/// # Errors
/// Returns `BulwarkError::Config` if required variables are missing
/// or have invalid values.
pub fn load_from_env() -> Result<Config> {
    let breaker_defaults = CircuitBreakerSettings::default();
    let circuit_breaker = CircuitBreakerSettings {
        failure_rate_threshold: env_parse("FAILURE_RATE_THRESHOLD")?,
        sliding_window_size: env_parse("SLIDING_WINDOW_SIZE")?,
        minimum_calls: env_parse("MINIMUM_CALLS")?,
        wait_duration_in_open_state_ms: env_parse_or(
            "WAIT_DURATION_OPEN_MS",
            breaker_defaults.wait_duration_in_open_state_ms,
        )?,
        permitted_calls_in_half_open: env_parse_or(
            "PERMITTED_CALLS_HALF_OPEN",
            breaker_defaults.permitted_calls_in_half_open,
        )?,
    };

    let bulkhead = BulkheadSettings {
        max_concurrent_calls: env_parse("MAX_CONCURRENT_CALLS")?,
        max_wait_duration_ms: env_parse_or(
            "MAX_WAIT_DURATION_MS",
            BulkheadSettings::default().max_wait_duration_ms,
        )?,
    };

    let retry_defaults = RetrySettings::default();
    let retry = RetrySettings {
        max_attempts: env_parse("MAX_ATTEMPTS")?,
        wait_duration_ms: env_parse_or("RETRY_WAIT_MS", retry_defaults.wait_duration_ms)?,
        backoff: env_parse_or("RETRY_BACKOFF", retry_defaults.backoff)?,
        ..retry_defaults
    };

    let time_limiter = env_optional::<u64>("TIMEOUT_MS")?
        .map(|timeout_ms| TimeLimiterSettings { timeout_ms });

    let logging_defaults = LoggingConfig::default();
    let logging = LoggingConfig {
        level: std::env::var(env_key("LOG_LEVEL")).unwrap_or(logging_defaults.level),
        format: env_parse_or("LOG_FORMAT", logging_defaults.format)?,
    };

    let mut config = Config {
        logging,
        defaults: ResourceDefaults { circuit_breaker, bulkhead, retry, time_limiter },
        circuit_breakers: BTreeMap::new(),
        bulkheads: BTreeMap::new(),
        retries: BTreeMap::new(),
        time_limiters: BTreeMap::new(),
        ..Config::default()
    };
    config.simulation.failure_probability =
        env_parse_or("FAILURE_PROBABILITY", config.simulation.failure_probability)?;

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `BulwarkError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BulwarkError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BulwarkError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BulwarkError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration by file extension (`.json` or `.toml`)
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BulwarkError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BulwarkError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(BulwarkError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the working directory, its parent and grandparent, then the
/// executable's directory, trying each of `bulwark.toml`, `bulwark.json`,
/// `config.toml` and `config.json` in turn.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
        dirs.push(cwd.join("../.."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

/// Required `BULWARK_<suffix>` variable, parsed
fn env_parse<T>(suffix: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let key = env_key(suffix);
    let raw = std::env::var(&key).map_err(|_| {
        BulwarkError::Config(format!("Missing required environment variable: {key}"))
    })?;
    parse_value(&key, &raw)
}

/// Optional `BULWARK_<suffix>` variable; unset means `None`
fn env_optional<T>(suffix: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let key = env_key(suffix);
    match std::env::var(&key) {
        Ok(raw) => parse_value(&key, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn env_parse_or<T>(suffix: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(env_optional(suffix)?.unwrap_or(default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| BulwarkError::Config(format!("Invalid value for {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use bulwark_domain::constants::SLOW_SERVICE;
    use bulwark_domain::{BackoffKind, LogFormat};
    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const REQUIRED: [(&str, &str); 5] = [
        ("BULWARK_FAILURE_RATE_THRESHOLD", "60"),
        ("BULWARK_SLIDING_WINDOW_SIZE", "8"),
        ("BULWARK_MINIMUM_CALLS", "4"),
        ("BULWARK_MAX_CONCURRENT_CALLS", "5"),
        ("BULWARK_MAX_ATTEMPTS", "2"),
    ];

    const OPTIONAL: [&str; 9] = [
        "BULWARK_LOG_LEVEL",
        "BULWARK_LOG_FORMAT",
        "BULWARK_WAIT_DURATION_OPEN_MS",
        "BULWARK_PERMITTED_CALLS_HALF_OPEN",
        "BULWARK_MAX_WAIT_DURATION_MS",
        "BULWARK_RETRY_WAIT_MS",
        "BULWARK_RETRY_BACKOFF",
        "BULWARK_TIMEOUT_MS",
        "BULWARK_FAILURE_PROBABILITY",
    ];

    fn clear_env() {
        for (key, _) in REQUIRED {
            std::env::remove_var(key);
        }
        for key in OPTIONAL {
            std::env::remove_var(key);
        }
    }

    fn set_required() {
        for (key, value) in REQUIRED {
            std::env::set_var(key, value);
        }
    }

    /// Write `contents` to a temp file with the given extension
    fn temp_config(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_load_from_env_required_vars_only() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();

        let result = load_from_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.defaults.circuit_breaker.failure_rate_threshold, 60.0);
        assert_eq!(config.defaults.circuit_breaker.sliding_window_size, 8);
        assert_eq!(config.defaults.circuit_breaker.minimum_calls, 4);
        assert_eq!(config.defaults.bulkhead.max_concurrent_calls, 5);
        assert_eq!(config.defaults.retry.max_attempts, 2);
        assert_eq!(config.defaults.retry.wait_duration_ms, 500);
        assert!(config.defaults.time_limiter.is_none());
        assert_eq!(config.logging, LoggingConfig::default());
        // Environment settings apply to every resource
        assert!(config.bulkheads.is_empty());
        assert_eq!(config.bulkhead(SLOW_SERVICE).max_concurrent_calls, 5);

        clear_env();
    }

    #[test]
    fn test_load_from_env_optional_vars() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();
        std::env::set_var("BULWARK_LOG_LEVEL", "debug");
        std::env::set_var("BULWARK_LOG_FORMAT", "JSON");
        std::env::set_var("BULWARK_WAIT_DURATION_OPEN_MS", "2500");
        std::env::set_var("BULWARK_RETRY_BACKOFF", "exponential");
        std::env::set_var("BULWARK_TIMEOUT_MS", " 750 ");
        std::env::set_var("BULWARK_FAILURE_PROBABILITY", "0.25");

        let config = load_from_env().expect("config from env");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.defaults.circuit_breaker.wait_duration_in_open_state_ms, 2_500);
        assert_eq!(config.defaults.retry.backoff, BackoffKind::Exponential);
        assert_eq!(config.time_limiter("anything").map(|t| t.timeout_ms), Some(750));
        assert_eq!(config.simulation.failure_probability, 0.25);

        clear_env();
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();
        std::env::remove_var("BULWARK_MAX_ATTEMPTS");

        let err = load_from_env().unwrap_err();
        match err {
            BulwarkError::Config(message) => assert!(message.contains("BULWARK_MAX_ATTEMPTS")),
            other => panic!("Should be a Config error, got {other:?}"),
        }

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();
        std::env::set_var("BULWARK_SLIDING_WINDOW_SIZE", "not-a-number");

        let result = load_from_env();
        assert!(matches!(result, Err(BulwarkError::Config(_))), "Should be a Config error");

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_optional_is_error() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        set_required();
        std::env::set_var("BULWARK_LOG_FORMAT", "xml");

        let result = load_from_env();
        assert!(matches!(result, Err(BulwarkError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = temp_config(
            r#"
[logging]
level = "warn"

[bulkheads.inventory]
max_concurrent_calls = 7

[time_limiters.inventory]
timeout_ms = 300
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).expect("Should load config from TOML file");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.bulkhead("inventory").max_concurrent_calls, 7);
        assert_eq!(config.time_limiter("inventory").map(|t| t.timeout_ms), Some(300));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_json() {
        let path = temp_config(
            r#"{
                "retries": {"inventory": {"max_attempts": 5, "backoff": "exponential"}},
                "fallback": {"cache_key": "inventory-last"}
            }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).expect("Should load config from JSON file");
        assert_eq!(config.retry("inventory").max_attempts, 5);
        assert_eq!(config.retry("inventory").backoff, BackoffKind::Exponential);
        assert_eq!(config.fallback.cache_key, "inventory-last");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/bulwark.toml")));
        assert!(matches!(result, Err(BulwarkError::Config(_))), "Should fail when file not found");
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = temp_config(r#"{ "this is": "not valid json" "#, "json");

        let result = load_from_file(Some(path.clone()));
        assert!(result.is_err(), "Should fail with invalid JSON");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_wrong_value_type() {
        let path = temp_config("[bulkheads.inventory]\nmax_concurrent_calls = \"many\"\n", "toml");

        let result = load_from_file(Some(path.clone()));
        assert!(matches!(result, Err(BulwarkError::Config(_))));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", Path::new("bulwark.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_parse_config_empty_toml_is_default() {
        let config = parse_config("", Path::new("bulwark.toml")).expect("empty toml");
        assert_eq!(config, Config::default());
    }
}
