//! Integration tests for configuration loader
//!
//! Loads files end to end and feeds the result into the resilience registry.

use std::io::Write;
use std::path::PathBuf;

use bulwark_core::ResilienceRegistry;
use bulwark_domain::constants::{EXTERNAL_SERVICE, SLOW_SERVICE};
use bulwark_domain::{BulwarkError, LogFormat};
use bulwark_infra::config;
use tempfile::NamedTempFile;

fn write_config(contents: &str, extension: &str) -> PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_toml_file() {
    let path = write_config(
        r#"
[logging]
level = "debug"
format = "json"

[defaults.circuit_breaker]
sliding_window_size = 6
minimum_calls = 3

[circuit_breakers.externalService]
failure_rate_threshold = 75.0
sliding_window_size = 4
minimum_calls = 4
wait_duration_in_open_state_ms = 2000

[bulkheads.miServicio]
max_concurrent_calls = 2
max_wait_duration_ms = 50

[retries.miServicio]
max_attempts = 4
wait_duration_ms = 100
backoff = "exponential"
multiplier = 3.0
jitter = "equal"

[time_limiters.miServicio]
timeout_ms = 1500
"#,
        "toml",
    );

    let config = config::load_from_file(Some(path.clone())).expect("load TOML config");

    // Verify logging configuration
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);

    // Verify resource configuration
    let breaker = config.circuit_breaker(EXTERNAL_SERVICE);
    assert_eq!(breaker.failure_rate_threshold, 75.0);
    assert_eq!(breaker.wait_duration_in_open_state_ms, 2_000);
    assert_eq!(config.circuit_breaker("inventory").sliding_window_size, 6);
    assert_eq!(config.bulkhead(SLOW_SERVICE).max_wait_duration_ms, 50);
    assert_eq!(config.retry(SLOW_SERVICE).max_attempts, 4);
    assert_eq!(config.time_limiter(SLOW_SERVICE).map(|t| t.timeout_ms), Some(1_500));

    // The registry accepts every section
    let registry = ResilienceRegistry::from_config(&config).expect("valid registry");
    assert_eq!(
        registry.bulkhead(SLOW_SERVICE).expect("bulkhead").config().max_concurrent_calls,
        2
    );
    assert_eq!(
        registry.circuit_breaker("inventory").expect("breaker").config().sliding_window_size,
        6
    );

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_config(
        r#"{
            "fallback": {
                "cache_key": "inventoryLast",
                "static_message": "Inventario no disponible"
            },
            "bulkheads": {
                "inventory": {"max_concurrent_calls": 10}
            }
        }"#,
        "json",
    );

    let config = config::load_from_file(Some(path.clone())).expect("load JSON config");

    assert_eq!(config.fallback.cache_key, "inventoryLast");
    assert_eq!(config.fallback.static_message, "Inventario no disponible");
    assert_eq!(config.bulkhead("inventory").max_concurrent_calls, 10);
    // Maps absent from the file keep the built-in entries
    assert!(config.circuit_breakers.contains_key(EXTERNAL_SERVICE));

    std::fs::remove_file(path).ok();
}

#[test]
fn test_invalid_settings_fail_at_registry_build() {
    let path = write_config(
        r#"
[circuit_breakers.externalService]
failure_rate_threshold = 150.0
"#,
        "toml",
    );

    let config = config::load_from_file(Some(path.clone())).expect("syntactically valid");
    let error = ResilienceRegistry::from_config(&config).unwrap_err();

    match error {
        BulwarkError::Config(message) => {
            assert!(message.contains("circuit_breakers.externalService"), "{message}");
        }
        other => panic!("Expected Config error, got {other:?}"),
    }

    std::fs::remove_file(path).ok();
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let path = write_config("logging:\n  level: debug\n", "yaml");

    let result = config::load_from_file(Some(path.clone()));
    assert!(matches!(result, Err(BulwarkError::Config(_))));

    std::fs::remove_file(path).ok();
}
