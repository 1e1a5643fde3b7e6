//! Configuration management
//!
//! Serde model of a deployment. Every section has defaults, so a file only
//! needs the values it changes:
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "json"
//!
//! [circuit_breakers.externalService]
//! failure_rate_threshold = 50.0
//! sliding_window_size = 4
//! minimum_calls = 4
//!
//! [bulkheads.miServicio]
//! max_concurrent_calls = 3
//! ```
//!
//! Resources without a named entry use the `[defaults]` section.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOG_LEVEL, EXTERNAL_SERVICE, FALLBACK_STATIC_MESSAGE, FALLBACK_STATIC_NOTE,
    LAST_SUCCESSFUL_RESPONSE_KEY, SLOW_SERVICE,
};
use crate::impl_domain_status_conversions;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub fallback: FallbackConfig,
    pub simulation: SimulationConfig,
    pub defaults: ResourceDefaults,
    pub circuit_breakers: BTreeMap<String, CircuitBreakerSettings>,
    pub bulkheads: BTreeMap<String, BulkheadSettings>,
    pub retries: BTreeMap<String, RetrySettings>,
    pub time_limiters: BTreeMap<String, TimeLimiterSettings>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl_domain_status_conversions!(LogFormat {
    Pretty => "pretty",
    Json => "json",
});

/// Fallback resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Cache key successful responses are stored under
    pub cache_key: String,
    pub static_message: String,
    pub static_note: String,
}

/// Simulated upstreams used by the demo binary
///
/// The fast service answers `externalService` calls; the slow one answers
/// `miServicio` calls and is what the bulkhead and time limit are sized for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Probability in `[0, 1]` that a request fails
    pub failure_probability: f64,
    pub latency_ms: u64,
    pub slow_failure_probability: f64,
    pub slow_latency_ms: u64,
    /// Concurrent calls fired per burst
    pub burst_size: usize,
    pub bursts: usize,
}

/// Settings applied to resources that have no named entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceDefaults {
    pub circuit_breaker: CircuitBreakerSettings,
    pub bulkhead: BulkheadSettings,
    pub retry: RetrySettings,
    /// No per-attempt limit unless set
    pub time_limiter: Option<TimeLimiterSettings>,
}

/// Circuit breaker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Percentage in `(0, 100]`
    pub failure_rate_threshold: f64,
    pub sliding_window_size: usize,
    pub minimum_calls: usize,
    pub wait_duration_in_open_state_ms: u64,
    pub permitted_calls_in_half_open: usize,
}

/// Bulkhead settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkheadSettings {
    pub max_concurrent_calls: usize,
    /// 0 rejects immediately when saturated
    pub max_wait_duration_ms: u64,
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts including the first one
    pub max_attempts: u32,
    /// Fixed wait, or the initial wait for exponential backoff
    pub wait_duration_ms: u64,
    pub backoff: BackoffKind,
    pub multiplier: f64,
    pub max_wait_duration_ms: u64,
    pub jitter: JitterKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

impl_domain_status_conversions!(BackoffKind {
    Fixed => "fixed",
    Exponential => "exponential",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterKind {
    #[default]
    None,
    Full,
    Equal,
}

impl_domain_status_conversions!(JitterKind {
    None => "none",
    Full => "full",
    Equal => "equal",
});

/// Per-attempt time limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeLimiterSettings {
    pub timeout_ms: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), format: LogFormat::Pretty }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            cache_key: LAST_SUCCESSFUL_RESPONSE_KEY.to_string(),
            static_message: FALLBACK_STATIC_MESSAGE.to_string(),
            static_note: FALLBACK_STATIC_NOTE.to_string(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            failure_probability: 0.5,
            latency_ms: 100,
            slow_failure_probability: 0.4,
            slow_latency_ms: 3_000,
            burst_size: 6,
            bursts: 4,
        }
    }
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 20,
            minimum_calls: 10,
            wait_duration_in_open_state_ms: 10_000,
            permitted_calls_in_half_open: 3,
        }
    }
}

impl Default for BulkheadSettings {
    fn default() -> Self {
        Self { max_concurrent_calls: 25, max_wait_duration_ms: 0 }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait_duration_ms: 500,
            backoff: BackoffKind::Fixed,
            multiplier: 2.0,
            max_wait_duration_ms: 10_000,
            jitter: JitterKind::None,
        }
    }
}

impl Default for TimeLimiterSettings {
    fn default() -> Self {
        Self { timeout_ms: 1_000 }
    }
}

impl Default for Config {
    /// The two demo resources: `externalService` (breaker with a small
    /// window) and `miServicio` (three-slot bulkhead, three attempts one
    /// second apart, four-second attempt limit).
    fn default() -> Self {
        let mut circuit_breakers = BTreeMap::new();
        circuit_breakers.insert(
            EXTERNAL_SERVICE.to_string(),
            CircuitBreakerSettings {
                sliding_window_size: 10,
                minimum_calls: 5,
                ..CircuitBreakerSettings::default()
            },
        );

        let mut bulkheads = BTreeMap::new();
        bulkheads.insert(
            SLOW_SERVICE.to_string(),
            BulkheadSettings { max_concurrent_calls: 3, max_wait_duration_ms: 0 },
        );

        let mut retries = BTreeMap::new();
        retries.insert(
            SLOW_SERVICE.to_string(),
            RetrySettings { wait_duration_ms: 1_000, ..RetrySettings::default() },
        );

        let mut time_limiters = BTreeMap::new();
        time_limiters.insert(SLOW_SERVICE.to_string(), TimeLimiterSettings { timeout_ms: 4_000 });

        Self {
            logging: LoggingConfig::default(),
            fallback: FallbackConfig::default(),
            simulation: SimulationConfig::default(),
            defaults: ResourceDefaults::default(),
            circuit_breakers,
            bulkheads,
            retries,
            time_limiters,
        }
    }
}

impl Config {
    /// Named breaker settings, or the defaults
    pub fn circuit_breaker(&self, name: &str) -> &CircuitBreakerSettings {
        self.circuit_breakers.get(name).unwrap_or(&self.defaults.circuit_breaker)
    }

    pub fn bulkhead(&self, name: &str) -> &BulkheadSettings {
        self.bulkheads.get(name).unwrap_or(&self.defaults.bulkhead)
    }

    pub fn retry(&self, name: &str) -> &RetrySettings {
        self.retries.get(name).unwrap_or(&self.defaults.retry)
    }

    /// Named limit, else the default limit, else none
    pub fn time_limiter(&self, name: &str) -> Option<&TimeLimiterSettings> {
        self.time_limiters.get(name).or(self.defaults.time_limiter.as_ref())
    }

    /// Every resource name that appears in any section, sorted
    pub fn resource_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .circuit_breakers
            .keys()
            .chain(self.bulkheads.keys())
            .chain(self.retries.keys())
            .chain(self.time_limiters.keys())
            .collect();
        names.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_demo_resources() {
        let config = Config::default();

        assert_eq!(config.bulkhead(SLOW_SERVICE).max_concurrent_calls, 3);
        assert_eq!(config.bulkhead(SLOW_SERVICE).max_wait_duration_ms, 0);
        assert_eq!(config.retry(SLOW_SERVICE).max_attempts, 3);
        assert_eq!(config.retry(SLOW_SERVICE).wait_duration_ms, 1_000);
        assert_eq!(config.circuit_breaker(EXTERNAL_SERVICE).failure_rate_threshold, 50.0);
        assert_eq!(
            config.resource_names(),
            vec![EXTERNAL_SERVICE.to_string(), SLOW_SERVICE.to_string()]
        );
    }

    #[test]
    fn test_unknown_resource_uses_defaults() {
        let config = Config::default();

        assert_eq!(config.circuit_breaker("inventory"), &CircuitBreakerSettings::default());
        assert_eq!(config.bulkhead("inventory").max_concurrent_calls, 25);
        assert!(config.time_limiter("inventory").is_none());
        assert_eq!(config.time_limiter(SLOW_SERVICE).map(|t| t.timeout_ms), Some(4_000));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "logging": {"format": "json"},
                "circuit_breakers": {"payments": {"sliding_window_size": 4, "minimum_calls": 4}}
            }"#,
        )
        .expect("parse");

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        let payments = config.circuit_breaker("payments");
        assert_eq!(payments.sliding_window_size, 4);
        assert_eq!(payments.failure_rate_threshold, 50.0);
        // A map present in the file replaces the built-in entries; absent
        // maps keep them
        assert!(!config.circuit_breakers.contains_key(EXTERNAL_SERVICE));
        assert!(config.bulkheads.contains_key(SLOW_SERVICE));
    }

    #[test]
    fn test_label_enums_parse() {
        assert_eq!("Exponential".parse::<BackoffKind>(), Ok(BackoffKind::Exponential));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("sometimes".parse::<JitterKind>().is_err());
    }
}
