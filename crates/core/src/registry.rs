//! Resilience instances built from configuration
//!
//! One [`ResilienceRegistry`] is built at startup and passed by reference
//! to guards and the admin surface. It owns one registry per primitive, all
//! publishing through a shared [`EventPublisher`], so one listener sees
//! every event of the process.

use std::sync::Arc;
use std::time::Duration;

use bulwark_common::resilience::policies::RetryOnTransient;
use bulwark_common::resilience::{
    BackoffStrategy, Bulkhead, BulkheadConfig, CircuitBreaker, CircuitBreakerConfig, ConfigError,
    ConfigResult, EventPublisher, Jitter, Registry, RetryConfig, RetryExecutor, TimeLimiter,
    TimeLimiterConfig,
};
use bulwark_domain::{
    BackoffKind, BulkheadSettings, BulwarkError, CircuitBreakerSettings, Config, JitterKind,
    Result, RetrySettings, TimeLimiterSettings,
};
use tracing::info;

use crate::fallback::FallbackResolver;
use crate::guard::{Guard, GuardBuilder};

pub type RetryRegistry = Registry<RetryExecutor<RetryOnTransient>>;

/// Name-keyed breakers, bulkheads, retries and time limiters
#[derive(Debug)]
pub struct ResilienceRegistry {
    events: EventPublisher,
    circuit_breakers: Registry<CircuitBreaker>,
    bulkheads: Registry<Bulkhead>,
    retries: RetryRegistry,
    time_limiters: Registry<TimeLimiter>,
    /// Unnamed resources get a time limit only when the defaults carry one
    default_time_limit: bool,
}

impl ResilienceRegistry {
    /// Validate every section of `config` and register each named resource
    ///
    /// # Errors
    /// Returns `BulwarkError::Config` naming the first invalid section.
    pub fn from_config(config: &Config) -> Result<Self> {
        let events = EventPublisher::new();
        let defaults = &config.defaults;

        let default_limit = defaults.time_limiter.clone().unwrap_or_default();
        let registry = Self {
            circuit_breakers: Registry::with_events(
                breaker_config(&defaults.circuit_breaker)
                    .map_err(invalid("defaults.circuit_breaker"))?,
                events.clone(),
            ),
            bulkheads: Registry::with_events(
                bulkhead_config(&defaults.bulkhead).map_err(invalid("defaults.bulkhead"))?,
                events.clone(),
            ),
            retries: Registry::with_events(
                retry_config(&defaults.retry).map_err(invalid("defaults.retry"))?,
                events.clone(),
            ),
            time_limiters: Registry::with_events(
                time_limiter_config(&default_limit).map_err(invalid("defaults.time_limiter"))?,
                events.clone(),
            ),
            default_time_limit: defaults.time_limiter.is_some(),
            events,
        };

        for (name, settings) in &config.circuit_breakers {
            let section = format!("circuit_breakers.{name}");
            let breaker_config = breaker_config(settings).map_err(invalid(&section))?;
            registry.circuit_breakers.register(name, &breaker_config).map_err(invalid(&section))?;
        }
        for (name, settings) in &config.bulkheads {
            let section = format!("bulkheads.{name}");
            let bulkhead_config = bulkhead_config(settings).map_err(invalid(&section))?;
            registry.bulkheads.register(name, &bulkhead_config).map_err(invalid(&section))?;
        }
        for (name, settings) in &config.retries {
            let section = format!("retries.{name}");
            let retry_config = retry_config(settings).map_err(invalid(&section))?;
            registry.retries.register(name, &retry_config).map_err(invalid(&section))?;
        }
        for (name, settings) in &config.time_limiters {
            let section = format!("time_limiters.{name}");
            let limiter_config = time_limiter_config(settings).map_err(invalid(&section))?;
            registry.time_limiters.register(name, &limiter_config).map_err(invalid(&section))?;
        }

        info!(resources = ?config.resource_names(), "resilience registry ready");
        Ok(registry)
    }

    /// Shared publisher of every instance in this registry
    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn circuit_breaker(&self, name: &str) -> Result<Arc<CircuitBreaker>> {
        self.circuit_breakers.get_or_create(name).map_err(invalid(name))
    }

    pub fn bulkhead(&self, name: &str) -> Result<Arc<Bulkhead>> {
        self.bulkheads.get_or_create(name).map_err(invalid(name))
    }

    pub fn retry(&self, name: &str) -> Result<Arc<RetryExecutor<RetryOnTransient>>> {
        self.retries.get_or_create(name).map_err(invalid(name))
    }

    /// Named limiter, or one from the defaults if they set a limit
    pub fn time_limiter(&self, name: &str) -> Result<Option<Arc<TimeLimiter>>> {
        if let Some(limiter) = self.time_limiters.get(name) {
            return Ok(Some(limiter));
        }
        if !self.default_time_limit {
            return Ok(None);
        }
        self.time_limiters.get_or_create(name).map(Some).map_err(invalid(name))
    }

    /// Breaker already created for `name`; never creates one
    pub fn find_circuit_breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.circuit_breakers.get(name)
    }

    pub fn find_bulkhead(&self, name: &str) -> Option<Arc<Bulkhead>> {
        self.bulkheads.get(name)
    }

    pub fn circuit_breakers(&self) -> &Registry<CircuitBreaker> {
        &self.circuit_breakers
    }

    pub fn bulkheads(&self) -> &Registry<Bulkhead> {
        &self.bulkheads
    }

    /// Bulkhead, breaker, retry and (if configured) time limit for `name`
    pub fn guard<V: Clone>(
        &self,
        name: &str,
        fallback: Arc<FallbackResolver<V>>,
    ) -> Result<Guard<V>> {
        Ok(self.guard_builder(name, fallback)?.build())
    }

    /// The full chain for `name`, left open for a cache key or classifier
    pub fn guard_builder<V: Clone>(
        &self,
        name: &str,
        fallback: Arc<FallbackResolver<V>>,
    ) -> Result<GuardBuilder<V>> {
        let mut builder = Guard::builder(name, fallback)
            .bulkhead(self.bulkhead(name)?)
            .circuit_breaker(self.circuit_breaker(name)?)
            .retry(self.retry(name)?);
        if let Some(limiter) = self.time_limiter(name)? {
            builder = builder.time_limiter(limiter);
        }
        Ok(builder)
    }
}

fn invalid<'a>(section: &'a str) -> impl Fn(ConfigError) -> BulwarkError + 'a {
    move |error| BulwarkError::Config(format!("{section}: {error}"))
}

//==============================================================================
// Settings conversion
//==============================================================================

pub fn breaker_config(settings: &CircuitBreakerSettings) -> ConfigResult<CircuitBreakerConfig> {
    CircuitBreakerConfig::builder()
        .failure_rate_threshold(settings.failure_rate_threshold)
        .sliding_window_size(settings.sliding_window_size)
        .minimum_calls(settings.minimum_calls)
        .wait_duration_in_open_state(Duration::from_millis(settings.wait_duration_in_open_state_ms))
        .permitted_calls_in_half_open(settings.permitted_calls_in_half_open)
        .build()
}

pub fn bulkhead_config(settings: &BulkheadSettings) -> ConfigResult<BulkheadConfig> {
    BulkheadConfig::builder()
        .max_concurrent_calls(settings.max_concurrent_calls)
        .max_wait_duration(Duration::from_millis(settings.max_wait_duration_ms))
        .build()
}

pub fn retry_config(settings: &RetrySettings) -> ConfigResult<RetryConfig> {
    let wait = Duration::from_millis(settings.wait_duration_ms);
    let config = RetryConfig {
        max_attempts: settings.max_attempts,
        backoff: match settings.backoff {
            BackoffKind::Fixed => BackoffStrategy::Fixed(wait),
            BackoffKind::Exponential => BackoffStrategy::Exponential {
                initial_delay: wait,
                multiplier: settings.multiplier,
                max_delay: Duration::from_millis(settings.max_wait_duration_ms),
            },
        },
        jitter: match settings.jitter {
            JitterKind::None => Jitter::None,
            JitterKind::Full => Jitter::Full,
            JitterKind::Equal => Jitter::Equal,
        },
    };
    config.validate()?;
    Ok(config)
}

pub fn time_limiter_config(settings: &TimeLimiterSettings) -> ConfigResult<TimeLimiterConfig> {
    TimeLimiterConfig::new(Duration::from_millis(settings.timeout_ms))
}

#[cfg(test)]
mod tests {
    use bulwark_common::resilience::CircuitState;
    use bulwark_domain::constants::{EXTERNAL_SERVICE, SLOW_SERVICE};

    use super::*;

    #[test]
    fn test_default_config_builds_demo_resources() {
        let registry = ResilienceRegistry::from_config(&Config::default()).expect("valid config");

        let bulkhead = registry.bulkhead(SLOW_SERVICE).expect("bulkhead");
        assert_eq!(bulkhead.config().max_concurrent_calls, 3);
        assert_eq!(registry.retry(SLOW_SERVICE).expect("retry").config().max_attempts, 3);
        assert!(registry.time_limiter(SLOW_SERVICE).expect("limiter").is_some());
        assert!(registry.time_limiter(EXTERNAL_SERVICE).expect("limiter").is_none());
        assert_eq!(
            registry.circuit_breaker(EXTERNAL_SERVICE).expect("breaker").state(),
            CircuitState::Closed
        );
    }

    #[test]
    fn test_same_name_same_instance() {
        let registry = ResilienceRegistry::from_config(&Config::default()).expect("valid config");

        let first = registry.circuit_breaker("inventory").expect("breaker");
        let second = registry.circuit_breaker("inventory").expect("breaker");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.find_circuit_breaker("payments").is_none());
    }

    #[test]
    fn test_invalid_section_is_named() {
        let mut config = Config::default();
        config.circuit_breakers.insert(
            "payments".into(),
            CircuitBreakerSettings { minimum_calls: 50, sliding_window_size: 10, ..Default::default() },
        );

        let error = ResilienceRegistry::from_config(&config).unwrap_err();
        match error {
            BulwarkError::Config(message) => {
                assert!(message.starts_with("circuit_breakers.payments"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    /// Sizes too large to allocate or to hand to the semaphore are refused
    /// when the registry is built.
    #[test]
    fn test_oversize_settings_are_rejected() {
        let mut config = Config::default();
        config.bulkheads.insert(
            "inventory".into(),
            BulkheadSettings { max_concurrent_calls: usize::MAX, ..Default::default() },
        );
        match ResilienceRegistry::from_config(&config).unwrap_err() {
            BulwarkError::Config(message) => assert!(message.starts_with("bulkheads.inventory")),
            other => panic!("expected config error, got {other:?}"),
        }

        let mut config = Config::default();
        config.circuit_breakers.insert(
            "inventory".into(),
            CircuitBreakerSettings {
                permitted_calls_in_half_open: usize::MAX / 2,
                ..Default::default()
            },
        );
        match ResilienceRegistry::from_config(&config).unwrap_err() {
            BulwarkError::Config(message) => {
                assert!(message.starts_with("circuit_breakers.inventory"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_exponential_retry_settings() {
        let settings = RetrySettings {
            backoff: BackoffKind::Exponential,
            wait_duration_ms: 100,
            multiplier: 2.0,
            max_wait_duration_ms: 1_000,
            jitter: JitterKind::Full,
            ..RetrySettings::default()
        };

        let config = retry_config(&settings).expect("valid settings");
        assert_eq!(
            config.backoff,
            BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(100),
                multiplier: 2.0,
                max_delay: Duration::from_secs(1),
            }
        );
        assert_eq!(config.jitter, Jitter::Full);
    }

    #[test]
    fn test_default_time_limit_applies_to_unnamed_resources() {
        let mut config = Config::default();
        config.defaults.time_limiter = Some(TimeLimiterSettings { timeout_ms: 250 });
        let registry = ResilienceRegistry::from_config(&config).expect("valid config");

        let limiter = registry.time_limiter("inventory").expect("limiter").expect("default limit");
        assert_eq!(limiter.timeout(), Duration::from_millis(250));
    }
}
