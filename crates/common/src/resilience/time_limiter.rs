//! Per-attempt time limit

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
use super::events::{EventPublisher, ResilienceEventKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLimiterConfig {
    /// Upper bound for a single attempt
    pub timeout: Duration,
}

impl Default for TimeLimiterConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(1) }
    }
}

impl TimeLimiterConfig {
    pub fn new(timeout: Duration) -> ConfigResult<Self> {
        let config = Self { timeout };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout must be greater than 0"));
        }
        Ok(())
    }
}

/// Cancels an attempt that runs past its deadline
///
/// The attempt's future is dropped on timeout, so any permits it holds are
/// released with it.
#[derive(Debug, Clone)]
pub struct TimeLimiter {
    name: Arc<str>,
    config: TimeLimiterConfig,
    timeouts: Arc<AtomicU64>,
    events: EventPublisher,
}

impl TimeLimiter {
    pub fn new(name: impl Into<String>, config: TimeLimiterConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            name: Arc::from(name.into()),
            config,
            timeouts: Arc::new(AtomicU64::new(0)),
            events: EventPublisher::new(),
        })
    }

    /// Publish events through `events` instead of a private publisher
    pub fn with_event_publisher(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Attempts that hit the limit since creation
    pub fn timeout_count(&self) -> u64 {
        self.timeouts.load(Ordering::Acquire)
    }

    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        match self.limit(operation()).await {
            Ok(result) => result.map_err(|source| ResilienceError::OperationFailed { source }),
            Err(timeout) => Err(ResilienceError::Timeout { timeout }),
        }
    }

    /// Bound `future` without interpreting its output
    ///
    /// Returns the configured timeout as the error when the deadline passes.
    pub async fn limit<Fut: Future>(&self, future: Fut) -> Result<Fut::Output, Duration> {
        match tokio::time::timeout(self.config.timeout, future).await {
            Ok(output) => Ok(output),
            Err(_) => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                debug!(limiter = %self.name, timeout = ?self.config.timeout, "attempt timed out");
                self.events.publish(
                    &self.name,
                    ResilienceEventKind::Timeout { timeout: self.config.timeout },
                );
                Err(self.config.timeout)
            }
        }
    }
}
