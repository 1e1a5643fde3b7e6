//! Bulkhead pattern for limiting concurrent operations
//!
//! At most `max_concurrent_calls` permits are outstanding at any time. A
//! caller that finds the bulkhead full waits up to `max_wait_duration` for a
//! slot (zero means fail immediately) and is then rejected.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

use super::error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
use super::events::{EventPublisher, ResilienceEventKind};

/// Configuration for bulkhead behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkheadConfig {
    /// Maximum number of concurrent calls
    pub max_concurrent_calls: usize,
    /// How long a caller may wait for a free slot
    pub max_wait_duration: Duration,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self { max_concurrent_calls: 25, max_wait_duration: Duration::ZERO }
    }
}

impl BulkheadConfig {
    /// Create a new configuration builder
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent_calls == 0 {
            return Err(ConfigError::invalid("max_concurrent_calls must be greater than 0"));
        }
        if self.max_concurrent_calls > Semaphore::MAX_PERMITS {
            return Err(ConfigError::invalid(format!(
                "max_concurrent_calls cannot exceed {}, got {}",
                Semaphore::MAX_PERMITS,
                self.max_concurrent_calls
            )));
        }
        Ok(())
    }
}

/// Builder for BulkheadConfig
#[derive(Debug, Default)]
pub struct BulkheadConfigBuilder {
    config: BulkheadConfig,
}

impl BulkheadConfigBuilder {
    pub fn new() -> Self {
        Self { config: BulkheadConfig::default() }
    }

    pub fn max_concurrent_calls(mut self, max: usize) -> Self {
        self.config.max_concurrent_calls = max;
        self
    }

    pub fn max_wait_duration(mut self, wait: Duration) -> Self {
        self.config.max_wait_duration = wait;
        self
    }

    pub fn build(self) -> ConfigResult<BulkheadConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Returned when no slot became free in time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Bulkhead '{name}' is full: {capacity} concurrent calls")]
pub struct BulkheadFull {
    pub name: String,
    pub capacity: usize,
}

/// One concurrency slot
///
/// The slot returns to the bulkhead exactly once: on the first
/// [`release`](Self::release) or on drop, whichever comes first.
#[must_use = "dropping the permit releases the slot immediately"]
#[derive(Debug)]
pub struct BulkheadPermit {
    permit: Option<OwnedSemaphorePermit>,
}

impl BulkheadPermit {
    /// Give the slot back. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        self.permit.take().is_some()
    }

    pub fn is_held(&self) -> bool {
        self.permit.is_some()
    }
}

/// Metrics for bulkhead monitoring
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkheadMetrics {
    pub name: String,
    pub max_concurrent_calls: usize,
    pub available_permits: usize,
    /// Calls admitted since creation
    pub permitted_calls: u64,
    /// Calls rejected since creation
    pub rejected_calls: u64,
}

impl BulkheadMetrics {
    pub fn concurrent_calls(&self) -> usize {
        self.max_concurrent_calls.saturating_sub(self.available_permits)
    }

    /// Current utilization (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        self.concurrent_calls() as f64 / self.max_concurrent_calls as f64
    }

    /// Share of calls rejected (0.0 to 1.0)
    pub fn rejection_rate(&self) -> f64 {
        let total = self.permitted_calls + self.rejected_calls;
        if total == 0 {
            return 0.0;
        }
        self.rejected_calls as f64 / total as f64
    }

    pub fn is_at_capacity(&self) -> bool {
        self.available_permits == 0
    }
}

/// Bulkhead for limiting concurrent operations
///
/// # Examples
///
/// ```rust
/// use bulwark_common::resilience::{Bulkhead, BulkheadConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = BulkheadConfig::builder().max_concurrent_calls(3).build()?;
/// let bulkhead = Bulkhead::new("miServicio", config)?;
///
/// let result = bulkhead.execute(|| async { Ok::<_, std::io::Error>("Success") }).await?;
/// assert_eq!(result, "Success");
/// # Ok(())
/// # }
/// ```
pub struct Bulkhead {
    name: Arc<str>,
    config: BulkheadConfig,
    semaphore: Arc<Semaphore>,
    permitted_calls: Arc<AtomicU64>,
    rejected_calls: Arc<AtomicU64>,
    events: EventPublisher,
}

impl Bulkhead {
    /// Create a named bulkhead
    pub fn new(name: impl Into<String>, config: BulkheadConfig) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            name: Arc::from(name.into()),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_calls)),
            permitted_calls: Arc::new(AtomicU64::new(0)),
            rejected_calls: Arc::new(AtomicU64::new(0)),
            events: EventPublisher::new(),
            config,
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

    pub fn config(&self) -> &BulkheadConfig {
        &self.config
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    /// Take a slot without waiting
    pub fn try_acquire(&self) -> Result<BulkheadPermit, BulkheadFull> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(self.admitted(permit)),
            Err(_) => Err(self.rejected()),
        }
    }

    /// Take a slot, waiting up to `max_wait_duration`
    pub async fn acquire(&self) -> Result<BulkheadPermit, BulkheadFull> {
        if self.config.max_wait_duration.is_zero() {
            return self.try_acquire();
        }

        let semaphore = Arc::clone(&self.semaphore);
        match tokio::time::timeout(self.config.max_wait_duration, semaphore.acquire_owned()).await
        {
            Ok(Ok(permit)) => Ok(self.admitted(permit)),
            // Timed out, or the semaphore was closed
            _ => Err(self.rejected()),
        }
    }

    /// Return a slot. Equivalent to dropping the permit.
    pub fn release(&self, mut permit: BulkheadPermit) {
        permit.release();
    }

    /// Execute an operation with bulkhead protection
    #[instrument(skip(self, operation), fields(bulkhead = %self.name))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let _permit = self.acquire().await.map_err(|full| ResilienceError::BulkheadFull {
            name: full.name,
            capacity: full.capacity,
        })?;

        operation().await.map_err(|source| ResilienceError::OperationFailed { source })
    }

    /// Slots currently free
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn metrics(&self) -> BulkheadMetrics {
        BulkheadMetrics {
            name: self.name.to_string(),
            max_concurrent_calls: self.config.max_concurrent_calls,
            available_permits: self.available_permits(),
            permitted_calls: self.permitted_calls.load(Ordering::Acquire),
            rejected_calls: self.rejected_calls.load(Ordering::Acquire),
        }
    }

    fn admitted(&self, permit: OwnedSemaphorePermit) -> BulkheadPermit {
        self.permitted_calls.fetch_add(1, Ordering::Relaxed);
        BulkheadPermit { permit: Some(permit) }
    }

    fn rejected(&self) -> BulkheadFull {
        self.rejected_calls.fetch_add(1, Ordering::Relaxed);
        debug!(bulkhead = %self.name, capacity = self.config.max_concurrent_calls, "bulkhead full");
        self.events.publish(
            &self.name,
            ResilienceEventKind::BulkheadRejected { capacity: self.config.max_concurrent_calls },
        );
        BulkheadFull { name: self.name.to_string(), capacity: self.config.max_concurrent_calls }
    }
}

impl Clone for Bulkhead {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            config: self.config.clone(),
            semaphore: Arc::clone(&self.semaphore),
            permitted_calls: Arc::clone(&self.permitted_calls),
            rejected_calls: Arc::clone(&self.rejected_calls),
            events: self.events.clone(),
        }
    }
}

impl fmt::Debug for Bulkhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bulkhead")
            .field("name", &self.name)
            .field("max_concurrent_calls", &self.config.max_concurrent_calls)
            .field("available_permits", &self.available_permits())
            .finish()
    }
}
