//! Failure-rate circuit breaker over a count-based sliding window
//!
//! The breaker moves between three states:
//!
//! - `CLOSED`: calls flow; each outcome is recorded in a window of the last
//!   `sliding_window_size` calls. Once at least `minimum_calls` outcomes are
//!   buffered and the failure percentage reaches `failure_rate_threshold`,
//!   the breaker opens.
//! - `OPEN`: calls are rejected until `wait_duration_in_open_state` has
//!   elapsed; the first request after that moves the breaker to half-open.
//! - `HALF_OPEN`: up to `permitted_calls_in_half_open` probes are admitted.
//!   When all of them have reported, the probe failure rate decides between
//!   `OPEN` and `CLOSED`.
//!
//! All state lives behind one mutex so every transition is atomic. Each
//! transition bumps an epoch; permits carry the epoch they were issued in and
//! outcomes from an older epoch are ignored.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
use super::events::{EventPublisher, ResilienceEventKind};
use super::outcome::CallOutcome;
use super::sliding_window::{RecordedOutcome, SlidingMetrics};

//==============================================================================
// State and Configuration
//==============================================================================

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, allowing limited requests to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Failure percentage at or above which the circuit opens, in `(0, 100]`
    pub failure_rate_threshold: f64,
    /// Number of most recent outcomes kept in the window
    pub sliding_window_size: usize,
    /// Outcomes required before the failure rate is evaluated
    pub minimum_calls: usize,
    /// Cooldown before an open circuit admits probes
    pub wait_duration_in_open_state: Duration,
    /// Probes admitted while half-open
    pub permitted_calls_in_half_open: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            sliding_window_size: 20,
            minimum_calls: 10,
            wait_duration_in_open_state: Duration::from_secs(10),
            permitted_calls_in_half_open: 3,
        }
    }
}

/// Largest accepted sliding window or half-open probe count
pub const MAX_WINDOW_SIZE: usize = 1_000_000;

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 100.0) {
            return Err(ConfigError::invalid(format!(
                "failure_rate_threshold must be in (0, 100], got {}",
                self.failure_rate_threshold
            )));
        }

        if self.sliding_window_size == 0 {
            return Err(ConfigError::invalid("sliding_window_size must be greater than 0"));
        }

        if self.sliding_window_size > MAX_WINDOW_SIZE {
            return Err(ConfigError::invalid(format!(
                "sliding_window_size cannot exceed {MAX_WINDOW_SIZE}, got {}",
                self.sliding_window_size
            )));
        }

        if self.minimum_calls == 0 {
            return Err(ConfigError::invalid("minimum_calls must be greater than 0"));
        }

        if self.minimum_calls > self.sliding_window_size {
            return Err(ConfigError::invalid(format!(
                "minimum_calls ({}) cannot exceed sliding_window_size ({})",
                self.minimum_calls, self.sliding_window_size
            )));
        }

        if self.permitted_calls_in_half_open == 0 {
            return Err(ConfigError::invalid(
                "permitted_calls_in_half_open must be greater than 0",
            ));
        }

        if self.permitted_calls_in_half_open > MAX_WINDOW_SIZE {
            return Err(ConfigError::invalid(format!(
                "permitted_calls_in_half_open cannot exceed {MAX_WINDOW_SIZE}, got {}",
                self.permitted_calls_in_half_open
            )));
        }

        Ok(())
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn failure_rate_threshold(mut self, percent: f64) -> Self {
        self.config.failure_rate_threshold = percent;
        self
    }

    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.config.sliding_window_size = size;
        self
    }

    pub fn minimum_calls(mut self, calls: usize) -> Self {
        self.config.minimum_calls = calls;
        self
    }

    pub fn wait_duration_in_open_state(mut self, wait: Duration) -> Self {
        self.config.wait_duration_in_open_state = wait;
        self
    }

    pub fn permitted_calls_in_half_open(mut self, calls: usize) -> Self {
        self.config.permitted_calls_in_half_open = calls;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//==============================================================================
// Permits and Snapshots
//==============================================================================

/// Returned by [`CircuitBreaker::try_acquire`] when a call is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circuit breaker '{name}' is {state}, call not permitted")]
pub struct CallNotPermitted {
    pub name: String,
    pub state: CircuitState,
    /// Time left before an open circuit admits probes
    pub retry_after: Option<Duration>,
}

/// Authorization for exactly one call
///
/// Hand it back through [`CircuitBreaker::on_outcome`]. Dropping it without
/// an outcome (cancellation, panic) releases a half-open probe slot and
/// records nothing.
#[must_use = "a permit must be completed with on_outcome or dropped to release it"]
pub struct CircuitPermit {
    epoch: u64,
    probe: bool,
    started_at: Instant,
    completed: bool,
    inner: Arc<Mutex<BreakerState>>,
}

impl CircuitPermit {
    /// `true` if this permit is a half-open probe
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl fmt::Debug for CircuitPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitPermit")
            .field("epoch", &self.epoch)
            .field("probe", &self.probe)
            .field("completed", &self.completed)
            .finish()
    }
}

impl Drop for CircuitPermit {
    fn drop(&mut self) {
        if self.completed || !self.probe {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.epoch == self.epoch && inner.state == CircuitState::HalfOpen {
            inner.probes_admitted = inner.probes_admitted.saturating_sub(1);
            debug!(epoch = self.epoch, "half-open probe released without outcome");
        }
    }
}

/// Point-in-time view of a breaker, used by the admin surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    /// Percentage, `0.0` until the window holds enough outcomes
    pub failure_rate: f64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub not_permitted_calls: u64,
    pub buffered_calls: usize,
}

//==============================================================================
// Circuit Breaker
//==============================================================================

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    epoch: u64,
    metrics: SlidingMetrics,
    opened_at: Option<Instant>,
    probes_admitted: usize,
}

type Transition = (CircuitState, CircuitState);

/// Failure-rate circuit breaker
///
/// Clones share state, so a breaker can be handed to many tasks.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<BreakerState>>,
    events: EventPublisher,
    clock: Arc<C>,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl<C: Clock> Clone for CircuitBreaker<C> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a named circuit breaker using the system clock
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(name, config, SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: C,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let metrics = SlidingMetrics::new(config.sliding_window_size, config.minimum_calls);
        Ok(Self {
            name: Arc::from(name.into()),
            config,
            inner: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                epoch: 0,
                metrics,
                opened_at: None,
                probes_admitted: 0,
            })),
            events: EventPublisher::new(),
            clock: Arc::new(clock),
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

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Event publisher, for subscribing listeners
    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    /// Current state without triggering the open to half-open transition
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Ask for permission to run one call
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open here and
    /// the caller receives the first probe.
    pub fn try_acquire(&self) -> Result<CircuitPermit, CallNotPermitted> {
        let now = self.clock.now();
        let mut transition = None;

        let decision = {
            let mut inner = self.inner.lock();

            if inner.state == CircuitState::Open {
                let opened_at = inner.opened_at.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed >= self.config.wait_duration_in_open_state {
                    transition = Some(self.transition(&mut inner, CircuitState::HalfOpen, now));
                }
            }

            match inner.state {
                CircuitState::Closed => Ok((inner.epoch, false)),
                CircuitState::HalfOpen
                    if inner.probes_admitted < self.config.permitted_calls_in_half_open =>
                {
                    inner.probes_admitted += 1;
                    Ok((inner.epoch, true))
                }
                state => {
                    inner.metrics.record_not_permitted();
                    let retry_after = inner.opened_at.filter(|_| state == CircuitState::Open).map(
                        |opened_at| {
                            self.config
                                .wait_duration_in_open_state
                                .saturating_sub(now.saturating_duration_since(opened_at))
                        },
                    );
                    Err(CallNotPermitted { name: self.name.to_string(), state, retry_after })
                }
            }
        };

        self.publish_transition(transition);

        match decision {
            Ok((epoch, probe)) => Ok(CircuitPermit {
                epoch,
                probe,
                started_at: now,
                completed: false,
                inner: Arc::clone(&self.inner),
            }),
            Err(rejection) => {
                debug!(breaker = %self.name, state = %rejection.state, "call not permitted");
                self.events.publish(&self.name, ResilienceEventKind::CallNotPermitted);
                Err(rejection)
            }
        }
    }

    /// Report the terminal outcome of a permitted call
    ///
    /// `Rejected` outcomes release the permit without touching the window.
    pub fn on_outcome<T, E: fmt::Display>(&self, permit: CircuitPermit, outcome: &CallOutcome<T, E>) {
        match outcome {
            CallOutcome::Success(_) => self.on_success(permit),
            CallOutcome::Failure(error) => self.on_error(permit, error),
            CallOutcome::Rejected(_) => drop(permit),
        }
    }

    /// Record a successful call
    pub fn on_success(&self, permit: CircuitPermit) {
        let (elapsed, transition) = self.record(permit, RecordedOutcome::Success);
        self.events.publish(&self.name, ResilienceEventKind::CallSucceeded { elapsed });
        self.publish_transition(transition);
    }

    /// Record a failed call
    pub fn on_error(&self, permit: CircuitPermit, error: &dyn fmt::Display) {
        let (elapsed, transition) = self.record(permit, RecordedOutcome::Failure);
        self.events.publish(
            &self.name,
            ResilienceEventKind::CallFailed { elapsed, error: error.to_string() },
        );
        self.publish_transition(transition);
    }

    /// Apply `outcome` under the lock. The caller publishes the returned
    /// transition once its own call event is out.
    fn record(
        &self,
        mut permit: CircuitPermit,
        outcome: RecordedOutcome,
    ) -> (Duration, Option<Transition>) {
        permit.completed = true;
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(permit.started_at);

        let transition = {
            let mut inner = self.inner.lock();

            if inner.epoch != permit.epoch {
                debug!(
                    breaker = %self.name,
                    permit_epoch = permit.epoch,
                    current_epoch = inner.epoch,
                    "ignoring outcome from a previous state"
                );
                None
            } else {
                match inner.state {
                    CircuitState::Closed => {
                        inner.metrics.record(outcome);
                        let rate = inner.metrics.failure_rate();
                        if inner.metrics.has_minimum_calls()
                            && rate >= self.config.failure_rate_threshold
                        {
                            warn!(
                                breaker = %self.name,
                                failure_rate = rate,
                                threshold = self.config.failure_rate_threshold,
                                "circuit breaker opening"
                            );
                            Some(self.transition(&mut inner, CircuitState::Open, now))
                        } else {
                            None
                        }
                    }
                    CircuitState::HalfOpen => {
                        inner.metrics.record(outcome);
                        if inner.metrics.buffered() >= self.config.permitted_calls_in_half_open {
                            let rate = inner.metrics.failure_rate();
                            let next = if rate >= self.config.failure_rate_threshold {
                                CircuitState::Open
                            } else {
                                CircuitState::Closed
                            };
                            info!(breaker = %self.name, probe_failure_rate = rate, next = %next, "half-open probes complete");
                            Some(self.transition(&mut inner, next, now))
                        } else {
                            None
                        }
                    }
                    // Every transition bumps the epoch, so a matching permit
                    // can never observe OPEN.
                    CircuitState::Open => None,
                }
            }
        };

        (elapsed, transition)
    }

    /// Administrative reset: back to CLOSED with an empty window
    pub fn force_closed(&self) {
        let now = self.clock.now();
        let transition = {
            let mut inner = self.inner.lock();
            self.transition(&mut inner, CircuitState::Closed, now)
        };

        info!(breaker = %self.name, from = %transition.0, "circuit breaker reset to CLOSED");
        self.events.publish(&self.name, ResilienceEventKind::Reset);
        if transition.0 != transition.1 {
            self.publish_transition(Some(transition));
        }
    }

    /// Consistent view of state and window counters
    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let inner = self.inner.lock();
        CircuitBreakerSnapshot {
            name: self.name.to_string(),
            state: inner.state,
            failure_rate: inner.metrics.failure_rate(),
            successful_calls: inner.metrics.successes(),
            failed_calls: inner.metrics.failures(),
            not_permitted_calls: inner.metrics.not_permitted(),
            buffered_calls: inner.metrics.buffered(),
        }
    }

    /// Execute an operation with circuit breaker protection
    #[instrument(skip(self, operation), fields(breaker = %self.name))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let permit = self
            .try_acquire()
            .map_err(|rejection| ResilienceError::CircuitOpen { name: rejection.name })?;

        match operation().await {
            Ok(value) => {
                self.on_success(permit);
                Ok(value)
            }
            Err(error) => {
                self.on_error(permit, &error);
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Execute a synchronous operation with circuit breaker protection
    pub fn call<F, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let permit = self
            .try_acquire()
            .map_err(|rejection| ResilienceError::CircuitOpen { name: rejection.name })?;

        match operation() {
            Ok(value) => {
                self.on_success(permit);
                Ok(value)
            }
            Err(error) => {
                self.on_error(permit, &error);
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Move to `to`, bump the epoch and swap in the window for the new state.
    ///
    /// OPEN keeps the window that tripped it so snapshots still explain why.
    fn transition(&self, inner: &mut BreakerState, to: CircuitState, now: Instant) -> Transition {
        let from = inner.state;
        inner.state = to;
        inner.epoch += 1;
        inner.probes_admitted = 0;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(now);
            }
            CircuitState::HalfOpen => {
                inner.opened_at = None;
                let probes = self.config.permitted_calls_in_half_open;
                inner.metrics = SlidingMetrics::new(probes, probes);
            }
            CircuitState::Closed => {
                inner.opened_at = None;
                inner.metrics = SlidingMetrics::new(
                    self.config.sliding_window_size,
                    self.config.minimum_calls,
                );
            }
        }

        (from, to)
    }

    fn publish_transition(&self, transition: Option<Transition>) {
        if let Some((from, to)) = transition {
            info!(breaker = %self.name, from = %from, to = %to, "circuit breaker state transition");
            self.events.publish(&self.name, ResilienceEventKind::StateTransition { from, to });
        }
    }
}
