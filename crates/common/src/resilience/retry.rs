//! Retry with configurable backoff and a pluggable retry predicate
//!
//! Attempts are strictly sequential. The backoff delay is measured from the
//! end of the failed attempt. `max_attempts` counts the first call, so a
//! value of 3 means one call plus at most two retries.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::error::{ConfigError, ConfigResult};
use super::events::{EventPublisher, ResilienceEventKind};
use crate::error::ErrorClassification;

/// Errors that end a retry sequence without a value
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed with a retryable error
    #[error("All retry attempts exhausted after {attempts} tries: {source}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The policy refused to retry this error
    #[error("Operation failed with non-retryable error after {attempts} attempts: {source}")]
    NonRetryable {
        attempts: u32,
        #[source]
        source: E,
    },

    /// Cancellation was observed before or between attempts
    #[error("Retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    /// Attempts made before the sequence ended
    pub fn attempts(&self) -> u32 {
        match self {
            Self::AttemptsExhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// The last operation error, unless the sequence was cancelled
    pub fn into_source(self) -> Option<E> {
        match self {
            Self::AttemptsExhausted { source, .. } | Self::NonRetryable { source, .. } => {
                Some(source)
            }
            Self::Cancelled { .. } => None,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Result plus what it took to get there
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub context: RetryContext,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }

    pub fn attempts(&self) -> u32 {
        self.context.attempts_made
    }

    /// Average backoff between attempts
    pub fn average_delay(&self) -> Duration {
        if self.context.attempts_made <= 1 {
            return Duration::ZERO;
        }
        self.context.total_delay / (self.context.attempts_made - 1)
    }
}

/// Progress of one retry sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryContext {
    /// Attempts started so far, including the first call
    pub attempts_made: u32,
    /// Display form of the most recent failure
    pub last_error: Option<String>,
    /// Total backoff slept
    pub total_delay: Duration,
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// `attempt` is the 1-based number of the attempt that produced `error`.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation with a custom delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay before every retry
    Fixed(Duration),
    /// `initial_delay * multiplier^n`, capped at `max_delay`
    Exponential { initial_delay: Duration, multiplier: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay before retry number `retry` (0 for the first retry)
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Exponential { initial_delay, multiplier, max_delay } => {
                let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
                let delay_ms = initial_delay.as_millis() as f64 * multiplier.powi(exponent);
                let capped = delay_ms.min(max_delay.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }
}

/// Jitter type for adding randomness to retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// No jitter
    None,
    /// Full jitter: 0 to calculated_delay
    Full,
    /// Equal jitter: calculated_delay/2 to calculated_delay
    Equal,
}

impl Jitter {
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = delay.as_millis() as u64;
        match self {
            Jitter::None => delay,
            Jitter::Full => Duration::from_millis(random_up_to(millis)),
            Jitter::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + random_up_to(millis - half))
            }
        }
    }
}

fn random_up_to(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    rand::thread_rng().gen_range(0..=max)
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
    /// Jitter type for randomizing delays
    pub jitter: Jitter,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Fixed(Duration::from_millis(500)),
            jitter: Jitter::None,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be greater than 0"));
        }

        if let BackoffStrategy::Exponential { multiplier, initial_delay, max_delay } = &self.backoff
        {
            if *multiplier < 1.0 {
                return Err(ConfigError::invalid(format!(
                    "exponential multiplier must be at least 1.0, got {multiplier}"
                )));
            }
            if max_delay < initial_delay {
                return Err(ConfigError::invalid("max_delay cannot be shorter than initial_delay"));
            }
        }

        Ok(())
    }

    /// Delay before the retry that follows attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base = self.backoff.calculate_delay(attempt.saturating_sub(1));
        self.jitter.apply(base)
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    pub fn exponential_backoff(
        mut self,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        self.config.backoff = BackoffStrategy::Exponential { initial_delay, multiplier, max_delay };
        self
    }

    pub fn no_jitter(mut self) -> Self {
        self.config.jitter = Jitter::None;
        self
    }

    pub fn full_jitter(mut self) -> Self {
        self.config.jitter = Jitter::Full;
        self
    }

    pub fn equal_jitter(mut self) -> Self {
        self.config.jitter = Jitter::Equal;
        self
    }

    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The main retry executor
pub struct RetryExecutor<P> {
    name: Arc<str>,
    config: RetryConfig,
    policy: P,
    events: EventPublisher,
}

impl<P: fmt::Debug> fmt::Debug for RetryExecutor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish()
    }
}

impl<P> RetryExecutor<P> {
    /// Create a named executor with the given configuration and policy
    pub fn new(name: impl Into<String>, config: RetryConfig, policy: P) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self { name: Arc::from(name.into()), config, policy, events: EventPublisher::new() })
    }

    /// Publish events through `events` instead of a private publisher
    pub fn with_event_publisher(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(None, operation).await.into_result()
    }

    /// Execute an operation and report attempts alongside the result
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(None, operation).await
    }

    /// Like [`execute_with_outcome`](Self::execute_with_outcome), but stops
    /// issuing attempts once `token` is cancelled.
    ///
    /// An attempt already in flight runs to completion; cancellation is
    /// observed before each attempt and while sleeping between attempts.
    pub async fn execute_cancellable<F, Fut, T, E>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(Some(token), operation).await
    }

    #[instrument(skip(self, token, operation), fields(retry = %self.name, max_attempts = self.config.max_attempts))]
    async fn run<F, Fut, T, E>(
        &self,
        token: Option<&CancellationToken>,
        mut operation: F,
    ) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut context = RetryContext::default();

        loop {
            if token.is_some_and(CancellationToken::is_cancelled) {
                debug!(attempts = context.attempts_made, "retry cancelled before next attempt");
                let attempts = context.attempts_made;
                return RetryOutcome { result: Err(RetryError::Cancelled { attempts }), context };
            }

            context.attempts_made += 1;
            let attempt = context.attempts_made;
            debug!("Executing operation (attempt {}/{})", attempt, self.config.max_attempts);

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded after {} retries", attempt - 1);
                    }
                    return RetryOutcome { result: Ok(value), context };
                }
                Err(error) => error,
            };

            let message = error.to_string();
            context.last_error = Some(message.clone());

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt, error = %message, "retry policy declined to retry");
                    return RetryOutcome {
                        result: Err(RetryError::NonRetryable { attempts: attempt, source: error }),
                        context,
                    };
                }
                _ if attempt >= self.config.max_attempts => {
                    warn!(attempts = attempt, error = %message, "all retry attempts exhausted");
                    self.events.publish(
                        &self.name,
                        ResilienceEventKind::RetryExhausted { attempts: attempt, error: message },
                    );
                    return RetryOutcome {
                        result: Err(RetryError::AttemptsExhausted {
                            attempts: attempt,
                            source: error,
                        }),
                        context,
                    };
                }
                RetryDecision::Retry => self.config.delay_after(attempt),
                RetryDecision::RetryAfter(custom) => custom,
            };

            warn!("Operation failed (attempt {}), retrying after {:?}", attempt, delay);
            self.events.publish(
                &self.name,
                ResilienceEventKind::Retry { attempt, wait: delay, error: message },
            );

            match token {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            debug!(attempts = attempt, "retry cancelled during backoff");
                            return RetryOutcome {
                                result: Err(RetryError::Cancelled { attempts: attempt }),
                                context,
                            };
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
            context.total_delay += delay;
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::*;

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Retries errors that classify themselves as transient
    ///
    /// Honors [`ErrorClassification::retry_after`] when the error carries a
    /// delay hint.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RetryOnTransient;

    impl<E: ErrorClassification> RetryPolicy<E> for RetryOnTransient {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if !error.is_retryable() {
                return RetryDecision::Stop;
            }
            match error.retry_after() {
                Some(delay) => RetryDecision::RetryAfter(delay),
                None => RetryDecision::Retry,
            }
        }
    }

    /// Predicate-based retry policy
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> fmt::Debug for PredicateRetry<F> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("PredicateRetry").finish_non_exhaustive()
        }
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E) -> bool,
    {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if (self.predicate)(error) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for retry strategies and policies
    //!
    //! Timing tests run on a paused tokio clock so backoff is observable
    //! without real sleeps.

    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::policies::*;
    use super::*;
    use crate::error::CommonError;
    use crate::testing::{assert_duration_in_range, RecordingListener};

    fn config(max_attempts: u32, delay_ms: u64) -> RetryConfig {
        RetryConfig::builder()
            .max_attempts(max_attempts)
            .fixed_backoff(Duration::from_millis(delay_ms))
            .build()
            .expect("valid config")
    }

    fn simulated() -> CommonError {
        CommonError::transient("miServicio", "Error simulado")
    }

    /// Validates `BackoffStrategy::Exponential` delays and the cap.
    ///
    /// Assertions:
    /// - Delays double from the initial value.
    /// - Large retry numbers are capped at `max_delay`.
    #[test]
    fn test_backoff_strategy_exponential() {
        let strategy = BackoffStrategy::Exponential {
            initial_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(10),
        };

        assert_eq!(strategy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(strategy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(strategy.calculate_delay(3), Duration::from_millis(800));
        assert_eq!(strategy.calculate_delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_strategy_fixed() {
        let strategy = BackoffStrategy::Fixed(Duration::from_secs(1));
        assert_eq!(strategy.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(strategy.calculate_delay(7), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_bounds() {
        let delay = Duration::from_millis(100);
        assert_eq!(Jitter::None.apply(delay), delay);
        for _ in 0..50 {
            assert!(Jitter::Full.apply(delay) <= delay);
            let equal = Jitter::Equal.apply(delay);
            assert_duration_in_range(equal, Duration::from_millis(75), Duration::from_millis(25));
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(RetryConfig::builder().max_attempts(0).build().is_err());
        assert!(RetryConfig::builder()
            .exponential_backoff(Duration::from_millis(100), 0.5, Duration::from_secs(1))
            .build()
            .is_err());
        assert!(RetryConfig::builder()
            .exponential_backoff(Duration::from_secs(2), 2.0, Duration::from_secs(1))
            .build()
            .is_err());
        assert!(RetryConfig::default().validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let executor = RetryExecutor::new("miServicio", config(3, 1000), RetryOnTransient)
            .expect("executor");
        let calls = AtomicU32::new(0);

        let outcome = executor
            .execute_with_outcome(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(simulated())
                } else {
                    Ok("ok")
                }
            })
            .await;

        assert_eq!(outcome.attempts(), 3);
        assert_eq!(outcome.context.total_delay, Duration::from_secs(2));
        assert_eq!(outcome.context.last_error.as_deref(), Some("Backend error from 'miServicio': Error simulado"));
        assert_eq!(outcome.into_result().expect("third attempt succeeds"), "ok");
    }

    /// `max_attempts` bounds the total number of invocations.
    ///
    /// Assertions:
    /// - The operation runs exactly `max_attempts` times.
    /// - The last error is preserved as the source.
    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let executor =
            RetryExecutor::new("miServicio", config(3, 10), AlwaysRetry).expect("executor");
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), CommonError> = executor
            .execute(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(CommonError::transient("miServicio", format!("failure {n}")))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(RetryError::AttemptsExhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("failure 3"));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_propagates_immediately() {
        let executor = RetryExecutor::new("miServicio", config(5, 10), RetryOnTransient)
            .expect("executor");
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), CommonError> = executor
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CommonError::permanent("miServicio", "bad request"))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::NonRetryable { attempts: 1, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_policy_matches_message() {
        let policy = PredicateRetry::new(|e: &CommonError| e.to_string().contains("Error simulado"));
        let executor = RetryExecutor::new("miServicio", config(3, 10), policy).expect("executor");
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), CommonError> = executor
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(simulated())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.expect_err("always fails").attempts(), 3);
    }

    /// The wait starts when the failed attempt ends, not when it started.
    #[tokio::test(start_paused = true)]
    async fn test_backoff_measured_from_end_of_failed_attempt() {
        let executor =
            RetryExecutor::new("miServicio", config(2, 1000), AlwaysRetry).expect("executor");
        let starts = parking_lot::Mutex::new(Vec::new());

        let _: RetryResult<(), CommonError> = executor
            .execute(|| async {
                starts.lock().push(Instant::now());
                tokio::time::sleep(Duration::from_millis(300)).await;
                Err(simulated())
            })
            .await;

        let starts = starts.into_inner();
        assert_eq!(starts.len(), 2);
        assert_eq!(starts[1] - starts[0], Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_decision_overrides_backoff() {
        struct Hinted;
        impl RetryPolicy<CommonError> for Hinted {
            fn should_retry(&self, _error: &CommonError, _attempt: u32) -> RetryDecision {
                RetryDecision::RetryAfter(Duration::from_secs(3))
            }
        }

        let executor =
            RetryExecutor::new("externalService", config(2, 10), Hinted).expect("executor");
        let outcome: RetryOutcome<(), CommonError> =
            executor.execute_with_outcome(|| async { Err(simulated()) }).await;

        assert_eq!(outcome.context.total_delay, Duration::from_secs(3));
        assert_eq!(outcome.average_delay(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff_stops_attempts() {
        let executor =
            RetryExecutor::new("miServicio", config(5, 1000), AlwaysRetry).expect("executor");
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                token.cancel();
            })
        };

        let outcome: RetryOutcome<(), CommonError> = executor
            .execute_cancellable(&token, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(simulated())
            })
            .await;
        canceller.await.expect("canceller task");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(outcome.result, Err(RetryError::Cancelled { attempts: 1 })));
    }

    #[tokio::test]
    async fn test_cancelled_token_prevents_first_attempt() {
        let executor =
            RetryExecutor::new("miServicio", config(3, 10), AlwaysRetry).expect("executor");
        let token = CancellationToken::new();
        token.cancel();

        let outcome: RetryOutcome<(), CommonError> =
            executor.execute_cancellable(&token, || async { Ok(()) }).await;

        assert!(matches!(outcome.result, Err(RetryError::Cancelled { attempts: 0 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_on_retry_and_exhaustion() {
        let executor =
            RetryExecutor::new("miServicio", config(3, 1000), AlwaysRetry).expect("executor");
        let listener = Arc::new(RecordingListener::new());
        executor.events().subscribe(listener.clone());

        let _: RetryResult<(), CommonError> = executor.execute(|| async { Err(simulated()) }).await;

        assert_eq!(listener.labels(), vec!["retry", "retry", "retry_exhausted"]);
        let first = &listener.events()[0];
        assert_eq!(
            first.kind,
            ResilienceEventKind::Retry {
                attempt: 1,
                wait: Duration::from_secs(1),
                error: simulated().to_string(),
            }
        );
    }
}
