//! Decorator composer
//!
//! A [`Guard`] wraps an operation in, from the outside in:
//!
//! ```text
//! Bulkhead -> CircuitBreaker -> Retry -> TimeLimiter -> operation
//!                                                  \-> FallbackResolver
//! ```
//!
//! Each layer is optional. A call always ends in a [`GuardedResponse`]:
//! either the live value, or a fallback value with the reason the protected
//! path could not produce one. Rejections at entry skip the operation and
//! the retry loop entirely.
//!
//! Permits are RAII values. Dropping the call future at any await point
//! releases the bulkhead slot and any half-open probe slot exactly once.

mod attempt;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use bulwark_common::resilience::policies::RetryOnTransient;
use bulwark_common::resilience::{
    Bulkhead, BulkheadFull, BulkheadPermit, CircuitBreaker, Clock, RejectionReason, RetryError,
    RetryExecutor, SystemClock, TimeLimiter,
};
use bulwark_common::ErrorClassification;
use bulwark_domain::{FallbackReason, GuardedResponse, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

pub use attempt::AttemptFailure;

use crate::fallback::FallbackResolver;
use crate::registry::ResilienceRegistry;

type FailureClassifier<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Composed resilience chain for one logical resource
pub struct Guard<V, C: Clock = SystemClock> {
    name: Arc<str>,
    bulkhead: Option<Arc<Bulkhead>>,
    breaker: Option<Arc<CircuitBreaker<C>>>,
    retry: Option<Arc<RetryExecutor<RetryOnTransient>>>,
    limiter: Option<Arc<TimeLimiter>>,
    fallback: Arc<FallbackResolver<V>>,
    cache_key: String,
    classifier: Option<FailureClassifier<V>>,
}

impl<V, C: Clock> Clone for Guard<V, C> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            bulkhead: self.bulkhead.clone(),
            breaker: self.breaker.clone(),
            retry: self.retry.clone(),
            limiter: self.limiter.clone(),
            fallback: Arc::clone(&self.fallback),
            cache_key: self.cache_key.clone(),
            classifier: self.classifier.clone(),
        }
    }
}

impl<V, C: Clock> fmt::Debug for Guard<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guard")
            .field("name", &self.name)
            .field("bulkhead", &self.bulkhead.as_ref().map(|b| b.name().to_string()))
            .field("circuit_breaker", &self.breaker.as_ref().map(|b| b.name().to_string()))
            .field("retry", &self.retry.as_ref().map(|r| r.config().max_attempts))
            .field("time_limit", &self.limiter.as_ref().map(|l| l.timeout()))
            .field("cache_key", &self.cache_key)
            .finish()
    }
}

impl<V: Clone> Guard<V> {
    /// Start a guard with no layers; the cache key defaults to `name`
    pub fn builder(name: impl Into<String>, fallback: Arc<FallbackResolver<V>>) -> GuardBuilder<V> {
        let name = name.into();
        GuardBuilder {
            guard: Guard {
                cache_key: name.clone(),
                name: Arc::from(name),
                bulkhead: None,
                breaker: None,
                retry: None,
                limiter: None,
                fallback,
                classifier: None,
            },
        }
    }
}

impl<V, C> Guard<V, C>
where
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn fallback(&self) -> &FallbackResolver<V> {
        &self.fallback
    }

    pub fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker<C>>> {
        self.breaker.as_ref()
    }

    pub fn bulkhead(&self) -> Option<&Arc<Bulkhead>> {
        self.bulkhead.as_ref()
    }

    /// Run `operation` through every layer. Never fails.
    pub async fn execute<F, Fut, E>(&self, operation: F) -> GuardedResponse<V>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: ErrorClassification + fmt::Display,
    {
        self.run(None, operation).await
    }

    /// Like [`execute`](Self::execute), but stops issuing attempts once
    /// `token` is cancelled and resolves the call through fallback.
    pub async fn execute_with_cancellation<F, Fut, E>(
        &self,
        token: &CancellationToken,
        operation: F,
    ) -> GuardedResponse<V>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: ErrorClassification + fmt::Display,
    {
        self.run(Some(token), operation).await
    }

    #[instrument(skip_all, fields(guard = %self.name))]
    async fn run<F, Fut, E>(
        &self,
        token: Option<&CancellationToken>,
        mut operation: F,
    ) -> GuardedResponse<V>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        E: ErrorClassification + fmt::Display,
    {
        if token.is_some_and(CancellationToken::is_cancelled) {
            debug!("call cancelled before entry");
            return self.fall_back(FallbackReason::Cancelled, 0);
        }

        let bulkhead_permit = match &self.bulkhead {
            Some(bulkhead) => match self.wait_for_slot(bulkhead, token).await {
                None => {
                    debug!("call cancelled while waiting for a bulkhead slot");
                    return self.fall_back(FallbackReason::Cancelled, 0);
                }
                Some(Ok(permit)) => Some(permit),
                Some(Err(full)) => {
                    warn!(capacity = full.capacity, "bulkhead full, call rejected");
                    return self.fall_back(rejection_reason(RejectionReason::BulkheadFull), 0);
                }
            },
            None => None,
        };

        let circuit_permit = match &self.breaker {
            Some(breaker) => match breaker.try_acquire() {
                Ok(permit) => Some(permit),
                Err(denied) => {
                    warn!(state = %denied.state, retry_after = ?denied.retry_after, "circuit breaker rejected call");
                    self.release_bulkhead(bulkhead_permit);
                    return self.fall_back(rejection_reason(RejectionReason::CircuitOpen), 0);
                }
            },
            None => None,
        };

        let (result, attempts) = match &self.retry {
            Some(retry) => {
                let attempt = || self.attempt(operation());
                let outcome = match token {
                    Some(token) => retry.execute_cancellable(token, attempt).await,
                    None => retry.execute_with_outcome(attempt).await,
                };
                let attempts = outcome.attempts();
                (outcome.result, attempts)
            }
            None => (self.single_attempt(operation()).await, 1),
        };

        let reason = result.as_ref().err().map(attempt::fallback_reason);

        if let (Some(breaker), Some(permit)) = (&self.breaker, circuit_permit) {
            match &result {
                Ok(_) => breaker.on_success(permit),
                // Cancellation says nothing about the dependency's health
                Err(_) if reason == Some(FallbackReason::Cancelled) => drop(permit),
                Err(error) => breaker.on_error(permit, error),
            }
        }
        self.release_bulkhead(bulkhead_permit);

        match result {
            Ok(value) => {
                self.fallback.record_success(&self.cache_key, value.clone());
                GuardedResponse::live(value, attempts)
            }
            Err(error) => {
                let reason = reason.unwrap_or(FallbackReason::RetryExhausted);
                warn!(%reason, attempts, error = %error, "guarded call failed, resolving fallback");
                self.fall_back(reason, attempts)
            }
        }
    }

    /// Wait for a bulkhead slot. `None` means the token fired first.
    async fn wait_for_slot(
        &self,
        bulkhead: &Bulkhead,
        token: Option<&CancellationToken>,
    ) -> Option<std::result::Result<BulkheadPermit, BulkheadFull>> {
        match token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                acquired = bulkhead.acquire() => Some(acquired),
            },
            None => Some(bulkhead.acquire().await),
        }
    }

    /// One attempt with no retry layer. Counts as a budget of one.
    async fn single_attempt<Fut, E>(
        &self,
        future: Fut,
    ) -> std::result::Result<V, RetryError<AttemptFailure<E>>>
    where
        Fut: Future<Output = std::result::Result<V, E>>,
        E: ErrorClassification,
    {
        match self.attempt(future).await {
            Ok(value) => Ok(value),
            Err(source) if source.is_retryable() => {
                Err(RetryError::AttemptsExhausted { attempts: 1, source })
            }
            Err(source) => Err(RetryError::NonRetryable { attempts: 1, source }),
        }
    }

    async fn attempt<Fut, E>(&self, future: Fut) -> std::result::Result<V, AttemptFailure<E>>
    where
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        let result = match &self.limiter {
            Some(limiter) => limiter.limit(future).await.map_err(AttemptFailure::TimedOut)?,
            None => future.await,
        };

        match result {
            Ok(value) if self.is_failed_result(&value) => {
                debug!("result classified as failure");
                Err(AttemptFailure::FailedResult)
            }
            Ok(value) => Ok(value),
            Err(error) => Err(AttemptFailure::Operation(error)),
        }
    }

    fn is_failed_result(&self, value: &V) -> bool {
        self.classifier.as_ref().is_some_and(|classify| classify(value))
    }

    fn release_bulkhead(&self, permit: Option<BulkheadPermit>) {
        if let (Some(bulkhead), Some(permit)) = (&self.bulkhead, permit) {
            bulkhead.release(permit);
        }
    }

    fn fall_back(&self, reason: FallbackReason, attempts: u32) -> GuardedResponse<V> {
        let (value, source) = self.fallback.resolve(&self.cache_key);
        debug!(%reason, %source, "fallback resolved");
        GuardedResponse::fallback(value, source, reason, attempts)
    }
}

fn rejection_reason(rejection: RejectionReason) -> FallbackReason {
    match rejection {
        RejectionReason::CircuitOpen => FallbackReason::CircuitOpen,
        RejectionReason::BulkheadFull => FallbackReason::BulkheadFull,
    }
}

/// Fluent construction of a [`Guard`]
pub struct GuardBuilder<V, C: Clock = SystemClock> {
    guard: Guard<V, C>,
}

impl<V, C: Clock> GuardBuilder<V, C> {
    pub fn bulkhead(mut self, bulkhead: Arc<Bulkhead>) -> Self {
        self.guard.bulkhead = Some(bulkhead);
        self
    }

    /// Attach a breaker. Its clock type becomes the guard's.
    pub fn circuit_breaker<C2: Clock>(self, breaker: Arc<CircuitBreaker<C2>>) -> GuardBuilder<V, C2> {
        let Guard { name, bulkhead, retry, limiter, fallback, cache_key, classifier, .. } =
            self.guard;
        GuardBuilder {
            guard: Guard {
                name,
                bulkhead,
                breaker: Some(breaker),
                retry,
                limiter,
                fallback,
                cache_key,
                classifier,
            },
        }
    }

    pub fn retry(mut self, retry: Arc<RetryExecutor<RetryOnTransient>>) -> Self {
        self.guard.retry = Some(retry);
        self
    }

    /// Limit every attempt, inside the retry loop
    pub fn time_limiter(mut self, limiter: Arc<TimeLimiter>) -> Self {
        self.guard.limiter = Some(limiter);
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.guard.cache_key = key.into();
        self
    }

    /// Treat values for which `classify` returns `true` as transient
    /// failures. They are retried, recorded as failures by the breaker and
    /// never cached.
    pub fn classify_failure(mut self, classify: impl Fn(&V) -> bool + Send + Sync + 'static) -> Self {
        self.guard.classifier = Some(Arc::new(classify));
        self
    }

    pub fn build(self) -> Guard<V, C> {
        self.guard
    }
}

/// Build the full chain for `name` from `registry` and run `operation`
///
/// Convenience for one-off calls. Long-lived callers should build the
/// guard once with [`ResilienceRegistry::guard`] and reuse it.
///
/// # Errors
/// Returns `BulwarkError::Config` if the resource's settings are invalid.
pub async fn guarded_call<V, F, Fut, E>(
    registry: &ResilienceRegistry,
    name: &str,
    fallback: Arc<FallbackResolver<V>>,
    operation: F,
) -> Result<GuardedResponse<V>>
where
    V: Clone + Send + Sync + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<V, E>>,
    E: ErrorClassification + fmt::Display,
{
    let guard = registry.guard(name, fallback)?;
    Ok(guard.execute(operation).await)
}
