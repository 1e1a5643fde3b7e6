//! Resilience patterns for fault tolerance
//!
//! Each primitive is generic over the guarded operation's error type and
//! knows nothing about the others; composition happens in the caller.
//!
//! - **Circuit breaker**: sliding-window failure rate with CLOSED, OPEN and
//!   HALF_OPEN states
//! - **Bulkhead**: bounded concurrency with an optional bounded wait
//! - **Retry**: sequential attempts with fixed or exponential backoff
//! - **Time limiter**: per-attempt deadline
//! - **Registry**: one named instance per primitive
//!
//! Every primitive publishes [`ResilienceEvent`]s through an
//! [`EventPublisher`]. Attach a [`TracingListener`] to log them or a
//! [`ChannelListener`] to consume them asynchronously.

pub mod bulkhead;
pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod events;
pub mod outcome;
pub mod registry;
pub mod retry;
pub mod sliding_window;
pub mod time_limiter;

pub use bulkhead::{
    Bulkhead, BulkheadConfig, BulkheadConfigBuilder, BulkheadFull, BulkheadMetrics, BulkheadPermit,
};
pub use circuit_breaker::{
    CallNotPermitted, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder,
    CircuitBreakerSnapshot, CircuitPermit, CircuitState,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
pub use events::{
    ChannelListener, EventListener, EventPublisher, ResilienceEvent, ResilienceEventKind,
    TracingListener,
};
pub use outcome::{CallOutcome, RejectionReason};
pub use registry::{Registrable, Registry};
pub use retry::{
    policies, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder, RetryContext,
    RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
};
pub use sliding_window::{RecordedOutcome, SlidingMetrics};
pub use time_limiter::{TimeLimiter, TimeLimiterConfig};
