//! Shared building blocks for the Bulwark resilience engine.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors and collections, no async runtime
//! - `runtime`: resilience primitives (circuit breaker, bulkhead, retry,
//!   time limiter, registry) on tokio, with tracing
//! - `test-utils`: scripted operations and recording listeners for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod collections;
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    Bulkhead, BulkheadConfig, CallOutcome, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerSnapshot, CircuitState, Clock, EventListener, EventPublisher, MockClock,
    RejectionReason, ResilienceError, ResilienceEvent, ResilienceEventKind, ResilienceResult,
    RetryConfig, RetryError, RetryExecutor, RetryPolicy, SystemClock, TimeLimiter,
    TimeLimiterConfig,
};
