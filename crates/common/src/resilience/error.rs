//! Error types shared by the resilience primitives

use std::time::Duration;

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Validation failure of a primitive's configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("'{name}' is already registered")]
    Duplicate { name: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced by a guarded operation
///
/// Generic over the operation's own error `E` so the original failure is
/// preserved as the `source`.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Circuit breaker is open (or out of half-open probes)
    #[error("Circuit breaker '{name}' is open, rejecting calls")]
    CircuitOpen { name: String },

    /// Bulkhead capacity exceeded
    #[error("Bulkhead '{name}' is full: {capacity} concurrent calls")]
    BulkheadFull { name: String, capacity: usize },

    /// Attempt exceeded its time limit
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The underlying operation failed
    #[error("Operation failed")]
    OperationFailed {
        #[source]
        source: E,
    },

    /// Every allowed attempt failed
    #[error("Retry exhausted after {attempts} attempts")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The caller cancelled the call
    #[error("Call cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    /// Configuration error
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// `true` for errors produced without invoking the operation.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. } | Self::BulkheadFull { .. })
    }

    /// The operation's own error, if this wraps one.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::OperationFailed { source } | Self::RetryExhausted { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

impl<E> ErrorClassification for ResilienceError<E>
where
    E: std::error::Error + ErrorClassification + Send + Sync + 'static,
{
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::OperationFailed { source } => source.is_retryable(),
            _ => false,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CircuitOpen { .. } | Self::BulkheadFull { .. } | Self::Timeout { .. } => {
                ErrorSeverity::Warning
            }
            Self::OperationFailed { source } | Self::RetryExhausted { source, .. } => {
                source.severity()
            }
            Self::Cancelled { .. } => ErrorSeverity::Info,
            Self::InvalidConfiguration { .. } => ErrorSeverity::Critical,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::OperationFailed { source } => source.retry_after(),
            _ => None,
        }
    }
}
