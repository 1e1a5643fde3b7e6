//! Failure of a single attempt inside a guard

use std::time::Duration;

use bulwark_common::resilience::RetryError;
use bulwark_common::{ErrorClassification, ErrorSeverity};
use bulwark_domain::FallbackReason;
use thiserror::Error;

/// Why one invocation of the guarded operation did not produce a value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptFailure<E> {
    /// The operation returned an error
    #[error("{0}")]
    Operation(E),

    /// The attempt ran past the time limit and was dropped
    #[error("attempt timed out after {0:?}")]
    TimedOut(Duration),

    /// The operation returned a value the guard classifies as a failure
    #[error("result classified as failure")]
    FailedResult,
}

impl<E: ErrorClassification> ErrorClassification for AttemptFailure<E> {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Operation(error) => error.is_retryable(),
            Self::TimedOut(_) | Self::FailedResult => true,
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Operation(error) => error.severity(),
            Self::TimedOut(_) | Self::FailedResult => ErrorSeverity::Warning,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Operation(error) => error.retry_after(),
            _ => None,
        }
    }
}

/// Map a terminal retry failure to the reason reported with the fallback
pub(crate) fn fallback_reason<E>(error: &RetryError<AttemptFailure<E>>) -> FallbackReason {
    match error {
        RetryError::Cancelled { .. } => FallbackReason::Cancelled,
        RetryError::AttemptsExhausted { source: AttemptFailure::TimedOut(_), .. }
        | RetryError::NonRetryable { source: AttemptFailure::TimedOut(_), .. } => {
            FallbackReason::Timeout
        }
        RetryError::AttemptsExhausted { .. } => FallbackReason::RetryExhausted,
        RetryError::NonRetryable { .. } => FallbackReason::NonRetryable,
    }
}
