//! Terminal outcome of one guarded call

use std::fmt;

/// Why a layer refused to run the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// The circuit breaker is open or has no probe slot left
    CircuitOpen,
    /// The bulkhead is at capacity
    BulkheadFull,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitOpen => write!(f, "circuit open"),
            Self::BulkheadFull => write!(f, "bulkhead full"),
        }
    }
}

/// Exactly one of these ends every call that goes through a guard.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T, E> {
    /// The operation produced a value
    Success(T),
    /// The operation (after retries) failed
    Failure(E),
    /// A layer refused the call before the operation ran
    Rejected(RejectionReason),
}

impl<T, E> CallOutcome<T, E> {
    /// Lift a plain operation result.
    pub fn from_result(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The success value, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Borrowing view, so an outcome can be recorded before it is consumed.
    pub fn as_ref(&self) -> CallOutcome<&T, &E> {
        match self {
            Self::Success(value) => CallOutcome::Success(value),
            Self::Failure(error) => CallOutcome::Failure(error),
            Self::Rejected(reason) => CallOutcome::Rejected(*reason),
        }
    }
}
