//! Port interfaces for the protected dependency
//!
//! These traits define the boundary between the guard and whatever actually
//! talks to the unreliable service.

use std::time::Duration;

use async_trait::async_trait;
use bulwark_common::{ErrorClassification, ErrorSeverity};
use serde_json::Value;
use thiserror::Error;

/// Failure reported by an [`ExternalDataSource`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Worth retrying: the service is flaky, overloaded or slow
    #[error("{service} unavailable: {message}")]
    Transient { service: String, message: String },

    /// Retrying cannot help: the request itself is wrong
    #[error("{service} rejected the request: {message}")]
    Permanent { service: String, message: String },

    /// Transient failure with a server-provided back-off hint
    #[error("{service} throttled, retry after {retry_after:?}")]
    Throttled { service: String, retry_after: Duration },
}

impl SourceError {
    pub fn transient(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient { service: service.into(), message: message.into() }
    }

    pub fn permanent(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent { service: service.into(), message: message.into() }
    }
}

impl ErrorClassification for SourceError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Transient { .. } | Self::Throttled { .. } => ErrorSeverity::Warning,
            Self::Permanent { .. } => ErrorSeverity::Error,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Trait for the unreliable service a guard protects
///
/// Payloads are JSON documents. An upstream that answers with an error body
/// (`{"error": true, ...}`) instead of failing outright is caught by the
/// guard's result classifier, not here.
#[async_trait]
pub trait ExternalDataSource: Send + Sync {
    /// Logical resource name, used to look up resilience settings
    fn name(&self) -> &str;

    /// Fetch the current payload
    async fn fetch(&self) -> Result<Value, SourceError>;
}
