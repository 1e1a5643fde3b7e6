//! Resolution metadata returned by guarded calls

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Which path produced a guarded call's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// The protected operation succeeded
    Live,
    /// Last-known-good value from the fallback cache
    Cache,
    /// Static default payload
    Static,
}

impl_domain_status_conversions!(ResponseSource {
    Live => "live",
    Cache => "cache",
    Static => "static",
});

/// Why a guarded call fell back instead of returning a live value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Rejected by an open (or saturated half-open) circuit breaker
    CircuitOpen,
    /// Rejected by a full bulkhead
    BulkheadFull,
    /// Every retry attempt failed with a transient error
    RetryExhausted,
    /// The operation failed with an error the retry policy refused
    NonRetryable,
    /// The last attempt ran past its time limit
    Timeout,
    /// The caller cancelled the call
    Cancelled,
}

impl_domain_status_conversions!(FallbackReason {
    CircuitOpen => "circuit_open",
    BulkheadFull => "bulkhead_full",
    RetryExhausted => "retry_exhausted",
    NonRetryable => "non_retryable",
    Timeout => "timeout",
    Cancelled => "cancelled",
});

impl FallbackReason {
    /// Whether the call was turned away before the operation ran
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::CircuitOpen | Self::BulkheadFull)
    }
}

/// Value of a guarded call plus how it was obtained
///
/// A guarded call is total: it always yields a `GuardedResponse`, whether
/// the value is live or came from fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardedResponse<V> {
    pub value: V,
    pub source: ResponseSource,
    /// Set whenever `source` is not [`ResponseSource::Live`]
    pub reason: Option<FallbackReason>,
    /// Operation invocations made for this call (0 when rejected at entry)
    pub attempts: u32,
    pub resolved_at: DateTime<Utc>,
}

impl<V> GuardedResponse<V> {
    pub fn live(value: V, attempts: u32) -> Self {
        Self { value, source: ResponseSource::Live, reason: None, attempts, resolved_at: Utc::now() }
    }

    pub fn fallback(value: V, source: ResponseSource, reason: FallbackReason, attempts: u32) -> Self {
        Self { value, source, reason: Some(reason), attempts, resolved_at: Utc::now() }
    }

    pub fn is_live(&self) -> bool {
        self.source == ResponseSource::Live
    }

    pub fn is_fallback(&self) -> bool {
        !self.is_live()
    }

    pub fn into_value(self) -> V {
        self.value
    }

    /// Transform the value, keeping the metadata
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> GuardedResponse<U> {
        GuardedResponse {
            value: f(self.value),
            source: self.source,
            reason: self.reason,
            attempts: self.attempts,
            resolved_at: self.resolved_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_response_has_no_reason() {
        let response = GuardedResponse::live("ok", 2);
        assert!(response.is_live());
        assert_eq!(response.reason, None);
        assert_eq!(response.attempts, 2);
    }

    #[test]
    fn test_fallback_response_keeps_reason() {
        let response =
            GuardedResponse::fallback(1, ResponseSource::Cache, FallbackReason::CircuitOpen, 0);
        assert!(response.is_fallback());
        assert_eq!(response.reason, Some(FallbackReason::CircuitOpen));

        let mapped = response.map(|value| value * 10);
        assert_eq!(mapped.value, 10);
        assert_eq!(mapped.source, ResponseSource::Cache);
    }

    #[test]
    fn test_labels_match_serde_names() {
        for reason in [
            FallbackReason::CircuitOpen,
            FallbackReason::BulkheadFull,
            FallbackReason::RetryExhausted,
            FallbackReason::NonRetryable,
            FallbackReason::Timeout,
            FallbackReason::Cancelled,
        ] {
            let json = serde_json::to_value(reason).expect("serialize");
            assert_eq!(json, serde_json::Value::String(reason.to_string()));
        }
        assert_eq!("STATIC".parse::<ResponseSource>(), Ok(ResponseSource::Static));
    }

    #[test]
    fn test_rejection_reasons() {
        assert!(FallbackReason::BulkheadFull.is_rejection());
        assert!(FallbackReason::CircuitOpen.is_rejection());
        assert!(!FallbackReason::RetryExhausted.is_rejection());
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = GuardedResponse::fallback(
            "cached",
            ResponseSource::Cache,
            FallbackReason::RetryExhausted,
            3,
        );
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["source"], "cache");
        assert_eq!(json["reason"], "retry_exhausted");
        assert!(json.get("resolvedAt").is_some());
    }
}
