//! Unreliable upstream for demos and soak tests
//!
//! [`SimulatedExternalService`] fails a configurable share of requests and
//! adds a fixed latency to each one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bulwark_core::{ExternalDataSource, SourceError};
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};
use tracing::debug;

const UNAVAILABLE_MESSAGE: &str = "Servicio externo no disponible";

/// How a simulated failure is reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// `Err(SourceError::Transient)`
    #[default]
    Error,
    /// `Ok` with a body flagged `"error": true`
    ErrorBody,
}

#[derive(Debug)]
pub struct SimulatedExternalService {
    name: String,
    failure_probability: f64,
    latency: Duration,
    failure_mode: FailureMode,
    requests: AtomicU64,
    failures: AtomicU64,
}

impl SimulatedExternalService {
    /// `failure_probability` is clamped to `[0, 1]`
    pub fn new(name: impl Into<String>, failure_probability: f64, latency: Duration) -> Self {
        let failure_probability =
            if failure_probability.is_nan() { 0.0 } else { failure_probability.clamp(0.0, 1.0) };
        Self {
            name: name.into(),
            failure_probability,
            latency,
            failure_mode: FailureMode::Error,
            requests: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Never fails
    pub fn healthy(name: impl Into<String>, latency: Duration) -> Self {
        Self::new(name, 0.0, latency)
    }

    /// Always fails
    pub fn unavailable(name: impl Into<String>, latency: Duration) -> Self {
        Self::new(name, 1.0, latency)
    }

    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    pub fn failure_probability(&self) -> f64 {
        self.failure_probability
    }

    pub fn total_requests(&self) -> u64 {
        self.requests.load(Ordering::Acquire)
    }

    pub fn total_failures(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }

    /// Liveness report in the shape of a health endpoint
    pub fn health(&self) -> Value {
        json!({
            "status": "UP",
            "service": self.name,
            "totalRequests": self.total_requests(),
        })
    }

    fn success_payload(id: u64) -> Value {
        json!({
            "id": id,
            "message": "Datos del servicio externo",
            "timestamp": Utc::now().to_rfc3339(),
            "data": {
                "value1": "Información importante",
                "value2": 12345,
                "status": "active",
            },
        })
    }

    fn error_payload() -> Value {
        json!({
            "error": true,
            "message": UNAVAILABLE_MESSAGE,
            "timestamp": Utc::now().to_rfc3339(),
        })
    }
}

#[async_trait]
impl ExternalDataSource for SimulatedExternalService {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Value, SourceError> {
        let id = self.requests.fetch_add(1, Ordering::AcqRel) + 1;
        // Decide before the await; the thread-local rng is not Send
        let fail = rand::thread_rng().gen_bool(self.failure_probability);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if !fail {
            debug!(service = %self.name, request = id, "simulated request succeeded");
            return Ok(Self::success_payload(id));
        }

        self.failures.fetch_add(1, Ordering::AcqRel);
        debug!(service = %self.name, request = id, mode = ?self.failure_mode, "simulated request failed");
        match self.failure_mode {
            FailureMode::Error => Err(SourceError::transient(&self.name, UNAVAILABLE_MESSAGE)),
            FailureMode::ErrorBody => Ok(Self::error_payload()),
        }
    }
}

#[cfg(test)]
mod tests {
    use bulwark_common::ErrorClassification;
    use bulwark_core::fallback::is_error_payload;

    use super::*;

    #[tokio::test]
    async fn test_healthy_service_returns_payload() {
        let service = SimulatedExternalService::healthy("externalService", Duration::ZERO);

        let first = service.fetch().await.expect("healthy");
        let second = service.fetch().await.expect("healthy");

        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert_eq!(first["message"], "Datos del servicio externo");
        assert_eq!(first["data"]["value2"], 12345);
        assert!(!is_error_payload(&first));
        assert_eq!(service.total_requests(), 2);
        assert_eq!(service.total_failures(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_service_fails_transiently() {
        let service = SimulatedExternalService::unavailable("externalService", Duration::ZERO);

        let error = service.fetch().await.unwrap_err();

        assert!(error.is_retryable());
        assert!(error.to_string().contains(UNAVAILABLE_MESSAGE));
        assert_eq!(service.total_failures(), 1);
    }

    #[tokio::test]
    async fn test_error_body_mode_returns_flagged_payload() {
        let service = SimulatedExternalService::unavailable("externalService", Duration::ZERO)
            .with_failure_mode(FailureMode::ErrorBody);

        let body = service.fetch().await.expect("error bodies are Ok");

        assert!(is_error_payload(&body));
        assert_eq!(body["message"], UNAVAILABLE_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let service = SimulatedExternalService::healthy("miServicio", Duration::from_secs(3));
        let started = tokio::time::Instant::now();

        service.fetch().await.expect("healthy");

        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[test]
    fn test_probability_is_clamped() {
        let service = SimulatedExternalService::new("x", 1.7, Duration::ZERO);
        assert_eq!(service.failure_probability(), 1.0);

        let service = SimulatedExternalService::new("x", f64::NAN, Duration::ZERO);
        assert_eq!(service.failure_probability(), 0.0);
    }

    #[test]
    fn test_health_reports_request_count() {
        let service = SimulatedExternalService::healthy("externalService", Duration::ZERO);
        let health = service.health();
        assert_eq!(health["status"], "UP");
        assert_eq!(health["totalRequests"], 0);
    }
}
