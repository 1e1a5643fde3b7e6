//! Administrative surface
//!
//! Read-only status and a force-reset for the resilience instances of a
//! [`ResilienceRegistry`]. An HTTP layer can serialize the returned
//! snapshots directly.

use std::sync::Arc;

use bulwark_common::resilience::{BulkheadMetrics, CircuitBreakerSnapshot};
use bulwark_domain::{BulwarkError, Result};
use tracing::{info, instrument};

use crate::registry::ResilienceRegistry;

/// Status and reset operations by resource name
///
/// Lookups never create instances: asking about a name nothing has used
/// yet is a `NotFound`.
#[derive(Debug, Clone)]
pub struct AdminService {
    registry: Arc<ResilienceRegistry>,
}

impl AdminService {
    pub fn new(registry: Arc<ResilienceRegistry>) -> Self {
        Self { registry }
    }

    /// State, failure rate and call counts of one breaker
    pub fn breaker_status(&self, name: &str) -> Result<CircuitBreakerSnapshot> {
        self.registry
            .find_circuit_breaker(name)
            .map(|breaker| breaker.snapshot())
            .ok_or_else(|| BulwarkError::unknown_resource("circuit breaker", name))
    }

    /// Every breaker, sorted by name
    pub fn all_breaker_statuses(&self) -> Vec<CircuitBreakerSnapshot> {
        self.registry.circuit_breakers().all().iter().map(|breaker| breaker.snapshot()).collect()
    }

    pub fn bulkhead_status(&self, name: &str) -> Result<BulkheadMetrics> {
        self.registry
            .find_bulkhead(name)
            .map(|bulkhead| bulkhead.metrics())
            .ok_or_else(|| BulwarkError::unknown_resource("bulkhead", name))
    }

    pub fn all_bulkhead_statuses(&self) -> Vec<BulkheadMetrics> {
        self.registry.bulkheads().all().iter().map(|bulkhead| bulkhead.metrics()).collect()
    }

    /// Force a breaker to CLOSED with an empty window
    ///
    /// Returns the snapshot taken after the reset.
    #[instrument(skip(self))]
    pub fn reset_breaker(&self, name: &str) -> Result<CircuitBreakerSnapshot> {
        let breaker = self
            .registry
            .find_circuit_breaker(name)
            .ok_or_else(|| BulwarkError::unknown_resource("circuit breaker", name))?;
        let before = breaker.state();
        breaker.force_closed();
        info!(breaker = name, from = %before, "circuit breaker reset");
        Ok(breaker.snapshot())
    }
}
