//! Guarded access to an external data source

use std::sync::Arc;

use bulwark_domain::{FallbackConfig, GuardedResponse, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::fallback::{is_error_payload, FallbackResolver};
use crate::guard::Guard;
use crate::ports::ExternalDataSource;
use crate::registry::ResilienceRegistry;

/// Fetches from an [`ExternalDataSource`] through the full resilience chain
///
/// Successful payloads are cached under the configured key; bodies flagged
/// `"error": true` count as failures and are never cached.
#[derive(Clone)]
pub struct GuardedDataService {
    source: Arc<dyn ExternalDataSource>,
    guard: Guard<Value>,
}

impl GuardedDataService {
    /// Build the guard for `source.name()` from `registry`
    ///
    /// # Errors
    /// Returns `BulwarkError::Config` if the resource's settings are invalid.
    pub fn new(
        registry: &ResilienceRegistry,
        source: Arc<dyn ExternalDataSource>,
        fallback: &FallbackConfig,
    ) -> Result<Self> {
        let resolver = Arc::new(FallbackResolver::from_config(fallback));
        let guard = registry
            .guard_builder(source.name(), resolver)?
            .cache_key(fallback.cache_key.clone())
            .classify_failure(is_error_payload)
            .build();
        Ok(Self { source, guard })
    }

    pub fn guard(&self) -> &Guard<Value> {
        &self.guard
    }

    pub async fn fetch(&self) -> GuardedResponse<Value> {
        self.guard.execute(|| self.source.fetch()).await
    }

    pub async fn fetch_with_cancellation(&self, token: &CancellationToken) -> GuardedResponse<Value> {
        self.guard.execute_with_cancellation(token, || self.source.fetch()).await
    }
}

impl std::fmt::Debug for GuardedDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedDataService")
            .field("source", &self.source.name())
            .field("guard", &self.guard)
            .finish()
    }
}
