//! Two-tier fallback: cached value first, static default second

use std::fmt;

use bulwark_domain::ResponseSource;
use tracing::{debug, info};

use super::cache::FallbackCache;

/// Produces a value whenever the protected path cannot
///
/// Resolution never fails: a cache miss falls through to the static
/// producer. The resolver never writes to its own cache; callers record
/// successful live values with [`record_success`](Self::record_success).
pub struct FallbackResolver<V> {
    cache: FallbackCache<V>,
    static_value: Box<dyn Fn() -> V + Send + Sync>,
}

impl<V> fmt::Debug for FallbackResolver<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackResolver").field("cache", &self.cache).finish_non_exhaustive()
    }
}

impl<V: Clone> FallbackResolver<V> {
    /// `static_value` is called on every static resolution, so it can stamp
    /// fresh timestamps.
    pub fn new(static_value: impl Fn() -> V + Send + Sync + 'static) -> Self {
        Self { cache: FallbackCache::new(), static_value: Box::new(static_value) }
    }

    pub fn cache(&self) -> &FallbackCache<V> {
        &self.cache
    }

    pub fn get_cached(&self, key: &str) -> Option<V> {
        self.cache.get(key)
    }

    pub fn get_static(&self) -> V {
        (self.static_value)()
    }

    pub fn record_success(&self, key: &str, value: V) {
        debug!(key, "caching successful response for fallback");
        self.cache.put(key, value);
    }

    /// Cached value for `key` if present, otherwise the static default
    pub fn resolve(&self, key: &str) -> (V, ResponseSource) {
        match self.get_cached(key) {
            Some(value) => {
                info!(key, "using cached data for fallback");
                (value, ResponseSource::Cache)
            }
            None => {
                info!(key, "using static fallback response");
                (self.get_static(), ResponseSource::Static)
            }
        }
    }
}
