//! Fallback resolution for guarded calls
//!
//! A [`FallbackResolver`] answers whenever a guarded call is rejected or
//! fails for good. It first looks for the last successful value stored
//! under the call's cache key, then falls back to a static payload.
//!
//! The JSON helpers here build the resolver used by the demo service: a
//! static document tagged `FALLBACK_STATIC`, and a check for upstream
//! bodies flagged `"error": true`, which must never be cached.

pub mod cache;
pub mod resolver;

use bulwark_domain::constants::{
    ERROR_FLAG_FIELD, FALLBACK_STATIC_SOURCE, FALLBACK_STATIC_STATUS, FALLBACK_STATIC_VALUE1,
    FALLBACK_STATIC_VALUE2,
};
use bulwark_domain::FallbackConfig;
use chrono::Utc;
use serde_json::{json, Value};

pub use cache::{CacheEntry, FallbackCache};
pub use resolver::FallbackResolver;

/// The static fallback document, timestamped now
pub fn static_payload(config: &FallbackConfig) -> Value {
    json!({
        "source": FALLBACK_STATIC_SOURCE,
        "message": config.static_message,
        "timestamp": Utc::now().to_rfc3339(),
        "data": {
            "value1": FALLBACK_STATIC_VALUE1,
            "value2": FALLBACK_STATIC_VALUE2,
            "status": FALLBACK_STATIC_STATUS,
        },
        "note": config.static_note,
    })
}

/// Whether an upstream body reports an error instead of data
pub fn is_error_payload(value: &Value) -> bool {
    value.get(ERROR_FLAG_FIELD).and_then(Value::as_bool).unwrap_or(false)
}

impl FallbackResolver<Value> {
    /// Resolver whose static tier is [`static_payload`]
    pub fn from_config(config: &FallbackConfig) -> Self {
        let config = config.clone();
        Self::new(move || static_payload(&config))
    }
}
