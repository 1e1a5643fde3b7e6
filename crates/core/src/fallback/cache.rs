//! Last-known-good value store

use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// One cached value with the time it was written
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    pub key: String,
    pub value: V,
    pub stored_at: DateTime<Utc>,
}

/// Per-key, last-write-wins store with no expiry
///
/// Written only by successful protected calls; fallback resolution reads it.
pub struct FallbackCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V> Default for FallbackCache<V> {
    fn default() -> Self {
        Self { entries: DashMap::new() }
    }
}

impl<V> fmt::Debug for FallbackCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackCache").field("entries", &self.entries.len()).finish()
    }
}

impl<V: Clone> FallbackCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `key`
    pub fn put(&self, key: &str, value: V) {
        let entry = CacheEntry { key: key.to_string(), value, stored_at: Utc::now() };
        self.entries.insert(key.to_string(), entry);
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, key: &str) -> Option<CacheEntry<V>> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let cache = FallbackCache::new();
        cache.put("lastSuccessfulResponse", 1);
        cache.put("lastSuccessfulResponse", 2);

        assert_eq!(cache.get("lastSuccessfulResponse"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_records_key_and_time() {
        let cache = FallbackCache::new();
        let before = Utc::now();
        cache.put("k", "v");

        let entry = cache.entry("k").expect("entry");
        assert_eq!(entry.key, "k");
        assert!(entry.stored_at >= before);
        assert_eq!(cache.remove("k").map(|e| e.value), Some("v"));
        assert!(cache.is_empty());
    }
}
