//! Process-local cache backed by mini-moka.

use super::traits::{CacheBackend, CacheEntry};
use crate::error::Result;
use chrono::{DateTime, Utc};
use mini_moka::sync::Cache;
use std::time::Duration;

type Key = (String, String);

/// In-memory cache. Contents are lost on restart.
pub struct MemoryCache {
    inner: Cache<Key, CacheEntry>,
}

impl MemoryCache {
    pub const DEFAULT_CAPACITY: u64 = 10_000;
    /// Upper bound on how long any entry may live, whatever its own expiry.
    pub const MAX_TTL: Duration = Duration::from_secs(24 * 3600);

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(Self::MAX_TTL)
                .build(),
        }
    }

    fn keys_in(&self, namespace: &str) -> Vec<Key> {
        self.inner
            .iter()
            .filter(|entry| entry.key().0 == namespace)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryCache {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn get_entry(&self, namespace: &str, key: &str) -> Result<Option<CacheEntry>> {
        let cache_key = (namespace.to_string(), key.to_string());
        match self.inner.get(&cache_key) {
            Some(entry) if entry.is_expired_at(Utc::now()) => {
                self.inner.invalidate(&cache_key);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn set_with_expiry(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.insert(
            (namespace.to_string(), key.to_string()),
            CacheEntry {
                value: value.to_vec(),
                cached_at: Utc::now(),
                expires_at,
            },
        );
        Ok(())
    }

    fn invalidate(&self, namespace: &str, key: &str) -> Result<bool> {
        let cache_key = (namespace.to_string(), key.to_string());
        let existed = self.inner.get(&cache_key).is_some();
        self.inner.invalidate(&cache_key);
        Ok(existed)
    }

    fn invalidate_namespace(&self, namespace: &str) -> Result<usize> {
        let keys = self.keys_in(namespace);
        for key in &keys {
            self.inner.invalidate(key);
        }
        Ok(keys.len())
    }

    fn count(&self, namespace: &str) -> Result<usize> {
        let now = Utc::now();
        Ok(self
            .inner
            .iter()
            .filter(|entry| entry.key().0 == namespace && !entry.value().is_expired_at(now))
            .count())
    }

    fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let expired: Vec<Key> = self
            .inner
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();
        for key in &expired {
            self.inner.invalidate(key);
        }
        Ok(expired.len())
    }

    fn clear_all(&self) -> Result<()> {
        self.inner.invalidate_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_expiry() {
        let cache = MemoryCache::new();
        cache.set("ns", "live", b"1", Duration::from_secs(60)).unwrap();
        cache
            .set_with_expiry("ns", "dead", b"2", Utc::now() - chrono::Duration::seconds(1))
            .unwrap();

        assert_eq!(cache.get("ns", "live").unwrap().unwrap(), b"1");
        assert!(cache.get("ns", "dead").unwrap().is_none());
        assert_eq!(cache.count("ns").unwrap(), 1);
    }

    #[test]
    fn test_invalidate_namespace_leaves_others() {
        let cache = MemoryCache::new();
        cache.set("a", "k1", b"1", Duration::from_secs(60)).unwrap();
        cache.set("a", "k2", b"2", Duration::from_secs(60)).unwrap();
        cache.set("b", "k1", b"3", Duration::from_secs(60)).unwrap();

        assert_eq!(cache.invalidate_namespace("a").unwrap(), 2);
        assert!(cache.get("a", "k1").unwrap().is_none());
        assert_eq!(cache.get("b", "k1").unwrap().unwrap(), b"3");
        assert!(cache.invalidate("b", "k1").unwrap());
        assert!(!cache.invalidate("b", "k1").unwrap());
    }
}
