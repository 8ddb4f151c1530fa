//! Cache backend trait and types.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A cached value with its timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Namespace-isolated key-value storage with per-entry TTL.
///
/// All operations are synchronous to match rusqlite's API; expired entries are
/// never returned.
pub trait CacheBackend: Send + Sync {
    /// Short backend name for diagnostics.
    fn kind(&self) -> &'static str;

    /// Get cached data by key.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get_entry(namespace, key)?.map(|e| e.value))
    }

    /// Get cached data with its timestamps.
    fn get_entry(&self, namespace: &str, key: &str) -> Result<Option<CacheEntry>>;

    /// Set cached data with TTL, replacing any existing entry.
    fn set(&self, namespace: &str, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
        self.set_with_expiry(namespace, key, value, expires_at)
    }

    /// Set cached data with an explicit expiration time.
    fn set_with_expiry(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete one key. Returns whether anything was removed.
    fn invalidate(&self, namespace: &str, key: &str) -> Result<bool>;

    /// Delete every key in a namespace.
    fn invalidate_namespace(&self, namespace: &str) -> Result<usize>;

    /// Number of live (unexpired) entries in a namespace.
    fn count(&self, namespace: &str) -> Result<usize>;

    /// Remove expired entries from all namespaces.
    fn cleanup_expired(&self) -> Result<usize>;

    /// Clear all cached data across all namespaces.
    fn clear_all(&self) -> Result<()>;
}
