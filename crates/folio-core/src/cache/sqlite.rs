//! SQLite-backed cache.

use super::traits::{CacheBackend, CacheEntry};
use crate::db::{format_time, parse_time};
use crate::error::{FolioError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Persistent cache in its own SQLite file.
///
/// Thread-safe via an internal mutex on the connection.
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open (or create) a cache database at the given path.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| FolioError::io_with_path(e, parent.to_path_buf()))?;
        }

        let conn = Connection::open(db_path).map_err(|e| FolioError::Database {
            message: format!("Failed to open cache database: {}", e),
            source: Some(e),
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::from_connection(conn)
    }

    /// Cache held entirely in an in-memory SQLite database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                cached_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );

            CREATE INDEX IF NOT EXISTS idx_cache_expires
                ON cache_entries(namespace, expires_at);
            "#,
        )
        .map_err(|e| FolioError::Database {
            message: format!("Failed to initialize cache schema: {}", e),
            source: Some(e),
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| FolioError::Database {
            message: format!("Failed to lock cache database: {}", e),
            source: None,
        })
    }
}

impl CacheBackend for SqliteCache {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn get_entry(&self, namespace: &str, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;
        let now = format_time(Utc::now());

        let row: Option<(Vec<u8>, String, String)> = conn
            .query_row(
                r#"
                SELECT value, cached_at, expires_at
                FROM cache_entries
                WHERE namespace = ?1 AND key = ?2 AND expires_at > ?3
                "#,
                params![namespace, key, now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row.map(|(value, cached_at, expires_at)| CacheEntry {
            value,
            cached_at: parse_time(&cached_at),
            expires_at: parse_time(&expires_at),
        }))
    }

    fn set_with_expiry(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO cache_entries (namespace, key, value, cached_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                namespace,
                key,
                value,
                format_time(Utc::now()),
                format_time(expires_at)
            ],
        )?;
        Ok(())
    }

    fn invalidate(&self, namespace: &str, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM cache_entries WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )?;
        Ok(deleted > 0)
    }

    fn invalidate_namespace(&self, namespace: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM cache_entries WHERE namespace = ?1",
            params![namespace],
        )?;
        debug!(
            "Invalidated {} entries from namespace '{}'",
            deleted, namespace
        );
        Ok(deleted)
    }

    fn count(&self, namespace: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM cache_entries WHERE namespace = ?1 AND expires_at > ?2",
            params![namespace, format_time(Utc::now())],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn cleanup_expired(&self) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            params![format_time(Utc::now())],
        )?;
        if deleted > 0 {
            debug!("Cleaned up {} expired cache entries", deleted);
        }
        Ok(deleted)
    }

    fn clear_all(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM cache_entries", [])?;
        debug!("Cleared all cache data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_cache() -> (TempDir, SqliteCache) {
        let temp_dir = TempDir::new().unwrap();
        let cache = SqliteCache::open(temp_dir.path().join("nested/cache.sqlite")).unwrap();
        (temp_dir, cache)
    }

    #[test]
    fn test_set_and_get() {
        let (_temp, cache) = create_test_cache();
        cache
            .set("github_repo", "acme/widget", b"{}", Duration::from_secs(3600))
            .unwrap();
        assert_eq!(cache.get("github_repo", "acme/widget").unwrap().unwrap(), b"{}");
        assert_eq!(cache.count("github_repo").unwrap(), 1);
    }

    #[test]
    fn test_expired_entries_are_hidden_and_cleaned() {
        let (_temp, cache) = create_test_cache();
        let past = Utc::now() - chrono::Duration::seconds(5);
        cache.set_with_expiry("ns", "old", b"x", past).unwrap();
        cache.set("ns", "new", b"y", Duration::from_secs(60)).unwrap();

        assert!(cache.get("ns", "old").unwrap().is_none());
        assert_eq!(cache.count("ns").unwrap(), 1);
        assert_eq!(cache.cleanup_expired().unwrap(), 1);
    }

    #[test]
    fn test_namespace_isolation_and_invalidation() {
        let (_temp, cache) = create_test_cache();
        cache.set("ns1", "k", b"1", Duration::from_secs(60)).unwrap();
        cache.set("ns2", "k", b"2", Duration::from_secs(60)).unwrap();

        assert!(cache.invalidate("ns1", "k").unwrap());
        assert!(!cache.invalidate("ns1", "k").unwrap());
        assert_eq!(cache.get("ns2", "k").unwrap().unwrap(), b"2");

        cache.set("ns2", "k2", b"3", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.invalidate_namespace("ns2").unwrap(), 2);
        assert_eq!(cache.count("ns2").unwrap(), 0);
    }

    #[test]
    fn test_clear_all() {
        let cache = SqliteCache::open_in_memory().unwrap();
        cache.set("a", "k", b"1", Duration::from_secs(60)).unwrap();
        cache.set("b", "k", b"2", Duration::from_secs(60)).unwrap();
        cache.clear_all().unwrap();
        assert_eq!(cache.count("a").unwrap() + cache.count("b").unwrap(), 0);
    }
}
