//! Cache abstraction for external metadata.
//!
//! Two backends implement [`CacheBackend`]:
//! - [`SqliteCache`]: persistent, survives restarts (default)
//! - [`MemoryCache`]: process-local, for development and tests
//!
//! Callers isolate their data by namespace.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use traits::{CacheBackend, CacheEntry};

use crate::config::{CacheBackendKind, Settings};
use crate::error::Result;
use std::sync::Arc;

/// Build the backend selected in settings.
pub fn open_backend(settings: &Settings) -> Result<Arc<dyn CacheBackend>> {
    Ok(match settings.cache_backend {
        CacheBackendKind::Sqlite => Arc::new(SqliteCache::open(&settings.cache_path)?),
        CacheBackendKind::Memory => Arc::new(MemoryCache::new()),
    })
}
