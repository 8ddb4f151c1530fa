//! Repository metrics and failure records on top of a [`CacheBackend`].

use super::RepoRef;
use crate::cache::CacheBackend;
use crate::config::CacheTtlConfig;
use crate::error::{FolioError, Result};
use crate::models::{FailureKind, FailureRecord, RepoMetrics};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Namespace holding fetched metrics.
pub const METRICS_NAMESPACE: &str = "github_repo";
/// Namespace holding recent fetch failures.
pub const FAILURE_NAMESPACE: &str = "github_error";

impl FailureKind {
    /// Classify a fetch error.
    pub fn from_error(err: &FolioError) -> Self {
        match err {
            FolioError::RepoNotFound { .. } => FailureKind::NotFound,
            FolioError::RateLimited { .. } => FailureKind::Forbidden,
            FolioError::GitHubApi {
                status_code: Some(403),
                ..
            } => FailureKind::Forbidden,
            FolioError::GitHubApi { .. } => FailureKind::ApiError,
            _ => FailureKind::Transport,
        }
    }

    /// How long a failure of this kind suppresses new fetches.
    pub fn ttl(&self) -> Duration {
        match self {
            FailureKind::NotFound => CacheTtlConfig::NOT_FOUND,
            FailureKind::Forbidden => CacheTtlConfig::FORBIDDEN,
            FailureKind::ApiError => CacheTtlConfig::API_ERROR,
            FailureKind::Transport => CacheTtlConfig::TRANSPORT_ERROR,
        }
    }
}

/// Per-repository cache of metrics and failures.
#[derive(Clone)]
pub struct RepoCache {
    backend: Arc<dyn CacheBackend>,
    metrics_ttl: Duration,
}

impl RepoCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_ttl(backend, CacheTtlConfig::METRICS)
    }

    pub fn with_ttl(backend: Arc<dyn CacheBackend>, metrics_ttl: Duration) -> Self {
        Self {
            backend,
            metrics_ttl,
        }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub fn metrics_ttl(&self) -> Duration {
        self.metrics_ttl
    }

    /// Fresh cached metrics, if any. Unreadable entries are dropped.
    pub fn get_metrics(&self, repo: &RepoRef) -> Result<Option<RepoMetrics>> {
        let key = repo.full_name();
        let Some(bytes) = self.backend.get(METRICS_NAMESPACE, &key)? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(metrics) => {
                debug!("GitHub metrics cache hit for {}", key);
                Ok(Some(metrics))
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry for {}: {}", key, e);
                self.backend.invalidate(METRICS_NAMESPACE, &key)?;
                Ok(None)
            }
        }
    }

    /// Store metrics and forget any recorded failure.
    pub fn put_metrics(&self, repo: &RepoRef, metrics: &RepoMetrics) -> Result<()> {
        let key = repo.full_name();
        let bytes = serde_json::to_vec(metrics)?;
        self.backend
            .set(METRICS_NAMESPACE, &key, &bytes, self.metrics_ttl)?;
        self.backend.invalidate(FAILURE_NAMESPACE, &key)?;
        Ok(())
    }

    /// Remember a failed fetch for the TTL of its kind.
    pub fn record_failure(&self, repo: &RepoRef, err: &FolioError) -> Result<FailureRecord> {
        let kind = FailureKind::from_error(err);
        let record = FailureRecord {
            kind,
            message: err.to_string(),
            status_code: match err {
                FolioError::GitHubApi { status_code, .. } => *status_code,
                FolioError::RepoNotFound { .. } => Some(404),
                FolioError::RateLimited { .. } => Some(403),
                _ => None,
            },
            recorded_at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&record)?;
        self.backend
            .set(FAILURE_NAMESPACE, &repo.full_name(), &bytes, kind.ttl())?;
        debug!(
            "Recorded {} failure for {} for {:?}",
            kind.as_str(),
            repo,
            kind.ttl()
        );
        Ok(record)
    }

    /// Unexpired failure record, if any.
    pub fn get_failure(&self, repo: &RepoRef) -> Result<Option<FailureRecord>> {
        let key = repo.full_name();
        let Some(bytes) = self.backend.get(FAILURE_NAMESPACE, &key)? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Discarding unreadable failure record for {}: {}", key, e);
                self.backend.invalidate(FAILURE_NAMESPACE, &key)?;
                Ok(None)
            }
        }
    }

    /// Drop metrics and failure record for one repository. Returns the number
    /// of entries removed.
    pub fn clear_repo(&self, repo: &RepoRef) -> Result<usize> {
        let key = repo.full_name();
        let removed = self.backend.invalidate(METRICS_NAMESPACE, &key)? as usize
            + self.backend.invalidate(FAILURE_NAMESPACE, &key)? as usize;
        Ok(removed)
    }

    /// Drop every repository entry. Other namespaces are untouched.
    pub fn clear_all(&self) -> Result<usize> {
        Ok(self.backend.invalidate_namespace(METRICS_NAMESPACE)?
            + self.backend.invalidate_namespace(FAILURE_NAMESPACE)?)
    }

    pub fn metrics_count(&self) -> Result<usize> {
        self.backend.count(METRICS_NAMESPACE)
    }

    pub fn failure_count(&self) -> Result<usize> {
        self.backend.count(FAILURE_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    fn metrics(stars: i64) -> RepoMetrics {
        RepoMetrics {
            full_name: "acme/widget".into(),
            stars,
            forks: 2,
            watchers: stars,
            language: Some("Rust".into()),
            description: None,
            pushed_at: None,
            fetched_at: Utc::now(),
            mock: false,
        }
    }

    fn repo_cache() -> RepoCache {
        RepoCache::new(Arc::new(MemoryCache::new()))
    }

    #[test]
    fn test_failure_kinds_and_ttls() {
        let not_found = FolioError::RepoNotFound {
            repo: "acme/widget".into(),
        };
        assert_eq!(FailureKind::from_error(&not_found), FailureKind::NotFound);
        assert_eq!(FailureKind::NotFound.ttl(), Duration::from_secs(6 * 3600));

        let forbidden = FolioError::GitHubApi {
            message: "forbidden".into(),
            status_code: Some(403),
        };
        assert_eq!(FailureKind::from_error(&forbidden), FailureKind::Forbidden);
        assert_eq!(FailureKind::Forbidden.ttl(), Duration::from_secs(3600));

        let server = FolioError::GitHubApi {
            message: "boom".into(),
            status_code: Some(500),
        };
        assert_eq!(FailureKind::from_error(&server), FailureKind::ApiError);
        assert_eq!(FailureKind::ApiError.ttl(), Duration::from_secs(1800));

        let timeout = FolioError::Timeout(Duration::from_secs(10));
        assert_eq!(FailureKind::from_error(&timeout), FailureKind::Transport);
        assert_eq!(FailureKind::Transport.ttl(), Duration::from_secs(900));
    }

    #[test]
    fn test_success_clears_failure() {
        let cache = repo_cache();
        let repo = RepoRef::new("acme", "widget").unwrap();

        cache
            .record_failure(&repo, &FolioError::Timeout(Duration::from_secs(10)))
            .unwrap();
        assert_eq!(
            cache.get_failure(&repo).unwrap().unwrap().kind,
            FailureKind::Transport
        );

        cache.put_metrics(&repo, &metrics(42)).unwrap();
        assert_eq!(cache.get_metrics(&repo).unwrap().unwrap().stars, 42);
        assert!(cache.get_failure(&repo).unwrap().is_none());
        assert_eq!(cache.metrics_count().unwrap(), 1);
        assert_eq!(cache.failure_count().unwrap(), 0);
    }

    #[test]
    fn test_clear_repo_and_all() {
        let cache = repo_cache();
        let widget = RepoRef::new("acme", "widget").unwrap();
        let gadget = RepoRef::new("acme", "gadget").unwrap();

        cache.put_metrics(&widget, &metrics(1)).unwrap();
        cache.put_metrics(&gadget, &metrics(2)).unwrap();
        cache
            .record_failure(
                &widget,
                &FolioError::RepoNotFound {
                    repo: "acme/widget".into(),
                },
            )
            .unwrap();

        assert_eq!(cache.clear_repo(&widget).unwrap(), 2);
        assert!(cache.get_metrics(&widget).unwrap().is_none());
        assert!(cache.get_metrics(&gadget).unwrap().is_some());

        assert_eq!(cache.clear_all().unwrap(), 1);
        assert_eq!(cache.metrics_count().unwrap(), 0);
    }

    #[test]
    fn test_expired_metrics_are_ignored() {
        let cache = RepoCache::with_ttl(Arc::new(MemoryCache::new()), Duration::ZERO);
        let repo = RepoRef::new("acme", "widget").unwrap();
        cache.put_metrics(&repo, &metrics(5)).unwrap();
        assert!(cache.get_metrics(&repo).unwrap().is_none());
    }
}
