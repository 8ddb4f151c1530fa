//! GitHub metadata and cache reporting types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository metrics fetched from the GitHub API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMetrics {
    pub full_name: String,
    pub stars: i64,
    pub forks: i64,
    pub watchers: i64,
    pub language: Option<String>,
    pub description: Option<String>,
    pub pushed_at: Option<String>,
    pub fetched_at: DateTime<Utc>,
    /// Set when the metrics were synthesised rather than fetched.
    #[serde(default)]
    pub mock: bool,
}

/// The subset of the GitHub `GET /repos/{owner}/{repo}` payload we read.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepoPayload {
    pub full_name: String,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub watchers_count: i64,
    pub language: Option<String>,
    pub description: Option<String>,
    pub pushed_at: Option<String>,
}

impl GitHubRepoPayload {
    pub fn into_metrics(self, fetched_at: DateTime<Utc>) -> RepoMetrics {
        RepoMetrics {
            full_name: self.full_name,
            stars: self.stargazers_count,
            forks: self.forks_count,
            watchers: self.watchers_count,
            language: self.language,
            description: self.description,
            pushed_at: self.pushed_at,
            fetched_at,
            mock: false,
        }
    }
}

/// Why a fetch failed, as remembered by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Forbidden,
    ApiError,
    Transport,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::Forbidden => "forbidden",
            FailureKind::ApiError => "api_error",
            FailureKind::Transport => "transport",
        }
    }
}

/// A remembered fetch failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub message: String,
    pub status_code: Option<u16>,
    pub recorded_at: DateTime<Utc>,
}

/// Last rate limit values reported by GitHub.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RateLimitSnapshot {
    pub remaining: Option<u64>,
    pub limit: Option<u64>,
    /// Unix timestamp when the window resets.
    pub reset: Option<u64>,
}

/// Outcome counts of one listing refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Candidates inspected for staleness.
    pub evaluated: usize,
    /// Candidates found stale.
    pub stale: usize,
    /// Refresh attempts made (successful or not).
    pub attempted: usize,
    pub refreshed: usize,
    pub failed: usize,
}

/// Cache and sync statistics for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct GitHubCacheStats {
    pub cache_enabled: bool,
    pub cache_type: String,
    pub cached_repos: usize,
    pub cached_failures: usize,
    pub metrics_ttl_secs: u64,
    pub project_ttl_secs: u64,
    pub candidate_limit: usize,
    pub refresh_limit: usize,
    pub source: String,
    pub rate_limit: Option<RateLimitSnapshot>,
}
