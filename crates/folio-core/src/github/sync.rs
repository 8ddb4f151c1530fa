//! Time-gated refresh of project repository metrics.
//!
//! Listings call [`ProjectSync::refresh_listing`], which looks at a bounded
//! number of projects and refreshes a bounded number of the stale ones, so a
//! single request never fans out into unbounded GitHub traffic. Failures
//! degrade to the stored (stale) metrics.

use super::cache::RepoCache;
use super::source::RepoMetadataSource;
use super::RepoRef;
use crate::config::SyncConfig;
use crate::db::Database;
use crate::error::{FolioError, Result};
use crate::models::{GitHubCacheStats, Project, RepoMetrics, SyncReport};
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounds on how much refresh work a listing may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// A project is stale once its metrics are older than this.
    pub ttl: Duration,
    /// Projects inspected per listing (N).
    pub candidate_limit: usize,
    /// Refresh attempts per listing (M).
    pub refresh_limit: usize,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            ttl: SyncConfig::PROJECT_TTL,
            candidate_limit: SyncConfig::CANDIDATE_LIMIT,
            refresh_limit: SyncConfig::REFRESH_LIMIT,
        }
    }
}

impl SyncPolicy {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// True if the project was never synced or its last sync is older than the TTL.
    pub fn needs_update(&self, project: &Project, now: DateTime<Utc>) -> bool {
        match project.last_synced {
            None => true,
            Some(last) => {
                let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
                now.signed_duration_since(last) > ttl
            }
        }
    }
}

/// Keeps project metrics in step with their repositories.
#[derive(Clone)]
pub struct ProjectSync {
    source: Arc<dyn RepoMetadataSource>,
    cache: RepoCache,
    db: Database,
    policy: SyncPolicy,
}

impl ProjectSync {
    pub fn new(
        source: Arc<dyn RepoMetadataSource>,
        cache: RepoCache,
        db: Database,
        policy: SyncPolicy,
    ) -> Self {
        Self {
            source,
            cache,
            db,
            policy,
        }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    pub fn needs_update(&self, project: &Project, now: DateTime<Utc>) -> bool {
        self.policy.needs_update(project, now)
    }

    /// Refresh stale projects of a listing in place.
    ///
    /// Looks at the first `candidate_limit` projects that carry a usable
    /// repository reference, in the order given, and makes at most
    /// `refresh_limit` refresh attempts among the stale ones. Failed attempts
    /// count toward the limit and leave the project as it was.
    pub async fn refresh_listing(&self, projects: &mut [Project]) -> SyncReport {
        let now = Utc::now();
        let mut report = SyncReport::default();
        let mut attempted_ids = HashSet::new();

        for project in projects.iter_mut() {
            if report.evaluated >= self.policy.candidate_limit {
                break;
            }
            let Some(url) = project.github_url.as_deref().filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            if let Err(e) = RepoRef::parse(url) {
                debug!("Skipping project {} during sync: {}", project.id, e);
                continue;
            }

            report.evaluated += 1;
            if !self.needs_update(project, now) {
                continue;
            }
            report.stale += 1;

            if report.attempted >= self.policy.refresh_limit
                || !attempted_ids.insert(project.id)
            {
                continue;
            }
            report.attempted += 1;

            match self.refresh_project(project).await {
                Ok(_) => report.refreshed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        "Keeping stale metrics for project {} ({}): {}",
                        project.id, project.title, e
                    );
                }
            }
        }

        if report.attempted > 0 {
            info!(
                "Listing sync: evaluated {}, stale {}, refreshed {}, failed {}",
                report.evaluated, report.stale, report.refreshed, report.failed
            );
        }
        report
    }

    /// One non-forced refresh: fresh cache entry, then recent failure, then network.
    pub async fn refresh_project(&self, project: &mut Project) -> Result<RepoMetrics> {
        let repo = repo_for(project)?;

        match self.cache.get_metrics(&repo) {
            Ok(Some(metrics)) => {
                self.apply(project, &metrics)?;
                return Ok(metrics);
            }
            Ok(None) => {}
            Err(e) => warn!("Metrics cache read failed for {}: {}", repo, e),
        }

        match self.cache.get_failure(&repo) {
            Ok(Some(record)) => {
                debug!(
                    "Skipping fetch for {}: {} failure recorded at {}",
                    repo,
                    record.kind.as_str(),
                    record.recorded_at
                );
                return Err(FolioError::RecentFailure {
                    repo: repo.full_name(),
                    kind: record.kind.as_str().to_string(),
                });
            }
            Ok(None) => {}
            Err(e) => warn!("Failure cache read failed for {}: {}", repo, e),
        }

        let metrics = self.fetch_and_cache(&repo).await?;
        self.apply(project, &metrics)?;
        Ok(metrics)
    }

    /// Fetch now, ignoring staleness, cached metrics and recorded failures.
    pub async fn force_refresh(&self, project_id: i64) -> Result<Project> {
        let mut project = self.db.get_project(project_id)?;
        let repo = repo_for(&project)?;

        let metrics = self.fetch_and_cache(&repo).await?;
        self.apply(&mut project, &metrics)?;
        info!(
            "Force-refreshed project {} from {}: {} stars, {} forks",
            project.id, repo, project.stars, project.forks
        );
        Ok(project)
    }

    /// Remove cached entries for one repository, or for all of them.
    ///
    /// Project sync timestamps are left alone; use [`Self::force_refresh`]
    /// to refresh a project before its TTL runs out.
    pub fn clear_cache(&self, repo: Option<&RepoRef>) -> Result<usize> {
        let removed = match repo {
            Some(repo) => self.cache.clear_repo(repo)?,
            None => self.cache.clear_all()?,
        };
        info!(
            "Cleared {} GitHub cache entr{} ({})",
            removed,
            if removed == 1 { "y" } else { "ies" },
            repo.map(|r| r.full_name()).unwrap_or_else(|| "all".into())
        );
        Ok(removed)
    }

    pub fn cache_stats(&self) -> Result<GitHubCacheStats> {
        Ok(GitHubCacheStats {
            cache_enabled: true,
            cache_type: self.cache.backend_kind().to_string(),
            cached_repos: self.cache.metrics_count()?,
            cached_failures: self.cache.failure_count()?,
            metrics_ttl_secs: self.cache.metrics_ttl().as_secs(),
            project_ttl_secs: self.policy.ttl.as_secs(),
            candidate_limit: self.policy.candidate_limit,
            refresh_limit: self.policy.refresh_limit,
            source: self.source.name().to_string(),
            rate_limit: self.source.rate_limit(),
        })
    }

    async fn fetch_and_cache(&self, repo: &RepoRef) -> Result<RepoMetrics> {
        match self.source.fetch(repo).await {
            Ok(metrics) => {
                if let Err(e) = self.cache.put_metrics(repo, &metrics) {
                    warn!("Could not cache metrics for {}: {}", repo, e);
                }
                Ok(metrics)
            }
            Err(err) => {
                if let Err(e) = self.cache.record_failure(repo, &err) {
                    warn!("Could not record failure for {}: {}", repo, e);
                }
                Err(err)
            }
        }
    }

    /// Persist metrics, then mirror them on the in-memory project.
    fn apply(&self, project: &mut Project, metrics: &RepoMetrics) -> Result<()> {
        // Stored timestamps carry microseconds; keep the in-memory copy equal.
        let now = Utc::now().trunc_subsecs(6);
        self.db
            .update_github_metrics(project.id, metrics.stars, metrics.forks, now)?;
        project.stars = metrics.stars;
        project.forks = metrics.forks;
        project.last_synced = Some(now);
        Ok(())
    }
}

fn repo_for(project: &Project) -> Result<RepoRef> {
    let url = project
        .github_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or(FolioError::MissingRepoUrl {
            project_id: project.id,
        })?;
    RepoRef::parse(url)
}
