//! Sources of repository metadata.

use super::RepoRef;
use crate::error::Result;
use crate::models::{RateLimitSnapshot, RepoMetrics};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Something that can fetch current metrics for a repository.
#[async_trait]
pub trait RepoMetadataSource: Send + Sync {
    async fn fetch(&self, repo: &RepoRef) -> Result<RepoMetrics>;

    /// Short name for logs and stats (`"github"`, `"mock"`).
    fn name(&self) -> &'static str;

    /// Last rate limit reported upstream, if the source tracks one.
    fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        None
    }
}

const MOCK_LANGUAGES: &[&str] = &[
    "Python",
    "JavaScript",
    "TypeScript",
    "Java",
    "Go",
    "Rust",
    "PHP",
];

/// Offline source that derives stable fake metrics from the repository name.
///
/// The same `owner/repo` always yields the same numbers, across processes.
#[derive(Debug, Default, Clone)]
pub struct MockMetadataSource;

impl MockMetadataSource {
    pub fn new() -> Self {
        Self
    }

    fn seed(repo: &RepoRef) -> u64 {
        let digest = Sha256::digest(repo.full_name().to_ascii_lowercase().as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

#[async_trait]
impl RepoMetadataSource for MockMetadataSource {
    async fn fetch(&self, repo: &RepoRef) -> Result<RepoMetrics> {
        let mut rng = StdRng::seed_from_u64(Self::seed(repo));
        let language = MOCK_LANGUAGES[rng.random_range(0..MOCK_LANGUAGES.len())];
        Ok(RepoMetrics {
            full_name: repo.full_name(),
            stars: rng.random_range(10..=1000),
            forks: rng.random_range(5..=200),
            watchers: rng.random_range(10..=1000),
            language: Some(language.to_string()),
            description: Some(format!("Mock repository data for {}", repo)),
            pushed_at: None,
            fetched_at: Utc::now(),
            mock: true,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let source = MockMetadataSource::new();
        let repo = RepoRef::new("acme", "widget").unwrap();

        let a = source.fetch(&repo).await.unwrap();
        let b = source.fetch(&repo).await.unwrap();
        assert_eq!((a.stars, a.forks, &a.language), (b.stars, b.forks, &b.language));
        assert!(a.mock);
        assert!((10..=1000).contains(&a.stars));
        assert!((5..=200).contains(&a.forks));
    }

    #[tokio::test]
    async fn test_mock_varies_by_repo() {
        let source = MockMetadataSource::new();
        let mut seen = std::collections::HashSet::new();
        for name in ["alpha", "beta", "gamma", "delta", "epsilon"] {
            let repo = RepoRef::new("acme", name).unwrap();
            seen.insert(source.fetch(&repo).await.unwrap().stars);
        }
        assert!(seen.len() > 1);
    }
}
