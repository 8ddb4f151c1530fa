//! GitHub REST client for repository metadata.

use super::source::RepoMetadataSource;
use super::RepoRef;
use crate::config::NetworkConfig;
use crate::error::{FolioError, Result};
use crate::models::{GitHubRepoPayload, RateLimitSnapshot, RepoMetrics};
use crate::network::{retry_async, HttpClient, RetryConfig};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fetches `GET /repos/{owner}/{repo}` with retries and rate limit tracking.
pub struct GitHubClient {
    http: Arc<HttpClient>,
    token: Option<String>,
    api_base: String,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Client against the public API. A token raises the rate limit.
    pub fn new(token: Option<String>) -> Result<Self> {
        Ok(Self {
            http: Arc::new(HttpClient::new()?),
            token: token.filter(|t| !t.trim().is_empty()),
            api_base: NetworkConfig::GITHUB_API_BASE.to_string(),
            retry: RetryConfig::default(),
        })
    }

    /// Point the client at another API root, e.g. a GitHub Enterprise host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("Accept", NetworkConfig::GITHUB_ACCEPT.to_string())];
        if let Some(token) = &self.token {
            headers.push(("Authorization", format!("token {}", token)));
        }
        headers
    }

    async fn fetch_once(&self, url: &str, repo: &RepoRef) -> Result<RepoMetrics> {
        let response = self.http.get_with_headers(url, &self.headers()).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, response.headers(), repo));
        }

        let payload: GitHubRepoPayload = response.json().await.map_err(|e| FolioError::GitHubApi {
            message: format!("Unreadable repository payload for {}: {}", repo, e),
            status_code: Some(status.as_u16()),
        })?;
        Ok(payload.into_metrics(Utc::now()))
    }
}

#[async_trait]
impl RepoMetadataSource for GitHubClient {
    async fn fetch(&self, repo: &RepoRef) -> Result<RepoMetrics> {
        let url = format!("{}/repos/{}/{}", self.api_base, repo.owner, repo.repo);
        debug!("Fetching GitHub metadata for {}", repo);

        let (result, attempts) =
            retry_async(&self.retry, || self.fetch_once(&url, repo), |e| e.is_retryable()).await;

        match &result {
            Ok(metrics) => info!(
                "Fetched GitHub metadata for {} ({} stars, {} forks, {} attempt(s))",
                repo, metrics.stars, metrics.forks, attempts
            ),
            Err(e) => warn!("GitHub fetch for {} failed after {} attempt(s): {}", repo, attempts, e),
        }
        result
    }

    fn name(&self) -> &'static str {
        "github"
    }

    fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        let state = self.http.rate_limit_state();
        (state != RateLimitSnapshot::default()).then_some(state)
    }
}

/// Map a non-success response to an error.
fn classify_status(status: StatusCode, headers: &HeaderMap, repo: &RepoRef) -> FolioError {
    match status {
        StatusCode::NOT_FOUND => FolioError::RepoNotFound {
            repo: repo.full_name(),
        },
        StatusCode::FORBIDDEN => {
            let exhausted = header_u64(headers, "X-RateLimit-Remaining") == Some(0);
            if exhausted {
                let retry_after_secs = header_u64(headers, "X-RateLimit-Reset").map(|reset| {
                    (reset as i64 - Utc::now().timestamp()).max(0) as u64
                });
                FolioError::RateLimited {
                    service: "GitHub".to_string(),
                    retry_after_secs,
                }
            } else {
                FolioError::GitHubApi {
                    message: format!("Access to {} is forbidden", repo),
                    status_code: Some(403),
                }
            }
        }
        other => FolioError::GitHubApi {
            message: format!("GitHub API returned {} for {}", other, repo),
            status_code: Some(other.as_u16()),
        },
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn repo() -> RepoRef {
        RepoRef::new("acme", "widget").unwrap()
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify_status(StatusCode::NOT_FOUND, &HeaderMap::new(), &repo());
        assert!(matches!(err, FolioError::RepoNotFound { ref repo } if repo == "acme/widget"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_forbidden() {
        let err = classify_status(StatusCode::FORBIDDEN, &HeaderMap::new(), &repo());
        assert!(matches!(err, FolioError::GitHubApi { status_code: Some(403), .. }));

        let mut headers = HeaderMap::new();
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("0"));
        let err = classify_status(StatusCode::FORBIDDEN, &headers, &repo());
        assert!(matches!(err, FolioError::RateLimited { .. }));
    }

    #[test]
    fn test_classify_server_error_is_retryable() {
        let err = classify_status(StatusCode::BAD_GATEWAY, &HeaderMap::new(), &repo());
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_token_header() {
        let client = GitHubClient::new(Some("secret".into())).unwrap();
        assert!(client.has_token());
        assert!(client
            .headers()
            .iter()
            .any(|(k, v)| *k == "Authorization" && v == "token secret"));

        let anonymous = GitHubClient::new(Some("  ".into())).unwrap();
        assert!(!anonymous.has_token());
        assert_eq!(anonymous.rate_limit(), None);
    }
}
