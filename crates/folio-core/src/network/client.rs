//! HTTP client with rate limit awareness.
//!
//! Wraps reqwest with:
//! - Rate limit tracking from `X-RateLimit-*` response headers
//! - Throttling when close to the limit
//! - A fixed per-request timeout and user agent

use crate::config::{AppConfig, NetworkConfig};
use crate::error::{FolioError, Result};
use crate::models::RateLimitSnapshot;
use reqwest::{header, Client, Response, StatusCode};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

impl RateLimitSnapshot {
    /// Throttle when below 10% of the limit.
    pub fn should_throttle(&self) -> bool {
        match (self.remaining, self.limit) {
            (Some(remaining), Some(limit)) if limit > 0 => {
                let threshold = (limit as f64 * 0.1) as u64;
                remaining < threshold.max(1)
            }
            _ => false,
        }
    }
}

pub struct HttpClient {
    client: Client,
    rate_limit_remaining: AtomicI64,
    rate_limit_limit: AtomicU64,
    rate_limit_reset: AtomicU64,
    timeout: Duration,
    throttle_delay: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(NetworkConfig::REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| FolioError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            rate_limit_remaining: AtomicI64::new(-1),
            rate_limit_limit: AtomicU64::new(0),
            rate_limit_reset: AtomicU64::new(0),
            timeout,
            throttle_delay: Duration::from_millis(500),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Last rate limit values seen, `None` fields if never reported.
    pub fn rate_limit_state(&self) -> RateLimitSnapshot {
        let remaining = self.rate_limit_remaining.load(Ordering::SeqCst);
        let limit = self.rate_limit_limit.load(Ordering::SeqCst);
        let reset = self.rate_limit_reset.load(Ordering::SeqCst);
        RateLimitSnapshot {
            remaining: (remaining >= 0).then_some(remaining as u64),
            limit: (limit > 0).then_some(limit),
            reset: (reset > 0).then_some(reset),
        }
    }

    /// GET with extra headers. Non-success statuses other than 429 are
    /// returned to the caller for interpretation.
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<Response> {
        self.maybe_throttle().await;

        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(*key, value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FolioError::Timeout(self.timeout)
            } else {
                FolioError::Network {
                    message: format!("GET {} failed: {}", url, e),
                    source: Some(e),
                }
            }
        })?;

        self.update_rate_limits(&response);
        check_too_many_requests(response, url)
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 408 | 429 | 500 | 502 | 503 | 504)
    }

    async fn maybe_throttle(&self) {
        let state = self.rate_limit_state();
        if state.should_throttle() {
            warn!(
                "Rate limit approaching (remaining: {:?}/{:?}), throttling for {:?}",
                state.remaining, state.limit, self.throttle_delay
            );
            tokio::time::sleep(self.throttle_delay).await;
        }
    }

    fn update_rate_limits(&self, response: &Response) {
        let headers = response.headers();
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };

        if let Some(remaining) = read("X-RateLimit-Remaining") {
            self.rate_limit_remaining
                .store(remaining.min(i64::MAX as u64) as i64, Ordering::SeqCst);
        }
        if let Some(limit) = read("X-RateLimit-Limit") {
            self.rate_limit_limit.store(limit, Ordering::SeqCst);
        }
        if let Some(reset) = read("X-RateLimit-Reset") {
            self.rate_limit_reset.store(reset, Ordering::SeqCst);
        }

        let state = self.rate_limit_state();
        if let (Some(remaining), Some(limit)) = (state.remaining, state.limit) {
            debug!("Rate limit: {}/{}", remaining, limit);
        }
    }
}

fn check_too_many_requests(response: Response, url: &str) -> Result<Response> {
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return Ok(response);
    }
    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    Err(FolioError::RateLimited {
        service: extract_domain(url),
        retry_after_secs: retry_after,
    })
}

/// Host part of a URL, `"unknown"` if it has none.
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_threshold() {
        let low = RateLimitSnapshot {
            remaining: Some(5),
            limit: Some(60),
            reset: None,
        };
        assert!(low.should_throttle());

        let plenty = RateLimitSnapshot {
            remaining: Some(50),
            limit: Some(60),
            reset: None,
        };
        assert!(!plenty.should_throttle());
        assert!(!RateLimitSnapshot::default().should_throttle());
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://api.github.com/repos/acme/widget"),
            "api.github.com"
        );
        assert_eq!(extract_domain("not a url"), "unknown");
    }

    #[test]
    fn test_retryable_status_codes() {
        assert!(HttpClient::is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(HttpClient::is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!HttpClient::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!HttpClient::is_retryable_status(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_fresh_client_has_no_rate_limit_data() {
        let client = HttpClient::with_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(client.rate_limit_state(), RateLimitSnapshot::default());
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }
}
