//! Per-client rate limiting for the public form endpoints.

use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Checks between sweeps of idle client keys.
const PRUNE_EVERY: u64 = 1024;

/// Endpoint groups with independent budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitGroup {
    Newsletter,
    Contact,
    Donation,
}

impl LimitGroup {
    fn as_str(&self) -> &'static str {
        match self {
            LimitGroup::Newsletter => "newsletter",
            LimitGroup::Contact => "contact",
            LimitGroup::Donation => "donation",
        }
    }
}

/// Keyed limiters, one per [`LimitGroup`], keyed by client address.
pub struct RateLimiters {
    newsletter: DefaultKeyedRateLimiter<String>,
    contact: DefaultKeyedRateLimiter<String>,
    donation: DefaultKeyedRateLimiter<String>,
    trust_proxy: bool,
    checks: AtomicU64,
}

impl RateLimiters {
    pub fn per_minute(requests: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
        Self {
            newsletter: RateLimiter::keyed(quota),
            contact: RateLimiter::keyed(quota),
            donation: RateLimiter::keyed(quota),
            trust_proxy: false,
            checks: AtomicU64::new(0),
        }
    }

    /// Key clients by their `X-Forwarded-For` address.
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }

    /// Client key for a request under this limiter's proxy setting.
    pub fn client_ip(&self, headers: &HeaderMap, extensions: &Extensions) -> ClientIp {
        ClientIp::from_parts(headers, extensions, self.trust_proxy)
    }

    fn limiter(&self, group: LimitGroup) -> &DefaultKeyedRateLimiter<String> {
        match group {
            LimitGroup::Newsletter => &self.newsletter,
            LimitGroup::Contact => &self.contact,
            LimitGroup::Donation => &self.donation,
        }
    }

    /// Take one request from the client's budget in `group`.
    pub fn check(&self, group: LimitGroup, client: &ClientIp) -> Result<(), ApiError> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }
        self.limiter(group).check_key(&client.0).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            debug!("{} limit hit for {}", group.as_str(), client.0);
            ApiError::rate_limited(wait.as_secs())
        })
    }

    /// Forget clients whose budget has fully replenished.
    pub fn prune(&self) {
        for group in [LimitGroup::Newsletter, LimitGroup::Contact, LimitGroup::Donation] {
            let limiter = self.limiter(group);
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Number of client keys currently tracked across all groups.
    pub fn tracked_clients(&self) -> usize {
        self.newsletter.len() + self.contact.len() + self.donation.len()
    }
}

/// Client address used as the rate-limit key.
///
/// The socket peer address, or the first `X-Forwarded-For` hop when the
/// server sits behind a trusted proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn from_parts(headers: &HeaderMap, extensions: &Extensions, trust_proxy: bool) -> Self {
        if trust_proxy {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|ip| !ip.is_empty());
            if let Some(ip) = forwarded {
                return ClientIp(ip.to_string());
            }
        }
        match extensions.get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => ClientIp(addr.ip().to_string()),
            None => ClientIp("unknown".to_string()),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(state.limiters.client_ip(&parts.headers, &parts.extensions))
    }
}
