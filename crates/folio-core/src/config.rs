//! Centralized configuration for Folio.
//!
//! Compiled-in defaults live in the constant structs below. Deployment-specific
//! values come from the environment through [`Settings`].

use crate::error::{FolioError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Folio";
    pub const USER_AGENT: &'static str = "Folio-Portfolio/1.0";
    pub const DEFAULT_SITE_URL: &'static str = "http://localhost:5000";
    pub const DEFAULT_STORE_URL: &'static str = "https://store.example.com";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
    pub const GITHUB_API_BASE: &'static str = "https://api.github.com";
    pub const GITHUB_ACCEPT: &'static str = "application/vnd.github.v3+json";
}

/// Project sync policy defaults.
pub struct SyncConfig;

impl SyncConfig {
    /// A project is stale once its metrics are older than this.
    pub const PROJECT_TTL: Duration = Duration::from_secs(24 * 3600);
    /// Projects evaluated for staleness per listing request.
    pub const CANDIDATE_LIMIT: usize = 5;
    /// Refresh attempts allowed per listing request.
    pub const REFRESH_LIMIT: usize = 3;
}

/// Lifetimes of GitHub cache records.
pub struct CacheTtlConfig;

impl CacheTtlConfig {
    pub const METRICS: Duration = Duration::from_secs(2 * 3600);
    pub const NOT_FOUND: Duration = Duration::from_secs(6 * 3600);
    pub const FORBIDDEN: Duration = Duration::from_secs(3600);
    pub const API_ERROR: Duration = Duration::from_secs(30 * 60);
    pub const TRANSPORT_ERROR: Duration = Duration::from_secs(15 * 60);
}

/// Limits for public form submissions.
pub struct FormLimits;

impl FormLimits {
    pub const NAME_MAX: usize = 100;
    pub const EMAIL_MAX: usize = 120;
    pub const SUBJECT_MAX: usize = 200;
    pub const MESSAGE_MIN: usize = 10;
    pub const MESSAGE_MAX: usize = 5000;
    pub const INTERESTS_MAX: usize = 255;
    pub const RATE_LIMIT_PER_MINUTE: u32 = 5;
}

/// Shared directory and path configurations.
pub struct PathsConfig;

impl PathsConfig {
    pub const DATA_DIR_NAME: &'static str = "folio-data";
    pub const DATABASE_FILENAME: &'static str = "folio.sqlite";
    pub const CACHE_FILENAME: &'static str = "cache.sqlite";
}

/// Which cache backend holds GitHub metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Sqlite,
    Memory,
}

impl CacheBackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackendKind::Sqlite => "sqlite",
            CacheBackendKind::Memory => "memory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Some(CacheBackendKind::Sqlite),
            "memory" | "simple" => Some(CacheBackendKind::Memory),
            _ => None,
        }
    }
}

/// Deployment settings read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub cache_backend: CacheBackendKind,
    pub cache_path: PathBuf,
    /// When set, subdomains are recognised from the `Host` header; otherwise
    /// they are served under `/wiki`, `/git`, ... path prefixes.
    pub server_name: Option<String>,
    pub site_url: String,
    pub store_url: String,
    pub secret_key: String,
    pub admin_token: Option<String>,
    pub debug: bool,
    pub github_token: Option<String>,
    pub github_mock_mode: bool,
    pub sync_ttl: Duration,
    pub mail_sender: String,
    pub admin_email: Option<String>,
    pub rate_limit_per_minute: u32,
    /// Key rate limits on `X-Forwarded-For` instead of the socket address.
    /// Only safe behind a proxy that overwrites the header.
    pub trust_proxy: bool,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from the process environment, treating `force_debug` as
    /// if `FOLIO_DEBUG=true` were set. Debug defaults such as the development
    /// secret then apply before validation.
    pub fn from_env_with_debug(force_debug: bool) -> Result<Self> {
        Self::from_lookup_with_debug(|key| std::env::var(key).ok(), force_debug)
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup_with_debug(lookup, false)
    }

    pub fn from_lookup_with_debug<F>(lookup: F, force_debug: bool) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let debug =
            force_debug || parse_bool("FOLIO_DEBUG", get("FOLIO_DEBUG"))?.unwrap_or(false);
        let data_dir = PathBuf::from(PathsConfig::DATA_DIR_NAME);

        let cache_backend = match get("CACHE_BACKEND") {
            Some(raw) => CacheBackendKind::parse(&raw).ok_or_else(|| FolioError::Config {
                message: format!("CACHE_BACKEND must be 'sqlite' or 'memory', got '{}'", raw),
            })?,
            None => CacheBackendKind::Sqlite,
        };

        let secret_key = match get("SECRET_KEY") {
            Some(key) => key,
            None if debug => "folio-development-secret".to_string(),
            None => {
                return Err(FolioError::Config {
                    message: "SECRET_KEY must be set outside debug mode".into(),
                })
            }
        };

        let sync_ttl = match get("GITHUB_SYNC_TTL_HOURS") {
            Some(raw) => {
                let hours: u64 = raw.parse().map_err(|_| FolioError::Config {
                    message: format!("GITHUB_SYNC_TTL_HOURS must be a whole number, got '{}'", raw),
                })?;
                if hours == 0 {
                    return Err(FolioError::Config {
                        message: "GITHUB_SYNC_TTL_HOURS must be at least 1".into(),
                    });
                }
                let secs = hours.checked_mul(3600).ok_or_else(|| FolioError::Config {
                    message: format!("GITHUB_SYNC_TTL_HOURS is too large, got '{}'", raw),
                })?;
                Duration::from_secs(secs)
            }
            None => SyncConfig::PROJECT_TTL,
        };

        let rate_limit_per_minute = match get("RATE_LIMIT_PER_MINUTE") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| FolioError::Config {
                    message: format!("RATE_LIMIT_PER_MINUTE must be a positive number, got '{}'", raw),
                })?,
            None => FormLimits::RATE_LIMIT_PER_MINUTE,
        };

        Ok(Self {
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(PathsConfig::DATABASE_FILENAME)),
            cache_backend,
            cache_path: get("CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join(PathsConfig::CACHE_FILENAME)),
            server_name: get("SERVER_NAME").map(|s| s.to_lowercase()),
            site_url: get("SITE_URL")
                .unwrap_or_else(|| AppConfig::DEFAULT_SITE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            store_url: get("STORE_URL").unwrap_or_else(|| AppConfig::DEFAULT_STORE_URL.to_string()),
            secret_key,
            admin_token: get("ADMIN_TOKEN"),
            debug,
            github_token: get("GITHUB_TOKEN"),
            github_mock_mode: parse_bool("GITHUB_MOCK_MODE", get("GITHUB_MOCK_MODE"))?
                .unwrap_or(false),
            sync_ttl,
            mail_sender: get("MAIL_SENDER").unwrap_or_else(|| "noreply@localhost".to_string()),
            admin_email: get("ADMIN_EMAIL"),
            rate_limit_per_minute,
            trust_proxy: parse_bool("TRUST_PROXY", get("TRUST_PROXY"))?.unwrap_or(false),
        })
    }

    /// Settings for tests and local tooling: debug on, in-memory cache,
    /// everything else at defaults.
    pub fn for_development(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            cache_backend: CacheBackendKind::Memory,
            cache_path: PathBuf::from(PathsConfig::CACHE_FILENAME),
            server_name: None,
            site_url: AppConfig::DEFAULT_SITE_URL.to_string(),
            store_url: AppConfig::DEFAULT_STORE_URL.to_string(),
            secret_key: "folio-development-secret".to_string(),
            admin_token: None,
            debug: true,
            github_token: None,
            github_mock_mode: true,
            sync_ttl: SyncConfig::PROJECT_TTL,
            mail_sender: "noreply@localhost".to_string(),
            admin_email: None,
            rate_limit_per_minute: FormLimits::RATE_LIMIT_PER_MINUTE,
            trust_proxy: false,
        }
    }

    /// Whether subdomains are dispatched by host rather than path prefix.
    pub fn host_routing(&self) -> bool {
        self.server_name.is_some()
    }
}

fn parse_bool(key: &str, raw: Option<String>) -> Result<Option<bool>> {
    match raw {
        None => Ok(None),
        Some(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(FolioError::Config {
                message: format!("{} must be a boolean, got '{}'", key, v),
            }),
        },
    }
}
