//! Error types for Folio.
//!
//! Every fallible operation in the core returns [`FolioError`]. The server maps
//! each variant to an HTTP status with [`FolioError::status_code`] and to a
//! stable machine-readable code with [`FolioError::code`].

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Folio core.
#[derive(Debug, Error)]
pub enum FolioError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limited by {service}, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },

    // GitHub errors
    #[error("GitHub API error: {message}")]
    GitHubApi {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Repository not found on GitHub: {repo}")]
    RepoNotFound { repo: String },

    #[error("Recent fetch failure for {repo} is still cached ({kind})")]
    RecentFailure { repo: String, kind: String },

    #[error("Cannot parse repository reference: {url}")]
    InvalidRepoUrl { url: String },

    #[error("Project {project_id} has no repository reference")]
    MissingRepoUrl { project_id: i64 },

    // Storage errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Lookup errors
    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: i64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    // Input errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Folio operations.
pub type Result<T> = std::result::Result<T, FolioError>;

impl From<std::io::Error> for FolioError {
    fn from(err: std::io::Error) -> Self {
        FolioError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(err: serde_json::Error) -> Self {
        FolioError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for FolioError {
    fn from(err: rusqlite::Error) -> Self {
        FolioError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for FolioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FolioError::Timeout(crate::config::NetworkConfig::REQUEST_TIMEOUT)
        } else {
            FolioError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

impl FolioError {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FolioError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        FolioError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// HTTP status code for this error.
    ///
    /// - 400: malformed input, unparseable or missing repository references
    /// - 404: missing entities
    /// - 409: uniqueness conflicts
    /// - 429: rate limited (our own limiter or GitHub's)
    /// - 502: GitHub answered with an error or is unreachable
    /// - 504: GitHub timed out
    /// - 500: everything else
    pub fn status_code(&self) -> u16 {
        match self {
            FolioError::Validation { .. }
            | FolioError::InvalidRepoUrl { .. }
            | FolioError::MissingRepoUrl { .. } => 400,

            FolioError::ProjectNotFound { .. }
            | FolioError::NotFound { .. }
            | FolioError::RepoNotFound { .. } => 404,

            FolioError::Conflict(_) => 409,

            FolioError::RateLimited { .. } => 429,

            FolioError::Network { .. }
            | FolioError::GitHubApi { .. }
            | FolioError::RecentFailure { .. } => 502,

            FolioError::Timeout(_) => 504,

            _ => 500,
        }
    }

    /// Stable snake_case identifier used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            FolioError::Network { .. } => "network_error",
            FolioError::Timeout(_) => "timeout",
            FolioError::RateLimited { .. } => "rate_limited",
            FolioError::GitHubApi { .. } => "github_api_error",
            FolioError::RepoNotFound { .. } => "repo_not_found",
            FolioError::RecentFailure { .. } => "recent_failure",
            FolioError::InvalidRepoUrl { .. } => "invalid_repo_url",
            FolioError::MissingRepoUrl { .. } => "missing_repo_url",
            FolioError::Database { .. } => "database_error",
            FolioError::Io { .. } => "io_error",
            FolioError::Json { .. } => "json_error",
            FolioError::ProjectNotFound { .. } | FolioError::NotFound { .. } => "not_found",
            FolioError::Validation { .. } => "validation_error",
            FolioError::Conflict(_) => "conflict",
            FolioError::Config { .. } => "config_error",
            FolioError::Other(_) => "internal_error",
        }
    }

    /// Whether the message is safe to show to an end user.
    ///
    /// Storage and IO errors can leak paths and SQL, so they are replaced with
    /// a generic message outside debug mode.
    pub fn is_client_facing(&self) -> bool {
        self.status_code() < 500 || matches!(self, FolioError::GitHubApi { .. })
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            FolioError::Network { .. } | FolioError::Timeout(_) => true,
            FolioError::GitHubApi {
                status_code: Some(code),
                ..
            } => matches!(code, 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FolioError::InvalidRepoUrl {
            url: "not a url".into(),
        };
        assert_eq!(err.to_string(), "Cannot parse repository reference: not a url");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(FolioError::MissingRepoUrl { project_id: 3 }.status_code(), 400);
        assert_eq!(FolioError::ProjectNotFound { project_id: 3 }.status_code(), 404);
        assert_eq!(
            FolioError::GitHubApi {
                message: "boom".into(),
                status_code: Some(500)
            }
            .status_code(),
            502
        );
        assert_eq!(FolioError::Other("x".into()).status_code(), 500);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(FolioError::Timeout(std::time::Duration::from_secs(5)).is_retryable());
        assert!(FolioError::GitHubApi {
            message: "bad gateway".into(),
            status_code: Some(502)
        }
        .is_retryable());
        assert!(!FolioError::RepoNotFound {
            repo: "acme/widget".into()
        }
        .is_retryable());
        assert!(!FolioError::RateLimited {
            service: "GitHub".into(),
            retry_after_secs: None
        }
        .is_retryable());
    }

    #[test]
    fn test_database_errors_are_not_client_facing() {
        let err = FolioError::Database {
            message: "no such table: project".into(),
            source: None,
        };
        assert!(!err.is_client_facing());
        assert!(FolioError::validation("email", "required").is_client_facing());
    }
}
