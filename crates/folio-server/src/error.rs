//! HTTP error responses.

use axum::{
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use folio_core::FolioError;
use serde_json::json;
use std::any::Any;
use tracing::{error, warn};

/// Full error text kept on the response for the debug-detail layer.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Error returned from every handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retry_after_secs: Option<u64>,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after_secs: None,
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "A valid admin token is required",
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    /// Masked 500 for a handler that panicked, keeping the payload as detail.
    pub fn panicked(payload: &(dyn Any + Send)) -> Self {
        let detail = if let Some(text) = payload.downcast_ref::<&str>() {
            text.to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        Self {
            detail: Some(format!("handler panicked: {}", detail)),
            ..Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            )
        }
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            retry_after_secs: Some(retry_after_secs.max(1)),
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests. Please try again later.",
            )
        }
    }
}

impl From<FolioError> for ApiError {
    fn from(err: FolioError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let retry_after_secs = match &err {
            FolioError::RateLimited {
                retry_after_secs, ..
            } => Some(retry_after_secs.unwrap_or(60)),
            _ => None,
        };

        let (message, detail) = if err.is_client_facing() {
            (err.to_string(), None)
        } else {
            ("Internal server error".to_string(), Some(error_chain(&err)))
        };

        Self {
            status,
            code: err.code(),
            message,
            retry_after_secs,
            detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                "{} ({}): {}",
                self.code,
                self.status.as_u16(),
                self.detail.as_deref().unwrap_or(&self.message)
            );
        } else if self.status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited: {}", self.message);
        }

        let body = match self.retry_after_secs {
            Some(secs) => json!({
                "success": false,
                "status": "error",
                "error": self.code,
                "message": self.message,
                "retry_after_secs": secs,
            }),
            None => json!({
                "success": false,
                "error": self.code,
                "message": self.message,
            }),
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        if let Some(detail) = self.detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Fallback for routes nothing else claimed.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_are_masked() {
        let err: ApiError = FolioError::Database {
            message: "no such table: projects".into(),
            source: None,
        }
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "database_error");
        assert_eq!(err.message, "Internal server error");

        let response = err.into_response();
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert!(detail.0.contains("no such table"));
    }

    #[test]
    fn test_client_errors_keep_message() {
        let err: ApiError = FolioError::MissingRepoUrl { project_id: 4 }.into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "missing_repo_url");
        assert!(err.message.contains("4"));
    }

    #[test]
    fn test_panic_payload_becomes_detail() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("index out of bounds"));
        let err = ApiError::panicked(payload.as_ref());
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");

        let response = err.into_response();
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.0, "handler panicked: index out of bounds");

        let opaque: Box<dyn Any + Send> = Box::new(42u8);
        assert!(ApiError::panicked(opaque.as_ref())
            .into_response()
            .extensions()
            .get::<ErrorDetail>()
            .is_some());
    }

    #[test]
    fn test_rate_limited_sets_header() {
        let response = ApiError::rate_limited(0).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }
}
