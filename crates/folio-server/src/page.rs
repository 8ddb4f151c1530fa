//! Page payloads and request-body extraction.
//!
//! Rendering happens outside this server. A page handler answers with the
//! template it wants and the JSON context for it.

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::de::DeserializeOwned;
use folio_core::SeoSettings;
use serde::Serialize;
use serde_json::Value;

/// Template name plus context.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub template: &'static str,
    pub context: Value,
}

impl Page {
    pub fn new(template: &'static str, context: Value) -> Self {
        Self { template, context }
    }

    /// Put the page's title and meta tags under `seo` in the context.
    pub fn with_seo(mut self, seo: Option<SeoSettings>) -> Self {
        if let Some(context) = self.context.as_object_mut() {
            let value = serde_json::to_value(seo).unwrap_or(Value::Null);
            context.insert("seo".to_string(), value);
        }
        self
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Body accepted either as JSON or as an urlencoded form, by content type.
#[derive(Debug, Clone)]
pub struct JsonOrForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            Ok(JsonOrForm(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            Ok(JsonOrForm(value))
        }
    }
}
