//! Admin API: GitHub cache control and content management.
//!
//! Every handler takes [`AdminAuth`], which requires
//! `Authorization: Bearer <ADMIN_TOKEN>`. Without a configured token the
//! admin API is disabled and answers 403.

use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts},
    Json,
};
use folio_core::{
    ContactSubmission, Donation, GitHubCacheStats, NewCategory, NewProject, NewsletterSubscriber,
    Project, ProjectCategory, ProjectUpdate, RepoRef, SeoSettings, SeoUpdate,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

const CONTACTS_LIMIT: usize = 200;

/// Proof that the request carried the admin token.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.folio.settings().admin_token.as_deref() else {
            return Err(ApiError::forbidden("Admin API is disabled"));
        };

        let provided = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match provided {
            Some(token) if tokens_match(token, expected) => Ok(AdminAuth),
            Some(_) => {
                warn!("Rejected admin request to {} with a bad token", parts.uri.path());
                Err(ApiError::unauthorized())
            }
            None => Err(ApiError::unauthorized()),
        }
    }
}

// Compare digests so the comparison time does not depend on the token prefix.
fn tokens_match(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

// ============================================================================
// GitHub cache
// ============================================================================

pub async fn cache_stats(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<GitHubCacheStats>, ApiError> {
    Ok(Json(state.folio.sync().cache_stats()?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClearCacheRequest {
    /// `owner/name` or a repository URL; absent clears everything.
    pub repo: Option<String>,
}

pub async fn clear_cache(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    body: Option<Json<ClearCacheRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let repo = match request.repo.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(RepoRef::parse(raw)?),
        _ => None,
    };

    let removed = state.folio.sync().clear_cache(repo.as_ref())?;
    Ok(Json(json!({
        "success": true,
        "removed": removed,
        "repo": repo.map(|r| r.full_name()),
    })))
}

pub async fn force_refresh(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let project = state.folio.sync().force_refresh(id).await?;
    Ok(Json(json!({ "success": true, "project": project })))
}

// ============================================================================
// Content management
// ============================================================================

pub async fn list_categories(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProjectCategory>>, ApiError> {
    Ok(Json(state.folio.db().list_categories()?))
}

pub async fn create_category(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewCategory>,
) -> Result<Json<ProjectCategory>, ApiError> {
    Ok(Json(state.folio.db().create_category(new)?))
}

pub async fn delete_category(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.folio.db().delete_category(id)?;
    info!("Deleted project category {}", id);
    Ok(Json(json!({ "success": true })))
}

pub async fn create_project(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewProject>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.folio.db().create_project(new)?))
}

pub async fn update_project(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<ProjectUpdate>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.folio.db().update_project(id, update)?))
}

pub async fn delete_project(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.folio.db().delete_project(id)?;
    info!("Deleted project {}", id);
    Ok(Json(json!({ "success": true })))
}

pub async fn list_contacts(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ContactSubmission>>, ApiError> {
    Ok(Json(state.folio.db().list_contacts(CONTACTS_LIMIT)?))
}

pub async fn list_subscribers(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NewsletterSubscriber>>, ApiError> {
    Ok(Json(state.folio.db().active_subscribers()?))
}

pub async fn complete_donation(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Donation>, ApiError> {
    Ok(Json(state.folio.db().complete_donation(id)?))
}

// ============================================================================
// SEO metadata
// ============================================================================

pub async fn list_seo(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SeoSettings>>, ApiError> {
    Ok(Json(state.folio.db().list_seo()?))
}

pub async fn upsert_seo(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
    Json(update): Json<SeoUpdate>,
) -> Result<Json<SeoSettings>, ApiError> {
    Ok(Json(state.folio.db().upsert_seo(&page, &update)?))
}
