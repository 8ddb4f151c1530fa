//! Public JSON API.

use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use folio_core::{Project, ProjectFilter};
use serde_json::{json, Value};
use std::sync::Arc;

/// Project listing; stale projects among the first few are refreshed first.
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Value>, ApiError> {
    let mut projects = state.folio.db().list_projects(&filter)?;
    let report = state.folio.sync().refresh_listing(&mut projects).await;

    Ok(Json(json!({
        "success": true,
        "count": projects.len(),
        "projects": projects,
        "sync": report,
    })))
}

pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.folio.db().get_project(id)?))
}
