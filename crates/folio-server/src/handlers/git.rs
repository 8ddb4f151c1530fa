//! Git subdomain: the code-repository browser.
//!
//! Every page that lists projects runs one bounded sync pass over them first,
//! so stale GitHub metrics are refreshed inline and shown in the same response.

use crate::error::ApiError;
use crate::page::Page;
use crate::server::AppState;
use folio_core::{Project, ProjectFilter};
use serde_json::json;

pub async fn index(state: &AppState) -> Result<Page, ApiError> {
    listing(state, ProjectFilter::default(), "git/index.html").await
}

pub async fn search(state: &AppState, query: &str) -> Result<Page, ApiError> {
    let filter = ProjectFilter {
        query: (!query.is_empty()).then(|| query.to_string()),
        ..ProjectFilter::default()
    };
    listing(state, filter, "git/search.html").await
}

pub async fn category(state: &AppState, id: i64) -> Result<Page, ApiError> {
    let category = state.folio.db().get_category(id)?;
    let filter = ProjectFilter {
        category: Some(id),
        ..ProjectFilter::default()
    };
    let mut page = listing(state, filter, "git/category.html").await?;
    page.context["category"] = json!(category);
    Ok(page)
}

pub async fn project(state: &AppState, id: i64) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let mut project = db.get_project(id)?;
    state
        .folio
        .sync()
        .refresh_listing(std::slice::from_mut(&mut project))
        .await;

    let category = project
        .category_id
        .and_then(|category_id| db.get_category(category_id).ok());
    let technologies = project.technology_list();
    Ok(Page::new(
        "git/project.html",
        json!({
            "project": project,
            "category": category,
            "technologies": technologies,
        }),
    ))
}

async fn listing(
    state: &AppState,
    filter: ProjectFilter,
    template: &'static str,
) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let mut projects: Vec<Project> = db.list_projects(&filter)?;
    let report = state.folio.sync().refresh_listing(&mut projects).await;

    Ok(Page::new(
        template,
        json!({
            "projects": projects,
            "categories": db.list_categories()?,
            "query": filter.query,
            "sync": report,
        }),
    ))
}
