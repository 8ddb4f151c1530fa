//! Wiki subdomain pages.

use crate::error::ApiError;
use crate::page::Page;
use crate::server::AppState;
use serde_json::json;

const RECENT_ARTICLES: usize = 10;

pub fn index(state: &AppState) -> Result<Page, ApiError> {
    let db = state.folio.db();
    Ok(Page::new(
        "wiki/index.html",
        json!({
            "categories": db.list_wiki_categories()?,
            "recent_articles": db.recent_articles(RECENT_ARTICLES)?,
        }),
    ))
}

pub fn search(state: &AppState, query: &str) -> Result<Page, ApiError> {
    let articles = if query.is_empty() {
        Vec::new()
    } else {
        state.folio.db().search_articles(query)?
    };
    Ok(Page::new(
        "wiki/search.html",
        json!({ "query": query, "articles": articles }),
    ))
}

pub fn article(state: &AppState, id: i64) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let article = db.get_article(id)?;
    let category = article
        .category_id
        .and_then(|category_id| db.get_wiki_category(category_id).ok());
    let tags = folio_core::split_list(&article.tags);
    Ok(Page::new(
        "wiki/article.html",
        json!({ "article": article, "category": category, "tags": tags }),
    ))
}

pub fn category(state: &AppState, id: i64) -> Result<Page, ApiError> {
    let db = state.folio.db();
    let category = db.get_wiki_category(id)?;
    let subcategories: Vec<_> = db
        .list_wiki_categories()?
        .into_iter()
        .filter(|c| c.parent_id == Some(id))
        .collect();
    Ok(Page::new(
        "wiki/category.html",
        json!({
            "category": category,
            "subcategories": subcategories,
            "articles": db.articles_in_category(id)?,
        }),
    ))
}
