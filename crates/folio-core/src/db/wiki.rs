//! Wiki storage.

use super::{format_time, is_unique_violation, parse_time, Database};
use crate::error::{FolioError, Result};
use crate::models::{NewWikiArticle, WikiArticle, WikiCategory};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

const ARTICLE_COLUMNS: &str = "id, title, content, tags, category_id, created_at, updated_at";

fn row_to_article(row: &Row<'_>) -> rusqlite::Result<WikiArticle> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(WikiArticle {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        tags: row.get(3)?,
        category_id: row.get(4)?,
        created_at: parse_time(&created_at),
        updated_at: parse_time(&updated_at),
    })
}

fn row_to_wiki_category(row: &Row<'_>) -> rusqlite::Result<WikiCategory> {
    let created_at: String = row.get(4)?;
    Ok(WikiCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        parent_id: row.get(3)?,
        created_at: parse_time(&created_at),
    })
}

impl Database {
    pub fn list_wiki_categories(&self) -> Result<Vec<WikiCategory>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, parent_id, created_at
             FROM wiki_categories ORDER BY name COLLATE NOCASE",
        )?;
        let rows = stmt
            .query_map([], row_to_wiki_category)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_wiki_category(&self, id: i64) -> Result<WikiCategory> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, description, parent_id, created_at
             FROM wiki_categories WHERE id = ?1",
            params![id],
            row_to_wiki_category,
        )
        .optional()?
        .ok_or(FolioError::NotFound {
            entity: "wiki category",
            id,
        })
    }

    pub fn create_wiki_category(
        &self,
        name: &str,
        description: Option<&str>,
        parent_id: Option<i64>,
    ) -> Result<WikiCategory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FolioError::validation("name", "category name is required"));
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO wiki_categories (name, description, parent_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, description, parent_id, format_time(Utc::now())],
        )?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            "SELECT id, name, description, parent_id, created_at
             FROM wiki_categories WHERE id = ?1",
            params![id],
            row_to_wiki_category,
        )?)
    }

    /// Most recently updated articles first.
    pub fn recent_articles(&self, limit: usize) -> Result<Vec<WikiArticle>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM wiki_articles ORDER BY updated_at DESC, id DESC LIMIT ?1",
            ARTICLE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_article)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_article(&self, id: i64) -> Result<WikiArticle> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM wiki_articles WHERE id = ?1", ARTICLE_COLUMNS),
            params![id],
            row_to_article,
        )
        .optional()?
        .ok_or(FolioError::NotFound {
            entity: "article",
            id,
        })
    }

    pub fn articles_in_category(&self, category_id: i64) -> Result<Vec<WikiArticle>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM wiki_articles WHERE category_id = ?1 ORDER BY title COLLATE NOCASE",
            ARTICLE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![category_id], row_to_article)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Case-insensitive substring search over title, content and tags.
    pub fn search_articles(&self, query: &str) -> Result<Vec<WikiArticle>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", query.replace('%', "").replace('_', ""));
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM wiki_articles
             WHERE title LIKE ?1 OR content LIKE ?1 OR tags LIKE ?1
             ORDER BY updated_at DESC, id DESC",
            ARTICLE_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![pattern], row_to_article)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn create_article(&self, new: NewWikiArticle) -> Result<WikiArticle> {
        new.validate()?;
        let title = new.title.trim().to_string();
        self.transaction(|tx| {
            if let Some(category_id) = new.category_id {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM wiki_categories WHERE id = ?1)",
                    params![category_id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(FolioError::validation("category_id", "unknown wiki category"));
                }
            }
            tx.execute(
                "INSERT INTO wiki_articles (title, content, tags, category_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    title,
                    new.content,
                    new.tags.trim(),
                    new.category_id,
                    format_time(Utc::now())
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    FolioError::Conflict(format!("an article titled '{}' already exists", title))
                } else {
                    e.into()
                }
            })?;
            let id = tx.last_insert_rowid();
            Ok(tx.query_row(
                &format!("SELECT {} FROM wiki_articles WHERE id = ?1", ARTICLE_COLUMNS),
                params![id],
                row_to_article,
            )?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, tags: &str, category_id: Option<i64>) -> NewWikiArticle {
        NewWikiArticle {
            title: title.into(),
            content: format!("Notes about {}", title),
            tags: tags.into(),
            category_id,
        }
    }

    #[test]
    fn test_articles_by_category_and_search() {
        let db = Database::open_in_memory().unwrap();
        let rust = db.create_wiki_category("Rust", Some("Systems"), None).unwrap();
        let async_cat = db
            .create_wiki_category("Async", None, Some(rust.id))
            .unwrap();
        assert_eq!(async_cat.parent_id, Some(rust.id));

        let ownership = db
            .create_article(article("Ownership", "borrowing", Some(rust.id)))
            .unwrap();
        db.create_article(article("Tokio", "runtime", Some(async_cat.id)))
            .unwrap();

        let in_rust = db.articles_in_category(rust.id).unwrap();
        assert_eq!(in_rust.len(), 1);
        assert_eq!(in_rust[0].id, ownership.id);

        assert_eq!(db.search_articles("BORROW").unwrap().len(), 1);
        assert_eq!(db.search_articles("notes").unwrap().len(), 2);
        assert!(db.search_articles("  ").unwrap().is_empty());
        assert_eq!(db.recent_articles(1).unwrap().len(), 1);
    }

    #[test]
    fn test_article_errors() {
        let db = Database::open_in_memory().unwrap();
        db.create_article(article("Ownership", "", None)).unwrap();
        assert!(matches!(
            db.create_article(article("Ownership", "", None)),
            Err(FolioError::Conflict(_))
        ));
        assert!(matches!(
            db.create_article(article("Lifetimes", "", Some(42))),
            Err(FolioError::Validation { .. })
        ));
        assert!(matches!(
            db.get_article(999),
            Err(FolioError::NotFound { entity: "article", id: 999 })
        ));
    }
}
