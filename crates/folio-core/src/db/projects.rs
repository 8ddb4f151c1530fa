//! Project and category storage.

use super::{format_time, is_unique_violation, parse_time, Database};
use crate::error::{FolioError, Result};
use crate::models::{
    NewCategory, NewProject, Project, ProjectCategory, ProjectFilter, ProjectStatus,
    ProjectUpdate,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::{debug, info};

const PROJECT_COLUMNS: &str = "id, title, description, image_url, github_url, live_url, \
     commercial_url, technologies, category_id, stars, forks, last_synced, is_featured, \
     is_opensource, show_on_homepage, status, created_at, updated_at";

const LISTING_ORDER: &str = "ORDER BY is_featured DESC, created_at DESC, id DESC";

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    let last_synced: Option<String> = row.get(11)?;
    let status: String = row.get(15)?;
    let created_at: String = row.get(16)?;
    let updated_at: String = row.get(17)?;
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        github_url: row.get(4)?,
        live_url: row.get(5)?,
        commercial_url: row.get(6)?,
        technologies: row.get(7)?,
        category_id: row.get(8)?,
        stars: row.get(9)?,
        forks: row.get(10)?,
        last_synced: last_synced.as_deref().map(parse_time),
        is_featured: row.get(12)?,
        is_opensource: row.get(13)?,
        show_on_homepage: row.get(14)?,
        status: ProjectStatus::parse(&status).unwrap_or_default(),
        created_at: parse_time(&created_at),
        updated_at: parse_time(&updated_at),
    })
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<ProjectCategory> {
    let created_at: String = row.get(5)?;
    Ok(ProjectCategory {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        color: row.get(4)?,
        created_at: parse_time(&created_at),
    })
}

fn select_project(conn: &Connection, id: i64) -> Result<Option<Project>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
            params![id],
            row_to_project,
        )
        .optional()?)
}

fn ensure_category_exists(conn: &Connection, category_id: Option<i64>) -> Result<()> {
    let Some(category_id) = category_id else {
        return Ok(());
    };
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM project_categories WHERE id = ?1)",
        params![category_id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(FolioError::validation(
            "category_id",
            format!("category {} does not exist", category_id),
        ))
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Database {
    /// Projects matching `filter`, in listing order.
    pub fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(category) = filter.category {
            clauses.push("category_id = ?");
            values.push(Value::Integer(category));
        }
        if let Some(featured) = filter.featured {
            clauses.push("is_featured = ?");
            values.push(Value::Integer(featured as i64));
        }
        if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            clauses.push(
                "(title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\' \
                 OR technologies LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(query);
            for _ in 0..3 {
                values.push(Value::Text(pattern.clone()));
            }
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM projects {} {}",
            PROJECT_COLUMNS, where_sql, LISTING_ORDER
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let projects = stmt
            .query_map(params_from_iter(values), row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Projects flagged for the homepage, falling back to featured ones.
    pub fn homepage_projects(&self, limit: usize) -> Result<Vec<Project>> {
        let conn = self.lock()?;
        let query = |column: &str| -> Result<Vec<Project>> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM projects WHERE {} = 1 {} LIMIT ?1",
                PROJECT_COLUMNS, column, LISTING_ORDER
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], row_to_project)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        };

        let projects = query("show_on_homepage")?;
        if projects.is_empty() {
            query("is_featured")
        } else {
            Ok(projects)
        }
    }

    /// Total and featured project counts.
    pub fn project_counts(&self) -> Result<(i64, i64)> {
        let conn = self.lock()?;
        Ok(conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_featured), 0) FROM projects",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
    }

    pub fn get_project(&self, id: i64) -> Result<Project> {
        let conn = self.lock()?;
        select_project(&conn, id)?.ok_or(FolioError::ProjectNotFound { project_id: id })
    }

    pub fn create_project(&self, new: NewProject) -> Result<Project> {
        new.validate()?;
        let now = format_time(Utc::now());

        let project = self.transaction(|tx| {
            ensure_category_exists(tx, new.category_id)?;
            tx.execute(
                "INSERT INTO projects (title, description, image_url, github_url, live_url,
                     commercial_url, technologies, category_id, stars, forks, is_featured,
                     is_opensource, show_on_homepage, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)",
                params![
                    new.title.trim(),
                    optional_text(new.description),
                    optional_text(new.image_url),
                    optional_text(new.github_url),
                    optional_text(new.live_url),
                    optional_text(new.commercial_url),
                    new.technologies.trim(),
                    new.category_id,
                    new.stars,
                    new.forks,
                    new.is_featured,
                    new.is_opensource,
                    new.show_on_homepage,
                    new.status.as_str(),
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            select_project(tx, id)?.ok_or(FolioError::ProjectNotFound { project_id: id })
        })?;

        info!("Created project {} ({})", project.id, project.title);
        Ok(project)
    }

    pub fn update_project(&self, id: i64, update: ProjectUpdate) -> Result<Project> {
        update.validate()?;

        self.transaction(|tx| {
            let mut project =
                select_project(tx, id)?.ok_or(FolioError::ProjectNotFound { project_id: id })?;
            update.apply(&mut project);
            ensure_category_exists(tx, project.category_id)?;
            project.description = optional_text(project.description.take());
            project.image_url = optional_text(project.image_url.take());
            project.github_url = optional_text(project.github_url.take());
            project.live_url = optional_text(project.live_url.take());
            project.commercial_url = optional_text(project.commercial_url.take());
            project.updated_at = Utc::now();

            tx.execute(
                "UPDATE projects SET title = ?1, description = ?2, image_url = ?3,
                     github_url = ?4, live_url = ?5, commercial_url = ?6, technologies = ?7,
                     category_id = ?8, is_featured = ?9, is_opensource = ?10,
                     show_on_homepage = ?11, status = ?12, updated_at = ?13
                 WHERE id = ?14",
                params![
                    project.title,
                    project.description,
                    project.image_url,
                    project.github_url,
                    project.live_url,
                    project.commercial_url,
                    project.technologies,
                    project.category_id,
                    project.is_featured,
                    project.is_opensource,
                    project.show_on_homepage,
                    project.status.as_str(),
                    format_time(project.updated_at),
                    id,
                ],
            )?;
            debug!("Updated project {}", id);
            Ok(project)
        })
    }

    pub fn delete_project(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(FolioError::ProjectNotFound { project_id: id });
        }
        info!("Deleted project {}", id);
        Ok(())
    }

    /// Store freshly fetched repository metrics and stamp the sync time.
    pub fn update_github_metrics(
        &self,
        id: i64,
        stars: i64,
        forks: i64,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        self.transaction(|tx| {
            let updated = tx.execute(
                "UPDATE projects SET stars = ?1, forks = ?2, last_synced = ?3 WHERE id = ?4",
                params![stars, forks, format_time(synced_at), id],
            )?;
            if updated == 0 {
                return Err(FolioError::ProjectNotFound { project_id: id });
            }
            Ok(())
        })
    }

    pub fn list_categories(&self) -> Result<Vec<ProjectCategory>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, icon, color, created_at
             FROM project_categories ORDER BY name COLLATE NOCASE",
        )?;
        let categories = stmt
            .query_map([], row_to_category)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    pub fn get_category(&self, id: i64) -> Result<ProjectCategory> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, description, icon, color, created_at
             FROM project_categories WHERE id = ?1",
            params![id],
            row_to_category,
        )
        .optional()?
        .ok_or(FolioError::NotFound {
            entity: "category",
            id,
        })
    }

    pub fn create_category(&self, new: NewCategory) -> Result<ProjectCategory> {
        new.validate()?;
        let name = new.name.trim().to_string();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO project_categories (name, description, icon, color, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                name,
                optional_text(new.description),
                optional_text(new.icon),
                optional_text(new.color),
                format_time(Utc::now()),
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                FolioError::Conflict(format!("category '{}' already exists", name))
            } else {
                e.into()
            }
        })?;
        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            "SELECT id, name, description, icon, color, created_at
             FROM project_categories WHERE id = ?1",
            params![id],
            row_to_category,
        )?)
    }

    /// Delete a category; its projects become uncategorised.
    pub fn delete_category(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM project_categories WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(FolioError::NotFound {
                entity: "category",
                id,
            });
        }
        info!("Deleted category {}", id);
        Ok(())
    }
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(title: &str) -> NewProject {
        NewProject {
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_project(NewProject {
                github_url: Some(" https://github.com/acme/widget ".into()),
                description: Some("   ".into()),
                technologies: "Rust, SQLite".into(),
                status: ProjectStatus::InProgress,
                ..project("Widget")
            })
            .unwrap();

        let loaded = db.get_project(created.id).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.github_url.as_deref(), Some("https://github.com/acme/widget"));
        assert_eq!(loaded.description, None);
        assert_eq!(loaded.last_synced, None);
        assert_eq!(loaded.status, ProjectStatus::InProgress);
        assert_eq!(loaded.technology_list(), vec!["Rust", "SQLite"]);
    }

    #[test]
    fn test_listing_order_and_filters() {
        let db = Database::open_in_memory().unwrap();
        let first = db.create_project(project("Alpha")).unwrap();
        let featured = db
            .create_project(NewProject {
                is_featured: true,
                ..project("Beta")
            })
            .unwrap();
        let third = db
            .create_project(NewProject {
                technologies: "Rust".into(),
                ..project("Gamma")
            })
            .unwrap();

        let ids: Vec<i64> = db
            .list_projects(&ProjectFilter::default())
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![featured.id, third.id, first.id]);

        let rust = db
            .list_projects(&ProjectFilter {
                query: Some("rust".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rust.len(), 1);
        assert_eq!(rust[0].id, third.id);

        let only_featured = db
            .list_projects(&ProjectFilter {
                featured: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(only_featured.len(), 1);
        assert_eq!(db.project_counts().unwrap(), (3, 1));
    }

    #[test]
    fn test_like_wildcards_are_literal() {
        let db = Database::open_in_memory().unwrap();
        db.create_project(project("Alpha")).unwrap();
        let hits = db
            .list_projects(&ProjectFilter {
                query: Some("%".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_homepage_falls_back_to_featured() {
        let db = Database::open_in_memory().unwrap();
        db.create_project(project("Plain")).unwrap();
        let featured = db
            .create_project(NewProject {
                is_featured: true,
                ..project("Featured")
            })
            .unwrap();
        let homepage = db.homepage_projects(6).unwrap();
        assert_eq!(homepage.iter().map(|p| p.id).collect::<Vec<_>>(), vec![featured.id]);

        let pinned = db
            .create_project(NewProject {
                show_on_homepage: true,
                ..project("Pinned")
            })
            .unwrap();
        let homepage = db.homepage_projects(6).unwrap();
        assert_eq!(homepage.iter().map(|p| p.id).collect::<Vec<_>>(), vec![pinned.id]);
    }

    #[test]
    fn test_update_metrics() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_project(project("Widget")).unwrap();
        let now = Utc::now();

        db.update_github_metrics(created.id, 42, 7, now).unwrap();
        let loaded = db.get_project(created.id).unwrap();
        assert_eq!((loaded.stars, loaded.forks), (42, 7));
        assert_eq!(loaded.last_synced.map(format_time), Some(format_time(now)));

        assert!(matches!(
            db.update_github_metrics(999, 1, 1, now),
            Err(FolioError::ProjectNotFound { project_id: 999 })
        ));
    }

    #[test]
    fn test_update_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_project(NewProject {
                github_url: Some("https://github.com/acme/widget".into()),
                ..project("Widget")
            })
            .unwrap();

        let update: ProjectUpdate =
            serde_json::from_str(r#"{"title": "Widget 2", "github_url": null}"#).unwrap();
        let updated = db.update_project(created.id, update).unwrap();
        assert_eq!(updated.title, "Widget 2");
        assert_eq!(updated.github_url, None);
        assert_eq!(db.get_project(created.id).unwrap().github_url, None);

        db.delete_project(created.id).unwrap();
        assert!(matches!(
            db.get_project(created.id),
            Err(FolioError::ProjectNotFound { .. })
        ));
        assert!(db.delete_project(created.id).is_err());
    }

    #[test]
    fn test_category_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let category = db
            .create_category(NewCategory {
                name: "Web".into(),
                color: Some("#3498db".into()),
                ..Default::default()
            })
            .unwrap();

        let duplicate = db.create_category(NewCategory {
            name: "Web".into(),
            ..Default::default()
        });
        assert!(matches!(duplicate, Err(FolioError::Conflict(_))));

        let member = db
            .create_project(NewProject {
                category_id: Some(category.id),
                ..project("Site")
            })
            .unwrap();
        assert!(db
            .create_project(NewProject {
                category_id: Some(category.id + 100),
                ..project("Orphan")
            })
            .is_err());

        db.delete_category(category.id).unwrap();
        assert_eq!(db.get_project(member.id).unwrap().category_id, None);
        assert!(db.list_categories().unwrap().is_empty());
    }
}
