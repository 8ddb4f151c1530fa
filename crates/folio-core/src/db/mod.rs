//! SQLite persistence for projects, wiki, donations and site forms.
//!
//! One [`Database`] handle wraps a mutex-guarded connection and is cheap to
//! clone. The schema is created by an ordered migration chain tracked with
//! `PRAGMA user_version`; opening a database runs any migrations it has not
//! seen yet.

mod donations;
mod projects;
mod site;
mod wiki;

use crate::error::{FolioError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Transaction};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Ordered schema migrations. Index `i` upgrades `user_version` from `i` to `i + 1`.
const MIGRATIONS: &[&str] = &[
    // 1: projects and categories
    r#"
    CREATE TABLE project_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        icon TEXT,
        color TEXT,
        created_at TEXT NOT NULL
    );

    CREATE TABLE projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        image_url TEXT,
        github_url TEXT,
        live_url TEXT,
        commercial_url TEXT,
        technologies TEXT NOT NULL DEFAULT '',
        category_id INTEGER REFERENCES project_categories(id) ON DELETE SET NULL,
        stars INTEGER NOT NULL DEFAULT 0,
        forks INTEGER NOT NULL DEFAULT 0,
        last_synced TEXT,
        is_featured INTEGER NOT NULL DEFAULT 0,
        is_opensource INTEGER NOT NULL DEFAULT 0,
        show_on_homepage INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'completed',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX idx_projects_listing ON projects(is_featured, created_at);
    CREATE INDEX idx_projects_category ON projects(category_id);
    "#,
    // 2: wiki
    r#"
    CREATE TABLE wiki_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        parent_id INTEGER REFERENCES wiki_categories(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE wiki_articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL UNIQUE,
        content TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '',
        category_id INTEGER REFERENCES wiki_categories(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    // 3: donations
    r#"
    CREATE TABLE donation_projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        goal_amount REAL NOT NULL DEFAULT 0,
        currency TEXT NOT NULL DEFAULT 'NPR',
        is_active INTEGER NOT NULL DEFAULT 1,
        is_featured INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );

    CREATE TABLE donations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL REFERENCES donation_projects(id) ON DELETE CASCADE,
        donor_name TEXT NOT NULL,
        donor_email TEXT NOT NULL,
        amount REAL NOT NULL,
        currency TEXT NOT NULL,
        message TEXT,
        is_anonymous INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending',
        reference TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    );

    CREATE INDEX idx_donations_project ON donations(project_id, status);
    "#,
    // 4: site forms
    r#"
    CREATE TABLE contact_submissions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        subject TEXT,
        message TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE newsletter_subscribers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        name TEXT,
        interests TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    );
    "#,
    // 5: per-page SEO metadata
    r#"
    CREATE TABLE seo_settings (
        page_name TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        meta_description TEXT,
        meta_keywords TEXT,
        og_image TEXT,
        updated_at TEXT NOT NULL
    );
    "#,
];

/// Shared handle to the application database.
#[derive(Clone)]
pub struct Database {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `db_path` and bring its schema up to date.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| FolioError::io_with_path(e, parent.to_path_buf()))?;
            }
        }

        let conn = Connection::open(&db_path).map_err(|e| FolioError::Database {
            message: format!("Failed to open database {}: {}", db_path.display(), e),
            source: Some(e),
        })?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            ",
        )?;

        Self::init(conn, Some(db_path))
    }

    /// Database held in memory, used by tests and development tooling.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let applied = migrate(&mut conn)?;
        if applied > 0 {
            info!("Applied {} database migration(s)", applied);
        }
        Ok(Self {
            db_path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Path of the database file; `None` for in-memory databases.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Current schema version.
    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.lock()?;
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| FolioError::Database {
            message: "Failed to acquire connection lock".to_string(),
            source: None,
        })
    }

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back otherwise.
    fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Apply pending migrations and return how many ran.
fn migrate(conn: &mut Connection) -> Result<usize> {
    let current: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let current = current as usize;
    if current > MIGRATIONS.len() {
        return Err(FolioError::Config {
            message: format!(
                "Database schema version {} is newer than this build supports ({})",
                current,
                MIGRATIONS.len()
            ),
        });
    }

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql).map_err(|e| FolioError::Database {
            message: format!("Migration {} failed: {}", index + 1, e),
            source: Some(e),
        })?;
        tx.pragma_update(None, "user_version", (index + 1) as u32)?;
        tx.commit()?;
        debug!("Database migrated to version {}", index + 1);
    }

    Ok(MIGRATIONS.len() - current)
}

/// Timestamp text as stored in the database. Fixed precision keeps the
/// strings ordered the same way as the instants they encode.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Unreadable values map to the Unix epoch.
pub fn parse_time(raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(time) => time.with_timezone(&Utc),
        Err(e) => {
            warn!("Unreadable timestamp '{}' in database: {}", raw, e);
            DateTime::<Utc>::UNIX_EPOCH
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_migrations_run_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data/folio.sqlite");

        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap() as usize, MIGRATIONS.len());
        assert_eq!(db.db_path(), Some(path.as_path()));
        drop(db);

        // Reopening applies nothing new
        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap() as usize, MIGRATIONS.len());
    }

    #[test]
    fn test_time_format_is_ordered() {
        let earlier = DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = earlier + chrono::Duration::milliseconds(1500);

        assert!(format_time(earlier) < format_time(later));
        assert_eq!(parse_time(&format_time(later)), later);
        assert_eq!(parse_time("garbage"), DateTime::<Utc>::UNIX_EPOCH);
    }
}
