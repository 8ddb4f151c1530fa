//! Folio Core - Headless library behind the Folio portfolio site.
//!
//! This crate owns everything that is not HTTP: the SQLite store for
//! projects, wiki, donations and site forms, the subdomain route table, and
//! the time-gated GitHub metadata sync for project listings. The
//! `folio-server` crate puts an axum front end on top of it.
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_core::{Folio, ProjectFilter, Settings};
//!
//! #[tokio::main]
//! async fn main() -> folio_core::Result<()> {
//!     let folio = Folio::open(Settings::from_env()?)?;
//!
//!     let mut projects = folio.db().list_projects(&ProjectFilter::default())?;
//!     let report = folio.sync().refresh_listing(&mut projects).await;
//!     println!("Refreshed {} of {} projects", report.refreshed, projects.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod mail;
pub mod models;
pub mod network;
pub mod routing;
pub mod seo;
pub mod validation;

mod api;

// Re-export commonly used types
pub use api::{Folio, FolioBuilder};
pub use cache::{CacheBackend, CacheEntry, MemoryCache, SqliteCache};
pub use config::{CacheBackendKind, Settings};
pub use db::Database;
pub use error::{FolioError, Result};
pub use github::{
    GitHubClient, MockMetadataSource, ProjectSync, RepoCache, RepoMetadataSource, RepoRef,
    SyncPolicy,
};
pub use mail::{Email, LogMailer, Mailer};
pub use models::*;
pub use routing::{HandlerId, RouteMatch, RoutingMode, Subdomain, SubdomainRouter};
pub use seo::SiteUrls;
