//! The assembled core: database, project sync and mailer behind one handle.

use crate::cache::{self, CacheBackend};
use crate::config::Settings;
use crate::db::Database;
use crate::error::Result;
use crate::github::{self, ProjectSync, RepoCache, RepoMetadataSource, SyncPolicy};
use crate::mail::{LogMailer, Mailer};
use crate::routing::{RoutingMode, SubdomainRouter};
use crate::seo::SiteUrls;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application core. Cheap to clone.
#[derive(Clone)]
pub struct Folio {
    settings: Arc<Settings>,
    db: Database,
    sync: ProjectSync,
    mailer: Arc<dyn Mailer>,
}

impl Folio {
    pub fn builder(settings: Settings) -> FolioBuilder {
        FolioBuilder::new(settings)
    }

    /// Open everything from settings alone.
    pub fn open(settings: Settings) -> Result<Self> {
        FolioBuilder::new(settings).build()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn sync(&self) -> &ProjectSync {
        &self.sync
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    /// Router configured for host or path-prefix matching.
    pub fn subdomain_router(&self) -> SubdomainRouter {
        let mode = if self.settings.host_routing() {
            RoutingMode::Host
        } else {
            RoutingMode::PathPrefix
        };
        SubdomainRouter::new(mode)
    }

    pub fn site_urls(&self) -> SiteUrls {
        SiteUrls::new(&self.settings.site_url, self.settings.server_name.as_deref())
    }
}

/// Builder for [`Folio`]. Anything not supplied is derived from settings.
pub struct FolioBuilder {
    settings: Settings,
    db: Option<Database>,
    cache_backend: Option<Arc<dyn CacheBackend>>,
    source: Option<Arc<dyn RepoMetadataSource>>,
    mailer: Option<Arc<dyn Mailer>>,
    policy: Option<SyncPolicy>,
}

impl FolioBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            db: None,
            cache_backend: None,
            source: None,
            mailer: None,
            policy: None,
        }
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Replace the metadata source (GitHub client or mock).
    pub fn with_source(mut self, source: Arc<dyn RepoMetadataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<Folio> {
        let settings = self.settings;

        let db = match self.db {
            Some(db) => db,
            None => Database::open(&settings.database_path)?,
        };
        let backend = match self.cache_backend {
            Some(backend) => backend,
            None => cache::open_backend(&settings)?,
        };
        match backend.cleanup_expired() {
            Ok(0) => {}
            Ok(n) => info!("Dropped {} expired cache entries", n),
            Err(e) => warn!("Cache cleanup failed: {}", e),
        }
        let source = match self.source {
            Some(source) => source,
            None => github::source_from_settings(&settings)?,
        };
        let policy = self
            .policy
            .unwrap_or_else(|| SyncPolicy::default().with_ttl(settings.sync_ttl));

        info!(
            "Folio core ready: {} cache, {} metadata source, sync TTL {}h",
            backend.kind(),
            source.name(),
            policy.ttl.as_secs() / 3600
        );

        let sync = ProjectSync::new(source, RepoCache::new(backend), db.clone(), policy);
        Ok(Folio {
            settings: Arc::new(settings),
            db,
            sync,
            mailer: self.mailer.unwrap_or_else(|| Arc::new(LogMailer)),
        })
    }
}
