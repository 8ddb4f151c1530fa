//! GitHub repository metadata: references, sources, caching and project sync.

mod cache;
mod client;
mod repo_ref;
mod source;
mod sync;

pub use cache::{RepoCache, FAILURE_NAMESPACE, METRICS_NAMESPACE};
pub use client::GitHubClient;
pub use repo_ref::RepoRef;
pub use source::{MockMetadataSource, RepoMetadataSource};
pub use sync::{ProjectSync, SyncPolicy};

use crate::config::Settings;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Metadata source selected in settings: the offline mock or the live API.
pub fn source_from_settings(settings: &Settings) -> Result<Arc<dyn RepoMetadataSource>> {
    if settings.github_mock_mode {
        info!("GitHub metadata in mock mode; no network calls will be made");
        return Ok(Arc::new(MockMetadataSource::new()));
    }
    let client = GitHubClient::new(settings.github_token.clone())?;
    if !client.has_token() {
        info!("No GITHUB_TOKEN set; using the unauthenticated GitHub rate limit");
    }
    Ok(Arc::new(client))
}
