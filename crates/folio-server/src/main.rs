//! Folio Server - serves the portfolio site and its subdomains.

use anyhow::{Context, Result};
use clap::Parser;
use folio_core::{Folio, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "folio-server")]
#[command(about = "Portfolio site with wiki, git, donation and store subdomains")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging and detailed error bodies
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the process environment still applies.
    let _ = dotenv::dotenv();
    let args = Args::parse();

    let settings = Settings::from_env_with_debug(args.debug).context("Invalid configuration")?;

    // Set up logging
    let default_level = if settings.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if args.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    info!("Starting Folio server");
    info!("Database: {}", settings.database_path.display());
    match &settings.server_name {
        Some(name) => info!("Subdomain routing by host under {}", name),
        None => info!("Subdomain routing by path prefix (no SERVER_NAME set)"),
    }

    let folio = Folio::open(settings).context("Failed to open the Folio store")?;
    folio_server::serve(folio, &args.host, args.port).await
}
