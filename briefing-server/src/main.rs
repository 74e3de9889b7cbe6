//! briefing-server - Weekly briefing viewer
//!
//! Serves the edition page, audio assets and the feedback API over a
//! content directory and an SQLite feedback store.

use anyhow::Result;
use briefing_common::config::{Config, Overrides};
use briefing_common::{ContentRepository, FeedbackStore};
use briefing_server::{build_router, AppState};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Command-line arguments; each falls back to its environment variable,
/// then to the config file, then to the compiled default
#[derive(Debug, Parser)]
#[command(name = "briefing-server", version, about = "Weekly briefing viewer")]
struct Args {
    /// Directory holding one folder per edition
    #[arg(long, env = "BRIEFING_CONTENT_ROOT")]
    content_root: Option<PathBuf>,

    /// SQLite feedback database
    #[arg(long, env = "BRIEFING_DATABASE")]
    database: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "BRIEFING_BIND")]
    bind: Option<String>,

    /// HTTP port
    #[arg(long, env = "BRIEFING_PORT")]
    port: Option<u16>,
}

impl From<Args> for Overrides {
    fn from(args: Args) -> Self {
        Overrides {
            content_root: args.content_root,
            database: args.database,
            bind: args.bind,
            port: args.port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification first, before any disk or database work
    info!(
        "Starting briefing-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = Config::load(Args::parse().into());
    info!("Content root: {}", config.content_root.display());
    info!("Database path: {}", config.database.display());

    let content = ContentRepository::new(&config.content_root);
    let editions = content.list_editions();
    match editions.first() {
        Some(latest) => info!("Found {} editions, latest {}", editions.len(), latest.name),
        None if config.legacy_override.is_some() => {
            info!("No editions found, serving the built-in briefing")
        }
        None => warn!("No editions found under {}", config.content_root.display()),
    }

    let feedback = match FeedbackStore::initialize(&config.database).await {
        Ok(store) => {
            info!("✓ Feedback store ready");
            store
        }
        Err(e) => {
            error!("Failed to open feedback store: {}", e);
            return Err(e.into());
        }
    };

    if let Some(csv_path) = &config.legacy_feedback_csv {
        match feedback
            .import_legacy_csv(csv_path, &config.legacy_edition)
            .await
        {
            Ok(0) => {}
            Ok(count) => info!("Imported {} legacy feedback rows", count),
            Err(e) => warn!("Legacy feedback import failed: {}", e),
        }
    }

    let addr = config.listen_addr();
    let state = AppState::new(content, feedback).with_legacy_override(config.legacy_override);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("briefing-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
