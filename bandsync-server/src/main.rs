//! bandsync-server - Main entry point

use anyhow::{Context, Result};
use bandsync_common::db::init_database;
use bandsync_common::Config;
use bandsync_server::api;
use bandsync_server::services::{staged_file::sweep_stale_uploads, CloudinaryRelay};
use bandsync_server::AppState;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bandsync_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting bandsync-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = Config::load().context("Invalid configuration")?;
    info!(
        port = config.port,
        upload_dir = %config.upload_dir.display(),
        guard_comments = config.guard_comments,
        "Configuration loaded"
    );

    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!("Failed to create upload directory {}", config.upload_dir.display())
    })?;
    // Leftovers from a previous process that died mid-upload
    if let Err(e) = sweep_stale_uploads(&config.upload_dir) {
        warn!(error = %e, "Could not sweep upload directory");
    }

    let db = init_database(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready");

    let relay = CloudinaryRelay::new(&config).context("Failed to build media relay client")?;

    let state = AppState {
        db,
        config: Arc::new(config),
        relay: Arc::new(relay),
    };

    api::run(state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
