//! # Tradelink API Server
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tradelink API Server                             │
//! │                                                                         │
//! │  Manufacturer ─┐                                                        │
//! │  Retailer ─────┼──► HTTP (8080) ───► Services ───► SQLite              │
//! │  Employee ─────┘     bearer JWT                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tradelink_api::{app, ApiConfig, AppState};
use tradelink_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tradelink=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Tradelink API server...");

    // Load configuration
    let config = ApiConfig::load().context("Invalid configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set, signing tokens with the development secret");
    }

    // Open database (creates the directory, runs migrations)
    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("Failed to open database")?;
    info!("Database ready");

    // Create shared state
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = Arc::new(AppState::new(config, db.clone()));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Cannot bind {}", addr))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
