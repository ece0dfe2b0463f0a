//! ticketing-gateway server entry point.
//!
//! Loads configuration, connects the stores and serves the REST API.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use ticketing_gateway::api;
use ticketing_gateway::app_state::AppState;
use ticketing_gateway::config::{AppConfig, LogFormat};
use ticketing_gateway::persistence::Stores;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting ticketing-gateway");
    if config.uses_default_jwt_secret() {
        tracing::warn!("JWT_SECRET not set, falling back to the development secret");
    }

    // Build persistence layer
    let stores = if config.in_memory_stores {
        tracing::warn!("IN_MEMORY_STORES set, data will not survive a restart");
        Stores::in_memory()
    } else {
        Stores::connect(&config)
            .await
            .context("failed to connect to the stores")?
    };

    tokio::fs::create_dir_all(config.upload_dir.join("events"))
        .await
        .with_context(|| format!("cannot create {}", config.upload_dir.display()))?;

    // Build application
    let app_state = AppState::new(&config, stores);
    let app = api::build_app(app_state, &config);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
