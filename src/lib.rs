pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod locations;
pub mod models;
pub mod sensing;
pub mod session;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use api::{create_router, ApiState};
use config::Config;
use db::Database;
use locations::LocationRegistry;
use sensing::{platform_sensor, MonitorController};

/// Start the monitor and serve the HTTP API until Ctrl-C.
pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    let default_level = if config::debug_enabled() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    info!("Wi-Fi Whisperer starting up on {}", std::env::consts::OS);

    let config = Config::load().context("failed to load configuration")?;
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("failed to create data directory {}", config.data_dir.display())
    })?;

    let database = Database::new(config.database_path())?;
    let registry = Arc::new(LocationRegistry::load_from_disk(config.locations_path()));

    let mut monitor = MonitorController::new();
    let handle = monitor.start_monitoring(
        platform_sensor(),
        database.clone(),
        registry.clone(),
        config.loop_timing(),
    )?;

    let router = create_router(ApiState {
        monitor: handle,
        registry,
        db: database,
        history_days: config.history_days,
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Serving API on http://{}", config.bind_addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    // Save whatever session is running even if the server stopped on error.
    monitor.stop_monitoring().await?;
    info!("Wi-Fi Whisperer stopped");
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C; graceful shutdown disabled: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
