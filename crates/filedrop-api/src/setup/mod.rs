//! Application setup and initialization
//!
//! This module contains all application initialization logic extracted from main.rs
//! for better organization and testability.

pub mod routes;
pub mod server;
pub mod storage;
pub mod validation;

use crate::services::CleanupSweeper;
use crate::state::AppState;
use anyhow::{Context, Result};
use filedrop_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Telemetry before validation so validation warnings reach the subscriber
    crate::telemetry::init_telemetry();

    // Validate configuration - fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    tracing::info!("Configuration loaded and validated successfully");

    // Setup storage
    let store = storage::setup_storage(&config).await?;

    // Background sweeper; the /internal/cleanup endpoint reuses the same instance
    let sweeper = Arc::new(CleanupSweeper::new(store.clone()));
    if config.cleanup_interval_secs > 0 {
        sweeper.clone().start(config.cleanup_interval_secs);
        tracing::info!(
            interval_secs = config.cleanup_interval_secs,
            "Scheduled cleanup task started"
        );
    } else {
        tracing::info!("Scheduled cleanup disabled (CLEANUP_INTERVAL_SECS=0)");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        sweeper,
    });

    // Setup routes
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
