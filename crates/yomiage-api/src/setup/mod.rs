//! Application setup and initialization
//!
//! Everything the process builds once before serving: validated configuration,
//! tracing, the storage backend, the outbound clients and the router.

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use yomiage_core::Config;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production());

    validation::validate_config(&config).context("Configuration validation failed")?;

    tracing::info!("Configuration loaded and validated successfully");

    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, storage).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
