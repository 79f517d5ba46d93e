//! Application setup and initialization
//!
//! Startup order: telemetry, storage client, outbound HTTP client, work
//! directory, state, routes. Any failure here aborts startup.

pub mod routes;
pub mod server;

use crate::pipeline::Pipeline;
use crate::state::AppState;
use anyhow::{Context, Result};
use imgrelay_core::Config;
use imgrelay_storage::{create_storage, Storage};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.server.log_format)
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        port = config.server.port,
        backend = %config.storage.backend,
        endpoint = %config.storage.endpoint,
        bucket = %config.storage.bucket,
        callback_url = %config.callback.url,
        work_dir = %config.pipeline.work_dir.display(),
        detached = config.pipeline.detached,
        "Configuration loaded"
    );

    let storage = create_storage(&config.storage)
        .await
        .context("Failed to create storage backend")?;

    let state = build_state(config, storage).await?;
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}

/// Build shared state around an existing storage backend.
pub async fn build_state(config: Config, storage: Arc<dyn Storage>) -> Result<Arc<AppState>> {
    tokio::fs::create_dir_all(&config.pipeline.work_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create work directory {}",
                config.pipeline.work_dir.display()
            )
        })?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("imgrelay/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let config = Arc::new(config);
    let pipeline = Pipeline::new(config.clone(), storage, http);

    Ok(Arc::new(AppState::new(config, pipeline)))
}
