//! Server startup and graceful shutdown

use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start the server with graceful shutdown
///
/// Binds the configured port and serves until SIGINT/SIGTERM; see [`serve`].
pub async fn start_server(state: Arc<AppState>, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.server.port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        fetch_timeout_secs = state.config.pipeline.fetch_timeout.as_secs(),
        upload_timeout_secs = state.config.pipeline.upload_timeout.as_secs(),
        callback_timeout_secs = state.config.callback.timeout.as_secs(),
        "Server ready and accepting connections"
    );

    serve(state, listener, app, shutdown_signal()).await
}

/// Serve `app` on `listener` until `signal` resolves.
///
/// When it does, the root cancellation token fires, in-flight pipelines stop
/// at their current stage and remove their temp files, and this returns only
/// after every tracked pipeline task has finished.
pub async fn serve<F>(
    state: Arc<AppState>,
    listener: TcpListener,
    app: Router,
    signal: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            shutdown.cancel();
        })
        .await?;

    state.tasks.close();
    state.tasks.wait().await;
    tracing::info!("All pipelines finished, exiting");

    Ok(())
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals to initiate graceful shutdown.
///
/// # Panics
/// - Panics if Ctrl+C signal handler cannot be installed (unrecoverable system error)
/// - On Unix systems, panics if SIGTERM signal handler cannot be installed (unrecoverable system error)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
