use crate::handlers;
use crate::state::AppState;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// The service exposes a single endpoint: every method and path is handled
/// by `download_image`.
pub fn setup_routes(state: Arc<AppState>) -> Router<()> {
    Router::new()
        .fallback(handlers::download_image)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
