use crate::error::RawJson;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use imgrelay_core::{DownloadImageRequest, GeneratedFilename};
use std::sync::Arc;
use tracing::Instrument;

/// Relay one external image into the object store.
///
/// Registered as the router fallback, so every method and path lands here.
/// The response is always `200` with the submitted URL as plain text; the
/// pipeline outcome is only logged. Unless the service runs detached, the
/// response is held back until the pipeline has finished.
#[tracing::instrument(
    skip(state, request),
    fields(
        url = %request.external_image_url,
        filename = tracing::field::Empty,
        operation = "download_image"
    )
)]
pub async fn download_image(
    State(state): State<Arc<AppState>>,
    RawJson(request): RawJson<DownloadImageRequest>,
) -> Response {
    let external_url = request.external_image_url;
    let filename = GeneratedFilename::generate();
    tracing::Span::current().record("filename", filename.as_str());

    let pipeline = state.pipeline.clone();
    let cancel = state.shutdown.child_token();
    let url = external_url.clone();

    // Spawned so a client hanging up cannot drop the run halfway through.
    let task = state.tasks.spawn(
        async move { pipeline.run(url, filename, cancel).await }
            .instrument(tracing::Span::current()),
    );

    if state.config.pipeline.detached {
        tracing::debug!("Pipeline detached from response");
    } else if let Err(e) = task.await {
        tracing::error!(error = %e, "Pipeline task panicked");
    }

    (StatusCode::OK, external_url).into_response()
}
