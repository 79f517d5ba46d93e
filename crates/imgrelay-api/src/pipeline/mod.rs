//! Image relay pipeline
//!
//! One run per accepted request: `Fetch → Upload → Notify → Cleanup`.
//! Every outbound stage is bounded by a timeout and raced against the
//! request's cancellation token. A fetch or upload failure ends the run early
//! (the temp file is still removed); a callback failure is recorded and the
//! run continues to cleanup.

pub mod cleanup;
pub mod fetch;
pub mod notify;
pub mod upload;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use imgrelay_core::{Config, GeneratedFilename, ImagePutRequest};
use imgrelay_storage::{Storage, StorageError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Upload,
    Notify,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Upload => "upload",
            Stage::Notify => "notify",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Received non-success status code: {0}")]
    Status(reqwest::StatusCode),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Cancelled")]
    Cancelled,
}

/// Result of the callback PUT. Never fails the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackStatus {
    /// The endpoint answered; the status code is not interpreted.
    Delivered(u16),
    Failed(String),
}

#[derive(Debug)]
pub struct CompletedRun {
    pub filename: GeneratedFilename,
    pub bytes: u64,
    pub internal_url: String,
    pub callback: CallbackStatus,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Completed(CompletedRun),
    Failed {
        filename: GeneratedFilename,
        stage: Stage,
        error: PipelineError,
    },
}

impl PipelineOutcome {
    pub fn filename(&self) -> &GeneratedFilename {
        match self {
            PipelineOutcome::Completed(run) => &run.filename,
            PipelineOutcome::Failed { filename, .. } => filename,
        }
    }

    /// Stage at which the run stopped, if it did not complete.
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            PipelineOutcome::Completed(_) => None,
            PipelineOutcome::Failed { stage, .. } => Some(*stage),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed(_))
    }
}

/// Shared, cheaply cloneable pipeline runner.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    storage: Arc<dyn Storage>,
    http: reqwest::Client,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, storage: Arc<dyn Storage>, http: reqwest::Client) -> Self {
        Self {
            config,
            storage,
            http,
        }
    }

    /// Run all stages for one request and report where it ended.
    pub async fn run(
        &self,
        external_url: String,
        filename: GeneratedFilename,
        cancel: CancellationToken,
    ) -> PipelineOutcome {
        let start = Instant::now();
        let outcome = self.execute(external_url, filename, &cancel).await;
        log_outcome(&outcome, start.elapsed());
        outcome
    }

    async fn execute(
        &self,
        external_url: String,
        filename: GeneratedFilename,
        cancel: &CancellationToken,
    ) -> PipelineOutcome {
        let settings = &self.config.pipeline;
        let local_path = filename.local_path(&settings.work_dir);

        let fetched = bounded(
            settings.fetch_timeout,
            cancel,
            fetch::download_to_file(&self.http, &external_url, &local_path),
        )
        .await;
        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(error) => {
                // A timed out or cancelled download can leave a partial file behind.
                cleanup::remove_if_present(&local_path).await;
                return PipelineOutcome::Failed {
                    filename,
                    stage: Stage::Fetch,
                    error,
                };
            }
        };

        let uploaded = bounded(
            settings.upload_timeout,
            cancel,
            upload::upload_temp_file(self.storage.as_ref(), &filename, &local_path),
        )
        .await;
        let uploaded = match uploaded {
            Ok(uploaded) => uploaded,
            Err(error) => {
                cleanup::remove_if_present(&local_path).await;
                return PipelineOutcome::Failed {
                    filename,
                    stage: Stage::Upload,
                    error,
                };
            }
        };

        let payload = ImagePutRequest {
            external_image_url: external_url,
            internal_image_url: uploaded.url,
        };
        let callback = match bounded(
            self.config.callback.timeout,
            cancel,
            notify::send_callback(&self.http, &self.config.callback.url, &payload),
        )
        .await
        {
            Ok(status) => {
                if !status.is_success() {
                    tracing::warn!(
                        status = status.as_u16(),
                        callback_url = %self.config.callback.url,
                        "Callback endpoint returned non-success status"
                    );
                }
                CallbackStatus::Delivered(status.as_u16())
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    callback_url = %self.config.callback.url,
                    "Callback failed, continuing to cleanup"
                );
                CallbackStatus::Failed(error.to_string())
            }
        };

        if let Err(error) = cleanup::remove_temp_file(&local_path).await {
            return PipelineOutcome::Failed {
                filename,
                stage: Stage::Cleanup,
                error: PipelineError::Io(error),
            };
        }

        PipelineOutcome::Completed(CompletedRun {
            filename,
            bytes,
            internal_url: payload.internal_image_url,
            callback,
        })
    }
}

/// Await `fut` unless it outlives `limit` or `cancel` fires first.
pub async fn bounded<T, F>(
    limit: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        result = tokio::time::timeout(limit, fut) => match result {
            Ok(inner) => inner,
            Err(_) => Err(PipelineError::Timeout(limit)),
        },
    }
}

fn log_outcome(outcome: &PipelineOutcome, elapsed: Duration) {
    let duration_ms = elapsed.as_secs_f64() * 1000.0;
    match outcome {
        PipelineOutcome::Completed(run) => {
            tracing::info!(
                filename = %run.filename,
                size_bytes = run.bytes,
                internal_url = %run.internal_url,
                callback = ?run.callback,
                duration_ms,
                "Image relayed"
            );
        }
        // Source-side problems are expected noise; storage and disk problems are not.
        PipelineOutcome::Failed {
            filename,
            stage: stage @ Stage::Fetch,
            error,
        } => {
            tracing::warn!(
                filename = %filename,
                stage = %stage,
                error = %error,
                duration_ms,
                "Image relay aborted"
            );
        }
        PipelineOutcome::Failed {
            filename,
            stage,
            error,
        } => {
            tracing::error!(
                filename = %filename,
                stage = %stage,
                error = %error,
                duration_ms,
                "Image relay failed"
            );
        }
    }
}
