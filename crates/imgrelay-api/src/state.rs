//! Application state shared by every request.

use imgrelay_core::Config;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Pipeline,
    /// Root token; each request runs under a child of it. Cancelled on shutdown.
    pub shutdown: CancellationToken,
    /// Tracks pipeline tasks so shutdown can wait for them to clean up.
    pub tasks: TaskTracker,
}

impl AppState {
    pub fn new(config: Arc<Config>, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }
}
