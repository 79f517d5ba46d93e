//! imgrelay API library
//!
//! HTTP entry point, relay pipeline and application setup.

pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod setup;
pub mod state;
mod telemetry;

// Re-exports
pub use error::HttpAppError;
pub use pipeline::{CallbackStatus, Pipeline, PipelineError, PipelineOutcome, Stage};
pub use state::AppState;
