//! imgrelay core library
//!
//! Shared configuration, error types and data model used by the storage and
//! API crates. This crate performs no I/O beyond reading the environment.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

pub use config::{
    CallbackConfig, Config, LogFormat, PipelineConfig, ServerConfig, StorageConfig,
};
pub use error::{AppError, LogLevel};
pub use models::{DownloadImageRequest, GeneratedFilename, ImagePutRequest};
pub use storage_types::StorageBackend;
