//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What the store holds after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub key: String,
    pub size: u64,
    pub url: String,
}

/// Storage abstraction trait
///
/// The relay pipeline only depends on this trait, so tests can run the whole
/// request flow against an in-memory or on-disk store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload the file at `path` under `key` with the given content type.
    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<UploadedObject>;

    /// Read an object back by key.
    ///
    /// The relay never reads what it stored; this is the read-back check used
    /// to verify uploads, and returns `NotFound` for keys that were never
    /// written.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Public URL of the object stored under `key`.
    ///
    /// Pure string composition; does not check that the object exists.
    fn object_url(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
