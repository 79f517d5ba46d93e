//! imgrelay storage library
//!
//! Object store abstraction used by the relay pipeline. The `Storage` trait
//! uploads a local file under a key and composes the public URL of the
//! stored object. `S3Storage` talks to any S3-compatible service (MinIO in
//! the usual deployment); `LocalStorage` writes into a directory and is meant
//! for development without an object store.
//!
//! # Key format
//!
//! Keys are flat object names (the per-request generated filename). They must
//! not be empty, contain `..`, or start with `/`; see the `keys` module.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use imgrelay_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, UploadedObject};
