//! Request and payload types exchanged with clients and the callback endpoint.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::IMAGE_EXTENSION;

/// Inbound request body: the image to relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadImageRequest {
    pub external_image_url: String,
}

/// Outbound callback body correlating the source URL with the stored copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePutRequest {
    pub external_image_url: String,
    pub internal_image_url: String,
}

/// Per-request file name: a random v4 UUID plus the fixed image extension.
///
/// Generated once before any I/O and reused as the local temp file name,
/// the object key and the last segment of the internal URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneratedFilename(String);

impl GeneratedFilename {
    pub fn generate() -> Self {
        Self(format!("{}.{}", Uuid::new_v4(), IMAGE_EXTENSION))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of the temp file for this request inside `work_dir`.
    pub fn local_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.0)
    }
}

impl fmt::Display for GeneratedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GeneratedFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
