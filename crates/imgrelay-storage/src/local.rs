use crate::keys::{join_url, validate_key};
use crate::traits::{Storage, StorageError, StorageResult, UploadedObject};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored objects (e.g., "/var/lib/imgrelay/images")
    /// * `base_url` - URL the directory is served from; object URLs are `{base_url}/{key}`
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        _content_type: &str,
    ) -> StorageResult<UploadedObject> {
        let dest = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let size = fs::copy(path, &dest).await.map_err(|e| {
            tracing::error!(
                error = %e,
                key = %key,
                source = %path.display(),
                "Local upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            key = %key,
            path = %dest.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
        );

        Ok(UploadedObject {
            key: key.to_string(),
            size,
            url: self.object_url(key),
        })
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(e.to_string())),
        }
    }

    fn object_url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_upload_download() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("store"), "http://localhost:9000/images".to_string())
            .await
            .unwrap();

        let source = dir.path().join("incoming.jpg");
        let data = b"test image bytes".to_vec();
        fs::write(&source, &data).await.unwrap();

        let uploaded = storage
            .upload_file("incoming.jpg", &source, "image/jpeg")
            .await
            .unwrap();

        assert_eq!(uploaded.size, data.len() as u64);
        assert_eq!(uploaded.url, "http://localhost:9000/images/incoming.jpg");

        let downloaded = storage.download("incoming.jpg").await.unwrap();
        assert_eq!(data, downloaded);
        // Source file is left for the caller to clean up.
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:9000/images".to_string())
            .await
            .unwrap();

        let result = storage.download("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage
            .upload_file("/etc/passwd", Path::new("/dev/null"), "image/jpeg")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_download_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:9000/images".to_string())
            .await
            .unwrap();

        let result = storage.download("missing.jpg").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upload_missing_source_fails() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:9000/images".to_string())
            .await
            .unwrap();

        let result = storage
            .upload_file("a.jpg", &dir.path().join("nope.jpg"), "image/jpeg")
            .await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
    }
}
