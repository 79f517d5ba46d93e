use crate::keys::{join_url, validate_key};
use crate::traits::{Storage, StorageError, StorageResult, UploadedObject};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use imgrelay_core::StorageConfig;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectStore, PutMultipartOptions, PutOptions, PutPayload,
    Result as ObjectResult, WriteMultipart,
};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Files above this size are uploaded in parts instead of one PUT.
const MULTIPART_THRESHOLD: u64 = 8 * 1024 * 1024;
/// S3 requires every part but the last to be at least 5 MiB.
const READ_CHUNK_SIZE: usize = 5 * 1024 * 1024;
const MAX_CONCURRENT_PARTS: usize = 4;

/// S3 storage implementation
///
/// Works against AWS S3 and S3-compatible servers such as MinIO. Requests use
/// path-style addressing so the internal URL `{endpoint}/{bucket}/{key}` is
/// also the address the object is served from.
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    base_url: String,
}

impl S3Storage {
    /// Build a client from static credentials.
    ///
    /// The client is constructed once and shared across requests; the
    /// underlying HTTP connection pool is reused.
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let endpoint = config.endpoint_url();
        let allow_http = endpoint.starts_with("http://");

        let store = AmazonS3Builder::new()
            .with_endpoint(endpoint.clone())
            .with_allow_http(allow_http)
            .with_region(config.region.clone())
            .with_bucket_name(config.bucket.clone())
            .with_access_key_id(config.access_key_id.clone())
            .with_secret_access_key(config.secret_access_key.clone())
            .with_virtual_hosted_style_request(false)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        tracing::debug!(
            endpoint = %endpoint,
            bucket = %config.bucket,
            region = %config.region,
            "S3 client created"
        );

        Ok(Self::with_store(
            Arc::new(store),
            config.bucket.clone(),
            config.bucket_url(),
        ))
    }

    /// Wrap an existing object store, e.g. `object_store::memory::InMemory` in tests.
    ///
    /// `base_url` is the bucket URL that object keys are appended to.
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        S3Storage {
            store,
            bucket: bucket.into(),
            base_url: base_url.into(),
        }
    }

    fn location(key: &str) -> StorageResult<ObjectPath> {
        validate_key(key)?;
        ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))
    }

    /// Single PUT for files small enough to hold in memory.
    async fn put_buffered(
        &self,
        location: &ObjectPath,
        path: &Path,
        attributes: Attributes,
    ) -> StorageResult<()> {
        let data = tokio::fs::read(path).await?;
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(location, PutPayload::from(Bytes::from(data)), options)
            .await;
        result.map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        Ok(())
    }

    /// Multipart upload fed from the file in fixed-size reads, so large
    /// images are never fully buffered.
    async fn put_streamed(
        &self,
        location: &ObjectPath,
        path: &Path,
        attributes: Attributes,
    ) -> StorageResult<()> {
        let mut file = tokio::fs::File::open(path).await?;
        let options = PutMultipartOptions {
            attributes,
            ..Default::default()
        };
        let upload = self
            .store
            .put_multipart_opts(location, options)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let mut writer = WriteMultipart::new(upload);
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let read = match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) => {
                    abort_upload(writer).await;
                    return Err(StorageError::IoError(e));
                }
            };
            if let Err(e) = writer.wait_for_capacity(MAX_CONCURRENT_PARTS).await {
                abort_upload(writer).await;
                return Err(StorageError::UploadFailed(e.to_string()));
            }
            writer.write(&buf[..read]);
        }

        writer
            .finish()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        Ok(())
    }
}

async fn abort_upload(writer: WriteMultipart) {
    if let Err(e) = writer.abort().await {
        tracing::warn!(error = %e, "Failed to abort multipart upload");
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<UploadedObject> {
        let location = Self::location(key)?;
        let start = std::time::Instant::now();

        let size = tokio::fs::metadata(path).await?.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        let result = if size > MULTIPART_THRESHOLD {
            self.put_streamed(&location, path, attributes).await
        } else {
            self.put_buffered(&location, path, attributes).await
        };

        if let Err(e) = &result {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
        }
        result?;

        let url = self.object_url(key);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(UploadedObject {
            key: key.to_string(),
            size,
            url,
        })
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        let location = Self::location(key)?;

        let result: ObjectResult<_> = self.store.get_opts(&location, GetOptions::default()).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    fn object_url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
