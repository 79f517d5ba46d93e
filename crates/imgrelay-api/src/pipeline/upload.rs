use std::path::Path;

use imgrelay_core::constants::IMAGE_CONTENT_TYPE;
use imgrelay_core::GeneratedFilename;
use imgrelay_storage::{Storage, UploadedObject};

use super::PipelineError;

/// Upload the downloaded temp file under the request's generated filename.
pub async fn upload_temp_file(
    storage: &dyn Storage,
    filename: &GeneratedFilename,
    path: &Path,
) -> Result<UploadedObject, PipelineError> {
    let uploaded = storage
        .upload_file(filename.as_str(), path, IMAGE_CONTENT_TYPE)
        .await?;

    tracing::debug!(
        key = %uploaded.key,
        size_bytes = uploaded.size,
        backend = %storage.backend_type(),
        "Image stored"
    );

    Ok(uploaded)
}
