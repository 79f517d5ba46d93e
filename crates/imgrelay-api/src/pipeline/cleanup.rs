use std::io::ErrorKind;
use std::path::Path;

/// Delete the request's temp file after upload and notification.
pub async fn remove_temp_file(path: &Path) -> std::io::Result<()> {
    tokio::fs::remove_file(path).await?;
    tracing::debug!(path = %path.display(), "Temp file removed");
    Ok(())
}

/// Best-effort removal on early exit; a missing file is fine.
pub async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Temp file removed after failure"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Failed to remove temp file")
        }
    }
}
