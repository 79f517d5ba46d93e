use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::PipelineError;

/// GET `url` and stream the body into a freshly created file at `path`.
///
/// Nothing is written for a transport error or a non-2xx status. If the body
/// stream breaks midway the partial file is removed. Returns the number of
/// bytes written.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<u64, PipelineError> {
    let response = client.get(url).send().await.map_err(|e| {
        tracing::debug!(error = %e, url = %url, "GET request failed");
        PipelineError::Request(e)
    })?;

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), url = %url, "Received non-success status code");
        return Err(PipelineError::Status(status));
    }

    let mut file = File::create(path).await?;
    match stream_body(response, &mut file).await {
        Ok(written) => {
            tracing::debug!(url = %url, path = %path.display(), size_bytes = written, "Image downloaded");
            Ok(written)
        }
        Err(e) => {
            drop(file);
            if let Err(remove_err) = tokio::fs::remove_file(path).await {
                tracing::warn!(error = %remove_err, path = %path.display(), "Failed to remove partial download");
            }
            Err(e)
        }
    }
}

async fn stream_body(response: reqwest::Response, file: &mut File) -> Result<u64, PipelineError> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
