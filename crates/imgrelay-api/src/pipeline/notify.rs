use imgrelay_core::ImagePutRequest;
use reqwest::StatusCode;

use super::PipelineError;

/// PUT the correlation payload to the callback endpoint as JSON.
///
/// Only transport failures are errors; the caller decides what to make of
/// the returned status.
pub async fn send_callback(
    client: &reqwest::Client,
    callback_url: &str,
    payload: &ImagePutRequest,
) -> Result<StatusCode, PipelineError> {
    let response = client.put(callback_url).json(payload).send().await?;
    Ok(response.status())
}
