//! HTTP error response conversion
//!
//! Client-facing failures render as plain text with the status taken from
//! `AppError::http_status_code`, matching what existing callers parse.

use axum::{
    body::Bytes,
    extract::rejection::BytesRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use imgrelay_core::{AppError, LogLevel};
use serde::de::DeserializeOwned;

/// Wrapper type for AppError to implement IntoResponse
///
/// Needed because of the orphan rule: `IntoResponse` (axum) cannot be
/// implemented for `AppError` (imgrelay-core) in this crate.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<BytesRejection> for HttpAppError {
    fn from(rejection: BytesRejection) -> Self {
        let message = rejection.body_text();
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            HttpAppError(AppError::PayloadTooLarge(message))
        } else {
            HttpAppError(AppError::InvalidInput(message))
        }
    }
}

/// JSON body extractor that ignores the `Content-Type` header.
///
/// Callers post JSON without always declaring it, so the body is read as raw
/// bytes and decoded directly. Decode failures become a 400 carrying the
/// parser's message.
#[derive(Debug, Clone, Copy)]
pub struct RawJson<T>(pub T);

impl<T, S> FromRequest<S> for RawJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        let value: T = serde_json::from_slice(&body).map_err(AppError::from)?;
        Ok(RawJson(value))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Rejected request");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Rejected request");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        log_error(&self.0);
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.0.to_string()).into_response()
    }
}
