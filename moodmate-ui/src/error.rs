//! Error types for moodmate-ui
//!
//! Backend failures are normally rendered inside the page that triggered
//! them (see [`failure_status`]). `UiError` covers requests that cannot be
//! served at all, such as an unreadable multipart body or a background stop
//! task that died before answering.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::client::{ClientError, Endpoint};
use crate::pages::escape;

/// Request-level error
#[derive(Debug, Error)]
pub enum UiError {
    /// Multipart body could not be read
    #[error("Upload failed: {0}")]
    Multipart(#[from] MultipartError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            UiError::Multipart(err) => (err.status(), err.body_text()),
            UiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        tracing::warn!(status = status.as_u16(), error = %self, "Request failed");

        let body = format!(
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\"><title>MoodMate</title></head>\
             <body><h2>Something went wrong</h2><p>{}</p><p><a href=\"/\">Back to MoodMate</a></p></body></html>",
            escape(&message)
        );
        (status, Html(body)).into_response()
    }
}

/// HTTP status for a page that reports a failed backend call
pub fn failure_status(err: &ClientError) -> StatusCode {
    match err {
        ClientError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ClientError::DuplicateEmail => StatusCode::CONFLICT,
        ClientError::Status {
            endpoint: Endpoint::Signin,
            ..
        } => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// Result type for handlers that can fail before rendering a page
pub type UiResult<T> = Result<T, UiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_renders_500() {
        let response = UiError::Internal("Stop request did not complete".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_failure_status_mapping() {
        assert_eq!(failure_status(&ClientError::DuplicateEmail), StatusCode::CONFLICT);
        assert_eq!(
            failure_status(&ClientError::Status {
                endpoint: Endpoint::Signin,
                status: 401
            }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            failure_status(&ClientError::Status {
                endpoint: Endpoint::Stop,
                status: 500
            }),
            StatusCode::BAD_GATEWAY
        );
    }
}
