//! Error types for the report handler.
//!
//! Every failure is reported to the caller as `{"error": "<message>"}` with a
//! fixed status code. Upstream failures only expose the dispatch endpoint's
//! status and body; verification failures expose nothing.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors that end a report submission.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The HTTP verb is not GET, POST or OPTIONS.
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// The request body exceeds the accepted size.
    #[error("Request body too large")]
    PayloadTooLarge,

    /// The request body is not valid JSON.
    #[error("Invalid JSON body")]
    InvalidJson,

    /// Verification is enabled but the client sent no token.
    #[error("Missing hCaptcha verification token")]
    MissingVerificationToken,

    /// The verification service rejected the token or could not be reached.
    #[error("hCaptcha verification failed")]
    VerificationFailed,

    /// Too many reports from this client in the current window.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Title or description is empty after sanitation.
    #[error("Missing required fields: title and description")]
    MissingRequiredFields,

    /// Dispatch credentials or target are missing or malformed.
    #[error("Server not configured: {0}")]
    NotConfigured(String),

    /// The dispatch endpoint rejected the report or could not be reached.
    #[error("GitHub dispatch failed: {0}")]
    UpstreamDispatchFailed(String),
}

impl ReportError {
    /// Returns the HTTP status code for this error.
    ///
    /// Configuration problems and upstream rejections share 502: the caller
    /// cannot tell a misconfigured server from a failing upstream.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidJson
            | Self::MissingVerificationToken
            | Self::VerificationFailed
            | Self::MissingRequiredFields => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotConfigured(_) | Self::UpstreamDispatchFailed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({ "error": self.to_string() });

        (status, Json(body)).into_response()
    }
}
