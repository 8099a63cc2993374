//! Hub error types with HTTP status code mapping.
//!
//! [`HubError`] covers the failures a caller can actually observe:
//! producer-side serialization, bad HTTP requests, and missing resources.
//! Per-connection transport failures are not errors; they surface as a
//! [`crate::hub::DisconnectReason`] and are only logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "invalid request: unknown event type: Deploy"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Error enum for the hub and its HTTP surface.
///
/// # Error Code Ranges
///
/// | Range     | Category      | HTTP Status               |
/// |-----------|---------------|---------------------------|
/// | 1000–1999 | Validation    | 400 Bad Request           |
/// | 2000–2999 | Not Found     | 404 Not Found             |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A producer payload could not be serialized to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The named resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Serialization(_) => 1002,
            Self::NotFound(_) => 2001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Serialization(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses_line_up() {
        let err = HubError::InvalidRequest("bad".to_string());
        assert_eq!(err.error_code(), 1001);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = HubError::NotFound("simulator svc-9".to_string());
        assert_eq!(err.error_code(), 2001);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn into_response_uses_status_code() {
        let response = HubError::NotFound("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn serde_errors_convert() {
        let Err(source) = serde_json::from_str::<serde_json::Value>("{") else {
            return;
        };
        let err = HubError::from(source);
        assert_eq!(err.error_code(), 1002);
        assert!(err.to_string().starts_with("serialization error"));
    }
}
