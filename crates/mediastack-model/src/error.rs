//! Typed API failures.
//!
//! An [`ApiError`] is a business-logic failure that already knows how it should
//! look on the wire: an HTTP status code and a client-facing message. Anything
//! that is not an `ApiError` is treated as an unexpected failure by the
//! dispatcher and collapsed into a generic 500.

use http::StatusCode;

/// A status-bearing failure raised by business logic.
///
/// # Examples
///
/// ```
/// use mediastack_model::ApiError;
///
/// let err = ApiError::not_found("File not found in database");
/// assert_eq!(err.status_code, http::StatusCode::NOT_FOUND);
/// assert_eq!(err.to_string(), "File not found in database");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    /// The HTTP status code sent to the client.
    pub status_code: StatusCode,
    /// The message sent to the client in the `error` field.
    pub message: String,
}

impl ApiError {
    /// Create a new `ApiError` with an explicit status code.
    #[must_use]
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 Internal Server Error with an explicit, client-safe message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// The JSON error envelope, `{"error": message}`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.message })
    }
}
