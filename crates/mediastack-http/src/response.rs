//! Handler responses and JSON wire formatting.

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use mediastack_model::ApiError;

use crate::body::MediaResponseBody;
use crate::error::HandlerError;

/// Content type of every response body.
pub const CONTENT_TYPE: &str = "application/json";

/// Header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// What a handler returns on success: a status and a JSON body, serialized
/// verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response body.
    pub body: Value,
}

impl HandlerResponse {
    /// A response with an explicit status.
    #[must_use]
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `200 OK` with `body`.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// `200 OK` with a serialized DTO.
    pub fn json<T: Serialize>(dto: &T) -> Result<Self, HandlerError> {
        let body = serde_json::to_value(dto).map_err(anyhow::Error::from)?;
        Ok(Self::ok(body))
    }
}

/// Serialize an API error into the `{"error": message}` envelope.
#[must_use]
pub fn error_to_json(error: &ApiError) -> Vec<u8> {
    serde_json::to_vec(&error.to_json()).expect("JSON serialization of error cannot fail")
}

/// Convert an `ApiError` into a complete HTTP error response.
#[must_use]
pub fn error_to_response(error: &ApiError, request_id: &str) -> http::Response<MediaResponseBody> {
    http::Response::builder()
        .status(error.status_code)
        .header("content-type", CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(MediaResponseBody::from_bytes(error_to_json(error)))
        .expect("valid error response")
}

/// Build a response from a status and JSON body.
#[must_use]
pub fn json_response(
    status: StatusCode,
    body: &Value,
    request_id: &str,
) -> http::Response<MediaResponseBody> {
    let json = serde_json::to_vec(body).expect("JSON serialization of a Value cannot fail");
    http::Response::builder()
        .status(status)
        .header("content-type", CONTENT_TYPE)
        .header(REQUEST_ID_HEADER, request_id)
        .body(MediaResponseBody::from_bytes(json))
        .expect("valid JSON response")
}
