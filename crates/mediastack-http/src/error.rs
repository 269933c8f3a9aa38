//! Dispatch failures and their translation to typed API errors.

use http::StatusCode;

use mediastack_model::ApiError;

use crate::schema::ValidationError;

/// A failure raised by a handler.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// A typed failure; its status and message reach the client verbatim.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Anything else. The client only ever sees a generic 500.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Every way a request can end without a handler's success response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The request target is missing or not an absolute path.
    #[error("Bad Request")]
    BadRequest,
    /// No route structurally fits the method and path.
    #[error("Not Found")]
    RouteNotFound,
    /// The matched route rejected the path parameters.
    #[error("invalid path parameters: {0}")]
    InvalidParams(ValidationError),
    /// The body is not valid JSON.
    #[error("Invalid JSON")]
    InvalidJson(#[source] serde_json::Error),
    /// The decoded body does not fit the matched route's body shape.
    #[error("invalid body: {0}")]
    InvalidBody(ValidationError),
    /// The body exceeds the configured cap.
    #[error("Payload Too Large")]
    PayloadTooLarge,
    /// The deadline expired while the body was being read.
    #[error("Request Timeout")]
    BodyTimeout,
    /// The deadline expired while the handler was running.
    #[error("Gateway Timeout")]
    HandlerTimeout,
    /// The body stream failed before it ended.
    #[error("failed to read request body: {0}")]
    BodyRead(String),
    /// The handler failed.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl DispatchError {
    /// Translate into the typed failure sent to the client.
    ///
    /// Internal detail never leaves this function: unexpected handler
    /// failures and panics collapse to `500 Internal Server Error`.
    #[must_use]
    pub fn to_api_error(&self) -> ApiError {
        match self {
            Self::BadRequest | Self::BodyRead(_) => ApiError::bad_request("Bad Request"),
            Self::RouteNotFound => ApiError::not_found("Not Found"),
            Self::InvalidParams(detail) | Self::InvalidBody(detail) => {
                ApiError::bad_request(detail.to_string())
            }
            Self::InvalidJson(_) => ApiError::bad_request("Invalid JSON"),
            Self::PayloadTooLarge => ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"),
            Self::BodyTimeout => ApiError::new(StatusCode::REQUEST_TIMEOUT, "Request Timeout"),
            Self::HandlerTimeout => ApiError::new(StatusCode::GATEWAY_TIMEOUT, "Gateway Timeout"),
            Self::Handler(HandlerError::Api(err)) => err.clone(),
            Self::Handler(HandlerError::Internal(_) | HandlerError::Panicked(_)) => {
                ApiError::internal("Internal Server Error")
            }
        }
    }

    /// Whether the failure is the server's fault.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.to_api_error().status_code.is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_translate_routing_failures() {
        assert_eq!(
            DispatchError::BadRequest.to_api_error(),
            ApiError::bad_request("Bad Request")
        );
        assert_eq!(
            DispatchError::RouteNotFound.to_api_error(),
            ApiError::not_found("Not Found")
        );
    }

    #[test]
    fn test_should_keep_validation_detail() {
        let err = DispatchError::InvalidBody(ValidationError {
            path: "type".to_owned(),
            message: "Required".to_owned(),
        });
        assert_eq!(err.to_api_error().message, "type: Required");
    }

    #[test]
    fn test_should_use_fixed_message_for_malformed_json() {
        let parse = serde_json::from_slice::<serde_json::Value>(b"{bad").unwrap_err();
        let api = DispatchError::InvalidJson(parse).to_api_error();
        assert_eq!(api, ApiError::bad_request("Invalid JSON"));
    }

    #[test]
    fn test_should_pass_typed_handler_failure_through() {
        let err = DispatchError::from(HandlerError::from(ApiError::not_found(
            "File not found in database",
        )));
        assert_eq!(
            err.to_api_error(),
            ApiError::not_found("File not found in database")
        );
        assert!(!err.is_internal());
    }

    #[test]
    fn test_should_hide_internal_detail() {
        let err = DispatchError::from(HandlerError::from(anyhow::anyhow!(
            "connection refused to db at 10.0.0.3"
        )));
        let api = err.to_api_error();
        assert_eq!(api.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message, "Internal Server Error");
        assert!(err.is_internal());
    }

    #[test]
    fn test_should_map_limits_and_deadlines() {
        assert_eq!(
            DispatchError::PayloadTooLarge.to_api_error().status_code,
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            DispatchError::BodyTimeout.to_api_error().status_code,
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            DispatchError::HandlerTimeout.to_api_error().status_code,
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
