//! Media service error types.
//!
//! [`MediaError`] covers every business failure the media and upload
//! services raise. Converting it into a [`HandlerError`] via [`From`] turns
//! business failures into typed [`ApiError`]s with their client-facing status
//! and message, and collaborator failures into internal errors whose detail
//! only reaches the logs.
//!
//! # Usage
//!
//! ```
//! use http::StatusCode;
//! use mediastack_core::error::MediaError;
//! use mediastack_http::HandlerError;
//!
//! let err: HandlerError = MediaError::RecordNotFound.into();
//! let HandlerError::Api(api) = err else { unreachable!() };
//! assert_eq!(api.status_code, StatusCode::NOT_FOUND);
//! assert_eq!(api.message, "File not found in database");
//! ```

use http::StatusCode;

use mediastack_http::HandlerError;
use mediastack_model::ApiError;

use crate::metadata::MetadataError;
use crate::storage::StorageError;

/// Media service error type.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    // -----------------------------------------------------------------------
    // Lifecycle errors
    // -----------------------------------------------------------------------
    /// Finalize was called for an id with no record.
    #[error("File not initialized")]
    NotInitialized,

    /// Finalize found no object under the record's key.
    #[error("File does not exist in S3")]
    ObjectMissing,

    /// Finalize found a zero-byte object.
    #[error("File is empty")]
    EmptyObject,

    /// No record has the requested id or key.
    #[error("File not found in database")]
    RecordNotFound,

    /// The record exists but its object does not.
    #[error("File not found in S3")]
    ObjectNotFound,

    // -----------------------------------------------------------------------
    // Multipart errors
    // -----------------------------------------------------------------------
    /// Storage did not report both a key and an upload id.
    #[error("Failed to create multipart upload")]
    MultipartCreateFailed,

    /// Storage rejected or failed the completion request.
    #[error("Failed to complete multipart upload")]
    MultipartCompleteFailed,

    // -----------------------------------------------------------------------
    // Collaborator failures
    // -----------------------------------------------------------------------
    /// Object storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The metadata store failed.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl From<MediaError> for HandlerError {
    fn from(err: MediaError) -> Self {
        match client_error(&err) {
            Some(api) => HandlerError::Api(api),
            None => HandlerError::Internal(anyhow::Error::new(err)),
        }
    }
}

/// The typed failure for a business error; `None` for internal failures.
fn client_error(err: &MediaError) -> Option<ApiError> {
    let status = match err {
        MediaError::NotInitialized
        | MediaError::ObjectMissing
        | MediaError::RecordNotFound
        | MediaError::ObjectNotFound => StatusCode::NOT_FOUND,
        MediaError::EmptyObject => StatusCode::BAD_REQUEST,
        MediaError::MultipartCreateFailed | MediaError::MultipartCompleteFailed => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        // The store lost the record between lookup and write.
        MediaError::Metadata(MetadataError::NotFound { .. }) => {
            return Some(ApiError::not_found(
                MediaError::RecordNotFound.to_string(),
            ));
        }
        MediaError::Storage(_) | MediaError::Metadata(MetadataError::Internal(_)) => return None,
    };
    Some(ApiError::new(status, err.to_string()))
}

/// Convenience result type for media service operations.
pub type MediaResult<T> = Result<T, MediaError>;
