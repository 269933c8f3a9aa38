//! Object storage backends.
//!
//! [`StorageBackend`] is everything the media and upload services need from
//! object storage: existence and size checks, presigned URLs, deletion, and
//! the multipart upload lifecycle. Two implementations exist:
//!
//! - [`S3Storage`]: any S3-compatible service, through the AWS SDK
//! - [`InMemoryStorage`]: a process-local store for development and tests

pub mod memory;
pub mod presign;
pub mod s3;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use mediastack_model::input::CompletedPart;

use crate::config::{ConfigError, MediaStackConfig, StorageBackendKind};

pub use memory::InMemoryStorage;
pub use presign::Presigner;
pub use s3::S3Storage;

/// Storage backend failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The object does not exist.
    #[error("The specified key does not exist: {key}")]
    NoSuchKey {
        /// The missing key.
        key: String,
    },
    /// The multipart upload does not exist.
    #[error("The specified upload does not exist: {upload_id}")]
    NoSuchUpload {
        /// The missing upload id.
        upload_id: String,
    },
    /// A part in a completion request is missing or does not match.
    #[error("Invalid part {part_number}: {reason}")]
    InvalidPart {
        /// The offending part number.
        part_number: u32,
        /// What is wrong with it.
        reason: String,
    },
    /// Parts in a completion request are not in ascending order.
    #[error("The list of parts was not in ascending order")]
    InvalidPartOrder,
    /// A presigned URL could not be produced.
    #[error("failed to presign request: {0}")]
    Presign(String),
    /// The backend itself failed.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Response metadata of an existing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHead {
    /// Size in bytes.
    pub size: u64,
}

/// What the backend reports when a multipart upload is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedUpload {
    /// Key of the upload, when reported.
    pub key: Option<String>,
    /// Upload id, when reported.
    pub upload_id: Option<String>,
}

/// What the backend reports when a multipart upload is completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedUpload {
    /// Key of the assembled object, when reported.
    pub key: Option<String>,
    /// Location of the assembled object, when reported.
    pub location: Option<String>,
    /// Bucket of the assembled object, when reported.
    pub bucket: Option<String>,
    /// ETag of the assembled object, when reported.
    pub e_tag: Option<String>,
}

/// Object storage as seen by the media and upload services.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Whether an object exists under `key`.
    async fn object_exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Metadata of the object under `key`.
    async fn head_object(&self, key: &str) -> Result<ObjectHead, StorageError>;

    /// A presigned `GET` URL for `key`.
    async fn presign_get(&self, key: &str) -> Result<String, StorageError>;

    /// A presigned `PUT` URL for `key`.
    async fn presign_put(&self, key: &str) -> Result<String, StorageError>;

    /// Delete the object under `key`.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Start a multipart upload for `key`.
    async fn begin_multipart(&self, key: &str) -> Result<StartedUpload, StorageError>;

    /// A presigned `PUT` URL for one part (numbered from 1) of an upload.
    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<String, StorageError>;

    /// Assemble an upload from `parts`, which must be in ascending part
    /// number order.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompletedUpload, StorageError>;
}

/// Build the backend selected by `config`.
pub async fn connect(config: &MediaStackConfig) -> Result<Arc<dyn StorageBackend>, ConfigError> {
    match config.storage_backend {
        StorageBackendKind::S3 => {
            let settings = config.s3_settings()?;
            tracing::info!(
                region = %settings.region,
                bucket = %settings.bucket,
                endpoint = settings.endpoint.as_deref().unwrap_or("aws"),
                "using S3 storage backend"
            );
            Ok(Arc::new(
                S3Storage::connect(&settings, config.presign_expiry()),
            ))
        }
        StorageBackendKind::Memory => {
            let storage = InMemoryStorage::from_config(config);
            tracing::info!(bucket = %storage.bucket(), "using in-memory storage backend");
            Ok(Arc::new(storage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_refuse_s3_backend_without_settings() {
        let config = MediaStackConfig::default();
        let err = connect(&config).await.unwrap_err();
        assert!(matches!(err, ConfigError::MissingS3Settings));
    }

    #[tokio::test]
    async fn test_should_connect_memory_backend() {
        let config = MediaStackConfig::builder()
            .storage_backend(StorageBackendKind::Memory)
            .build();
        let storage = connect(&config).await.unwrap();
        assert!(!storage.object_exists("media/x.png").await.unwrap());
    }
}
