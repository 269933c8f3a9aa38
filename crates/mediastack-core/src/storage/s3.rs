//! S3 storage backend over `aws-sdk-s3`.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};

use mediastack_model::input::CompletedPart;

use super::{CompletedUpload, ObjectHead, StartedUpload, StorageBackend, StorageError};
use crate::config::S3Settings;

/// [`StorageBackend`] talking to AWS S3 or any S3-compatible service.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    expires: Duration,
}

impl S3Storage {
    /// Build a client from `settings`. A custom endpoint switches the client
    /// to path-style addressing.
    #[must_use]
    pub fn connect(settings: &S3Settings, expires: Duration) -> Self {
        let credentials = Credentials::new(
            settings.access_key.clone(),
            settings.secret_key.clone(),
            None,
            None,
            "mediastack",
        );
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: settings.bucket.clone(),
            expires,
        }
    }

    /// The bucket every operation targets.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn presigning_config(&self) -> Result<PresigningConfig, StorageError> {
        PresigningConfig::expires_in(self.expires)
            .map_err(|e| StorageError::Presign(e.to_string()))
    }
}

fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    StorageError::Internal(anyhow::anyhow!(
        "{operation} failed: {}",
        DisplayErrorContext(err)
    ))
}

fn presign_error<E, R>(err: SdkError<E, R>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    StorageError::Presign(DisplayErrorContext(err).to_string())
}

/// HTTP status of a service error, if the request reached the service.
fn status_of<E>(err: &SdkError<E, aws_sdk_s3::config::http::HttpResponse>) -> Option<u16> {
    err.raw_response().map(|r| r.status().as_u16())
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.head_object(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NoSuchKey { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        match result {
            Ok(output) => {
                let size = output
                    .content_length()
                    .and_then(|len| u64::try_from(len).ok())
                    .unwrap_or(0);
                Ok(ObjectHead { size })
            }
            // S3 answers 403 instead of 404 when the caller may not list the bucket.
            Err(err) if matches!(status_of(&err), Some(404 | 403)) => {
                Err(StorageError::NoSuchKey {
                    key: key.to_owned(),
                })
            }
            Err(err) => Err(sdk_error("HeadObject", err)),
        }
    }

    async fn presign_get(&self, key: &str) -> Result<String, StorageError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning_config()?)
            .await
            .map_err(presign_error)?;
        Ok(request.uri().to_owned())
    }

    async fn presign_put(&self, key: &str) -> Result<String, StorageError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(self.presigning_config()?)
            .await
            .map_err(presign_error)?;
        Ok(request.uri().to_owned())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("DeleteObject", e))?;
        Ok(())
    }

    async fn begin_multipart(&self, key: &str) -> Result<StartedUpload, StorageError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("CreateMultipartUpload", e))?;
        Ok(StartedUpload {
            key: output.key().map(ToOwned::to_owned),
            upload_id: output.upload_id().map(ToOwned::to_owned),
        })
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<String, StorageError> {
        let part_number = i32::try_from(part_number).map_err(|_| StorageError::InvalidPart {
            part_number,
            reason: "part number out of range".to_owned(),
        })?;
        let request = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .presigned(self.presigning_config()?)
            .await
            .map_err(presign_error)?;
        Ok(request.uri().to_owned())
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompletedUpload, StorageError> {
        let mut upload = CompletedMultipartUpload::builder();
        for part in parts {
            let part_number =
                i32::try_from(part.part_number).map_err(|_| StorageError::InvalidPart {
                    part_number: part.part_number,
                    reason: "part number out of range".to_owned(),
                })?;
            upload = upload.parts(
                S3CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(&part.e_tag)
                    .build(),
            );
        }

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(upload.build())
            .send()
            .await
            .map_err(|e| sdk_error("CompleteMultipartUpload", e))?;

        Ok(CompletedUpload {
            key: output.key().map(ToOwned::to_owned),
            location: output.location().map(ToOwned::to_owned),
            bucket: output.bucket().map(ToOwned::to_owned),
            e_tag: output.e_tag().map(ToOwned::to_owned),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: Option<&str>) -> S3Settings {
        S3Settings {
            endpoint: endpoint.map(ToOwned::to_owned),
            region: "us-east-1".to_owned(),
            access_key: "test".to_owned(),
            secret_key: "test".to_owned(),
            bucket: "media".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_should_presign_path_style_get_for_custom_endpoint() {
        let storage = S3Storage::connect(
            &settings(Some("http://localhost:9000")),
            Duration::from_secs(3600),
        );
        let url = storage.presign_get("media/a.png").await.unwrap();
        assert!(url.starts_with("http://localhost:9000/media/media/a.png?"), "{url}");
        assert!(url.contains("X-Amz-Expires=3600"));
    }

    #[tokio::test]
    async fn test_should_presign_part_with_upload_id() {
        let storage = S3Storage::connect(
            &settings(Some("http://localhost:9000")),
            Duration::from_secs(3600),
        );
        let url = storage
            .presign_part("media/v.mp4", "upload-1", 2)
            .await
            .unwrap();
        assert!(url.contains("partNumber=2"), "{url}");
        assert!(url.contains("uploadId=upload-1"), "{url}");
    }

    #[test]
    fn test_should_keep_bucket_from_settings() {
        let storage = S3Storage::connect(&settings(None), Duration::from_secs(60));
        assert_eq!(storage.bucket(), "media");
    }
}
