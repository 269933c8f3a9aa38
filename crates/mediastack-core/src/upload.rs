//! Presigned single and multipart uploads.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{error, info};

use mediastack_model::input::CompletedPart;
use mediastack_model::output::{
    MultipartCompletedOutput, MultipartPresignedUrlsOutput, MultipartUploadOutput, PresignedPart,
};

use crate::error::{MediaError, MediaResult};
use crate::storage::StorageBackend;

/// Most parts one multipart upload may have, as in S3.
pub const MAX_PARTS: u32 = 10_000;

/// Part URLs presigned at once.
const PRESIGN_CONCURRENCY: usize = 16;

/// Hands out upload URLs and drives the multipart lifecycle.
#[derive(Debug, Clone)]
pub struct UploadService {
    storage: Arc<dyn StorageBackend>,
}

impl UploadService {
    /// Create a service over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// A presigned `PUT` URL for uploading `key` in one request.
    pub async fn presigned_put_url(&self, key: &str) -> MediaResult<String> {
        Ok(self.storage.presign_put(key).await?)
    }

    /// Start a multipart upload for `key`.
    pub async fn start_multipart(&self, key: &str) -> MediaResult<MultipartUploadOutput> {
        let started = self.storage.begin_multipart(key).await?;
        let (Some(key), Some(upload_id)) = (started.key, started.upload_id) else {
            return Err(MediaError::MultipartCreateFailed);
        };
        info!(key, upload_id, "started multipart upload");
        Ok(MultipartUploadOutput { key, upload_id })
    }

    /// Presigned URLs for parts `1..=parts`, at most [`PRESIGN_CONCURRENCY`]
    /// in flight. Callers bound `parts` by [`MAX_PARTS`].
    ///
    /// The task yields after every batch so a request deadline can fire
    /// even when the backend signs without awaiting anything.
    pub async fn multipart_part_urls(
        &self,
        key: &str,
        upload_id: &str,
        parts: u32,
    ) -> MediaResult<MultipartPresignedUrlsOutput> {
        let mut requests = stream::iter(1..=parts)
            .map(|part_number| async move {
                let signed_url = self
                    .storage
                    .presign_part(key, upload_id, part_number)
                    .await?;
                Ok::<_, MediaError>(PresignedPart {
                    signed_url,
                    part_number,
                })
            })
            .buffered(PRESIGN_CONCURRENCY);

        let mut signed = Vec::with_capacity(parts.min(MAX_PARTS) as usize);
        while let Some(part) = requests.try_next().await? {
            signed.push(part);
            if signed.len() % PRESIGN_CONCURRENCY == 0 {
                tokio::task::yield_now().await;
            }
        }
        Ok(MultipartPresignedUrlsOutput { parts: signed })
    }

    /// Assemble the upload from `parts`, given in any order.
    pub async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        mut parts: Vec<CompletedPart>,
    ) -> MediaResult<MultipartCompletedOutput> {
        parts.sort_by_key(|part| part.part_number);

        let completed = self
            .storage
            .complete_multipart(key, upload_id, &parts)
            .await
            .map_err(|err| {
                error!(key, upload_id, error = %err, "error completing multipart upload");
                MediaError::MultipartCompleteFailed
            })?;

        let (Some(location), Some(e_tag)) = (completed.location, completed.e_tag) else {
            error!(key, upload_id, "multipart completion reported no location or ETag");
            return Err(MediaError::MultipartCompleteFailed);
        };
        info!(key, upload_id, parts = parts.len(), "completed multipart upload");
        Ok(MultipartCompletedOutput {
            key: key.to_owned(),
            location,
            bucket: completed.bucket,
            e_tag,
        })
    }
}
