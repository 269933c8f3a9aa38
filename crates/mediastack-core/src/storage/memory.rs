//! Process-local storage backend.
//!
//! Objects and in-progress multipart uploads live in [`DashMap`]s. ETags are
//! quoted MD5 digests; an assembled multipart object gets the composite
//! `"<md5-of-part-md5s>-<count>"` ETag. Presigned URLs are real SigV4 URLs
//! against the configured endpoint, so clients see the same shapes as with
//! S3.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use md5::{Digest, Md5};
use tracing::debug;

use mediastack_model::input::CompletedPart;

use super::presign::Presigner;
use super::{CompletedUpload, ObjectHead, StartedUpload, StorageBackend, StorageError};
use crate::config::MediaStackConfig;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    e_tag: String,
}

#[derive(Debug, Default)]
struct PendingUpload {
    key: String,
    /// Uploaded parts keyed by part number (1-based).
    parts: BTreeMap<u32, StoredObject>,
}

/// In-memory [`StorageBackend`].
#[derive(Debug)]
pub struct InMemoryStorage {
    bucket: String,
    presigner: Presigner,
    objects: DashMap<String, StoredObject>,
    uploads: DashMap<String, PendingUpload>,
}

impl InMemoryStorage {
    /// Create an empty store for `bucket`, signing URLs with `presigner`.
    #[must_use]
    pub fn new(bucket: impl Into<String>, presigner: Presigner) -> Self {
        Self {
            bucket: bucket.into(),
            presigner,
            objects: DashMap::new(),
            uploads: DashMap::new(),
        }
    }

    /// Create a store from the S3 settings in `config`, filling in local
    /// defaults for anything unset.
    #[must_use]
    pub fn from_config(config: &MediaStackConfig) -> Self {
        let presigner = Presigner::new(
            config
                .s3_endpoint
                .clone()
                .unwrap_or_else(|| "http://localhost:9000".to_owned()),
            config
                .s3_region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_owned()),
            config
                .s3_access_key
                .clone()
                .unwrap_or_else(|| "test".to_owned()),
            config
                .s3_secret_key
                .clone()
                .unwrap_or_else(|| "test".to_owned()),
            config.presign_expiry(),
        );
        let bucket = config
            .s3_bucket_name
            .clone()
            .unwrap_or_else(|| "media".to_owned());
        Self::new(bucket, presigner)
    }

    /// The bucket name reported to clients.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store an object directly, as a client holding a presigned `PUT` URL
    /// would. Returns the object's ETag.
    pub fn put_object(&self, key: &str, data: impl Into<Bytes>) -> String {
        let stored = stored(data.into());
        let e_tag = stored.e_tag.clone();
        debug!(key, size = stored.data.len(), "stored object");
        self.objects.insert(key.to_owned(), stored);
        e_tag
    }

    /// Store one part of a multipart upload, as a client holding a presigned
    /// part URL would. Returns the part's ETag.
    pub fn upload_part(
        &self,
        upload_id: &str,
        part_number: u32,
        data: impl Into<Bytes>,
    ) -> Result<String, StorageError> {
        let mut upload = self
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StorageError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            })?;
        let stored = stored(data.into());
        let e_tag = stored.e_tag.clone();
        upload.parts.insert(part_number, stored);
        Ok(e_tag)
    }
}

fn stored(data: Bytes) -> StoredObject {
    let e_tag = format!("\"{}\"", hex::encode(Md5::digest(&data)));
    StoredObject { data, e_tag }
}

/// MD5 of the concatenated part digests, suffixed with the part count.
fn composite_e_tag(parts: &[&StoredObject]) -> String {
    let mut digests = Vec::with_capacity(parts.len() * 16);
    for part in parts {
        if let Ok(bytes) = hex::decode(part.e_tag.trim_matches('"')) {
            digests.extend_from_slice(&bytes);
        }
    }
    format!("\"{}-{}\"", hex::encode(Md5::digest(&digests)), parts.len())
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.contains_key(key))
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead, StorageError> {
        let object = self.objects.get(key).ok_or_else(|| StorageError::NoSuchKey {
            key: key.to_owned(),
        })?;
        Ok(ObjectHead {
            size: object.data.len() as u64,
        })
    }

    async fn presign_get(&self, key: &str) -> Result<String, StorageError> {
        Ok(self.presigner.presign("GET", &self.bucket, key, &[]))
    }

    async fn presign_put(&self, key: &str) -> Result<String, StorageError> {
        Ok(self.presigner.presign("PUT", &self.bucket, key, &[]))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.remove(key);
        Ok(())
    }

    async fn begin_multipart(&self, key: &str) -> Result<StartedUpload, StorageError> {
        let upload_id = uuid::Uuid::new_v4().simple().to_string();
        self.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                key: key.to_owned(),
                parts: BTreeMap::new(),
            },
        );
        debug!(key, upload_id, "started multipart upload");
        Ok(StartedUpload {
            key: Some(key.to_owned()),
            upload_id: Some(upload_id),
        })
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<String, StorageError> {
        let query = [
            ("partNumber", part_number.to_string()),
            ("uploadId", upload_id.to_owned()),
        ];
        Ok(self.presigner.presign("PUT", &self.bucket, key, &query))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompletedUpload, StorageError> {
        let no_such_upload = || StorageError::NoSuchUpload {
            upload_id: upload_id.to_owned(),
        };
        let upload = self.uploads.get(upload_id).ok_or_else(no_such_upload)?;
        if upload.key != key {
            return Err(no_such_upload());
        }
        if parts.is_empty() {
            return Err(StorageError::InvalidPart {
                part_number: 0,
                reason: "at least one part is required".to_owned(),
            });
        }
        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(StorageError::InvalidPartOrder);
        }

        let mut selected = Vec::with_capacity(parts.len());
        for part in parts {
            let stored = upload
                .parts
                .get(&part.part_number)
                .ok_or_else(|| StorageError::InvalidPart {
                    part_number: part.part_number,
                    reason: "part was never uploaded".to_owned(),
                })?;
            if stored.e_tag.trim_matches('"') != part.e_tag.trim_matches('"') {
                return Err(StorageError::InvalidPart {
                    part_number: part.part_number,
                    reason: "ETag does not match".to_owned(),
                });
            }
            selected.push(stored);
        }

        let mut combined = BytesMut::new();
        for part in &selected {
            combined.extend_from_slice(&part.data);
        }
        let e_tag = composite_e_tag(&selected);
        drop(upload);

        let size = combined.len();
        self.objects.insert(
            key.to_owned(),
            StoredObject {
                data: combined.freeze(),
                e_tag: e_tag.clone(),
            },
        );
        self.uploads.remove(upload_id);
        debug!(key, upload_id, size, parts = parts.len(), "completed multipart upload");

        Ok(CompletedUpload {
            key: Some(key.to_owned()),
            location: Some(self.presigner.object_url(&self.bucket, key)),
            bucket: Some(self.bucket.clone()),
            e_tag: Some(e_tag),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn storage() -> InMemoryStorage {
        InMemoryStorage::new(
            "media",
            Presigner::new(
                "http://localhost:9000",
                "us-east-1",
                "test",
                "test",
                Duration::from_secs(3600),
            ),
        )
    }

    fn part(part_number: u32, e_tag: &str) -> CompletedPart {
        CompletedPart {
            part_number,
            e_tag: e_tag.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_should_report_existence_and_size() {
        let s = storage();
        assert!(!s.object_exists("media/a.png").await.unwrap());
        s.put_object("media/a.png", &b"hello"[..]);
        assert!(s.object_exists("media/a.png").await.unwrap());
        assert_eq!(s.head_object("media/a.png").await.unwrap().size, 5);
    }

    #[tokio::test]
    async fn test_should_fail_head_for_missing_object() {
        let err = storage().head_object("media/none.png").await.unwrap_err();
        assert!(matches!(err, StorageError::NoSuchKey { .. }));
    }

    #[test]
    fn test_should_use_md5_etag() {
        let e_tag = storage().put_object("k", &b"hello"[..]);
        assert_eq!(e_tag, "\"5d41402abc4b2a76b9719d911017c592\"");
    }

    #[tokio::test]
    async fn test_should_delete_object_idempotently() {
        let s = storage();
        s.put_object("k", &b"x"[..]);
        s.delete_object("k").await.unwrap();
        s.delete_object("k").await.unwrap();
        assert!(!s.object_exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_should_presign_urls_for_bucket() {
        let s = storage();
        let get = s.presign_get("media/a.png").await.unwrap();
        let put = s.presign_put("media/a.png").await.unwrap();
        assert!(get.starts_with("http://localhost:9000/media/media/a.png?"));
        assert!(put.contains("X-Amz-Signature="));
        let part = s.presign_part("media/v.mp4", "u1", 3).await.unwrap();
        assert!(part.contains("partNumber=3"));
        assert!(part.contains("uploadId=u1"));
    }

    #[tokio::test]
    async fn test_should_assemble_multipart_upload() {
        let s = storage();
        let started = s.begin_multipart("media/v.mp4").await.unwrap();
        let upload_id = started.upload_id.unwrap();
        let e1 = s.upload_part(&upload_id, 1, &b"abc"[..]).unwrap();
        let e2 = s.upload_part(&upload_id, 2, &b"def"[..]).unwrap();

        let done = s
            .complete_multipart("media/v.mp4", &upload_id, &[part(1, &e1), part(2, &e2)])
            .await
            .unwrap();
        assert_eq!(done.bucket.as_deref(), Some("media"));
        assert_eq!(
            done.location.as_deref(),
            Some("http://localhost:9000/media/media/v.mp4")
        );
        assert!(done.e_tag.unwrap().ends_with("-2\""));
        assert_eq!(s.head_object("media/v.mp4").await.unwrap().size, 6);

        let again = s
            .complete_multipart("media/v.mp4", &upload_id, &[part(1, &e1)])
            .await
            .unwrap_err();
        assert!(matches!(again, StorageError::NoSuchUpload { .. }));
    }

    #[tokio::test]
    async fn test_should_reject_unordered_parts() {
        let s = storage();
        let upload_id = s.begin_multipart("k").await.unwrap().upload_id.unwrap();
        let e1 = s.upload_part(&upload_id, 1, &b"a"[..]).unwrap();
        let e2 = s.upload_part(&upload_id, 2, &b"b"[..]).unwrap();
        let err = s
            .complete_multipart("k", &upload_id, &[part(2, &e2), part(1, &e1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPartOrder));
    }

    #[tokio::test]
    async fn test_should_reject_mismatched_etag() {
        let s = storage();
        let upload_id = s.begin_multipart("k").await.unwrap().upload_id.unwrap();
        s.upload_part(&upload_id, 1, &b"a"[..]).unwrap();
        let err = s
            .complete_multipart("k", &upload_id, &[part(1, "\"deadbeef\"")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPart { part_number: 1, .. }));
    }

    #[tokio::test]
    async fn test_should_reject_unknown_upload() {
        let s = storage();
        assert!(matches!(
            s.upload_part("nope", 1, &b"a"[..]),
            Err(StorageError::NoSuchUpload { .. })
        ));
        let err = s
            .complete_multipart("k", "nope", &[part(1, "x")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NoSuchUpload { .. }));
    }
}
