//! Media record lifecycle: init, finalize, read, delete, and key checks.

use std::sync::Arc;

use tracing::{debug, info};

use mediastack_model::output::{FileDto, NewMediaOutput};
use mediastack_model::MediaType;

use crate::error::{MediaError, MediaResult};
use crate::metadata::{MediaMetadata, MediaUpdate, MetadataStore};
use crate::storage::StorageBackend;

/// Business logic over a [`MetadataStore`] and a [`StorageBackend`].
#[derive(Debug, Clone)]
pub struct MediaService {
    metadata: Arc<dyn MetadataStore>,
    storage: Arc<dyn StorageBackend>,
}

impl MediaService {
    /// Create a service over the given collaborators.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>, storage: Arc<dyn StorageBackend>) -> Self {
        Self { metadata, storage }
    }

    /// Create an uncreated record and hand out the key to upload to.
    pub async fn init_file(&self, media_type: MediaType) -> MediaResult<NewMediaOutput> {
        let created = self.metadata.create(media_type).await?;
        info!(id = %created.id, key = %created.key, "initialized media file");
        Ok(NewMediaOutput {
            id: created.id,
            key: created.key,
        })
    }

    /// Mark the record `id` as created once its object is in storage.
    pub async fn finalize_file(&self, id: &str) -> MediaResult<()> {
        let record = self
            .metadata
            .find_by_id(id)
            .await?
            .ok_or(MediaError::NotInitialized)?;
        if !self.storage.object_exists(&record.key).await? {
            return Err(MediaError::ObjectMissing);
        }

        let head = self.storage.head_object(&record.key).await?;
        if head.size == 0 {
            return Err(MediaError::EmptyObject);
        }

        self.metadata
            .update(
                &record.id,
                MediaUpdate {
                    size: head.size,
                    created: true,
                },
            )
            .await?;
        info!(id, size = head.size, "finalized media file");
        Ok(())
    }

    /// Public view of the record `id`. The download URL is only issued once
    /// the file is finalized.
    pub async fn read_file(&self, id: &str) -> MediaResult<FileDto> {
        let record = self.find_record(id).await?;
        if !self.storage.object_exists(&record.key).await? {
            return Err(MediaError::ObjectNotFound);
        }

        let url = if record.created {
            Some(self.storage.presign_get(&record.key).await?)
        } else {
            None
        };
        Ok(file_dto(record, url))
    }

    /// Remove the record `id`, then its object if one was uploaded.
    pub async fn delete_file(&self, id: &str) -> MediaResult<()> {
        let record = self.find_record(id).await?;
        self.metadata.remove(&record).await?;

        if self.storage.object_exists(&record.key).await? {
            self.storage.delete_object(&record.key).await?;
        } else {
            debug!(key = %record.key, "no object to delete");
        }
        info!(id, key = %record.key, "deleted media file");
        Ok(())
    }

    /// Fail unless some record owns `key`.
    pub async fn verify_file(&self, key: &str) -> MediaResult<()> {
        self.metadata
            .find_by_key(key)
            .await?
            .map(|_| ())
            .ok_or(MediaError::RecordNotFound)
    }

    async fn find_record(&self, id: &str) -> MediaResult<MediaMetadata> {
        self.metadata
            .find_by_id(id)
            .await?
            .ok_or(MediaError::RecordNotFound)
    }
}

fn file_dto(record: MediaMetadata, url: Option<String>) -> FileDto {
    FileDto {
        url,
        key: record.key,
        media_type: record.media_type,
        size: record.size,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::metadata::InMemoryMetadataStore;
    use crate::storage::{InMemoryStorage, Presigner};

    fn setup() -> (MediaService, Arc<InMemoryMetadataStore>, Arc<InMemoryStorage>) {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let storage = Arc::new(InMemoryStorage::new(
            "media",
            Presigner::new(
                "http://localhost:9000",
                "us-east-1",
                "test",
                "test",
                Duration::from_secs(3600),
            ),
        ));
        let service = MediaService::new(metadata.clone(), storage.clone());
        (service, metadata, storage)
    }

    #[tokio::test]
    async fn test_should_finalize_uploaded_file() {
        let (service, metadata, storage) = setup();
        let new = service.init_file(MediaType::Png).await.unwrap();
        storage.put_object(&new.key, &b"png-bytes"[..]);

        service.finalize_file(&new.id).await.unwrap();

        let record = metadata.find_by_id(&new.id).await.unwrap().unwrap();
        assert!(record.created);
        assert_eq!(record.size, Some(9));
    }

    #[tokio::test]
    async fn test_should_refuse_to_finalize_unknown_missing_or_empty_file() {
        let (service, _, storage) = setup();
        assert!(matches!(
            service.finalize_file("nope").await,
            Err(MediaError::NotInitialized)
        ));

        let new = service.init_file(MediaType::Jpg).await.unwrap();
        assert!(matches!(
            service.finalize_file(&new.id).await,
            Err(MediaError::ObjectMissing)
        ));

        storage.put_object(&new.key, Vec::new());
        assert!(matches!(
            service.finalize_file(&new.id).await,
            Err(MediaError::EmptyObject)
        ));
    }

    #[tokio::test]
    async fn test_should_read_file_with_url_only_after_finalize() {
        let (service, _, storage) = setup();
        let new = service.init_file(MediaType::Gif).await.unwrap();
        storage.put_object(&new.key, &b"gif"[..]);

        let before = service.read_file(&new.id).await.unwrap();
        assert_eq!(before.url, None);
        assert_eq!(before.media_type.as_deref(), Some("gif"));

        service.finalize_file(&new.id).await.unwrap();
        let after = service.read_file(&new.id).await.unwrap();
        let url = after.url.expect("download url");
        assert!(url.contains(&new.key));
        assert_eq!(after.size, Some(3));
    }

    #[tokio::test]
    async fn test_should_fail_read_without_record_or_object() {
        let (service, _, _) = setup();
        assert!(matches!(
            service.read_file("nope").await,
            Err(MediaError::RecordNotFound)
        ));
        let new = service.init_file(MediaType::Mp4).await.unwrap();
        assert!(matches!(
            service.read_file(&new.id).await,
            Err(MediaError::ObjectNotFound)
        ));
    }

    #[tokio::test]
    async fn test_should_delete_record_and_object() {
        let (service, metadata, storage) = setup();
        let new = service.init_file(MediaType::Mov).await.unwrap();
        storage.put_object(&new.key, &b"mov"[..]);

        service.delete_file(&new.id).await.unwrap();

        assert!(metadata.is_empty());
        assert!(!storage.object_exists(&new.key).await.unwrap());
        assert!(matches!(
            service.delete_file(&new.id).await,
            Err(MediaError::RecordNotFound)
        ));
    }

    #[tokio::test]
    async fn test_should_delete_record_without_object() {
        let (service, metadata, _) = setup();
        let new = service.init_file(MediaType::Avi).await.unwrap();
        service.delete_file(&new.id).await.unwrap();
        assert!(metadata.is_empty());
    }

    #[tokio::test]
    async fn test_should_verify_known_keys_only() {
        let (service, _, _) = setup();
        let new = service.init_file(MediaType::Mkv).await.unwrap();
        service.verify_file(&new.key).await.unwrap();
        assert!(matches!(
            service.verify_file("media/other.mkv").await,
            Err(MediaError::RecordNotFound)
        ));
    }
}
