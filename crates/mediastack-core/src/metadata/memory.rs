//! Process-local metadata store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use mediastack_model::MediaType;

use super::{MediaMetadata, MediaUpdate, MetadataError, MetadataStore, NewMedia, new_object_key};

/// Process-local [`MetadataStore`].
///
/// Records are keyed by id, with a secondary index from object key to id.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: DashMap<String, MediaMetadata>,
    keys: DashMap<String, String>,
}

impl InMemoryMetadataStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create(&self, media_type: MediaType) -> Result<NewMedia, MetadataError> {
        let now = Utc::now();
        let record = MediaMetadata {
            id: uuid::Uuid::new_v4().to_string(),
            size: None,
            media_type: Some(media_type.to_string()),
            key: new_object_key(media_type),
            created: false,
            created_at: now,
            updated_at: now,
        };
        let created = NewMedia {
            id: record.id.clone(),
            key: record.key.clone(),
        };
        self.keys.insert(record.key.clone(), record.id.clone());
        self.records.insert(record.id.clone(), record);
        tracing::debug!(id = %created.id, key = %created.key, "created media record");
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MediaMetadata>, MetadataError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<MediaMetadata>, MetadataError> {
        let Some(id) = self.keys.get(key).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        self.find_by_id(&id).await
    }

    async fn update(&self, id: &str, update: MediaUpdate) -> Result<MediaMetadata, MetadataError> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| MetadataError::NotFound { id: id.to_owned() })?;
        record.size = Some(update.size);
        record.created = update.created;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn remove(&self, record: &MediaMetadata) -> Result<(), MetadataError> {
        self.records
            .remove(&record.id)
            .ok_or_else(|| MetadataError::NotFound {
                id: record.id.clone(),
            })?;
        self.keys.remove(&record.key);
        tracing::debug!(id = %record.id, key = %record.key, "removed media record");
        Ok(())
    }
}
