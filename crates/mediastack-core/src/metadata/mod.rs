//! Media metadata records and the store that persists them.
//!
//! One record per media object. A record is created when an upload is
//! initialized (`created == false`) and marked created, with its size, once
//! the object is finalized.
//!
//! Two [`MetadataStore`] implementations exist:
//!
//! - [`PgMetadataStore`]: the `media_metadata` table in PostgreSQL
//! - [`InMemoryMetadataStore`]: a process-local store for development and tests

pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mediastack_model::MediaType;

use crate::config::{MediaStackConfig, MetadataBackendKind};

pub use memory::InMemoryMetadataStore;
pub use postgres::PgMetadataStore;

/// A persisted media record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// Record id (UUID v4).
    pub id: String,
    /// Object size in bytes, known once finalized.
    pub size: Option<u64>,
    /// Media type extension.
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Object key, `media/<uuid>.<type>`.
    pub key: String,
    /// Whether the object has been finalized.
    pub created: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Identity of a freshly created record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMedia {
    /// Record id.
    pub id: String,
    /// Object key the client uploads to.
    pub key: String,
}

/// Fields changed when a record is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaUpdate {
    /// Object size in bytes.
    pub size: u64,
    /// Whether the object is finalized.
    pub created: bool,
}

/// Metadata store failures.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// No record has this id.
    #[error("media record not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// The store itself failed.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Object key for a new upload of `media_type`.
#[must_use]
pub fn new_object_key(media_type: MediaType) -> String {
    format!("media/{}.{media_type}", uuid::Uuid::new_v4())
}

/// Persistence for [`MediaMetadata`].
#[async_trait]
pub trait MetadataStore: Send + Sync + fmt::Debug {
    /// Create an uncreated record for a new upload of `media_type`.
    async fn create(&self, media_type: MediaType) -> Result<NewMedia, MetadataError>;

    /// Look a record up by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<MediaMetadata>, MetadataError>;

    /// Look a record up by object key.
    async fn find_by_key(&self, key: &str) -> Result<Option<MediaMetadata>, MetadataError>;

    /// Apply `update` to the record with `id`.
    async fn update(&self, id: &str, update: MediaUpdate) -> Result<MediaMetadata, MetadataError>;

    /// Delete `record`.
    async fn remove(&self, record: &MediaMetadata) -> Result<(), MetadataError>;
}

/// Build the store selected by `config`.
///
/// The Postgres store connects and applies pending migrations before it is
/// returned.
pub async fn connect(config: &MediaStackConfig) -> anyhow::Result<Arc<dyn MetadataStore>> {
    match config.metadata_backend {
        MetadataBackendKind::Postgres => {
            let url = config.database_url()?;
            let store = PgMetadataStore::connect(url)
                .await
                .context("failed to connect to the metadata database")?;
            store
                .migrate()
                .await
                .context("failed to migrate the metadata database")?;
            tracing::info!("using Postgres metadata store");
            Ok(Arc::new(store))
        }
        MetadataBackendKind::Memory => {
            tracing::info!("using in-memory metadata store");
            Ok(Arc::new(InMemoryMetadataStore::new()))
        }
    }
}
