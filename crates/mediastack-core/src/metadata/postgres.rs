//! PostgreSQL metadata store.
//!
//! Records live in the `media_metadata` table created by the migrations under
//! `migrations/`. Column names keep the camelCase timestamps of the table
//! layout (`"createdAt"`, `"updatedAt"`), so every identifier is quoted.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use mediastack_model::MediaType;

use super::{MediaMetadata, MediaUpdate, MetadataError, MetadataStore, NewMedia, new_object_key};

const COLUMNS: &str = r#""id", "size", "type", "key", "created", "createdAt", "updatedAt""#;

/// [`MetadataStore`] over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct MediaRow {
    id: Uuid,
    size: Option<i64>,
    #[sqlx(rename = "type")]
    media_type: Option<String>,
    key: String,
    created: bool,
    #[sqlx(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    updated_at: DateTime<Utc>,
}

impl From<MediaRow> for MediaMetadata {
    fn from(row: MediaRow) -> Self {
        Self {
            id: row.id.to_string(),
            size: row.size.and_then(|s| u64::try_from(s).ok()),
            media_type: row.media_type,
            key: row.key,
            created: row.created,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PgMetadataStore {
    /// Open a pool against `url`.
    pub async fn connect(url: &str) -> Result<Self, MetadataError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .context("failed to open Postgres pool")?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<(), MetadataError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .context("failed to run metadata migrations")?;
        Ok(())
    }
}

/// Record ids are UUIDs; anything else cannot name a row.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> MetadataError {
    move |err| MetadataError::Internal(anyhow::Error::new(err).context(operation))
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn create(&self, media_type: MediaType) -> Result<NewMedia, MetadataError> {
        let id = Uuid::new_v4();
        let key = new_object_key(media_type);
        sqlx::query(r#"INSERT INTO media_metadata ("id", "type", "key") VALUES ($1, $2, $3)"#)
            .bind(id)
            .bind(media_type.to_string())
            .bind(&key)
            .execute(&self.pool)
            .await
            .map_err(db_error("insert media record"))?;
        tracing::debug!(%id, %key, "created media record");
        Ok(NewMedia {
            id: id.to_string(),
            key,
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MediaMetadata>, MetadataError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, MediaRow>(&format!(
            r#"SELECT {COLUMNS} FROM media_metadata WHERE "id" = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("select media record by id"))?;
        Ok(row.map(MediaMetadata::from))
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<MediaMetadata>, MetadataError> {
        let row = sqlx::query_as::<_, MediaRow>(&format!(
            r#"SELECT {COLUMNS} FROM media_metadata WHERE "key" = $1 LIMIT 1"#
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("select media record by key"))?;
        Ok(row.map(MediaMetadata::from))
    }

    async fn update(&self, id: &str, update: MediaUpdate) -> Result<MediaMetadata, MetadataError> {
        let not_found = || MetadataError::NotFound { id: id.to_owned() };
        let uuid = parse_id(id).ok_or_else(not_found)?;
        let size = i64::try_from(update.size).context("object size exceeds BIGINT")?;
        let row = sqlx::query_as::<_, MediaRow>(&format!(
            r#"UPDATE media_metadata SET "size" = $2, "created" = $3, "updatedAt" = now()
               WHERE "id" = $1 RETURNING {COLUMNS}"#
        ))
        .bind(uuid)
        .bind(size)
        .bind(update.created)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update media record"))?;
        row.map(MediaMetadata::from).ok_or_else(not_found)
    }

    async fn remove(&self, record: &MediaMetadata) -> Result<(), MetadataError> {
        let not_found = || MetadataError::NotFound {
            id: record.id.clone(),
        };
        let uuid = parse_id(&record.id).ok_or_else(not_found)?;
        let result = sqlx::query(r#"DELETE FROM media_metadata WHERE "id" = $1"#)
            .bind(uuid)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete media record"))?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        tracing::debug!(id = %record.id, key = %record.key, "removed media record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_convert_row_into_record() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let record = MediaMetadata::from(MediaRow {
            id,
            size: Some(1024),
            media_type: Some("mp4".to_owned()),
            key: "media/x.mp4".to_owned(),
            created: true,
            created_at: now,
            updated_at: now,
        });
        assert_eq!(record.id, id.to_string());
        assert_eq!(record.size, Some(1024));
        assert_eq!(record.media_type.as_deref(), Some("mp4"));
        assert!(record.created);
    }

    #[test]
    fn test_should_drop_negative_size() {
        let now = Utc::now();
        let record = MediaMetadata::from(MediaRow {
            id: Uuid::new_v4(),
            size: Some(-1),
            media_type: None,
            key: "media/x.png".to_owned(),
            created: false,
            created_at: now,
            updated_at: now,
        });
        assert_eq!(record.size, None);
    }

    #[test]
    fn test_should_only_accept_uuid_ids() {
        assert!(parse_id("not-a-uuid").is_none());
        assert!(parse_id(&Uuid::new_v4().to_string()).is_some());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_should_persist_record_lifecycle() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let store = PgMetadataStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();

        let new = store.create(MediaType::Jpg).await.unwrap();
        let record = store.find_by_key(&new.key).await.unwrap().expect("record");
        assert_eq!(record.id, new.id);
        assert!(!record.created);

        let updated = store
            .update(
                &new.id,
                MediaUpdate {
                    size: 7,
                    created: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.size, Some(7));
        assert!(updated.created);

        store.remove(&updated).await.unwrap();
        assert!(store.find_by_id(&new.id).await.unwrap().is_none());
        assert!(store.find_by_id("not-a-uuid").await.unwrap().is_none());
    }
}
