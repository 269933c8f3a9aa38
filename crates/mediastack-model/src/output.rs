//! Response DTOs for every MediaStack route.
//!
//! All outputs use `camelCase` JSON field naming. Nullable fields are always
//! present and serialize as `null`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output of `POST /api/media/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMediaOutput {
    /// Id of the new metadata record.
    pub id: String,
    /// Object key the client must upload to.
    pub key: String,
}

/// Output of `POST /api/media/:id/finalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeOutput {
    /// Id of the finalized record.
    pub id: String,
}

/// Public view of one media record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    /// Presigned download URL; `null` until the file is finalized.
    pub url: Option<String>,
    /// Object key.
    pub key: String,
    /// Media type extension.
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Object size in bytes, known once finalized.
    pub size: Option<u64>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Output of `GET /api/media/:id`.
///
/// The file view is nested under `url` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMediaOutput {
    /// The file view.
    pub url: FileDto,
}

/// A plain `{"message": ...}` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageOutput {
    /// Human-readable message.
    pub message: String,
}

impl MessageOutput {
    /// Create a message body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Output of `PUT /api/upload/single`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUrlOutput {
    /// Presigned `PUT` URL for the whole object.
    pub url: String,
}

/// Output of `POST /api/upload/multipart/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUploadOutput {
    /// Object key of the upload.
    pub key: String,
    /// Storage-assigned upload id.
    pub upload_id: String,
}

/// One presigned part URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedPart {
    /// Presigned `PUT` URL for this part.
    pub signed_url: String,
    /// 1-based part number.
    pub part_number: u32,
}

/// Output of `PUT /api/upload/multipart/parts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartPresignedUrlsOutput {
    /// Part URLs in ascending part number order.
    pub parts: Vec<PresignedPart>,
}

/// Output of `POST /api/upload/multipart/complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartCompletedOutput {
    /// Object key of the assembled object.
    pub key: String,
    /// Location of the assembled object.
    pub location: String,
    /// Bucket holding the object, when the backend reports one.
    pub bucket: Option<String>,
    /// ETag of the assembled object.
    pub e_tag: String,
}

/// Output of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthOutput {
    /// Always `"running"` while the server accepts requests.
    pub status: String,
    /// Server version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_file_dto_with_nulls() {
        let now = Utc::now();
        let dto = FileDto {
            url: None,
            key: "media/x.png".to_owned(),
            media_type: Some("png".to_owned()),
            size: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&dto).expect("serialize FileDto");
        assert_eq!(json["url"], serde_json::Value::Null);
        assert_eq!(json["type"], "png");
        assert_eq!(json["size"], serde_json::Value::Null);
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_should_serialize_presigned_part_in_camel_case() {
        let part = PresignedPart {
            signed_url: "http://s3/x?sig".to_owned(),
            part_number: 1,
        };
        let json = serde_json::to_string(&part).expect("serialize PresignedPart");
        assert_eq!(json, r#"{"signedUrl":"http://s3/x?sig","partNumber":1}"#);
    }

    #[test]
    fn test_should_serialize_completed_output_etag_field() {
        let out = MultipartCompletedOutput {
            key: "k".to_owned(),
            location: "http://s3/b/k".to_owned(),
            bucket: Some("b".to_owned()),
            e_tag: "\"abc-2\"".to_owned(),
        };
        let json = serde_json::to_value(&out).expect("serialize MultipartCompletedOutput");
        assert_eq!(json["eTag"], "\"abc-2\"");
    }
}
