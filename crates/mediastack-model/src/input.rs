//! Request inputs for every MediaStack route.
//!
//! All inputs use `camelCase` JSON field naming. Structural validation (enum
//! membership, non-empty strings, minimum values) happens in the route's
//! declared schema before a handler ever deserializes one of these types, so
//! the serde derives here only describe the shape.

use serde::{Deserialize, Serialize};

use crate::types::MediaType;

// ---------------------------------------------------------------------------
// Path parameters
// ---------------------------------------------------------------------------

/// Path parameters for routes addressed by media id (`/api/media/:id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaIdParams {
    /// The metadata record id.
    pub id: String,
}

/// Path parameters for the greeting route (`/api/hello/:name`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloParams {
    /// Who to greet.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Media lifecycle
// ---------------------------------------------------------------------------

/// Body of `POST /api/media/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMediaInput {
    /// The kind of file that will be uploaded.
    #[serde(rename = "type")]
    pub media_type: MediaType,
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

/// Body of `PUT /api/upload/single`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleUploadInput {
    /// Object key returned by `POST /api/media/new`.
    pub key: String,
}

/// Body of `POST /api/upload/multipart/new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartStartInput {
    /// Object key returned by `POST /api/media/new`.
    pub key: String,
}

/// Body of `PUT /api/upload/multipart/parts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartPartsInput {
    /// Upload id returned by `POST /api/upload/multipart/new`.
    pub upload_id: String,
    /// How many part URLs to issue.
    pub parts: u32,
    /// Object key of the upload.
    pub key: String,
}

/// One uploaded part, as reported by the client when completing an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// ETag returned by the storage backend for this part.
    pub e_tag: String,
}

/// Body of `POST /api/upload/multipart/complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartCompleteInput {
    /// Object key of the upload.
    pub key: String,
    /// Upload id returned by `POST /api/upload/multipart/new`.
    pub upload_id: String,
    /// Every uploaded part, in any order.
    pub parts: Vec<CompletedPart>,
}
