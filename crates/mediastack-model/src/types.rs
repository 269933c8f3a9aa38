//! Shared domain types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Media file kinds accepted by the upload endpoints.
///
/// Serialized as the lowercase file extension (`"jpg"`, `"mp4"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// JPEG image.
    Jpg,
    /// PNG image.
    Png,
    /// GIF image.
    Gif,
    /// MPEG-4 video.
    Mp4,
    /// QuickTime video.
    Mov,
    /// AVI video.
    Avi,
    /// Matroska video.
    Mkv,
    /// WebM video.
    Webm,
}

impl MediaType {
    /// Every accepted media type, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Jpg,
        Self::Png,
        Self::Gif,
        Self::Mp4,
        Self::Mov,
        Self::Avi,
        Self::Mkv,
        Self::Webm,
    ];

    /// Returns the file extension for this media type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
        }
    }

    /// Every accepted extension, in declaration order.
    #[must_use]
    pub fn extensions() -> Vec<&'static str> {
        Self::ALL.iter().map(Self::as_str).collect()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a known media type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media type: {0}")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownMediaType(s.to_owned()))
    }
}
