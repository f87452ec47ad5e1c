//! Rust models matching the database schema.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use vidstream_common::{VideoId, DEFAULT_CONTENT_TYPE};

/// Asset record for an uploaded video.
///
/// `file_path` locates the original on disk and is deliberately never
/// serialized to clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "videoId")]
    pub id: VideoId,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Content type to serve the original with.
    pub fn effective_content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// Location of the stored original.
    pub fn path(&self) -> &Path {
        Path::new(&self.file_path)
    }
}
