//! Typed ID wrapper for video assets.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an uploaded video asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(Uuid);

impl VideoId {
    /// Generate a new random video ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for VideoId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<VideoId> for Uuid {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

impl FromStr for VideoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_unique() {
        let a = VideoId::new();
        let b = VideoId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_video_id_roundtrip_through_string() {
        let id = VideoId::new();
        let parsed: VideoId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_video_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<VideoId>().is_err());
        assert!("../etc".parse::<VideoId>().is_err());
    }

    #[test]
    fn test_video_id_serializes_as_plain_string() {
        let uuid = Uuid::parse_str("6f1c1a52-1d4b-4c1e-9a40-0a7f3c2b9d11").unwrap();
        let json = serde_json::to_string(&VideoId::from(uuid)).unwrap();
        assert_eq!(json, "\"6f1c1a52-1d4b-4c1e-9a40-0a7f3c2b9d11\"");
    }
}
