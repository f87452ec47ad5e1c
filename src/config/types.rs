use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use vidstream_av::HlsSettings;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding uploaded originals
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,

    /// Directory holding per-asset HLS output
    #[serde(default = "default_hls_dir")]
    pub hls_dir: PathBuf,

    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Maximum accepted request body for uploads, in MiB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

fn default_video_dir() -> PathBuf {
    PathBuf::from("videos")
}
fn default_hls_dir() -> PathBuf {
    PathBuf::from("videos_hls")
}
fn default_database() -> PathBuf {
    PathBuf::from("vidstream.db")
}
fn default_max_upload_mb() -> u64 {
    2048
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            video_dir: default_video_dir(),
            hls_dir: default_hls_dir(),
            database: default_database(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl StorageConfig {
    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Explicit encoder path; `ffmpeg` on PATH when unset
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Kill the encoder after this many seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_segment_seconds() -> u32 {
    10
}
fn default_video_codec() -> String {
    "libx264".to_string()
}
fn default_audio_codec() -> String {
    "aac".to_string()
}
fn default_timeout_secs() -> u64 {
    3600
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            segment_seconds: default_segment_seconds(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TranscodeConfig {
    pub fn hls_settings(&self) -> HlsSettings {
        HlsSettings {
            encoder: self
                .ffmpeg_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            segment_seconds: self.segment_seconds,
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}
