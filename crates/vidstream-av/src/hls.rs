//! HLS transcoding of stored originals.
//!
//! Each asset gets one output directory, `<output_root>/<asset_id>/`, holding
//! `master.m3u8` and `segment_NNN.ts` files. The directory only appears once
//! the encoder has finished successfully; partial output lives in a hidden
//! staging directory and is removed on any failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use vidstream_common::paths::validate_component;

use crate::command::ToolCommand;
use crate::error::{Error, FailureCause, Result};
use crate::staging::StagingDir;

/// Name of the manifest inside an asset's output directory.
pub const MANIFEST_NAME: &str = "master.m3u8";

/// Segment file naming pattern handed to the encoder.
pub const SEGMENT_PATTERN: &str = "segment_%03d.ts";

/// Encoder settings for HLS output.
#[derive(Debug, Clone)]
pub struct HlsSettings {
    /// Encoder executable (ffmpeg or compatible).
    pub encoder: PathBuf,
    /// Target segment duration in seconds.
    pub segment_seconds: u32,
    pub video_codec: String,
    pub audio_codec: String,
    /// Upper bound on a single encoder run.
    pub timeout: Duration,
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            encoder: PathBuf::from("ffmpeg"),
            segment_seconds: 10,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            timeout: Duration::from_secs(3600),
        }
    }
}

/// Build the encoder argument vector for one transcode.
///
/// Every segment is listed in the manifest (`-hls_list_size 0`).
pub fn hls_args(source: &Path, output_dir: &Path, settings: &HlsSettings) -> Vec<String> {
    let segment_pattern = output_dir.join(SEGMENT_PATTERN);
    let manifest = output_dir.join(MANIFEST_NAME);

    vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-y".into(),
        "-i".into(),
        source.to_string_lossy().into_owned(),
        "-c:v".into(),
        settings.video_codec.clone(),
        "-c:a".into(),
        settings.audio_codec.clone(),
        "-f".into(),
        "hls".into(),
        "-hls_time".into(),
        settings.segment_seconds.to_string(),
        "-hls_list_size".into(),
        "0".into(),
        "-hls_playlist_type".into(),
        "vod".into(),
        "-hls_segment_filename".into(),
        segment_pattern.to_string_lossy().into_owned(),
        manifest.to_string_lossy().into_owned(),
    ]
}

/// Runs HLS transcodes into a shared output root.
///
/// Transcodes of the same asset id are serialized; different assets run
/// concurrently.
///
/// # Example
///
/// ```no_run
/// use vidstream_av::{HlsSettings, HlsTranscoder};
/// use tokio_util::sync::CancellationToken;
/// use std::path::Path;
///
/// # async fn example() -> vidstream_av::Result<()> {
/// let transcoder = HlsTranscoder::new("videos_hls", HlsSettings::default());
/// let dir = transcoder
///     .transcode("4f1c...", Path::new("videos/clip.mp4"), &CancellationToken::new())
///     .await?;
/// println!("manifest at {}", dir.join("master.m3u8").display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HlsTranscoder {
    output_root: PathBuf,
    settings: HlsSettings,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl HlsTranscoder {
    pub fn new(output_root: impl Into<PathBuf>, settings: HlsSettings) -> Self {
        Self {
            output_root: output_root.into(),
            settings,
            locks: DashMap::new(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn settings(&self) -> &HlsSettings {
        &self.settings
    }

    /// Transcode `source` into `<output_root>/<asset_id>/`.
    ///
    /// Returns the published output directory. Fails with
    /// [`Error::DirectoryCreate`] if the output directory already exists or
    /// cannot be prepared, and with [`Error::TranscodeFailed`] if the encoder
    /// does not finish successfully. After a failure no directory exists for
    /// the asset.
    pub async fn transcode(
        &self,
        asset_id: &str,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        validate_component(asset_id).map_err(|_| Error::InvalidAssetId(asset_id.to_string()))?;

        let _lock = self.lock(asset_id).await;
        self.transcode_locked(asset_id, source, cancel).await
    }

    async fn lock(&self, asset_id: &str) -> AssetLock<'_> {
        let mutex = self.locks.entry(asset_id.to_string()).or_default().clone();
        let guard = mutex.lock_owned().await;
        AssetLock {
            locks: &self.locks,
            asset_id: asset_id.to_string(),
            guard: Some(guard),
        }
    }

    async fn transcode_locked(
        &self,
        asset_id: &str,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        if let Err(e) = tokio::fs::File::open(source).await {
            return Err(Error::TranscodeFailed {
                asset_id: asset_id.to_string(),
                cause: FailureCause::SourceUnreadable {
                    path: source.to_path_buf(),
                    source: e,
                },
                cleanup: None,
            });
        }

        let dir_error = |source| Error::DirectoryCreate {
            asset_id: asset_id.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.output_root)
            .await
            .map_err(dir_error)?;

        let final_dir = self.output_root.join(asset_id);
        if tokio::fs::try_exists(&final_dir).await.map_err(dir_error)? {
            return Err(dir_error(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "output directory already exists",
            )));
        }

        let mut staging = StagingDir::create(&self.output_root, asset_id)
            .await
            .map_err(dir_error)?;

        tracing::info!(
            asset_id = %asset_id,
            source = %source.display(),
            segment_seconds = self.settings.segment_seconds,
            "Starting HLS transcode"
        );

        let mut cmd = ToolCommand::new(self.settings.encoder.clone());
        cmd.timeout(self.settings.timeout);
        cmd.args(hls_args(source, staging.path(), &self.settings));
        tracing::debug!(asset_id = %asset_id, args = ?cmd.get_args(), "Encoder arguments");

        let outcome = match cmd.run(cancel).await {
            Ok(()) => finish(&mut staging, &final_dir).await,
            Err(cause) => Err(cause),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(asset_id = %asset_id, dir = %final_dir.display(), "HLS transcode complete");
                Ok(final_dir)
            }
            Err(cause) => {
                let cleanup = staging.remove().await.err();
                if let Some(ref e) = cleanup {
                    tracing::error!(asset_id = %asset_id, error = %e, "Failed to remove partial HLS output");
                }
                tracing::warn!(asset_id = %asset_id, cause = %cause, "HLS transcode failed");
                Err(Error::TranscodeFailed {
                    asset_id: asset_id.to_string(),
                    cause,
                    cleanup,
                })
            }
        }
    }
}

async fn finish(staging: &mut StagingDir, final_dir: &Path) -> std::result::Result<(), FailureCause> {
    let manifest = staging.path().join(MANIFEST_NAME);
    match tokio::fs::metadata(&manifest).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(FailureCause::IncompleteOutput(format!("{MANIFEST_NAME} is not a file"))),
        Err(e) => return Err(FailureCause::IncompleteOutput(e.to_string())),
    }
    staging.publish(final_dir).await.map_err(FailureCause::Publish)
}

/// Holds an asset's transcode lock and drops the map entry once unused.
struct AssetLock<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    asset_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for AssetLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.asset_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
