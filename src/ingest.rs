//! Ingestion flow: store an upload, record it, transcode it.
//!
//! Storage and metadata failures abort ingestion. A transcode failure does
//! not: the record and the original stay valid for direct streaming, and the
//! failure is reported alongside the record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use vidstream_av::HlsTranscoder;
use vidstream_common::{Error, Result, VideoId, DEFAULT_CONTENT_TYPE};
use vidstream_db::models::Video;
use vidstream_db::pool::{get_conn, DbPool};
use vidstream_db::queries::videos::{self, NewVideo};

use crate::storage::{content_type_for, AssetStore, StoredFile};

/// An upload as received from the client.
pub struct Upload<R> {
    /// Client-supplied filename; sanitized before use.
    pub filename: String,
    /// Client-supplied content type, if any.
    pub content_type: Option<String>,
    pub reader: R,
}

/// An original persisted to the asset store but not yet recorded.
#[derive(Debug)]
pub struct StoredUpload {
    pub file: StoredFile,
    pub content_type: Option<String>,
}

/// Outcome of a completed ingestion.
#[derive(Debug)]
pub struct IngestReport {
    pub video: Video,
    /// Published HLS directory, when the transcode succeeded.
    pub hls_dir: Option<PathBuf>,
    /// Why the transcode failed, when it did.
    pub transcode_error: Option<vidstream_av::Error>,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.transcode_error.is_none()
    }
}

/// Runs uploads through storage, the metadata store and the transcoder.
pub struct Ingestor {
    db: DbPool,
    assets: AssetStore,
    transcoder: Arc<HlsTranscoder>,
}

impl Ingestor {
    pub fn new(db: DbPool, assets: AssetStore, transcoder: Arc<HlsTranscoder>) -> Self {
        Self {
            db,
            assets,
            transcoder,
        }
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn hls_root(&self) -> &Path {
        self.transcoder.output_root()
    }

    /// Ingest an upload in one call.
    pub async fn ingest<R>(
        &self,
        upload: Upload<R>,
        title: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestReport>
    where
        R: AsyncRead + Unpin,
    {
        check_title(title)?;
        let stored = self.store(upload).await?;
        self.register(stored, title, description, cancel).await
    }

    /// Persist an upload to the asset store.
    pub async fn store<R>(&self, upload: Upload<R>) -> Result<StoredUpload>
    where
        R: AsyncRead + Unpin,
    {
        let file = self.assets.persist(&upload.filename, upload.reader).await?;

        let content_type = upload
            .content_type
            .filter(|ct| !ct.trim().is_empty() && ct != DEFAULT_CONTENT_TYPE)
            .or_else(|| content_type_for(&file.path).map(String::from));

        Ok(StoredUpload { file, content_type })
    }

    /// Drop a stored upload that will not be recorded.
    pub async fn discard(&self, stored: StoredUpload) {
        if let Err(e) = self.assets.remove(&stored.file.path).await {
            tracing::error!(path = %stored.file.path.display(), error = %e, "Failed to remove unrecorded upload");
        }
    }

    /// Record a stored upload and transcode it.
    ///
    /// If the record cannot be written the stored file is removed.
    pub async fn register(
        &self,
        stored: StoredUpload,
        title: &str,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        if let Err(e) = check_title(title) {
            self.discard(stored).await;
            return Err(e);
        }

        let id = VideoId::new();
        let file_path = stored.file.path.to_string_lossy().into_owned();

        let created = get_conn(&self.db).and_then(|conn| {
            videos::create_video(
                &conn,
                &NewVideo {
                    id,
                    title: title.trim(),
                    description,
                    file_path: &file_path,
                    content_type: stored.content_type.as_deref(),
                },
            )
        });

        let video = match created {
            Ok(video) => video,
            Err(e) => {
                tracing::error!(video_id = %id, error = %e, "Failed to record upload");
                self.discard(stored).await;
                return Err(e);
            }
        };

        tracing::info!(video_id = %video.id, path = %file_path, "Recorded upload, starting transcode");

        let (hls_dir, transcode_error) = match self
            .transcoder
            .transcode(&video.id.to_string(), video.path(), cancel)
            .await
        {
            Ok(dir) => (Some(dir), None),
            Err(e) => {
                tracing::error!(video_id = %video.id, error = %e, "Transcode failed; original remains available");
                (None, Some(e))
            }
        };

        Ok(IngestReport {
            video,
            hls_dir,
            transcode_error,
        })
    }

    /// All records, oldest first.
    pub fn list(&self) -> Result<Vec<Video>> {
        let conn = get_conn(&self.db)?;
        videos::list_videos(&conn)
    }

    /// One record by id.
    pub fn get(&self, id: VideoId) -> Result<Video> {
        let conn = get_conn(&self.db)?;
        videos::get_video(&conn, id)
    }

    /// The oldest record with this title. Titles are stored trimmed, so the
    /// lookup trims too.
    pub fn get_by_title(&self, title: &str) -> Result<Video> {
        let conn = get_conn(&self.db)?;
        videos::get_video_by_title(&conn, title.trim())
    }
}

fn check_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::validation("title must not be empty"));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use vidstream_av::HlsSettings;
    use vidstream_db::pool::init_memory_pool;

    fn ingestor(dir: &Path, encoder: PathBuf) -> Ingestor {
        let transcoder = HlsTranscoder::new(
            dir.join("hls"),
            HlsSettings {
                encoder,
                ..HlsSettings::default()
            },
        );
        Ingestor::new(
            init_memory_pool().unwrap(),
            AssetStore::new(dir.join("videos")),
            Arc::new(transcoder),
        )
    }

    fn upload(bytes: &'static [u8]) -> Upload<&'static [u8]> {
        Upload {
            filename: "clip.mp4".into(),
            content_type: None,
            reader: bytes,
        }
    }

    #[tokio::test]
    async fn test_failed_transcode_keeps_record() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(dir.path(), PathBuf::from("false"));

        let report = ingestor
            .ingest(upload(b"data"), "Clip", "", &CancellationToken::new())
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert!(report.hls_dir.is_none());
        assert_eq!(report.video.content_type.as_deref(), Some("video/mp4"));
        let fetched = ingestor.get(report.video.id).unwrap();
        assert_eq!(fetched.title, "Clip");
        assert_eq!(fetched.file_path, report.video.file_path);
        assert!(report.video.path().is_file());
        assert!(!dir.path().join("hls").join(report.video.id.to_string()).exists());
    }

    #[tokio::test]
    async fn test_blank_title_rejected_before_storing() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(dir.path(), PathBuf::from("false"));

        let err = ingestor
            .ingest(upload(b"data"), "   ", "", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_matches!(err, Error::Validation(_));
        assert!(ingestor.list().unwrap().is_empty());
        assert!(!dir.path().join("videos").join("clip.mp4").exists());
    }

    #[tokio::test]
    async fn test_get_by_title() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(dir.path(), PathBuf::from("false"));

        let report = ingestor
            .ingest(upload(b"data"), "  Beach day ", "", &CancellationToken::new())
            .await
            .unwrap();

        let found = ingestor.get_by_title("Beach day").unwrap();
        assert_eq!(found.id, report.video.id);
        assert_eq!(ingestor.get_by_title(" Beach day\n").unwrap().id, report.video.id);

        let err = ingestor.get_by_title("Mountain day").unwrap_err();
        assert_matches!(err, Error::NotFound { .. });
    }

    #[tokio::test]
    async fn test_client_content_type_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(dir.path(), PathBuf::from("false"));

        let mut up = upload(b"data");
        up.filename = "clip.bin".into();
        up.content_type = Some("video/webm".into());
        let stored = ingestor.store(up).await.unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("video/webm"));

        let mut up = upload(b"data");
        up.filename = "clip.bin".into();
        up.content_type = Some("application/octet-stream".into());
        let stored = ingestor.store(up).await.unwrap();
        assert!(stored.content_type.is_none());
    }

    #[tokio::test]
    async fn test_discard_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = ingestor(dir.path(), PathBuf::from("false"));

        let stored = ingestor.store(upload(b"data")).await.unwrap();
        let path = stored.file.path.clone();
        assert!(path.is_file());

        ingestor.discard(stored).await;
        assert!(!path.exists());
    }
}
