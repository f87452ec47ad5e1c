//! Video record routes: upload, list and lookup.

use std::io;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use vidstream_common::{Error, VideoId};
use vidstream_db::models::Video;

use crate::ingest::{StoredUpload, Upload};
use crate::server::{AppContext, AppError};

pub fn video_routes() -> Router<AppContext> {
    Router::new()
        .route("/videos", get(list_videos).post(upload_video))
        .route("/videos/:id", get(get_video))
}

/// Body returned when an upload could not be fully processed.
#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
}

impl UploadFailure {
    fn new(message: impl Into<String>, video: Option<Video>) -> Self {
        Self {
            message: message.into(),
            success: false,
            video,
        }
    }
}

impl IntoResponse for UploadFailure {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> Error {
    Error::validation(format!("invalid multipart body: {}", e.body_text()))
}

async fn upload_video(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut stored: Option<StoredUpload> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;

    let parsed: Result<(), Error> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("file") => {
                    if stored.is_some() {
                        return Err(Error::validation("only one file may be uploaded"));
                    }
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(String::from);
                    let reader = StreamReader::new(field.map_err(io::Error::other));
                    tokio::pin!(reader);

                    let upload = Upload {
                        filename,
                        content_type,
                        reader,
                    };
                    stored = Some(ctx.ingestor.store(upload).await?);
                }
                Some("title") => title = Some(field.text().await.map_err(multipart_error)?),
                Some("description") => {
                    description = Some(field.text().await.map_err(multipart_error)?)
                }
                other => tracing::debug!(field = ?other, "Ignoring unknown multipart field"),
            }
        }
        Ok(())
    }
    .await;

    let failure = match (parsed, &title) {
        (Err(e), _) => Some(e),
        (Ok(()), None) => Some(Error::validation("missing field: title")),
        (Ok(()), Some(_)) if stored.is_none() => Some(Error::validation("missing field: file")),
        _ => None,
    };
    if let Some(e) = failure {
        if let Some(stored) = stored {
            ctx.ingestor.discard(stored).await;
        }
        return failure_response(e);
    }

    let (Some(stored), Some(title)) = (stored, title) else {
        return Err(Error::internal("upload state out of sync").into());
    };
    let description = description.unwrap_or_default();

    match ctx
        .ingestor
        .register(stored, &title, &description, &ctx.shutdown)
        .await
    {
        Ok(report) => match report.transcode_error {
            None => Ok(Json(report.video).into_response()),
            Some(e) => {
                tracing::warn!(video_id = %report.video.id, error = %e, "Upload stored without HLS output");
                Ok(UploadFailure::new(
                    "video stored but HLS transcoding failed",
                    Some(report.video),
                )
                .into_response())
            }
        },
        Err(e) => failure_response(e),
    }
}

/// Server-side failures use the upload failure body; client errors use the
/// regular error body.
fn failure_response(e: Error) -> Result<Response, AppError> {
    if e.http_status() >= 500 {
        tracing::error!(error = %e, "Upload failed");
        return Ok(UploadFailure::new("video upload failed", None).into_response());
    }
    Err(e.into())
}

async fn list_videos(State(ctx): State<AppContext>) -> Result<Json<Vec<Video>>, AppError> {
    Ok(Json(ctx.ingestor.list()?))
}

async fn get_video(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Result<Json<Video>, AppError> {
    let id: VideoId = id.parse().map_err(|_| Error::not_found("video", &id))?;
    Ok(Json(ctx.ingestor.get(id)?))
}
