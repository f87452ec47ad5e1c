//! Direct streaming of stored originals, whole or by byte range.
//!
//! Range requests are answered one window at a time: any request starting at
//! `<start>` returns the [`CHUNK_SIZE`] bytes from there, or up to the end of
//! the file. A client-supplied end is checked but does not shorten the
//! window. Players follow up with the next window.

use std::io::SeekFrom;
use std::path::Path as FsPath;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use vidstream_common::{Error, Result, VideoId};
use vidstream_db::models::Video;
use vidstream_db::pool::get_conn;
use vidstream_db::queries::videos;

use crate::server::{AppContext, AppError};

/// Largest window served by a single range response: 1 MiB.
pub const CHUNK_SIZE: u64 = 1 << 20;

/// An inclusive byte range inside a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Parse a `Range` header value against a file of `file_length` bytes.
///
/// Accepts a single `bytes=<start>-[<end>]` range. Suffix ranges, multiple
/// ranges, other units and anything unparsable are rejected, as is a start
/// at or past the end of the file or an end below the start.
///
/// The returned range always covers `min(CHUNK_SIZE, file_length - start)`
/// bytes, whatever end the client asked for.
pub fn parse_range(value: &str, file_length: u64) -> Result<ByteRange> {
    let unsatisfiable = |reason: &str| Error::range_not_satisfiable(reason, file_length);

    let value = value.trim();
    let spec = match value.split_once('=') {
        Some((unit, spec)) if unit.trim().eq_ignore_ascii_case("bytes") => spec.trim(),
        _ => return Err(unsatisfiable("expected a bytes range")),
    };

    if spec.contains(',') {
        return Err(unsatisfiable("multiple ranges are not supported"));
    }

    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| unsatisfiable("missing '-' in range"))?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        return Err(unsatisfiable("suffix ranges are not supported"));
    }

    let start = parse_position(start).ok_or_else(|| unsatisfiable("invalid range start"))?;
    if start >= file_length {
        return Err(unsatisfiable("range start is beyond the end of the file"));
    }

    if !end.is_empty() {
        let end = parse_position(end).ok_or_else(|| unsatisfiable("invalid range end"))?;
        if end < start {
            return Err(unsatisfiable("range end precedes range start"));
        }
    }

    Ok(ByteRange {
        start,
        end: start.saturating_add(CHUNK_SIZE - 1).min(file_length - 1),
    })
}

fn parse_position(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Read exactly the bytes covered by `range`.
///
/// A file shorter than the range is an [`Error::IoRead`], never a truncated
/// result.
pub async fn read_window(path: &FsPath, range: ByteRange) -> Result<Vec<u8>> {
    let context = || format!("reading bytes {}-{} of {}", range.start, range.end, path.display());

    let mut file = File::open(path)
        .await
        .map_err(|e| Error::io_read(context(), e))?;
    file.seek(SeekFrom::Start(range.start))
        .await
        .map_err(|e| Error::io_read(context(), e))?;

    let len = usize::try_from(range.length())
        .map_err(|_| Error::internal(format!("range of {} bytes is too large", range.length())))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)
        .await
        .map_err(|e| Error::io_read(context(), e))?;

    Ok(buf)
}

/// Look up an asset and the current length of its original.
pub(crate) async fn open_original(ctx: &AppContext, id: &str) -> Result<(Video, u64)> {
    let video_id: VideoId = id.parse().map_err(|_| Error::not_found("video", id))?;

    let video = {
        let conn = get_conn(&ctx.db)?;
        videos::get_video(&conn, video_id)?
    };

    let metadata = tokio::fs::metadata(video.path()).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found("video file", video_id)
        } else {
            Error::io_read(format!("reading metadata of {}", video.file_path), e)
        }
    })?;

    Ok((video, metadata.len()))
}

async fn whole_file_response(video: &Video, file_length: u64) -> Result<Response> {
    let file = File::open(video.path()).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::not_found("video file", video.id)
        } else {
            Error::io_read(format!("opening {}", video.file_path), e)
        }
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, video.effective_content_type())
        .header(header::CONTENT_LENGTH, file_length.to_string())
        .header(header::ACCEPT_RANGES, "bytes")
        .body(Body::from_stream(ReaderStream::new(file.take(file_length))))
        .map_err(|e| Error::internal(e.to_string()))
}

/// Serve the whole stored original.
pub async fn stream_video(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> std::result::Result<Response, AppError> {
    let (video, file_length) = open_original(&ctx, &id).await?;
    tracing::debug!(video_id = %video.id, file_length, "Serving whole file");
    Ok(whole_file_response(&video, file_length).await?)
}

/// Serve one window of the stored original, or the whole file when no
/// `Range` header is sent.
pub async fn stream_video_range(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> std::result::Result<Response, AppError> {
    let (video, file_length) = open_original(&ctx, &id).await?;

    let Some(value) = headers.get(header::RANGE) else {
        return Ok(whole_file_response(&video, file_length).await?);
    };

    let value = value
        .to_str()
        .map_err(|_| Error::range_not_satisfiable("range header is not valid ASCII", file_length))?;
    let range = parse_range(value, file_length)?;

    tracing::debug!(
        video_id = %video.id,
        start = range.start,
        end = range.end,
        file_length,
        "Serving range"
    );

    let data = read_window(video.path(), range).await?;

    Ok(Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, video.effective_content_type())
        .header(header::CONTENT_LENGTH, range.length().to_string())
        .header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", range.start, range.end, file_length),
        )
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from(data))
        .map_err(|e| Error::internal(e.to_string()))?)
}
