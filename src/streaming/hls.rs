//! HLS manifest and segment serving.
//!
//! Files are read straight from `{hls_root}/{asset_id}/`. Both path
//! components come from the request URL and are validated before any path is
//! built from them.

use std::path::{Path as FsPath, PathBuf};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use vidstream_av::MANIFEST_NAME;
use vidstream_common::paths::validate_component;
use vidstream_common::{Error, Result};

use crate::server::{AppContext, AppError};

pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";
const SEGMENT_SUFFIX: &str = ".ts";

/// Path of the manifest for `asset_id`.
pub fn resolve_manifest(hls_root: &FsPath, asset_id: &str) -> Result<PathBuf> {
    let asset_id = validate_component(asset_id)?;
    Ok(hls_root.join(asset_id).join(MANIFEST_NAME))
}

/// Path of segment `segment_name` (without the `.ts` suffix) for `asset_id`.
pub fn resolve_segment(hls_root: &FsPath, asset_id: &str, segment_name: &str) -> Result<PathBuf> {
    let asset_id = validate_component(asset_id)?;
    let segment_name = validate_component(segment_name)?;
    Ok(hls_root
        .join(asset_id)
        .join(format!("{segment_name}{SEGMENT_SUFFIX}")))
}

async fn serve_file(path: &FsPath, content_type: &'static str, entity: &str, id: &str) -> Result<Response> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found(entity, id));
        }
        Err(e) => return Err(Error::io_read(format!("opening {}", path.display()), e)),
    };

    let metadata = file
        .metadata()
        .await
        .map_err(|e| Error::io_read(format!("reading metadata of {}", path.display()), e))?;
    if !metadata.is_file() {
        return Err(Error::not_found(entity, id));
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len().to_string())
        .header(header::CACHE_CONTROL, "max-age=60")
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| Error::internal(e.to_string()))
}

/// Serve the manifest for an asset.
pub async fn serve_manifest(hls_root: &FsPath, asset_id: &str) -> Result<Response> {
    let path = resolve_manifest(hls_root, asset_id)?;
    tracing::debug!(asset_id, path = %path.display(), "Serving HLS manifest");
    serve_file(&path, MANIFEST_CONTENT_TYPE, "manifest", asset_id).await
}

/// Serve one media segment for an asset.
pub async fn serve_segment(hls_root: &FsPath, asset_id: &str, segment_name: &str) -> Result<Response> {
    let path = resolve_segment(hls_root, asset_id, segment_name)?;
    tracing::debug!(asset_id, segment = segment_name, "Serving HLS segment");
    serve_file(
        &path,
        SEGMENT_CONTENT_TYPE,
        "segment",
        &format!("{asset_id}/{segment_name}{SEGMENT_SUFFIX}"),
    )
    .await
}

/// Handler for `/videos/:id/:file`, dispatching on the file name.
pub async fn hls_file(
    State(ctx): State<AppContext>,
    Path((asset_id, file)): Path<(String, String)>,
) -> std::result::Result<Response, AppError> {
    let hls_root = ctx.ingestor.hls_root();

    if file == MANIFEST_NAME {
        return Ok(serve_manifest(hls_root, &asset_id).await?);
    }

    match file.strip_suffix(SEGMENT_SUFFIX) {
        Some(segment) => Ok(serve_segment(hls_root, &asset_id, segment).await?),
        None => {
            validate_component(&file)?;
            Err(Error::not_found("file", format!("{asset_id}/{file}")).into())
        }
    }
}
