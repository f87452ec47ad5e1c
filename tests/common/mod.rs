//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds an [`AppContext`] over an in-memory
//! database and temporary asset/HLS directories, plus scripted stand-in
//! encoders so no real ffmpeg is needed.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use axum::{
    body::{Body, Bytes},
    http::{header, Request},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use vidstream::config::Config;
use vidstream::server::{create_router, AppContext};
use vidstream_common::VideoId;
use vidstream_db::models::Video;
use vidstream_db::pool::{get_conn, init_memory_pool};
use vidstream_db::queries::videos::{self, NewVideo};

pub const BOUNDARY: &str = "vidstream-test-boundary";

const SUCCEED: &str = r#"#!/bin/sh
for last; do :; done
dir=$(dirname "$last")
printf 'segment zero' > "$dir/segment_000.ts"
printf 'segment one' > "$dir/segment_001.ts"
printf '#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n#EXTINF:10.0,\nsegment_000.ts\n#EXTINF:10.0,\nsegment_001.ts\n#EXT-X-ENDLIST\n' > "$last"
"#;

const FAIL: &str = r#"#!/bin/sh
for last; do :; done
dir=$(dirname "$last")
printf 'partial' > "$dir/segment_000.ts"
exit 1
"#;

/// Path to a stand-in encoder script: `succeed.sh` or `fail.sh`.
///
/// All scripts are written on first use, before any of them is executed.
pub fn encoder_script(name: &str) -> PathBuf {
    static SCRIPTS: OnceLock<TempDir> = OnceLock::new();
    let dir = SCRIPTS.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [("succeed.sh", SUCCEED), ("fail.sh", FAIL)] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
        }
        dir
    });
    dir.path().join(name)
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
    pub dir: TempDir,
}

impl TestHarness {
    /// Harness whose encoder always succeeds.
    pub fn new() -> Self {
        Self::with_encoder(encoder_script("succeed.sh"))
    }

    /// Harness whose encoder always exits non-zero.
    pub fn failing() -> Self {
        Self::with_encoder(encoder_script("fail.sh"))
    }

    pub fn with_encoder(encoder: PathBuf) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.storage.video_dir = dir.path().join("videos");
        config.storage.hls_dir = dir.path().join("videos_hls");
        config.storage.database = dir.path().join("unused.db");
        config.transcode.ffmpeg_path = Some(encoder);

        std::fs::create_dir_all(&config.storage.video_dir).unwrap();
        std::fs::create_dir_all(&config.storage.hls_dir).unwrap();

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::new(config, db);

        Self { ctx, dir }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    pub fn video_dir(&self) -> &Path {
        &self.ctx.config.storage.video_dir
    }

    pub fn hls_dir(&self) -> &Path {
        &self.ctx.config.storage.hls_dir
    }

    /// Send one request through a fresh router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn get_range(&self, uri: &str, range: &str) -> Response {
        self.send(
            Request::get(uri)
                .header(header::RANGE, range)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Write a file into the video directory and record it directly.
    pub fn add_video(&self, filename: &str, data: &[u8], content_type: Option<&str>) -> Video {
        let path = self.video_dir().join(filename);
        std::fs::write(&path, data).unwrap();
        let path = path.to_string_lossy().into_owned();

        let conn = get_conn(&self.ctx.db).unwrap();
        videos::create_video(
            &conn,
            &NewVideo {
                id: VideoId::new(),
                title: filename,
                description: "",
                file_path: &path,
                content_type,
            },
        )
        .unwrap()
    }

    /// Write a finished HLS set for `asset_id` directly.
    pub fn add_hls(&self, asset_id: &str) -> PathBuf {
        let dir = self.hls_dir().join(asset_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("master.m3u8"), "#EXTM3U\n#EXTINF:10.0,\nsegment_000.ts\n#EXT-X-ENDLIST\n").unwrap();
        std::fs::write(dir.join("segment_000.ts"), b"segment zero").unwrap();
        dir
    }
}

/// Patterned test data so offsets are checkable.
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub async fn body_bytes(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
    response
        .headers()
        .get(&name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

/// One part of a multipart/form-data body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: Option<&'a str>,
        data: &'a [u8],
    },
}

/// Build a multipart upload request for `POST /videos`.
pub fn multipart_request(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                if let Some(ct) = content_type {
                    body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/videos")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
