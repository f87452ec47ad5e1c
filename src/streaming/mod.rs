//! Media delivery.
//!
//! # Routes
//!
//! Direct routes:
//! - `GET /videos/stream/{id}` - Whole stored original
//! - `GET /videos/stream/range/{id}` - One byte-range window of the original
//!
//! HLS routes:
//! - `GET /videos/{id}/master.m3u8` - Manifest
//! - `GET /videos/{id}/{segment}.ts` - Media segment

mod direct;
mod hls;

pub use direct::{parse_range, read_window, stream_video, stream_video_range, ByteRange, CHUNK_SIZE};
pub use hls::{
    hls_file, resolve_manifest, resolve_segment, serve_manifest, serve_segment,
    MANIFEST_CONTENT_TYPE, SEGMENT_CONTENT_TYPE,
};

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create the direct streaming router.
pub fn direct_router() -> Router<AppContext> {
    Router::new()
        .route("/videos/stream/:id", get(stream_video))
        .route("/videos/stream/range/:id", get(stream_video_range))
}

/// Create the HLS router.
pub fn hls_router() -> Router<AppContext> {
    Router::new().route("/videos/:id/:file", get(hls_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_creation() {
        let _direct: Router<AppContext> = direct_router();
        let _hls: Router<AppContext> = hls_router();
    }
}
