//! Integration tests for HLS manifest and segment serving.

mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, body_json, header_str, TestHarness};

#[tokio::test]
async fn manifest_and_segment_are_served() {
    let h = TestHarness::new();
    h.add_hls("asset-1");

    let resp = h.get("/videos/asset-1/master.m3u8").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        header_str(&resp, header::CONTENT_TYPE),
        "application/vnd.apple.mpegurl"
    );
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"#EXTM3U"));

    let resp = h.get("/videos/asset-1/segment_000.ts").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header_str(&resp, header::CONTENT_TYPE), "video/mp2t");
    assert_eq!(header_str(&resp, header::CONTENT_LENGTH), "12");
    assert_eq!(&body_bytes(resp).await[..], b"segment zero");
}

#[tokio::test]
async fn missing_manifest_is_not_found() {
    let h = TestHarness::new();

    let resp = h.get("/videos/never-transcoded/master.m3u8").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = body_json(resp).await;
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn missing_segment_is_not_found() {
    let h = TestHarness::new();
    h.add_hls("asset-1");

    let resp = h.get("/videos/asset-1/segment_999.ts").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_file_kind_is_not_found() {
    let h = TestHarness::new();
    h.add_hls("asset-1");

    let resp = h.get("/videos/asset-1/notes.txt").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_in_asset_id_is_rejected() {
    let h = TestHarness::new();
    std::fs::write(h.dir.path().join("master.m3u8"), "#EXTM3U\nsecret\n").unwrap();

    for uri in [
        "/videos/..%2F/master.m3u8",
        "/videos/..%2Fvideos_hls/master.m3u8",
        "/videos/.hidden/master.m3u8",
        "/videos/..%5Csecret/segment_000.ts",
    ] {
        let resp = h.get(uri).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri} should be rejected");
        let json = body_json(resp).await;
        assert_eq!(json["code"], "path_traversal_rejected");
    }
}

#[tokio::test]
async fn traversal_in_segment_name_is_rejected() {
    let h = TestHarness::new();
    h.add_hls("asset-1");

    for uri in [
        "/videos/asset-1/..%2F..%2Fetc%2Fpasswd.ts",
        "/videos/asset-1/..%2Fasset-2%2Fsegment_000.ts",
        "/videos/asset-1/..%2Fsecret.txt",
    ] {
        let resp = h.get(uri).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri} should be rejected");
    }
}
