//! Vidstream - video upload, HLS transcoding and byte-range streaming
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod ingest;
pub mod server;
pub mod storage;
pub mod streaming;
