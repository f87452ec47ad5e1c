//! # vidstream-av
//!
//! HLS transcode orchestration for stored video originals.
//!
//! This crate provides:
//!
//! - **Transcoding** ([`HlsTranscoder`]) -- run ffmpeg once per asset, stage
//!   its output and publish it only when the encoder succeeds.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout and
//!   cancellation for running external processes.
//! - **Tool discovery** ([`resolve_encoder`], [`check_encoder`]) -- locate the encoder.
//!
//! ## Example
//!
//! ```no_run
//! use vidstream_av::{HlsSettings, HlsTranscoder};
//! use tokio_util::sync::CancellationToken;
//! use std::path::Path;
//!
//! # async fn example() -> vidstream_av::Result<()> {
//! let transcoder = HlsTranscoder::new("videos_hls", HlsSettings::default());
//! let cancel = CancellationToken::new();
//! match transcoder.transcode("asset-1", Path::new("videos/clip.mp4"), &cancel).await {
//!     Ok(dir) => println!("published {}", dir.display()),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
mod error;
pub mod hls;
pub mod staging;
pub mod tools;

// Re-exports
pub use command::ToolCommand;
pub use error::{Error, FailureCause, Result};
pub use hls::{hls_args, HlsSettings, HlsTranscoder, MANIFEST_NAME, SEGMENT_PATTERN};
pub use tools::{check_encoder, check_tool, resolve_encoder, ToolInfo};
