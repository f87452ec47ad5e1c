//! Vidstream-Common: Shared types and utilities.
//!
//! This crate provides common functionality used across vidstream:
//!
//! - **Typed IDs**: a UUID wrapper for video asset identifiers
//! - **Path Utilities**: upload filename sanitization and path component checks
//! - **Error Handling**: the error taxonomy shared by storage, streaming and ingestion
//!
//! # Examples
//!
//! ```
//! use vidstream_common::{Error, Result, VideoId};
//! use vidstream_common::paths::sanitize_filename;
//!
//! let id = VideoId::new();
//! assert_eq!(id.to_string().len(), 36);
//!
//! assert_eq!(sanitize_filename("../../clip.mp4").unwrap(), "clip.mp4");
//!
//! fn lookup() -> Result<()> {
//!     Err(Error::not_found("video", "abc"))
//! }
//! assert!(lookup().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use ids::VideoId;

/// Content type used when a record carries none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
