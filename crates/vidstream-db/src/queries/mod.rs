//! Database query modules.
//!
//! - videos: asset record creation and lookup

pub mod videos;
