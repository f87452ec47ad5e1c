//! Vidstream-DB: Metadata store for uploaded video assets.
//!
//! This crate keeps asset records in SQLite using rusqlite and r2d2
//! connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching the database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use vidstream_common::VideoId;
//! use vidstream_db::pool::{get_conn, init_pool};
//! use vidstream_db::queries::videos::{self, NewVideo};
//!
//! let pool = init_pool("/var/lib/vidstream/vidstream.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let video = videos::create_video(
//!     &conn,
//!     &NewVideo {
//!         id: VideoId::new(),
//!         title: "Holiday",
//!         description: "Beach, day one",
//!         file_path: "/srv/videos/holiday.mp4",
//!         content_type: Some("video/mp4"),
//!     },
//! )
//! .unwrap();
//! println!("Created video: {}", video.id);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
