//! Video record query operations.
//!
//! A record is written once, in a single INSERT carrying the stored path and
//! content type, and never updated afterwards.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use vidstream_common::{Error, Result, VideoId};

use crate::models::Video;

const VIDEO_COLUMNS: &str = "id, title, description, file_path, content_type, created_at";

/// Fields needed to create a video record.
#[derive(Debug, Clone)]
pub struct NewVideo<'a> {
    pub id: VideoId,
    pub title: &'a str,
    pub description: &'a str,
    pub file_path: &'a str,
    pub content_type: Option<&'a str>,
}

/// Insert a new video record.
pub fn create_video(conn: &Connection, new: &NewVideo<'_>) -> Result<Video> {
    let now = Utc::now();

    conn.execute(
        "INSERT INTO videos (id, title, description, file_path, content_type, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            new.id.to_string(),
            new.title,
            new.description,
            new.file_path,
            new.content_type,
            now.to_rfc3339_opts(SecondsFormat::Micros, true),
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::database(format!("video {} already exists", new.id))
        }
        _ => Error::database(e),
    })?;

    Ok(Video {
        id: new.id,
        title: new.title.to_string(),
        description: new.description.to_string(),
        file_path: new.file_path.to_string(),
        content_type: new.content_type.map(String::from),
        created_at: now,
    })
}

/// Get a video by ID.
pub fn get_video(conn: &Connection, id: VideoId) -> Result<Video> {
    conn.query_row(
        &format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"),
        [id.to_string()],
        row_to_video,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::not_found("video", id),
        _ => Error::database(e),
    })
}

/// Get a video by exact title.
///
/// Titles are not unique; the oldest record with the title wins.
pub fn get_video_by_title(conn: &Connection, title: &str) -> Result<Video> {
    conn.query_row(
        &format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE title = ? ORDER BY created_at, rowid LIMIT 1"
        ),
        [title],
        row_to_video,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::not_found("video with title", title),
        _ => Error::database(e),
    })
}

/// List all videos, oldest first.
pub fn list_videos(conn: &Connection) -> Result<Vec<Video>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY created_at, rowid"
        ))
        .map_err(Error::database)?;

    let videos = stmt
        .query_map([], row_to_video)
        .map_err(Error::database)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::database)?;

    Ok(videos)
}

fn row_to_video(row: &Row<'_>) -> rusqlite::Result<Video> {
    let id: String = row.get(0)?;
    let id = id
        .parse::<VideoId>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;

    let created_at: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?;

    Ok(Video {
        id,
        title: row.get(1)?,
        description: row.get(2)?,
        file_path: row.get(3)?,
        content_type: row.get(4)?,
        created_at,
    })
}
