//! Common error types used throughout vidstream.
//!
//! Storage, streaming and ingestion failures all funnel into [`Error`], which
//! carries enough context for the HTTP layer to pick a status code via
//! [`Error::http_status`] and for logs to explain the failure without a repro.

use std::fmt;

/// Common error type for vidstream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested asset or derived file does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "video", "manifest", "segment").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The Range header was malformed or outside the file.
    #[error("range not satisfiable: {reason}")]
    RangeNotSatisfiable {
        /// Why the range was rejected.
        reason: String,
        /// Length of the file the range was checked against.
        file_length: u64,
    },

    /// A filename, asset id or segment name tried to escape its root.
    #[error("unsafe path component rejected: {0:?}")]
    PathTraversalRejected(String),

    /// Request data failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Writing to the asset store failed.
    #[error("storage write failed ({context}): {source}")]
    StorageWrite {
        /// What was being written.
        context: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Reading stored media failed, including short reads.
    #[error("read failed ({context}): {source}")]
    IoRead {
        /// What was being read.
        context: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A metadata store operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// The external encoder did not produce a complete segment set.
    #[error("transcode failed for {asset_id}: {message}")]
    TranscodeFailed {
        /// Asset whose transcode failed.
        asset_id: String,
        /// Primary cause, with any cleanup failure appended.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::PathTraversalRejected(_) => 400,
            Error::Validation(_) => 400,
            Error::StorageWrite { .. } => 500,
            Error::IoRead { .. } => 500,
            Error::Database(_) => 500,
            Error::TranscodeFailed { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Stable snake_case code for JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Error::PathTraversalRejected(_) => "path_traversal_rejected",
            Error::Validation(_) => "validation_error",
            Error::StorageWrite { .. } => "storage_write_error",
            Error::IoRead { .. } => "io_read_error",
            Error::Database(_) => "database_error",
            Error::TranscodeFailed { .. } => "transcode_failed",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new RangeNotSatisfiable error.
    pub fn range_not_satisfiable(reason: impl Into<String>, file_length: u64) -> Self {
        Error::RangeNotSatisfiable {
            reason: reason.into(),
            file_length,
        }
    }

    /// Create a new StorageWrite error.
    pub fn storage_write(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::StorageWrite {
            context: context.into(),
            source,
        }
    }

    /// Create a new IoRead error.
    pub fn io_read(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::IoRead {
            context: context.into(),
            source,
        }
    }

    /// Create a new Database error.
    pub fn database(msg: impl fmt::Display) -> Self {
        Error::Database(msg.to_string())
    }

    /// Create a new Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
