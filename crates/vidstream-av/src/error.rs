//! Error types for vidstream-av.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the transcode orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// The asset id cannot be used as a directory name.
    #[error("invalid asset id: {0:?}")]
    InvalidAssetId(String),

    /// The output directory for the asset could not be created.
    #[error("failed to create output directory for {asset_id}: {source}")]
    DirectoryCreate {
        asset_id: String,
        source: io::Error,
    },

    /// The encoder did not produce a complete segment set. Any partial output
    /// has been removed unless `cleanup` says otherwise.
    #[error("transcode failed for {asset_id}: {cause}{}", cleanup_note(.cleanup))]
    TranscodeFailed {
        asset_id: String,
        #[source]
        cause: FailureCause,
        cleanup: Option<io::Error>,
    },
}

/// Primary reason a transcode attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum FailureCause {
    /// The source file could not be opened.
    #[error("source {} is not readable: {source}", path.display())]
    SourceUnreadable { path: PathBuf, source: io::Error },

    /// The encoder process could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: io::Error },

    /// Waiting on the encoder process failed.
    #[error("failed waiting for {program}: {source}")]
    Wait { program: String, source: io::Error },

    /// The encoder exited unsuccessfully or was killed by a signal.
    #[error("{program} exited unsuccessfully ({status})")]
    Exit { program: String, status: ExitStatus },

    /// The caller cancelled the transcode.
    #[error("cancelled")]
    Cancelled,

    /// The encoder ran past the configured timeout.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The encoder exited cleanly but left no manifest.
    #[error("encoder produced no manifest ({0})")]
    IncompleteOutput(String),

    /// The finished output could not be moved into place.
    #[error("failed to publish output: {0}")]
    Publish(io::Error),
}

fn cleanup_note(cleanup: &Option<io::Error>) -> String {
    match cleanup {
        Some(e) => format!(" (cleanup of partial output also failed: {e})"),
        None => String::new(),
    }
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// The primary failure cause, if this is a transcode failure.
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            Error::TranscodeFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }

    /// The secondary cleanup failure, if removing partial output failed too.
    pub fn cleanup_error(&self) -> Option<&io::Error> {
        match self {
            Error::TranscodeFailed { cleanup, .. } => cleanup.as_ref(),
            _ => None,
        }
    }
}

impl From<Error> for vidstream_common::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidAssetId(id) => vidstream_common::Error::PathTraversalRejected(id),
            Error::ToolNotFound { .. } => vidstream_common::Error::internal(err.to_string()),
            Error::DirectoryCreate { ref asset_id, .. }
            | Error::TranscodeFailed { ref asset_id, .. } => {
                vidstream_common::Error::TranscodeFailed {
                    asset_id: asset_id.clone(),
                    message: err.to_string(),
                }
            }
        }
    }
}
