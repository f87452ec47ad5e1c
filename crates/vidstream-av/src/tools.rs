//! External tool detection.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

const DEFAULT_ENCODER: &str = "ffmpeg";

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available using the given version argument.
///
/// # Example
///
/// ```no_run
/// use vidstream_av::check_tool;
///
/// let info = check_tool("ffmpeg", "-version");
/// if info.available {
///     println!("ffmpeg version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(program: impl AsRef<Path>, version_arg: &str) -> ToolInfo {
    let program = program.as_ref();
    let name = program.display().to_string();

    match Command::new(program).arg(version_arg).output() {
        Ok(output) if output.status.success() => ToolInfo {
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
            path: which::which(program).ok(),
            name,
            available: true,
        },
        _ => ToolInfo {
            name,
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Locate the encoder executable.
///
/// A configured path must exist; it is never replaced by a PATH lookup.
/// Without one, `ffmpeg` is looked up on PATH.
///
/// # Errors
///
/// [`Error::ToolNotFound`] if the configured path does not exist or
/// `ffmpeg` is not on PATH.
pub fn resolve_encoder(configured: Option<&Path>) -> Result<PathBuf> {
    match configured {
        Some(path) if path.exists() => Ok(path.to_path_buf()),
        Some(path) => Err(Error::tool_not_found(path.display().to_string())),
        None => which::which(DEFAULT_ENCODER).map_err(|_| Error::tool_not_found(DEFAULT_ENCODER)),
    }
}

/// Check the encoder, preferring a configured path over PATH lookup.
pub fn check_encoder(configured: Option<&Path>) -> ToolInfo {
    match resolve_encoder(configured) {
        Ok(path) => check_tool(path, "-version"),
        Err(_) => ToolInfo {
            name: configured
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| DEFAULT_ENCODER.to_string()),
            available: false,
            version: None,
            path: None,
        },
    }
}
