//! Path utilities for untrusted names.
//!
//! Upload filenames, asset identifiers and segment names all arrive from
//! clients and end up joined onto a configured root directory. The functions
//! here are the only gate between that input and the filesystem.

use crate::{Error, Result};

/// Reduce a client-supplied upload filename to a single safe file name.
///
/// Directory parts (either separator style), `.` and `..` components and
/// control characters are stripped; only the final normal component is kept.
/// A name with nothing left afterwards is rejected.
///
/// # Examples
///
/// ```
/// use vidstream_common::paths::sanitize_filename;
///
/// assert_eq!(sanitize_filename("holiday.mp4").unwrap(), "holiday.mp4");
/// assert_eq!(sanitize_filename("../../etc/clip.mp4").unwrap(), "clip.mp4");
/// assert_eq!(sanitize_filename("C:\\Users\\me\\clip.mov").unwrap(), "clip.mov");
/// assert!(sanitize_filename("..").is_err());
/// ```
pub fn sanitize_filename(name: &str) -> Result<String> {
    let last = name
        .split(['/', '\\'])
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .last()
        .unwrap_or("");

    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        return Err(Error::PathTraversalRejected(name.to_string()));
    }

    Ok(cleaned.to_string())
}

/// Check that a value can be used as exactly one path component under a root.
///
/// Rejects empty values, separators, NUL bytes, drive markers, any `..`
/// sequence and leading dots (which also keeps staging directories private).
///
/// # Examples
///
/// ```
/// use vidstream_common::paths::validate_component;
///
/// assert!(validate_component("segment_000").is_ok());
/// assert!(validate_component("../master").is_err());
/// assert!(validate_component("/etc/passwd").is_err());
/// ```
pub fn validate_component(value: &str) -> Result<&str> {
    let unsafe_component = value.is_empty()
        || value.starts_with('.')
        || value.contains("..")
        || value.contains(['/', '\\', '\0', ':']);

    if unsafe_component {
        return Err(Error::PathTraversalRejected(value.to_string()));
    }

    Ok(value)
}
