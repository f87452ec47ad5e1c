//! Asset store for uploaded originals.
//!
//! Originals live directly under one directory, named after the sanitized
//! client filename. Uploads are streamed into a hidden temporary file first
//! and moved into place without ever replacing an existing file.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, PersistError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use vidstream_common::paths::sanitize_filename;
use vidstream_common::{Error, Result};

const COPY_BUF_SIZE: usize = 64 * 1024;
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// A file written into the asset store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Filesystem-backed store for original uploads.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory if it does not exist yet.
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            Error::storage_write(format!("creating asset directory {}", self.root.display()), e)
        })
    }

    /// Stream `reader` into the store under the sanitized form of `filename`.
    ///
    /// When the name is already taken a numeric suffix is added
    /// (`clip.mp4`, `clip-1.mp4`, ...). A failed or interrupted upload leaves
    /// no file behind.
    pub async fn persist<R>(&self, filename: &str, mut reader: R) -> Result<StoredFile>
    where
        R: AsyncRead + Unpin,
    {
        let name = sanitize_filename(filename)?;
        self.prepare().await?;

        let temp = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".partial")
            .tempfile_in(&self.root)
            .map_err(|e| Error::storage_write("creating temporary upload file", e))?;

        let std_file = temp
            .as_file()
            .try_clone()
            .map_err(|e| Error::storage_write("opening temporary upload file", e))?;
        let mut file = tokio::fs::File::from_std(std_file);

        let mut buf = vec![0u8; COPY_BUF_SIZE];
        let mut size = 0u64;
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| Error::validation(format!("upload interrupted: {e}")))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])
                .await
                .map_err(|e| Error::storage_write(format!("writing upload {name}"), e))?;
            size += n as u64;
        }
        file.sync_all()
            .await
            .map_err(|e| Error::storage_write(format!("syncing upload {name}"), e))?;
        drop(file);

        let path = place_without_clobbering(temp, &self.root, &name)?;
        tracing::info!(path = %path.display(), size, "Stored upload");

        Ok(StoredFile { path, size })
    }

    /// Remove a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_write(format!("removing {}", path.display()), e)),
        }
    }
}

fn place_without_clobbering(mut temp: NamedTempFile, root: &Path, name: &str) -> Result<PathBuf> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = root.join(numbered_name(name, attempt));
        match temp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(PersistError { error, file }) if error.kind() == io::ErrorKind::AlreadyExists => {
                temp = file;
            }
            Err(PersistError { error, .. }) => {
                return Err(Error::storage_write(
                    format!("moving upload into place as {}", candidate.display()),
                    error,
                ));
            }
        }
    }

    Err(Error::storage_write(
        format!("no free name for {name}"),
        io::Error::new(io::ErrorKind::AlreadyExists, "too many files with this name"),
    ))
}

/// `clip.mp4` with attempt 2 becomes `clip-2.mp4`.
fn numbered_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}-{}.{}",
            stem.to_string_lossy(),
            attempt,
            ext.to_string_lossy()
        ),
        _ => format!("{name}-{attempt}"),
    }
}

/// Guess a content type from a file extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "ts" | "m2ts" => "video/mp2t",
        "mpg" | "mpeg" => "video/mpeg",
        "ogv" => "video/ogg",
        _ => return None,
    };
    Some(content_type)
}
