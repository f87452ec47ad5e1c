//! Staging directory for in-progress transcode output.

use std::io;
use std::path::{Path, PathBuf};

/// A uniquely named directory next to the final output location.
///
/// The encoder writes into the staging directory; [`StagingDir::publish`]
/// renames it into place in one step. Dropping an unpublished staging
/// directory removes it, so an abandoned transcode leaves nothing behind.
///
/// The drop guard runs when a transcode future is dropped mid-encode.
/// `kill_on_drop` only sends SIGKILL at that point, it does not reap the
/// encoder, so the process may still be creating files. The guard first
/// renames the directory to a `.removing` name: the encoder addresses its
/// output by the old path, so later opens fail instead of repopulating the
/// directory while it is being emptied. A removal that still fails is logged.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    armed: bool,
}

impl StagingDir {
    /// Create a fresh staging directory for `asset_id` under `root`.
    pub async fn create(root: &Path, asset_id: &str) -> io::Result<Self> {
        let name = format!(".{}.{}.partial", asset_id, uuid::Uuid::new_v4().simple());
        let path = root.join(name);
        tokio::fs::create_dir(&path).await?;
        Ok(Self { path, armed: true })
    }

    /// Get the staging directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the staging directory to `destination`.
    ///
    /// On failure the staging directory is still owned by `self` and will be
    /// cleaned up by [`StagingDir::remove`] or on drop.
    pub async fn publish(&mut self, destination: &Path) -> io::Result<()> {
        tokio::fs::rename(&self.path, destination).await?;
        self.armed = false;
        Ok(())
    }

    /// Remove the staging directory and everything in it.
    pub async fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        match tokio::fs::remove_dir_all(&self.path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match remove_detached(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed abandoned staging directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove abandoned staging directory"
            ),
        }
    }
}

/// Rename `path` aside, then remove it. Falls back to removing in place if
/// the rename fails for any reason other than the directory being gone.
fn remove_detached(path: &Path) -> io::Result<()> {
    let detached = path.with_extension("removing");
    let target = match std::fs::rename(path, &detached) {
        Ok(()) => detached.as_path(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(_) => path,
    };
    match std::fs::remove_dir_all(target) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_staging_names_are_hidden_and_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = StagingDir::create(root.path(), "asset").await.unwrap();
        let b = StagingDir::create(root.path(), "asset").await.unwrap();

        assert_ne!(a.path(), b.path());
        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".asset."));
        assert!(name.ends_with(".partial"));
    }

    #[tokio::test]
    async fn test_publish_moves_contents() {
        let root = tempfile::tempdir().unwrap();
        let mut staging = StagingDir::create(root.path(), "asset").await.unwrap();
        std::fs::write(staging.path().join("master.m3u8"), "#EXTM3U\n").unwrap();

        let dest = root.path().join("asset");
        staging.publish(&dest).await.unwrap();
        drop(staging);

        assert!(dest.join("master.m3u8").is_file());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_drop_removes_unpublished() {
        let root = tempfile::tempdir().unwrap();
        let staging = StagingDir::create(root.path(), "asset").await.unwrap();
        let path = staging.path().to_path_buf();
        std::fs::write(path.join("segment_000.ts"), b"partial").unwrap();

        drop(staging);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_drop_detaches_directory_from_late_writers() {
        use std::io::Write;

        let root = tempfile::tempdir().unwrap();
        let staging = StagingDir::create(root.path(), "asset").await.unwrap();
        let path = staging.path().to_path_buf();
        let mut open_segment = std::fs::File::create(path.join("segment_000.ts")).unwrap();

        drop(staging);

        // An encoder holding an open segment can keep writing to it, but new
        // files under the old path cannot be created.
        open_segment.write_all(b"late").unwrap();
        assert!(std::fs::write(path.join("segment_001.ts"), b"late").is_err());
        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_remove_tolerates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let staging = StagingDir::create(root.path(), "asset").await.unwrap();
        std::fs::remove_dir(staging.path()).unwrap();
        staging.remove().await.unwrap();
    }
}
