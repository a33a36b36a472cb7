//! Scratch files for fetched announcement clips.
//!
//! A [`ScratchFile`] is created by the speech fetcher, handed to the
//! coordinator for playback, and removed by [`Janitor::cleanup`] as soon as
//! the sink reports the clip idle.

use crate::error::VoiceError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Directory that holds in-flight announcement clips.
///
/// The directory is created on first use and never removed.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
    extension: String,
    counter: Arc<AtomicU64>,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory if it does not exist yet.
    pub async fn ensure(&self) -> Result<(), VoiceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| VoiceError::Write {
                path: self.root.clone(),
                source,
            })
    }

    /// Returns a fresh path inside the directory.
    ///
    /// Names combine a millisecond timestamp with a per-directory sequence
    /// number, so two clips allocated in the same millisecond never collide.
    pub fn allocate(&self) -> PathBuf {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let millis = chrono::Utc::now().timestamp_millis();
        self.root
            .join(format!("announce_{}_{}.{}", millis, seq, self.extension))
    }
}

/// A clip on disk that belongs to exactly one announcement.
///
/// Dropping a `ScratchFile` does not delete it; ownership ends with
/// [`Janitor::cleanup`].
#[derive(Debug, PartialEq, Eq)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Adopts an existing file, e.g. one produced by a custom speech source.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self::new(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A clip that is still being written.
///
/// Removed from disk when dropped, so a failed or cancelled download never
/// leaves a partial file behind. [`PartialClip::complete`] hands a finished
/// clip over as a [`ScratchFile`].
#[derive(Debug)]
pub(crate) struct PartialClip {
    path: PathBuf,
    armed: bool,
}

impl PartialClip {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn complete(mut self) -> ScratchFile {
        self.armed = false;
        ScratchFile::new(std::mem::take(&mut self.path))
    }
}

impl Drop for PartialClip {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed partial clip"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "partial clip removal failed"),
        }
    }
}

/// Best-effort deletion of scratch files.
pub struct Janitor;

impl Janitor {
    /// Deletes `file`. Failures are logged and swallowed.
    pub async fn cleanup(file: ScratchFile) {
        if let Err(e) = Self::remove(&file.path).await {
            warn!(error = %e, "scratch cleanup failed");
        }
    }

    /// Deletes the file at `path`. A file that is already gone counts as
    /// removed.
    pub async fn remove(path: &Path) -> Result<(), VoiceError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed scratch file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(VoiceError::Cleanup {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_creates_nested_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = ScratchDir::new(temp.path().join("a").join("temp"), "mp3");
        dir.ensure().await.unwrap();
        assert!(dir.root().is_dir());
        // Second call is a no-op.
        dir.ensure().await.unwrap();
    }

    #[test]
    fn allocated_names_are_unique() {
        let dir = ScratchDir::new("/tmp/herald", "mp3");
        let a = dir.allocate();
        let b = dir.allocate();
        assert_ne!(a, b);
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("mp3"));
        assert!(a.starts_with("/tmp/herald"));
    }

    #[tokio::test]
    async fn cleanup_removes_file_and_tolerates_missing() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("clip.mp3");
        std::fs::write(&path, b"audio").unwrap();

        Janitor::cleanup(ScratchFile::adopt(&path)).await;
        assert!(!path.exists());

        // Already gone: still fine.
        Janitor::remove(&path).await.unwrap();
    }

    #[test]
    fn partial_clip_is_removed_unless_completed() {
        let temp = tempfile::tempdir().unwrap();
        let abandoned = temp.path().join("abandoned.mp3");
        let finished = temp.path().join("finished.mp3");
        std::fs::write(&abandoned, b"half").unwrap();
        std::fs::write(&finished, b"whole").unwrap();

        drop(PartialClip::new(abandoned.clone()));
        assert!(!abandoned.exists());

        let clip = PartialClip::new(finished.clone()).complete();
        assert_eq!(clip.path(), finished.as_path());
        assert!(finished.exists());

        // Never created: nothing to do.
        drop(PartialClip::new(temp.path().join("missing.mp3")));
    }

    #[tokio::test]
    async fn remove_reports_cleanup_error() {
        let temp = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be removed with remove_file.
        let dir = temp.path().join("not-a-file");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("inner"), b"x").unwrap();

        let result = Janitor::remove(&dir).await;
        assert!(matches!(result, Err(VoiceError::Cleanup { .. })));

        // cleanup() swallows the same failure.
        Janitor::cleanup(ScratchFile::adopt(&dir)).await;
        assert!(dir.exists());
    }
}
