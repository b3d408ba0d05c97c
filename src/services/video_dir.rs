//! The `uploaded_videos/` blob directory.
//!
//! Files are stored flat, named exactly like the video they belong to. Writes
//! and removals go through a hidden staging directory so that a catalog can
//! make the file change visible only once its table writes succeeded.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

use crate::models::evaluation::video_extension;

const STAGING_DIR: &str = ".staging";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug)]
pub struct VideoDir {
    root: PathBuf,
}

impl VideoDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, video_name: &str) -> PathBuf {
        self.root.join(video_name)
    }

    /// Every call yields a fresh path, so concurrent writers of one name never
    /// share a staged file.
    fn staging_path(&self, prefix: &str, video_name: &str) -> PathBuf {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        self.root.join(STAGING_DIR).join(format!(
            "{}-{}-{}-{}",
            prefix,
            std::process::id(),
            seq,
            video_name
        ))
    }

    pub async fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(self.root.join(STAGING_DIR)).await
    }

    pub async fn exists(&self, video_name: &str) -> io::Result<bool> {
        fs::try_exists(self.path_of(video_name)).await
    }

    pub async fn read(&self, video_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(video_name)).await
    }

    /// Write `data` next to the directory without replacing anything yet.
    pub async fn prepare(&self, video_name: &str, data: &[u8]) -> io::Result<PendingUpload> {
        self.ensure().await?;
        let pending = self.staging_path("upload", video_name);
        fs::write(&pending, data).await?;
        Ok(PendingUpload {
            pending,
            target: self.path_of(video_name),
        })
    }

    /// Move the file out of sight. `None` when there was nothing to remove.
    pub async fn stage_removal(&self, video_name: &str) -> io::Result<Option<StagedRemoval>> {
        let original = self.path_of(video_name);
        if !fs::try_exists(&original).await? {
            return Ok(None);
        }
        self.ensure().await?;
        let staged = self.staging_path("removed", video_name);
        fs::rename(&original, &staged).await?;
        Ok(Some(StagedRemoval { staged, original }))
    }

    /// Leftovers in the staging directory.
    #[cfg(test)]
    pub(crate) async fn staged(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(self.root.join(STAGING_DIR)).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    /// Video files on disk, filtered to the accepted extensions and sorted by name.
    pub async fn list(&self) -> io::Result<Vec<String>> {
        if !fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if video_extension(&name).is_some() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[must_use]
#[derive(Debug)]
pub struct PendingUpload {
    pending: PathBuf,
    target: PathBuf,
}

impl PendingUpload {
    /// Replace whatever file currently holds the name. On failure the staged
    /// copy is removed, leaving the target untouched.
    pub async fn publish(self) -> io::Result<()> {
        if let Err(e) = fs::rename(&self.pending, &self.target).await {
            if let Err(cleanup) = remove_if_present(&self.pending).await {
                tracing::warn!(path = %self.pending.display(), "Could not remove staged upload: {}", cleanup);
            }
            return Err(e);
        }
        Ok(())
    }

    pub async fn discard(self) -> io::Result<()> {
        remove_if_present(&self.pending).await
    }
}

#[must_use]
#[derive(Debug)]
pub struct StagedRemoval {
    staged: PathBuf,
    original: PathBuf,
}

impl StagedRemoval {
    pub async fn commit(self) -> io::Result<()> {
        remove_if_present(&self.staged).await
    }

    pub async fn restore(self) -> io::Result<()> {
        fs::rename(&self.staged, &self.original).await
    }
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// MIME type used when streaming a stored video back to the browser.
pub fn content_type(video_name: &str) -> &'static str {
    match video_extension(video_name).as_deref() {
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_prepare_is_invisible_until_published() {
        let temp_dir = TempDir::new().unwrap();
        let videos = VideoDir::new(temp_dir.path().join("uploaded_videos"));

        let pending = videos.prepare("match1.mp4", b"frames").await.unwrap();
        assert!(!videos.exists("match1.mp4").await.unwrap());
        assert!(videos.list().await.unwrap().is_empty());

        pending.publish().await.unwrap();
        assert_eq!(videos.read("match1.mp4").await.unwrap(), b"frames");
    }

    #[tokio::test]
    async fn test_discard_leaves_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let videos = VideoDir::new(temp_dir.path());

        videos.prepare("a.mp4", b"old").await.unwrap().publish().await.unwrap();
        videos.prepare("a.mp4", b"new").await.unwrap().discard().await.unwrap();

        assert_eq!(videos.read("a.mp4").await.unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_pending_uploads_of_one_name_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let videos = VideoDir::new(temp_dir.path());

        let first = videos.prepare("a.mp4", b"first").await.unwrap();
        let second = videos.prepare("a.mp4", b"second").await.unwrap();

        second.publish().await.unwrap();
        assert_eq!(videos.read("a.mp4").await.unwrap(), b"second");
        first.publish().await.unwrap();
        assert_eq!(videos.read("a.mp4").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_failed_publish_cleans_staging() {
        let temp_dir = TempDir::new().unwrap();
        let videos = VideoDir::new(temp_dir.path());
        // A non-empty directory squatting on the name makes the rename fail
        fs::create_dir_all(temp_dir.path().join("a.mp4").join("inner")).await.unwrap();

        let pending = videos.prepare("a.mp4", b"frames").await.unwrap();
        assert!(pending.publish().await.is_err());

        assert!(videos.staged().await.unwrap().is_empty());
        assert!(temp_dir.path().join("a.mp4").join("inner").is_dir());
    }

    #[tokio::test]
    async fn test_staged_removal_commit_and_restore() {
        let temp_dir = TempDir::new().unwrap();
        let videos = VideoDir::new(temp_dir.path());
        videos.prepare("a.mp4", b"a").await.unwrap().publish().await.unwrap();
        videos.prepare("b.mov", b"b").await.unwrap().publish().await.unwrap();

        let staged = videos.stage_removal("a.mp4").await.unwrap().unwrap();
        assert!(!videos.exists("a.mp4").await.unwrap());
        staged.restore().await.unwrap();
        assert_eq!(videos.read("a.mp4").await.unwrap(), b"a");

        let staged = videos.stage_removal("b.mov").await.unwrap().unwrap();
        staged.commit().await.unwrap();
        assert!(!videos.exists("b.mov").await.unwrap());

        assert!(videos.stage_removal("missing.mp4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_extension() {
        let temp_dir = TempDir::new().unwrap();
        let videos = VideoDir::new(temp_dir.path());
        videos.ensure().await.unwrap();

        for name in ["b.mov", "a.MP4", "c.avi", "notes.txt", "ratings.csv"] {
            fs::write(temp_dir.path().join(name), b"x").await.unwrap();
        }

        assert_eq!(videos.list().await.unwrap(), vec!["a.MP4", "b.mov", "c.avi"]);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("x.mp4"), "video/mp4");
        assert_eq!(content_type("x.MOV"), "video/quicktime");
        assert_eq!(content_type("x.avi"), "video/x-msvideo");
    }
}
