//! Flat-file catalog: two CSV tables next to the video directory.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::{
    distinct_names, table, CatalogError, CatalogResult, CatalogStore, DeleteReport,
    METADATA_FILE, RATINGS_FILE, VIDEO_DIR,
};
use crate::models::evaluation::validate_file_name;
use crate::models::{NewVideo, Rating, VideoMetadata};
use crate::services::video_dir::VideoDir;

/// Every mutation loads the whole table, changes it in memory and writes it
/// back through a temporary file. Mutations are serialised so two concurrent
/// submissions cannot overwrite each other's rows.
pub struct FlatFileCatalog {
    metadata_path: PathBuf,
    ratings_path: PathBuf,
    videos: VideoDir,
    write_lock: Mutex<()>,
}

impl FlatFileCatalog {
    /// Open the catalog in `data_dir`, creating empty tables if needed.
    pub async fn open(data_dir: &Path) -> CatalogResult<Self> {
        fs::create_dir_all(data_dir).await?;

        let catalog = Self {
            metadata_path: data_dir.join(METADATA_FILE),
            ratings_path: data_dir.join(RATINGS_FILE),
            videos: VideoDir::new(data_dir.join(VIDEO_DIR)),
            write_lock: Mutex::new(()),
        };
        catalog.videos.ensure().await?;

        if !fs::try_exists(&catalog.metadata_path).await? {
            catalog.save_metadata(&[]).await?;
        }
        if !fs::try_exists(&catalog.ratings_path).await? {
            catalog.save_ratings(&[]).await?;
        }

        tracing::info!("Flat-file catalog opened at {:?}", data_dir);
        Ok(catalog)
    }

    async fn load_metadata(&self) -> CatalogResult<Vec<VideoMetadata>> {
        match fs::read(&self.metadata_path).await {
            Ok(content) => table::read_metadata(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_ratings(&self) -> CatalogResult<Vec<Rating>> {
        match fs::read(&self.ratings_path).await {
            Ok(content) => table::read_ratings(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_metadata(&self, rows: &[VideoMetadata]) -> CatalogResult<()> {
        replace_file(&self.metadata_path, &table::write_metadata(rows)?).await
    }

    async fn save_ratings(&self, rows: &[Rating]) -> CatalogResult<()> {
        replace_file(&self.ratings_path, &table::write_ratings(rows)?).await
    }

    async fn export(&self, path: &Path, empty: Vec<u8>) -> CatalogResult<Vec<u8>> {
        match fs::read(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(empty),
            Err(e) => Err(e.into()),
        }
    }
}

async fn replace_file(path: &Path, content: &[u8]) -> CatalogResult<()> {
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, content).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CatalogStore for FlatFileCatalog {
    async fn list_videos(&self) -> CatalogResult<Vec<String>> {
        let metadata = self.load_metadata().await?;
        Ok(distinct_names(metadata.iter().map(|m| m.video_name.as_str())))
    }

    async fn get_metadata(&self, video_name: &str) -> CatalogResult<VideoMetadata> {
        self.load_metadata()
            .await?
            .into_iter()
            .find(|m| m.video_name == video_name)
            .ok_or_else(|| CatalogError::NotFound(format!("Video '{}' not found", video_name)))
    }

    async fn add_video(&self, video: NewVideo) -> CatalogResult<VideoMetadata> {
        video.validate()?;
        let _guard = self.write_lock.lock().await;

        let pending = self.videos.prepare(&video.video_name, &video.data).await?;

        let mut metadata = match self.load_metadata().await {
            Ok(rows) => rows,
            Err(e) => {
                pending.discard().await?;
                return Err(e);
            }
        };
        let previous = metadata.clone();
        let meta = video.metadata();
        metadata.push(meta.clone());

        if let Err(e) = self.save_metadata(&metadata).await {
            pending.discard().await?;
            return Err(e);
        }

        if let Err(e) = pending.publish().await {
            tracing::error!(video = %meta.video_name, "Failed to publish video file: {}", e);
            self.save_metadata(&previous).await?;
            return Err(e.into());
        }

        tracing::info!(video = %meta.video_name, bytes = video.data.len(), "Video added");
        Ok(meta)
    }

    async fn delete_video(&self, video_name: &str) -> CatalogResult<DeleteReport> {
        validate_file_name(video_name)?;
        let _guard = self.write_lock.lock().await;

        let staged = self.videos.stage_removal(video_name).await?;

        let tables = async {
            let metadata = self.load_metadata().await?;
            let ratings = self.load_ratings().await?;

            let kept_metadata: Vec<VideoMetadata> = metadata
                .iter()
                .filter(|m| m.video_name != video_name)
                .cloned()
                .collect();
            let kept_ratings: Vec<Rating> = ratings
                .iter()
                .filter(|r| r.video_name != video_name)
                .cloned()
                .collect();

            let report = DeleteReport {
                file_removed: false,
                metadata_rows_removed: (metadata.len() - kept_metadata.len()) as u64,
                ratings_removed: (ratings.len() - kept_ratings.len()) as u64,
            };

            if report.metadata_rows_removed > 0 {
                self.save_metadata(&kept_metadata).await?;
            }
            if report.ratings_removed > 0 {
                if let Err(e) = self.save_ratings(&kept_ratings).await {
                    // Keep the row so the surviving ratings still have a video
                    self.save_metadata(&metadata).await?;
                    return Err(e);
                }
            }
            Ok::<_, CatalogError>(report)
        }
        .await;

        match (tables, staged) {
            (Ok(mut report), Some(staged)) => {
                staged.commit().await?;
                report.file_removed = true;
                tracing::info!(video = %video_name, ?report, "Video deleted");
                Ok(report)
            }
            (Ok(report), None) => {
                tracing::info!(video = %video_name, ?report, "Video deleted (no file on disk)");
                Ok(report)
            }
            (Err(e), Some(staged)) => {
                staged.restore().await?;
                Err(e)
            }
            (Err(e), None) => Err(e),
        }
    }

    async fn add_rating(&self, rating: Rating) -> CatalogResult<Rating> {
        rating.validate()?;
        let _guard = self.write_lock.lock().await;

        let metadata = self.load_metadata().await?;
        if !metadata.iter().any(|m| m.video_name == rating.video_name) {
            return Err(CatalogError::NotFound(format!(
                "Video '{}' not found",
                rating.video_name
            )));
        }

        let mut ratings = self.load_ratings().await?;
        ratings.push(rating.clone());
        self.save_ratings(&ratings).await?;

        tracing::info!(video = %rating.video_name, preferred = %rating.preferred_model, "Rating saved");
        Ok(rating)
    }

    async fn list_ratings(&self) -> CatalogResult<Vec<Rating>> {
        self.load_ratings().await
    }

    async fn wipe_all(&self) -> CatalogResult<()> {
        let _guard = self.write_lock.lock().await;
        self.save_ratings(&[]).await?;
        self.save_metadata(&[]).await?;
        tracing::warn!("Ratings and metadata tables wiped");
        Ok(())
    }

    async fn export_metadata(&self) -> CatalogResult<Vec<u8>> {
        self.export(&self.metadata_path, table::write_metadata(&[])?).await
    }

    async fn export_ratings(&self) -> CatalogResult<Vec<u8>> {
        self.export(&self.ratings_path, table::write_ratings(&[])?).await
    }

    fn video_dir(&self) -> &VideoDir {
        &self.videos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::conformance;
    use tempfile::TempDir;

    async fn open_catalog() -> (TempDir, FlatFileCatalog) {
        let temp_dir = TempDir::new().unwrap();
        let catalog = FlatFileCatalog::open(temp_dir.path()).await.unwrap();
        (temp_dir, catalog)
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let (_dir, catalog) = open_catalog().await;
        conformance::add_then_get(&catalog).await;
    }

    #[tokio::test]
    async fn test_incomplete_upload_rejected() {
        let (_dir, catalog) = open_catalog().await;
        conformance::incomplete_upload_rejected(&catalog).await;
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let (_dir, catalog) = open_catalog().await;
        conformance::rating_bounds(&catalog).await;
    }

    #[tokio::test]
    async fn test_rating_requires_video() {
        let (_dir, catalog) = open_catalog().await;
        conformance::rating_requires_video(&catalog).await;
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (_dir, catalog) = open_catalog().await;
        conformance::delete_cascades(&catalog).await;
    }

    #[tokio::test]
    async fn test_delete_unknown_video() {
        let (_dir, catalog) = open_catalog().await;
        conformance::delete_unknown_video(&catalog).await;
    }

    #[tokio::test]
    async fn test_wipe_all() {
        let (_dir, catalog) = open_catalog().await;
        conformance::wipe_all(&catalog).await;
    }

    #[tokio::test]
    async fn test_delete_rejects_path_names() {
        let (_dir, catalog) = open_catalog().await;
        conformance::delete_rejects_path_names(&catalog).await;
    }

    #[tokio::test]
    async fn test_open_creates_tables_with_headers() {
        let (dir, _catalog) = open_catalog().await;

        let ratings = std::fs::read_to_string(dir.path().join(RATINGS_FILE)).unwrap();
        assert!(ratings.starts_with("Video Name,Action Accuracy,"));
        let metadata = std::fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap();
        assert_eq!(metadata, "Video Name,MatchTime Commentary,Llava-Qwen Commentary\n");
        assert!(dir.path().join(VIDEO_DIR).is_dir());
    }

    #[tokio::test]
    async fn test_reupload_appends_row_and_lists_once() {
        let (dir, catalog) = open_catalog().await;

        catalog
            .add_video(conformance::new_video("match1.mp4", "Goal!", "Shot scored"))
            .await
            .unwrap();
        catalog
            .add_video(NewVideo {
                data: b"second take".to_vec(),
                ..conformance::new_video("match1.mp4", "Penalty", "Spot kick")
            })
            .await
            .unwrap();

        assert_eq!(catalog.list_videos().await.unwrap(), vec!["match1.mp4"]);
        // Duplicate rows are allowed, the first one wins
        assert_eq!(catalog.get_metadata("match1.mp4").await.unwrap().commentary_a, "Goal!");
        let rows = table::read_metadata(&catalog.export_metadata().await.unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        // The file itself is silently replaced
        let on_disk = std::fs::read(dir.path().join(VIDEO_DIR).join("match1.mp4")).unwrap();
        assert_eq!(on_disk, b"second take");

        let report = catalog.delete_video("match1.mp4").await.unwrap();
        assert_eq!(report.metadata_rows_removed, 2);
        assert!(catalog.list_videos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_keeps_existing_rows() {
        let (dir, catalog) = open_catalog().await;
        catalog
            .add_video(conformance::new_video("match1.mp4", "Goal!", "Shot scored"))
            .await
            .unwrap();
        drop(catalog);

        let reopened = FlatFileCatalog::open(dir.path()).await.unwrap();
        assert_eq!(reopened.list_videos().await.unwrap(), vec!["match1.mp4"]);
    }

    #[tokio::test]
    async fn test_concurrent_ratings_are_all_kept() {
        let (_dir, catalog) = open_catalog().await;
        catalog
            .add_video(conformance::new_video("match1.mp4", "Goal!", "Shot scored"))
            .await
            .unwrap();
        let catalog = std::sync::Arc::new(catalog);

        let mut handles = Vec::new();
        for i in 1..=8u8 {
            let catalog = catalog.clone();
            handles.push(tokio::spawn(async move {
                catalog
                    .add_rating(conformance::rating("match1.mp4", i))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(catalog.list_ratings().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_unreadable_ratings_keep_video_on_delete() {
        let (dir, catalog) = open_catalog().await;
        catalog
            .add_video(conformance::new_video("match1.mp4", "Goal!", "Shot scored"))
            .await
            .unwrap();
        let mut corrupt = table::write_ratings(&[]).unwrap();
        corrupt.extend_from_slice(b"match1.mp4,eight,7,9,6,8,MatchTime\n");
        std::fs::write(dir.path().join(RATINGS_FILE), corrupt).unwrap();

        assert!(catalog.delete_video("match1.mp4").await.is_err());

        assert!(catalog.video_dir().exists("match1.mp4").await.unwrap());
        assert_eq!(catalog.list_videos().await.unwrap(), vec!["match1.mp4"]);
        assert!(catalog.video_dir().staged().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_metadata_write_discards_upload() {
        let (dir, catalog) = open_catalog().await;
        // A directory where the temporary table file goes makes every save fail
        std::fs::create_dir(dir.path().join("video_metadata.csv.tmp")).unwrap();

        let result = catalog
            .add_video(conformance::new_video("match1.mp4", "Goal!", "Shot scored"))
            .await;
        assert!(matches!(result, Err(CatalogError::Io(_))));

        assert!(!catalog.video_dir().exists("match1.mp4").await.unwrap());
        assert!(catalog.video_dir().staged().await.unwrap().is_empty());
        assert!(catalog.list_videos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_ratings_write_restores_metadata_and_file() {
        let (dir, catalog) = open_catalog().await;
        catalog
            .add_video(conformance::new_video("match1.mp4", "Goal!", "Shot scored"))
            .await
            .unwrap();
        catalog.add_rating(conformance::rating("match1.mp4", 8)).await.unwrap();
        std::fs::create_dir(dir.path().join("ratings.csv.tmp")).unwrap();

        let result = catalog.delete_video("match1.mp4").await;
        assert!(matches!(result, Err(CatalogError::Io(_))));

        // The metadata rewrite succeeded before the ratings failed, then got undone
        assert_eq!(catalog.list_videos().await.unwrap(), vec!["match1.mp4"]);
        assert_eq!(catalog.list_ratings().await.unwrap().len(), 1);
        assert_eq!(
            catalog.video_dir().read("match1.mp4").await.unwrap(),
            conformance::new_video("match1.mp4", "Goal!", "Shot scored").data
        );
    }

    #[tokio::test]
    async fn test_failed_publish_removes_row() {
        let (dir, catalog) = open_catalog().await;
        let squatter = dir.path().join(VIDEO_DIR).join("match1.mp4").join("inner");
        std::fs::create_dir_all(&squatter).unwrap();

        let result = catalog
            .add_video(conformance::new_video("match1.mp4", "Goal!", "Shot scored"))
            .await;
        assert!(matches!(result, Err(CatalogError::Io(_))));

        assert!(catalog.list_videos().await.unwrap().is_empty());
        assert!(catalog.video_dir().staged().await.unwrap().is_empty());
    }
}
