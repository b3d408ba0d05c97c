use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::{CatalogResult, CatalogStore};

/// Places where the tables and the video directory disagree. Nothing here is
/// repaired automatically; an administrator decides what to delete or re-upload.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ConsistencyReport {
    pub files_without_metadata: Vec<String>,
    pub metadata_without_file: Vec<String>,
    /// Video names that ratings point at but the metadata table no longer has.
    pub orphaned_rating_videos: Vec<String>,
    pub orphaned_rating_count: usize,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.files_without_metadata.is_empty()
            && self.metadata_without_file.is_empty()
            && self.orphaned_rating_count == 0
    }
}

pub struct ReconcileService {
    catalog: Arc<dyn CatalogStore>,
}

impl ReconcileService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    pub async fn check(&self) -> CatalogResult<ConsistencyReport> {
        let names = self.catalog.list_videos().await?;
        let files = self.catalog.video_dir().list().await?;
        let ratings = self.catalog.list_ratings().await?;

        let known: HashSet<&str> = names.iter().map(String::as_str).collect();
        let on_disk: HashSet<&str> = files.iter().map(String::as_str).collect();

        let mut report = ConsistencyReport {
            files_without_metadata: files
                .iter()
                .filter(|f| !known.contains(f.as_str()))
                .cloned()
                .collect(),
            metadata_without_file: names
                .iter()
                .filter(|n| !on_disk.contains(n.as_str()))
                .cloned()
                .collect(),
            ..Default::default()
        };

        for rating in ratings.iter().filter(|r| !known.contains(r.video_name.as_str())) {
            report.orphaned_rating_count += 1;
            if !report.orphaned_rating_videos.contains(&rating.video_name) {
                report.orphaned_rating_videos.push(rating.video_name.clone());
            }
        }

        Ok(report)
    }

    /// Run once at startup so an interrupted upload or delete shows up in the logs.
    pub async fn log_report(&self) {
        match self.check().await {
            Ok(report) if report.is_consistent() => {
                tracing::info!("Catalog Check | tables and video directory agree");
            }
            Ok(report) => {
                tracing::warn!(
                    files_without_metadata = ?report.files_without_metadata,
                    metadata_without_file = ?report.metadata_without_file,
                    orphaned_ratings = report.orphaned_rating_count,
                    "Catalog Check | inconsistencies found"
                );
            }
            Err(e) => tracing::error!("Catalog Check | failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{conformance, FlatFileCatalog, RATINGS_FILE};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reports_drift_between_tables_and_files() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(FlatFileCatalog::open(temp_dir.path()).await.unwrap());
        catalog
            .add_video(conformance::new_video("kept.mp4", "Goal!", "Shot scored"))
            .await
            .unwrap();
        catalog
            .add_video(conformance::new_video("lost.mp4", "Save", "Keeper dives"))
            .await
            .unwrap();

        // Simulate an interrupted delete and a hand-edited ratings table
        std::fs::remove_file(catalog.video_dir().path_of("lost.mp4")).unwrap();
        std::fs::write(catalog.video_dir().path_of("stray.mov"), b"x").unwrap();
        std::fs::write(
            temp_dir.path().join(RATINGS_FILE),
            "Video Name,Action Accuracy,Player Identification,Scorecard Relevance,Event Chronology,Commentary Quality,Preferred Model\n\
             gone.mp4,5,5,5,5,5,MatchTime\n\
             gone.mp4,6,6,6,6,6,Llava-Qwen-Interleave\n\
             kept.mp4,7,7,7,7,7,MatchTime\n",
        )
        .unwrap();

        let report = ReconcileService::new(catalog).check().await.unwrap();
        assert!(!report.is_consistent());
        assert_eq!(report.files_without_metadata, vec!["stray.mov"]);
        assert_eq!(report.metadata_without_file, vec!["lost.mp4"]);
        assert_eq!(report.orphaned_rating_videos, vec!["gone.mp4"]);
        assert_eq!(report.orphaned_rating_count, 2);
    }

    #[tokio::test]
    async fn test_fresh_catalog_is_consistent() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(FlatFileCatalog::open(temp_dir.path()).await.unwrap());
        let report = ReconcileService::new(catalog).check().await.unwrap();
        assert!(report.is_consistent());
    }
}
