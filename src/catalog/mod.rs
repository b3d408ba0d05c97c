//! The catalog store: video metadata, ratings and the video directory.
//!
//! Two interchangeable backends implement [`CatalogStore`]:
//! - [`FlatFileCatalog`] keeps `video_metadata.csv` and `ratings.csv` and
//!   rewrites the affected table in full on every mutation.
//! - [`SqlCatalog`] keeps both tables in SQLite and runs every multi-step
//!   mutation inside one transaction.

pub mod flat_file;
pub mod sql;
pub mod table;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{NewVideo, Rating, VideoMetadata};
use crate::services::video_dir::VideoDir;

pub use flat_file::FlatFileCatalog;
pub use sql::SqlCatalog;

pub const RATINGS_FILE: &str = "ratings.csv";
pub const METADATA_FILE: &str = "video_metadata.csv";
pub const VIDEO_DIR: &str = "uploaded_videos";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// What a delete actually removed. All zeros/false means the video was unknown.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct DeleteReport {
    pub file_removed: bool,
    pub metadata_rows_removed: u64,
    pub ratings_removed: u64,
}

impl DeleteReport {
    pub fn removed_anything(&self) -> bool {
        self.file_removed || self.metadata_rows_removed > 0 || self.ratings_removed > 0
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Distinct video names in table order.
    async fn list_videos(&self) -> CatalogResult<Vec<String>>;

    /// First metadata row for `video_name`.
    async fn get_metadata(&self, video_name: &str) -> CatalogResult<VideoMetadata>;

    /// Store the video file and record its commentaries.
    async fn add_video(&self, video: NewVideo) -> CatalogResult<VideoMetadata>;

    /// Remove the file, the metadata row(s) and every rating of `video_name`.
    async fn delete_video(&self, video_name: &str) -> CatalogResult<DeleteReport>;

    /// Append a rating for an existing video.
    async fn add_rating(&self, rating: Rating) -> CatalogResult<Rating>;

    async fn list_ratings(&self) -> CatalogResult<Vec<Rating>>;

    /// Empty both tables. Video files stay where they are.
    async fn wipe_all(&self) -> CatalogResult<()>;

    /// `video_metadata.csv` as it should be downloaded.
    async fn export_metadata(&self) -> CatalogResult<Vec<u8>>;

    /// `ratings.csv` as it should be downloaded.
    async fn export_ratings(&self) -> CatalogResult<Vec<u8>>;

    fn video_dir(&self) -> &VideoDir;
}

/// First-seen order, duplicates dropped.
pub(crate) fn distinct_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
