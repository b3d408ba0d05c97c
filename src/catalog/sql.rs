//! SQLite catalog. The file system and the two tables change together: a
//! mutation only becomes visible once its transaction commits, and the video
//! file is swapped in (or out) right before that commit.

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::path::Path;
use tokio::sync::Mutex;

use super::{table, CatalogError, CatalogResult, CatalogStore, DeleteReport, VIDEO_DIR};
use crate::entities::{rating, video};
use crate::models::evaluation::validate_file_name;
use crate::models::{NewVideo, Rating, Scores, VideoMetadata};
use crate::services::video_dir::VideoDir;

pub struct SqlCatalog {
    db: DatabaseConnection,
    videos: VideoDir,
    /// Held across the file swap and the commit so file order matches row order.
    file_lock: Mutex<()>,
}

impl From<video::Model> for VideoMetadata {
    fn from(model: video::Model) -> Self {
        Self {
            video_name: model.video_name,
            commentary_a: model.commentary_a,
            commentary_b: model.commentary_b,
        }
    }
}

impl From<rating::Model> for Rating {
    fn from(model: rating::Model) -> Self {
        Self {
            video_name: model.video_name,
            scores: Scores {
                action_accuracy: model.action_accuracy,
                player_identification: model.player_identification,
                scorecard_relevance: model.scorecard_relevance,
                event_chronology: model.event_chronology,
                commentary_quality: model.commentary_quality,
            },
            preferred_model: model.preferred_model,
        }
    }
}

impl SqlCatalog {
    /// Connect, run pending migrations and make sure the video directory exists.
    pub async fn connect(database_url: &str, data_dir: &Path) -> CatalogResult<Self> {
        tokio::fs::create_dir_all(data_dir).await?;

        tracing::info!("Connecting to database: {}", database_url);
        let db = Database::connect(database_url).await?;
        Migrator::up(&db, None).await?;

        let videos = VideoDir::new(data_dir.join(VIDEO_DIR));
        videos.ensure().await?;

        Ok(Self {
            db,
            videos,
            file_lock: Mutex::new(()),
        })
    }

    async fn find_video<C: ConnectionTrait>(
        conn: &C,
        video_name: &str,
    ) -> Result<Option<video::Model>, DbErr> {
        video::Entity::find()
            .filter(video::Column::VideoName.eq(video_name))
            .one(conn)
            .await
    }

    /// Insert the metadata row, or replace the commentaries of an existing one.
    async fn upsert_video<C: ConnectionTrait>(conn: &C, meta: &VideoMetadata) -> Result<(), DbErr> {
        match Self::find_video(conn, &meta.video_name).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.commentary_a = Set(meta.commentary_a.clone());
                active.commentary_b = Set(meta.commentary_b.clone());
                active.update(conn).await?;
            }
            None => {
                video::ActiveModel {
                    video_name: Set(meta.video_name.clone()),
                    commentary_a: Set(meta.commentary_a.clone()),
                    commentary_b: Set(meta.commentary_b.clone()),
                    created_at: Set(chrono::Utc::now().naive_utc()),
                    ..Default::default()
                }
                .insert(conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn all_metadata(&self) -> CatalogResult<Vec<VideoMetadata>> {
        let rows = video::Entity::find()
            .order_by_asc(video::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(VideoMetadata::from).collect())
    }
}

#[async_trait]
impl CatalogStore for SqlCatalog {
    async fn list_videos(&self) -> CatalogResult<Vec<String>> {
        let metadata = self.all_metadata().await?;
        Ok(super::distinct_names(metadata.iter().map(|m| m.video_name.as_str())))
    }

    async fn get_metadata(&self, video_name: &str) -> CatalogResult<VideoMetadata> {
        Self::find_video(&self.db, video_name)
            .await?
            .map(VideoMetadata::from)
            .ok_or_else(|| CatalogError::NotFound(format!("Video '{}' not found", video_name)))
    }

    async fn add_video(&self, video: NewVideo) -> CatalogResult<VideoMetadata> {
        video.validate()?;
        let meta = video.metadata();

        let _guard = self.file_lock.lock().await;
        let pending = self.videos.prepare(&video.video_name, &video.data).await?;

        let txn = match self.db.begin().await {
            Ok(txn) => txn,
            Err(e) => {
                pending.discard().await?;
                return Err(e.into());
            }
        };
        if let Err(e) = Self::upsert_video(&txn, &meta).await {
            pending.discard().await?;
            return Err(e.into());
        }

        // Dropping `txn` on the error path rolls the row back; a failed
        // publish has already removed its staged file
        if let Err(e) = pending.publish().await {
            tracing::warn!(video = %meta.video_name, "Could not publish upload: {}", e);
            return Err(e.into());
        }
        if let Err(e) = txn.commit().await {
            tracing::error!(video = %meta.video_name, "Commit failed after the file was written: {}", e);
            return Err(e.into());
        }

        tracing::info!(video = %meta.video_name, bytes = video.data.len(), "Video added");
        Ok(meta)
    }

    async fn delete_video(&self, video_name: &str) -> CatalogResult<DeleteReport> {
        validate_file_name(video_name)?;

        let _guard = self.file_lock.lock().await;
        let staged = self.videos.stage_removal(video_name).await?;

        let result = async {
            let txn = self.db.begin().await?;
            let ratings = rating::Entity::delete_many()
                .filter(rating::Column::VideoName.eq(video_name))
                .exec(&txn)
                .await?;
            let videos = video::Entity::delete_many()
                .filter(video::Column::VideoName.eq(video_name))
                .exec(&txn)
                .await?;
            txn.commit().await?;
            Ok::<_, DbErr>(DeleteReport {
                file_removed: false,
                metadata_rows_removed: videos.rows_affected,
                ratings_removed: ratings.rows_affected,
            })
        }
        .await;

        let mut report = match result {
            Ok(report) => report,
            Err(e) => {
                if let Some(staged) = staged {
                    staged.restore().await?;
                }
                return Err(e.into());
            }
        };

        if let Some(staged) = staged {
            staged.commit().await?;
            report.file_removed = true;
        }

        tracing::info!(video = %video_name, ?report, "Video deleted");
        Ok(report)
    }

    async fn add_rating(&self, new_rating: Rating) -> CatalogResult<Rating> {
        new_rating.validate()?;

        let txn = self.db.begin().await?;
        if Self::find_video(&txn, &new_rating.video_name).await?.is_none() {
            return Err(CatalogError::NotFound(format!(
                "Video '{}' not found",
                new_rating.video_name
            )));
        }

        let scores = &new_rating.scores;
        rating::ActiveModel {
            video_name: Set(new_rating.video_name.clone()),
            action_accuracy: Set(scores.action_accuracy),
            player_identification: Set(scores.player_identification),
            scorecard_relevance: Set(scores.scorecard_relevance),
            event_chronology: Set(scores.event_chronology),
            commentary_quality: Set(scores.commentary_quality),
            preferred_model: Set(new_rating.preferred_model),
            submitted_at: Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        tracing::info!(video = %new_rating.video_name, preferred = %new_rating.preferred_model, "Rating saved");
        Ok(new_rating)
    }

    async fn list_ratings(&self) -> CatalogResult<Vec<Rating>> {
        let rows = rating::Entity::find()
            .order_by_asc(rating::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(Rating::from).collect())
    }

    async fn wipe_all(&self) -> CatalogResult<()> {
        let txn = self.db.begin().await?;
        rating::Entity::delete_many().exec(&txn).await?;
        video::Entity::delete_many().exec(&txn).await?;
        txn.commit().await?;
        tracing::warn!("Ratings and metadata tables wiped");
        Ok(())
    }

    async fn export_metadata(&self) -> CatalogResult<Vec<u8>> {
        table::write_metadata(&self.all_metadata().await?)
    }

    async fn export_ratings(&self) -> CatalogResult<Vec<u8>> {
        table::write_ratings(&self.list_ratings().await?)
    }

    fn video_dir(&self) -> &VideoDir {
        &self.videos
    }
}
