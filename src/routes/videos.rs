use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::Iterable;
use serde::Serialize;

use crate::error::AppError;
use crate::models::evaluation::{PreferredModel, SCORE_DEFAULT, SCORE_MAX, SCORE_MIN};
use crate::models::{Metric, VideoMetadata};
use crate::routes::AppState;
use crate::services::video_dir::content_type;

#[derive(Serialize, utoipa::ToSchema)]
pub struct MetricInfo {
    name: String,
    description: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RubricResponse {
    metrics: Vec<MetricInfo>,
    score_min: u8,
    score_max: u8,
    score_default: u8,
    models: Vec<PreferredModel>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoListResponse {
    videos: Vec<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentaryView {
    model: PreferredModel,
    text: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VideoDetails {
    video_name: String,
    content_url: String,
    commentaries: Vec<CommentaryView>,
}

impl From<VideoMetadata> for VideoDetails {
    fn from(meta: VideoMetadata) -> Self {
        Self {
            content_url: format!("/videos/{}/content", meta.video_name),
            commentaries: vec![
                CommentaryView {
                    model: PreferredModel::MatchTime,
                    text: meta.commentary_a,
                },
                CommentaryView {
                    model: PreferredModel::LlavaQwenInterleave,
                    text: meta.commentary_b,
                },
            ],
            video_name: meta.video_name,
        }
    }
}

#[utoipa::path(
    get,
    path = "/rubric",
    responses(
        (status = 200, description = "Metrics to score and models to choose from", body = RubricResponse)
    ),
    tag = "Evaluation"
)]
pub async fn rubric() -> Json<RubricResponse> {
    Json(RubricResponse {
        metrics: Metric::ALL
            .iter()
            .map(|m| MetricInfo {
                name: m.column().to_string(),
                description: m.description().to_string(),
            })
            .collect(),
        score_min: SCORE_MIN,
        score_max: SCORE_MAX,
        score_default: SCORE_DEFAULT,
        models: PreferredModel::iter().collect(),
    })
}

#[utoipa::path(
    get,
    path = "/videos",
    responses(
        (status = 200, description = "Videos available for evaluation", body = VideoListResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Evaluation"
)]
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<VideoListResponse>, AppError> {
    let videos = state.catalog.list_videos().await?;
    Ok(Json(VideoListResponse { videos }))
}

#[utoipa::path(
    get,
    path = "/videos/{name}",
    params(
        ("name" = String, Path, description = "Video name including extension")
    ),
    responses(
        (status = 200, description = "Both commentaries for the video", body = VideoDetails),
        (status = 404, description = "Video not found")
    ),
    tag = "Evaluation"
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<VideoDetails>, AppError> {
    let meta = state.catalog.get_metadata(&name).await?;
    Ok(Json(VideoDetails::from(meta)))
}

#[utoipa::path(
    get,
    path = "/videos/{name}/content",
    params(
        ("name" = String, Path, description = "Video name including extension")
    ),
    responses(
        (status = 200, description = "Video bytes", content_type = "video/mp4"),
        (status = 404, description = "Video not found")
    ),
    tag = "Evaluation"
)]
pub async fn get_video_content(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    // Only catalogued videos are served, not whatever sits in the directory
    state.catalog.get_metadata(&name).await?;

    let data = state.catalog.video_dir().read(&name).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            tracing::warn!(video = %name, "Metadata exists but the video file is missing");
            AppError::NotFound(format!("Video file '{}' not found", name))
        } else {
            AppError::InternalServerError(format!("Failed to read video '{}': {}", name, e))
        }
    })?;

    Ok(([(header::CONTENT_TYPE, content_type(&name))], data).into_response())
}
