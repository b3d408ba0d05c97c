use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;

use crate::catalog::{DeleteReport, METADATA_FILE, RATINGS_FILE};
use crate::error::AppError;
use crate::middleware::auth::AdminSession;
use crate::models::{NewVideo, Rating, VideoMetadata};
use crate::routes::AppState;
use crate::services::reconcile::{ConsistencyReport, ReconcileService};

/// Multipart form accepted by the upload endpoint.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct UploadVideoForm {
    /// mp4, avi or mov; stored under its original file name
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// MatchTime commentary
    commentary_a: String,
    /// Llava-Qwen-Interleave commentary
    commentary_b: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    message: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RatingListResponse {
    total: usize,
    ratings: Vec<Rating>,
}

#[utoipa::path(
    post,
    path = "/admin/videos",
    tag = "Administration",
    request_body(content = UploadVideoForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Video uploaded successfully", body = VideoMetadata),
        (status = 400, description = "Missing file or commentary"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error")
    ),
    security(
        ("bearer_auth" = []),
        ("admin_passcode" = [])
    )
)]
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<VideoMetadata>), AppError> {
    let mut video_name = String::new();
    let mut data = Vec::new();
    let mut commentary_a = String::new();
    let mut commentary_b = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        match field.name() {
            Some("file") => {
                video_name = field.file_name().unwrap_or_default().to_string();
                data = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::BadRequest("Failed to read file bytes".to_string()))?
                    .to_vec();
            }
            Some("commentary_a") => {
                commentary_a = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Invalid commentary_a field".to_string()))?;
            }
            Some("commentary_b") => {
                commentary_b = field
                    .text()
                    .await
                    .map_err(|_| AppError::BadRequest("Invalid commentary_b field".to_string()))?;
            }
            _ => {}
        }
    }

    let video = NewVideo {
        video_name,
        data,
        commentary_a,
        commentary_b,
    };

    match state.catalog.add_video(video).await {
        Ok(meta) => {
            tracing::info!("Upload | POST /admin/videos | video={} | res=201", meta.video_name);
            Ok((StatusCode::CREATED, Json(meta)))
        }
        Err(e) => {
            tracing::info!("Upload | POST /admin/videos | res=error | {}", e);
            Err(e.into())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/admin/videos/{name}",
    params(
        ("name" = String, Path, description = "Video name including extension")
    ),
    responses(
        (status = 200, description = "Video, metadata and its ratings deleted", body = DeleteReport),
        (status = 400, description = "Name is not a bare file name"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Video not found")
    ),
    security(
        ("bearer_auth" = []),
        ("admin_passcode" = [])
    ),
    tag = "Administration"
)]
pub async fn delete_video(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(name): Path<String>,
) -> Result<Json<DeleteReport>, AppError> {
    let report = state.catalog.delete_video(&name).await?;

    if !report.removed_anything() {
        return Err(AppError::NotFound(format!("Video '{}' not found", name)));
    }

    tracing::info!(
        ?session,
        "Delete | DELETE /admin/videos/{} | ratings_removed={} | res=200",
        name,
        report.ratings_removed
    );
    Ok(Json(report))
}

fn csv_download(file_name: &str, content: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        content,
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/admin/export/ratings.csv",
    responses(
        (status = 200, description = "Ratings table", content_type = "text/csv"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = []),
        ("admin_passcode" = [])
    ),
    tag = "Administration"
)]
pub async fn export_ratings(State(state): State<AppState>) -> Result<Response, AppError> {
    let content = state.catalog.export_ratings().await?;
    Ok(csv_download(RATINGS_FILE, content))
}

#[utoipa::path(
    get,
    path = "/admin/export/video_metadata.csv",
    responses(
        (status = 200, description = "Video metadata table", content_type = "text/csv"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = []),
        ("admin_passcode" = [])
    ),
    tag = "Administration"
)]
pub async fn export_metadata(State(state): State<AppState>) -> Result<Response, AppError> {
    let content = state.catalog.export_metadata().await?;
    Ok(csv_download(METADATA_FILE, content))
}

#[utoipa::path(
    delete,
    path = "/admin/tables",
    responses(
        (status = 200, description = "Both tables emptied", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = []),
        ("admin_passcode" = [])
    ),
    tag = "Administration"
)]
pub async fn wipe_tables(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> Result<Json<MessageResponse>, AppError> {
    state.catalog.wipe_all().await?;
    tracing::warn!(?session, "Wipe | DELETE /admin/tables | res=200");

    Ok(Json(MessageResponse {
        message: "Ratings and metadata tables deleted and reinitialized.".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/admin/ratings",
    responses(
        (status = 200, description = "Every stored rating in submission order", body = RatingListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = []),
        ("admin_passcode" = [])
    ),
    tag = "Administration"
)]
pub async fn list_ratings(State(state): State<AppState>) -> Result<Json<RatingListResponse>, AppError> {
    let ratings = state.catalog.list_ratings().await?;
    Ok(Json(RatingListResponse {
        total: ratings.len(),
        ratings,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/consistency",
    responses(
        (status = 200, description = "Differences between the tables and the video directory", body = ConsistencyReport),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = []),
        ("admin_passcode" = [])
    ),
    tag = "Administration"
)]
pub async fn consistency(State(state): State<AppState>) -> Result<Json<ConsistencyReport>, AppError> {
    let report = ReconcileService::new(state.catalog.clone()).check().await?;
    Ok(Json(report))
}
