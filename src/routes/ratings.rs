use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppError;
use crate::models::Rating;
use crate::routes::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmitRatingResponse {
    message: String,
    rating: Rating,
}

#[utoipa::path(
    post,
    path = "/ratings",
    request_body = Rating,
    responses(
        (status = 201, description = "Rating stored", body = SubmitRatingResponse),
        (status = 400, description = "Score outside 1-10"),
        (status = 404, description = "Video not found"),
        (status = 422, description = "Malformed rating")
    ),
    tag = "Evaluation"
)]
pub async fn submit_rating(
    State(state): State<AppState>,
    Json(payload): Json<Rating>,
) -> Result<(StatusCode, Json<SubmitRatingResponse>), AppError> {
    let video_name = payload.video_name.clone();
    let rating = match state.catalog.add_rating(payload).await {
        Ok(rating) => rating,
        Err(e) => {
            tracing::info!("Rating | POST /ratings | video={} | rejected: {}", video_name, e);
            return Err(e.into());
        }
    };

    tracing::info!("Rating | POST /ratings | video={} | res=201", rating.video_name);
    Ok((
        StatusCode::CREATED,
        Json(SubmitRatingResponse {
            message: "Your ratings have been submitted and saved!".to_string(),
            rating,
        }),
    ))
}
