use axum::{response::Html, Json};
use serde::Serialize;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Welcome page HTML", content_type = "text/html")
    ),
    tag = "General"
)]
pub async fn root() -> Html<&'static str> {
    Html(concat!(
        "<!DOCTYPE html>\n",
        "<html lang=\"en\"><head><meta charset=\"UTF-8\"><title>Commentary Evaluation</title></head>\n",
        "<body>\n",
        "<h1>Commentary Evaluation</h1>\n",
        "<p>Rate MatchTime against Llava-Qwen-Interleave on the uploaded match clips.</p>\n",
        "<ul>\n",
        "<li><a href=\"/videos\">Videos awaiting evaluation</a></li>\n",
        "<li><a href=\"/rubric\">Scoring rubric</a></li>\n",
        "<li><a href=\"/swagger-ui/\">API documentation</a></li>\n",
        "</ul>\n",
        "</body></html>\n",
    ))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "General"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
