mod admin;
mod auth;
mod home;
mod ratings;
mod videos;


use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::catalog::CatalogStore;
use crate::middleware::auth::{require_admin, AdminGate, PASSCODE_HEADER};

/// Shared by every handler. The catalog is the only source of truth; nothing
/// about videos or ratings is cached between requests.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub gate: Arc<AdminGate>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // General endpoints
        home::root,
        home::health,
        // Evaluator endpoints
        videos::rubric,
        videos::list_videos,
        videos::get_video,
        videos::get_video_content,
        ratings::submit_rating,
        // Administrator endpoints
        auth::login,
        admin::upload_video,
        admin::delete_video,
        admin::export_ratings,
        admin::export_metadata,
        admin::wipe_tables,
        admin::list_ratings,
        admin::consistency,
    ),
    components(
        schemas(
            home::HealthResponse,
            videos::RubricResponse,
            videos::MetricInfo,
            videos::VideoListResponse,
            videos::VideoDetails,
            videos::CommentaryView,
            ratings::SubmitRatingResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            admin::UploadVideoForm,
            admin::MessageResponse,
            admin::RatingListResponse,
            crate::models::Rating,
            crate::models::Scores,
            crate::models::VideoMetadata,
            crate::models::evaluation::PreferredModel,
            crate::catalog::DeleteReport,
            crate::services::reconcile::ConsistencyReport,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Evaluation", description = "Watch a clip, read both commentaries and submit scores"),
        (name = "Administration", description = "Upload, delete and export (admin passcode required)")
    ),
    info(
        title = "Commentary Evaluation API",
        version = "0.1.0",
        description = "Human evaluation of MatchTime and Llava-Qwen-Interleave match commentary",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

// Bearer tokens from /admin/login, or the passcode header directly
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        components.add_security_scheme(
            "admin_passcode",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(PASSCODE_HEADER))),
        );
    }
}

pub fn create_routes(state: AppState, max_upload_bytes: usize) -> Router {
    // Swagger UI (stateless)
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    let admin_routes = Router::new()
        .route("/admin/videos", post(admin::upload_video))
        .route("/admin/videos/{name}", delete(admin::delete_video))
        .route("/admin/export/ratings.csv", get(admin::export_ratings))
        .route("/admin/export/video_metadata.csv", get(admin::export_metadata))
        .route("/admin/tables", delete(admin::wipe_tables))
        .route("/admin/ratings", get(admin::list_ratings))
        .route("/admin/consistency", get(admin::consistency))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/health", get(home::health))
        .route("/rubric", get(videos::rubric))
        .route("/videos", get(videos::list_videos))
        .route("/videos/{name}", get(videos::get_video))
        .route("/videos/{name}/content", get(videos::get_video_content))
        .route("/ratings", post(ratings::submit_rating))
        .route("/admin/login", post(auth::login))
        .merge(admin_routes)
        .with_state(state);

    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
