use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::routes::AppState;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    passcode: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    access_token: String,
    token_type: String,
    expires_in: u64,
}

#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access granted to Admin Mode", body = LoginResponse),
        (status = 401, description = "Invalid passcode")
    ),
    tag = "Administration"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if let Err(e) = state.gate.verify_passcode(payload.passcode).await {
        tracing::warn!("Admin | POST /admin/login | res=401");
        return Err(e);
    }

    let access_token = state.gate.issue_token()?;
    tracing::info!("Admin | POST /admin/login | res=200 | Access granted to Admin Mode");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.gate.token_ttl_secs(),
    }))
}
