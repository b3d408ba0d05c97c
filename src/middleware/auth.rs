use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;
use crate::routes::AppState;

pub const PASSCODE_HEADER: &str = "x-admin-passcode";
const ADMIN_SUBJECT: &str = "admin";

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// How the current request proved it is allowed into the admin area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSession {
    Token,
    Passcode,
}

/// The single shared admin credential and the tokens handed out for it.
pub struct AdminGate {
    passcode_hash: String,
    jwt_secret: String,
    token_ttl_secs: u64,
}

impl AdminGate {
    pub fn new(config: &Config) -> Self {
        Self {
            passcode_hash: config.admin_passcode_hash.clone(),
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_secs: config.token_ttl_secs,
        }
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.token_ttl_secs
    }

    /// Runs on the blocking pool: one argon2 check takes tens of milliseconds.
    pub async fn verify_passcode(&self, candidate: String) -> Result<(), AppError> {
        let passcode_hash = self.passcode_hash.clone();

        tokio::task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&passcode_hash)
                .map_err(|e| AppError::InternalServerError(format!("Hash parse error: {}", e)))?;

            Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed_hash)
                .map_err(|_| AppError::Unauthorized("Invalid passcode. Please try again.".to_string()))
        })
        .await
        .map_err(|e| AppError::InternalServerError(format!("Passcode check failed: {}", e)))?
    }

    pub fn issue_token(&self) -> Result<String, AppError> {
        let expiration = chrono::Utc::now().timestamp() as usize + self.token_ttl_secs as usize;
        let claims = Claims {
            sub: ADMIN_SUBJECT.to_string(),
            exp: expiration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )
        .map_err(|e| AppError::InternalServerError(format!("Token encode error: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> Result<(), AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!("JWT decode error: {}", e);
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        if token_data.claims.sub != ADMIN_SUBJECT {
            return Err(AppError::Unauthorized("Invalid or expired token".to_string()));
        }
        Ok(())
    }
}

/// Admits a request carrying either a bearer token from `/admin/login` or
/// the passcode itself in the `x-admin-passcode` header.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = header_value(&req, header::AUTHORIZATION.as_str());
    let passcode = header_value(&req, PASSCODE_HEADER);

    let session = if let Some(auth_header) = auth_header {
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".to_string()))?;
        state.gate.verify_token(token)?;
        AdminSession::Token
    } else if let Some(passcode) = passcode {
        state.gate.verify_passcode(passcode).await?;
        AdminSession::Passcode
    } else {
        return Err(AppError::Unauthorized("Admin access required".to_string()));
    };

    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}

fn header_value(req: &Request, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned)
}
