//! Login and token verification endpoints

use super::server::AppState;
use super::validation::{validate_login, JsonBody};
use crate::error::{ApiError, ApiResult};
use axum::{extract::State, Extension, Json};
use bandsync_common::api::{
    admin_claims, check_admin_credentials, issue_token, Claims, LoginRequest, LoginResponse,
    VerifyResponse,
};
use chrono::Utc;
use tracing::{info, warn};

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    validate_login(&req)?;

    let config = &state.config;
    if !check_admin_credentials(&req.username, &req.password, &config.admin_user, &config.admin_password) {
        warn!(username = %req.username, "Rejected login");
        return Err(ApiError::Auth("Invalid credentials".to_string()));
    }

    let claims = admin_claims(&req.username, Utc::now().timestamp());
    let access_token = issue_token(&claims, &config.signing_secret)
        .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))?;

    info!(username = %claims.username, exp = claims.exp, "Issued access token");
    Ok(Json(LoginResponse { access_token }))
}

/// GET /auth/verify
///
/// The guard has already checked the token; reaching the handler means it is
/// valid.
pub async fn verify(Extension(claims): Extension<Claims>) -> Json<VerifyResponse> {
    tracing::debug!(username = %claims.username, "Token verified");
    Json(VerifyResponse { valid: true })
}
