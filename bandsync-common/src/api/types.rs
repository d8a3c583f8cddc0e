//! Shared API request/response types for the auth endpoints

use serde::{Deserialize, Serialize};

/// Body of `POST /auth/login`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Response of `GET /auth/verify`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}
