//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared request/response types
//!
//! The service wraps these with framework-specific middleware (Axum).

pub mod auth;
pub mod types;

pub use auth::{
    admin_claims, check_admin_credentials, issue_token, verify_token, Claims, TokenError,
    TOKEN_TTL_SECS,
};
pub use types::{LoginRequest, LoginResponse, VerifyResponse};
