//! Error types for bandsync-server
//!
//! Every failure surfaced to a client carries a stable `code`:
//!
//! | code | status |
//! |---|---|
//! | `VALIDATION_ERROR` | 400 |
//! | `AUTH_ERROR` | 401 |
//! | `UPLOAD_FAILED` | 400 |
//! | `NOT_FOUND` | 404 |
//! | `STORE_ERROR` | 409 (constraint) / 500 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing request fields, rejected before any side effect
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing, invalid or expired credential
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// Media provider produced no URL; nothing was persisted
    #[error("Cloud upload failed: {0}")]
    UploadFailed(String),

    /// Referenced id does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity store failure
    ///
    /// When the failure follows a successful relay, `orphaned_remote_url`
    /// names the provider asset that now has no row.
    #[error("Store error: {message}")]
    Store {
        message: String,
        constraint: bool,
        orphaned_remote_url: Option<String>,
    },

    /// Local failure unrelated to the store (e.g. staging to disk)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Auth(_) => "AUTH_ERROR",
            ApiError::UploadFailed(_) => "UPLOAD_FAILED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Store { .. } => "STORE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::UploadFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store { constraint: true, .. } => StatusCode::CONFLICT,
            ApiError::Store { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Store failure that happened after the provider accepted `remote_url`
    pub fn store_after_relay(err: bandsync_common::Error, remote_url: String) -> Self {
        match ApiError::from(err) {
            ApiError::Store {
                message,
                constraint,
                ..
            } => ApiError::Store {
                message,
                constraint,
                orphaned_remote_url: Some(remote_url),
            },
            // The insert has no NotFound path of its own; keep the orphan visible anyway
            other => ApiError::Store {
                message: other.to_string(),
                constraint: false,
                orphaned_remote_url: Some(remote_url),
            },
        }
    }

    pub fn orphaned_remote_url(&self) -> Option<&str> {
        match self {
            ApiError::Store {
                orphaned_remote_url,
                ..
            } => orphaned_remote_url.as_deref(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("row not found".to_string()),
            other => {
                let constraint = other
                    .as_database_error()
                    .map(|db| {
                        db.is_foreign_key_violation()
                            || db.is_unique_violation()
                            || db.is_check_violation()
                    })
                    .unwrap_or(false);
                ApiError::Store {
                    message: other.to_string(),
                    constraint,
                    orphaned_remote_url: None,
                }
            }
        }
    }
}

impl From<bandsync_common::Error> for ApiError {
    fn from(err: bandsync_common::Error) -> Self {
        use bandsync_common::Error;

        match err {
            Error::Database(db) => ApiError::from(db),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::Validation(msg),
            Error::Io(io) => ApiError::Internal(io.to_string()),
            Error::Config(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(url) = self.orphaned_remote_url() {
            error["orphanedRemoteUrl"] = json!(url);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
