//! Request bodies and their validators
//!
//! Each endpoint deserializes into a loose request struct (every field
//! optional), then runs an explicit validator that produces the typed input
//! for the store. Failures are `VALIDATION_ERROR` and happen before any side
//! effect.

use crate::db::comments::{CommentUpdate, NewComment};
use crate::db::recordings::{NewRecording, RecordingUpdate};
use crate::db::songs::{NewSong, SongUpdate};
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use bandsync_common::api::LoginRequest;
use bandsync_common::db::{RecordingCategory, SongStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// JSON body extractor whose rejection is a `VALIDATION_ERROR`
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

// ========================================
// Request bodies
// ========================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSongRequest {
    pub title: Option<String>,
    pub status: Option<String>,
    pub band_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSongRequest {
    pub title: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordingRequest {
    pub version_name: Option<String>,
    pub category: Option<String>,
    pub recorded_at: Option<String>,
    pub is_final: Option<bool>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    // Immutable after upload; present only so they can be refused
    pub url: Option<Value>,
    pub song_id: Option<Value>,
    pub duration: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub recording_id: Option<String>,
    pub text: Option<String>,
    pub author_name: Option<String>,
    pub timestamp_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    pub text: Option<String>,
    pub author_name: Option<String>,
}

// ========================================
// Validators
// ========================================

pub fn validate_login(req: &LoginRequest) -> Result<(), ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_new_song(req: CreateSongRequest) -> Result<NewSong, ApiError> {
    let title = required_text("title", req.title)?;
    let band_id = required_text("bandId", req.band_id)?;
    let status = req.status.as_deref().map(parse_status).transpose()?;

    Ok(NewSong {
        title,
        status,
        band_id,
    })
}

pub fn validate_song_update(req: UpdateSongRequest) -> Result<SongUpdate, ApiError> {
    Ok(SongUpdate {
        title: optional_text("title", req.title)?,
        status: req.status.as_deref().map(parse_status).transpose()?,
    })
}

pub fn validate_recording_update(req: UpdateRecordingRequest) -> Result<RecordingUpdate, ApiError> {
    for (name, present) in [
        ("url", req.url.is_some()),
        ("songId", req.song_id.is_some()),
        ("duration", req.duration.is_some()),
    ] {
        if present {
            return Err(ApiError::Validation(format!("{} cannot be changed", name)));
        }
    }

    Ok(RecordingUpdate {
        version_name: optional_text("versionName", req.version_name)?,
        category: req.category.as_deref().map(parse_category).transpose()?,
        recorded_at: req
            .recorded_at
            .as_deref()
            .map(parse_recorded_at)
            .transpose()?,
        is_final: req.is_final,
        mime_type: optional_text("type", req.mime_type)?,
    })
}

/// Comment timestamps must be finite and non-negative; they are not checked
/// against the recording's duration.
pub fn validate_new_comment(req: CreateCommentRequest) -> Result<NewComment, ApiError> {
    let recording_id = required_text("recordingId", req.recording_id)?;
    let text = required_text("text", req.text)?;
    let author_name = required_text("authorName", req.author_name)?;
    let timestamp_seconds = req
        .timestamp_seconds
        .ok_or_else(|| ApiError::Validation("timestampSeconds is required".to_string()))?;

    if !timestamp_seconds.is_finite() || timestamp_seconds < 0.0 {
        return Err(ApiError::Validation(
            "timestampSeconds must be a non-negative number".to_string(),
        ));
    }

    Ok(NewComment {
        recording_id,
        text,
        author_name,
        timestamp_seconds,
    })
}

pub fn validate_comment_update(req: UpdateCommentRequest) -> Result<CommentUpdate, ApiError> {
    Ok(CommentUpdate {
        text: optional_text("text", req.text)?,
        author_name: optional_text("authorName", req.author_name)?,
    })
}

/// Validate the text fields of a multipart upload
///
/// Empty strings are treated as absent, matching how browsers submit blank
/// form inputs.
pub fn validate_upload_fields(fields: &HashMap<String, String>) -> Result<NewRecording, ApiError> {
    let field = |name: &str| form_field(fields, name);

    let song_id = field("songId")
        .ok_or_else(|| ApiError::Validation("songId is required".to_string()))?
        .to_string();

    let is_final = field("isFinal")
        .map(|v| match v {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ApiError::Validation(format!(
                "isFinal must be 'true' or 'false', got '{}'",
                other
            ))),
        })
        .transpose()?;

    Ok(NewRecording {
        song_id,
        version_name: field("versionName").map(str::to_string),
        category: field("category").map(parse_category).transpose()?,
        recorded_at: field("recordedAt").map(parse_recorded_at).transpose()?,
        is_final,
        mime_type: field("type").map(str::to_string),
    })
}

// ========================================
// Field helpers
// ========================================

fn form_field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required_text(name: &str, value: Option<String>) -> Result<String, ApiError> {
    optional_text(name, value)?
        .ok_or_else(|| ApiError::Validation(format!("{} is required", name)))
}

/// `None` stays `None`; a present value must not be blank
fn optional_text(name: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => {
            Err(ApiError::Validation(format!("{} must not be empty", name)))
        }
        Some(v) => Ok(Some(v.trim().to_string())),
    }
}

fn parse_status(value: &str) -> Result<SongStatus, ApiError> {
    SongStatus::from_str(value).map_err(ApiError::Validation)
}

fn parse_category(value: &str) -> Result<RecordingCategory, ApiError> {
    RecordingCategory::from_str(value).map_err(ApiError::Validation)
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date taken as midnight UTC
fn parse_recorded_at(value: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            ApiError::Validation(format!(
                "recordedAt must be an RFC 3339 timestamp or YYYY-MM-DD date, got '{}'",
                value
            ))
        })
}
