//! Recording endpoints, including the multipart upload

use super::server::AppState;
use super::validation::{
    validate_recording_update, validate_upload_fields, JsonBody, UpdateRecordingRequest,
};
use crate::db::recordings;
use crate::error::{ApiError, ApiResult};
use crate::services::{self, StagedFile};
use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use bandsync_common::db::Recording;
use std::collections::HashMap;
use std::path::Path as FsPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Allowance for form fields and multipart framing on top of the file cap
pub const UPLOAD_FORM_OVERHEAD: usize = 64 * 1024;

/// Request body limit for the upload route
pub fn upload_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes.saturating_add(UPLOAD_FORM_OVERHEAD)
}

/// Multipart part carrying the binary
const FILE_FIELD: &str = "file";

/// POST /recordings/upload
///
/// Stages the `file` part to disk, validates the text fields, then hands off
/// to the upload orchestrator. The staged file is removed whatever happens.
pub async fn upload_recording(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Recording>)> {
    let mut multipart = multipart.map_err(|e| ApiError::Validation(e.body_text()))?;

    let mut fields = HashMap::new();
    let mut staged: Option<StagedFile> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == FILE_FIELD {
            if staged.is_some() {
                return Err(ApiError::Validation("only one file may be uploaded".to_string()));
            }
            staged = Some(
                stage_field(&state.config.upload_dir, state.config.max_upload_bytes, field).await?,
            );
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            fields.insert(name, value);
        }
    }

    let staged = staged.ok_or_else(|| ApiError::Validation("file is required".to_string()))?;
    let metadata = validate_upload_fields(&fields)?;

    let recording =
        services::upload_recording(&state.db, state.relay.as_ref(), staged, metadata).await?;
    Ok((StatusCode::CREATED, Json(recording)))
}

/// Stream one multipart field into a fresh staged file
async fn stage_field(
    upload_dir: &FsPath,
    max_upload_bytes: usize,
    mut field: Field<'_>,
) -> ApiResult<StagedFile> {
    // Guard first, so a partial write is cleaned up on any early return
    let staged = StagedFile::new(StagedFile::unique_path(upload_dir, field.file_name()));

    let mut file = tokio::fs::File::create(staged.path())
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to stage upload: {}", e)))?;

    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        written += chunk.len();
        if written > max_upload_bytes {
            return Err(ApiError::Validation(format!(
                "file exceeds the upload limit of {} bytes",
                max_upload_bytes
            )));
        }
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to stage upload: {}", e)))?;
    }
    file.flush()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to stage upload: {}", e)))?;

    if written == 0 {
        return Err(ApiError::Validation("file is empty".to_string()));
    }

    debug!(path = %staged.path().display(), bytes = written, "Upload staged");
    Ok(staged)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Validation("request exceeds the upload size limit".to_string())
    } else {
        ApiError::Validation(err.body_text())
    }
}

/// GET /recordings/song/:song_id - newest recording first
pub async fn list_for_song(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
) -> ApiResult<Json<Vec<Recording>>> {
    Ok(Json(recordings::list_for_song(&state.db, &song_id).await?))
}

/// PUT /recordings/:id
pub async fn update_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateRecordingRequest>,
) -> ApiResult<Json<Recording>> {
    let update = validate_recording_update(req)?;
    Ok(Json(recordings::update_recording(&state.db, &id, update).await?))
}

/// DELETE /recordings/:id - cascades to comments
///
/// The remote asset is left with the provider.
pub async fn delete_recording(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Recording>> {
    let recording = recordings::delete_recording(&state.db, &id).await?;

    info!(recording_id = %recording.id, url = %recording.url, "Recording deleted");
    Ok(Json(recording))
}
