//! Upload orchestration: relay, then persist, then clean up
//!
//! The sequence is strictly ordered. No recording row exists unless the
//! provider returned a URL, and the staged file is gone once the call returns
//! (on success, on every error, and if the request future is dropped).

use super::media_relay::MediaRelay;
use super::staged_file::{CleanupOutcome, StagedFile};
use crate::db::recordings::{insert_recording, NewRecording};
use crate::error::{ApiError, ApiResult};
use bandsync_common::db::Recording;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

/// Relay a staged upload and persist the resulting recording
pub async fn upload_recording(
    db: &SqlitePool,
    relay: &dyn MediaRelay,
    mut staged: StagedFile,
    metadata: NewRecording,
) -> ApiResult<Recording> {
    let result = relay_and_store(db, relay, &staged, metadata).await;

    match staged.release() {
        CleanupOutcome::Removed => debug!(path = %staged.path().display(), "Staged upload removed"),
        CleanupOutcome::AlreadyAbsent | CleanupOutcome::AlreadyReleased => {}
        CleanupOutcome::Failed(kind) => {
            warn!(path = %staged.path().display(), ?kind, "Staged upload left on disk")
        }
    }

    result
}

async fn relay_and_store(
    db: &SqlitePool,
    relay: &dyn MediaRelay,
    staged: &StagedFile,
    metadata: NewRecording,
) -> ApiResult<Recording> {
    let song_id = metadata.song_id.clone();

    let asset = relay.upload(staged.path()).await.map_err(|e| {
        warn!(song_id = %song_id, error = %e, "Media relay failed");
        ApiError::UploadFailed(e.to_string())
    })?;

    let recording = metadata.into_recording(asset.url, asset.duration, Utc::now());

    if let Err(e) = insert_recording(db, &recording).await {
        // The provider holds an asset that no row points at
        error!(
            song_id = %song_id,
            orphaned_remote_url = %recording.url,
            error = %e,
            "Recording insert failed after successful relay"
        );
        return Err(ApiError::store_after_relay(e, recording.url));
    }

    info!(
        recording_id = %recording.id,
        song_id = %song_id,
        duration = recording.duration,
        "Recording stored"
    );
    Ok(recording)
}
