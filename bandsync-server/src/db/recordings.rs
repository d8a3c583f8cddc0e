//! Recording persistence
//!
//! Recordings are only inserted by the upload orchestrator, after the media
//! provider has returned a URL. `url`, `song_id` and `duration` never change
//! afterwards.

use bandsync_common::db::{
    Recording, RecordingCategory, DEFAULT_MIME_TYPE, DEFAULT_VERSION_NAME,
};
use bandsync_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

const RECORDING_COLUMNS: &str = "id, song_id, url, version_name, category, recorded_at, \
                                 is_final, mime_type, duration, created_at";

/// Upload metadata supplied by the client (everything except url/duration)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewRecording {
    pub song_id: String,
    pub version_name: Option<String>,
    pub category: Option<RecordingCategory>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub is_final: Option<bool>,
    pub mime_type: Option<String>,
}

impl NewRecording {
    /// Merge relay output into the metadata, applying defaults
    pub fn into_recording(self, url: String, duration: f64, now: DateTime<Utc>) -> Recording {
        Recording {
            id: Uuid::new_v4().to_string(),
            song_id: self.song_id,
            url,
            version_name: self
                .version_name
                .unwrap_or_else(|| DEFAULT_VERSION_NAME.to_string()),
            category: self.category.unwrap_or_default(),
            recorded_at: self.recorded_at.unwrap_or(now),
            is_final: self.is_final.unwrap_or(false),
            mime_type: self.mime_type.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            duration,
            created_at: now,
        }
    }
}

/// Partial recording update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingUpdate {
    pub version_name: Option<String>,
    pub category: Option<RecordingCategory>,
    pub recorded_at: Option<DateTime<Utc>>,
    pub is_final: Option<bool>,
    pub mime_type: Option<String>,
}

/// Single insert of a fully-formed recording
pub async fn insert_recording(pool: &SqlitePool, recording: &Recording) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO recordings (
            id, song_id, url, version_name, category, recorded_at,
            is_final, mime_type, duration, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&recording.id)
    .bind(&recording.song_id)
    .bind(&recording.url)
    .bind(&recording.version_name)
    .bind(recording.category)
    .bind(recording.recorded_at)
    .bind(recording.is_final)
    .bind(&recording.mime_type)
    .bind(recording.duration)
    .bind(recording.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_recording(pool: &SqlitePool, id: &str) -> Result<Recording> {
    sqlx::query_as::<_, Recording>(&format!(
        "SELECT {} FROM recordings WHERE id = ?",
        RECORDING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("recording {}", id)))
}

/// Recordings of one song, newest first
pub async fn list_for_song(pool: &SqlitePool, song_id: &str) -> Result<Vec<Recording>> {
    let song_exists: Option<(String,)> = sqlx::query_as("SELECT id FROM songs WHERE id = ?")
        .bind(song_id)
        .fetch_optional(pool)
        .await?;
    if song_exists.is_none() {
        return Err(Error::NotFound(format!("song {}", song_id)));
    }

    let recordings = sqlx::query_as::<_, Recording>(&format!(
        "SELECT {} FROM recordings WHERE song_id = ? ORDER BY recorded_at DESC",
        RECORDING_COLUMNS
    ))
    .bind(song_id)
    .fetch_all(pool)
    .await?;

    Ok(recordings)
}

pub async fn update_recording(
    pool: &SqlitePool,
    id: &str,
    update: RecordingUpdate,
) -> Result<Recording> {
    sqlx::query_as::<_, Recording>(&format!(
        r#"
        UPDATE recordings
        SET version_name = COALESCE(?, version_name),
            category = COALESCE(?, category),
            recorded_at = COALESCE(?, recorded_at),
            is_final = COALESCE(?, is_final),
            mime_type = COALESCE(?, mime_type)
        WHERE id = ?
        RETURNING {}
        "#,
        RECORDING_COLUMNS
    ))
    .bind(update.version_name)
    .bind(update.category)
    .bind(update.recorded_at)
    .bind(update.is_final)
    .bind(update.mime_type)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("recording {}", id)))
}

/// Hard-delete a recording and its comments
///
/// The provider asset is left in place.
pub async fn delete_recording(pool: &SqlitePool, id: &str) -> Result<Recording> {
    sqlx::query_as::<_, Recording>(&format!(
        "DELETE FROM recordings WHERE id = ? RETURNING {}",
        RECORDING_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("recording {}", id)))
}

/// Number of recordings stored for a song
pub async fn count_for_song(pool: &SqlitePool, song_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recordings WHERE song_id = ?")
        .bind(song_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
