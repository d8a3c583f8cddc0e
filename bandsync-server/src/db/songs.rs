//! Song persistence
//!
//! Read paths return songs with recordings and comments eagerly attached.

use super::bands::resolve_band;
use bandsync_common::db::{
    Comment, Recording, RecordingWithComments, Song, SongStatus, SongWithRecordings,
};
use bandsync_common::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

const SONG_COLUMNS: &str = "id, title, status, band_id, created_at, updated_at";

/// Validated input for a new song
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub status: Option<SongStatus>,
    pub band_id: String,
}

/// Partial song update; `None` leaves the field unchanged
#[derive(Debug, Clone, Default)]
pub struct SongUpdate {
    pub title: Option<String>,
    pub status: Option<SongStatus>,
}

/// Insert a song, attaching it to an existing or auto-provisioned band
///
/// The band lookup reads before the insert writes, so the transaction takes
/// the write lock at BEGIN. A deferred transaction would fail with
/// SQLITE_BUSY_SNAPSHOT under WAL when another writer commits in between.
pub async fn create_song(pool: &SqlitePool, new_song: NewSong) -> Result<Song> {
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let band = resolve_band(&mut *tx, &new_song.band_id).await?;
    let now = Utc::now();
    let song = Song {
        id: Uuid::new_v4().to_string(),
        title: new_song.title,
        status: new_song.status.unwrap_or_default(),
        band_id: band.id,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO songs (id, title, status, band_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&song.id)
    .bind(&song.title)
    .bind(song.status)
    .bind(&song.band_id)
    .bind(song.created_at)
    .bind(song.updated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(song)
}

/// All songs with their recordings and comments
pub async fn list_songs(pool: &SqlitePool) -> Result<Vec<SongWithRecordings>> {
    let mut tx = pool.begin().await?;

    let songs = sqlx::query_as::<_, Song>(&format!(
        "SELECT {} FROM songs ORDER BY created_at",
        SONG_COLUMNS
    ))
    .fetch_all(&mut *tx)
    .await?;

    let recordings = sqlx::query_as::<_, Recording>(
        r#"
        SELECT id, song_id, url, version_name, category, recorded_at,
               is_final, mime_type, duration, created_at
        FROM recordings
        ORDER BY recorded_at DESC
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    let comments = sqlx::query_as::<_, Comment>(
        r#"
        SELECT id, recording_id, text, author_name, timestamp_seconds, created_at
        FROM comments
        ORDER BY timestamp_seconds, created_at
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(attach_children(songs, recordings, comments))
}

/// One song with its recordings and comments
pub async fn get_song(pool: &SqlitePool, id: &str) -> Result<SongWithRecordings> {
    let mut tx = pool.begin().await?;

    let song = sqlx::query_as::<_, Song>(&format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("song {}", id)))?;

    let recordings = sqlx::query_as::<_, Recording>(
        r#"
        SELECT id, song_id, url, version_name, category, recorded_at,
               is_final, mime_type, duration, created_at
        FROM recordings
        WHERE song_id = ?
        ORDER BY recorded_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let comments = sqlx::query_as::<_, Comment>(
        r#"
        SELECT c.id, c.recording_id, c.text, c.author_name, c.timestamp_seconds, c.created_at
        FROM comments c
        JOIN recordings r ON r.id = c.recording_id
        WHERE r.song_id = ?
        ORDER BY c.timestamp_seconds, c.created_at
        "#,
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    attach_children(vec![song], recordings, comments)
        .pop()
        .ok_or_else(|| Error::NotFound(format!("song {}", id)))
}

/// Apply a partial update
pub async fn update_song(pool: &SqlitePool, id: &str, update: SongUpdate) -> Result<Song> {
    sqlx::query_as::<_, Song>(&format!(
        r#"
        UPDATE songs
        SET title = COALESCE(?, title),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        RETURNING {}
        "#,
        SONG_COLUMNS
    ))
    .bind(update.title)
    .bind(update.status)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("song {}", id)))
}

/// Hard-delete a song; recordings and comments go with it
pub async fn delete_song(pool: &SqlitePool, id: &str) -> Result<Song> {
    sqlx::query_as::<_, Song>(&format!("DELETE FROM songs WHERE id = ? RETURNING {}", SONG_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("song {}", id)))
}

/// Group flat rows into the song -> recording -> comment tree
///
/// Input order is preserved within each parent.
fn attach_children(
    songs: Vec<Song>,
    recordings: Vec<Recording>,
    comments: Vec<Comment>,
) -> Vec<SongWithRecordings> {
    let mut comments_by_recording: HashMap<String, Vec<Comment>> = HashMap::new();
    for comment in comments {
        comments_by_recording
            .entry(comment.recording_id.clone())
            .or_default()
            .push(comment);
    }

    let mut recordings_by_song: HashMap<String, Vec<RecordingWithComments>> = HashMap::new();
    for recording in recordings {
        let comments = comments_by_recording.remove(&recording.id).unwrap_or_default();
        recordings_by_song
            .entry(recording.song_id.clone())
            .or_default()
            .push(RecordingWithComments { recording, comments });
    }

    songs
        .into_iter()
        .map(|song| {
            let recordings = recordings_by_song.remove(&song.id).unwrap_or_default();
            SongWithRecordings { song, recordings }
        })
        .collect()
}
