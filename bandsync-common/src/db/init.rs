//! Database initialization
//!
//! Opens (creating if needed) the SQLite database named by `DATABASE_URL` and
//! creates the catalog schema. Schema creation is idempotent.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open the database pool and create tables if needed
///
/// In-memory URLs get a single, never-recycled connection so every query
/// sees the same database.
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| Error::Config(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?
    };

    init_schema(&pool).await?;
    info!("Database ready: {}", database_url);

    Ok(pool)
}

/// Create all catalog tables (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_bands_table(pool).await?;
    create_songs_table(pool).await?;
    create_recordings_table(pool).await?;
    create_comments_table(pool).await?;
    Ok(())
}

async fn create_bands_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bands (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL CHECK (length(title) > 0),
            status TEXT NOT NULL DEFAULT 'IDEA'
                CHECK (status IN ('IDEA', 'RECORDED', 'PUBLISHED')),
            band_id TEXT NOT NULL REFERENCES bands(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_band ON songs(band_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_recordings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recordings (
            id TEXT PRIMARY KEY,
            song_id TEXT NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            version_name TEXT NOT NULL DEFAULT 'Take 1',
            category TEXT NOT NULL DEFAULT 'REHEARSAL'
                CHECK (category IN ('REHEARSAL', 'STUDIO', 'LIVE', 'DEMO')),
            recorded_at TEXT NOT NULL,
            is_final INTEGER NOT NULL DEFAULT 0,
            mime_type TEXT NOT NULL DEFAULT 'audio/mpeg',
            duration REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_recordings_song ON recordings(song_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            recording_id TEXT NOT NULL REFERENCES recordings(id) ON DELETE CASCADE,
            text TEXT NOT NULL CHECK (length(text) > 0),
            author_name TEXT NOT NULL CHECK (length(author_name) > 0),
            timestamp_seconds REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_recording ON comments(recording_id)")
        .execute(pool)
        .await?;

    Ok(())
}
