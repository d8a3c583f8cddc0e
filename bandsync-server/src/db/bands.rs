//! Band lookup and auto-provisioning
//!
//! Songs always belong to a band. When a song names a band that does not
//! exist, it is attached to the "Default Band", which is created on first
//! use.

use bandsync_common::db::{Band, DEFAULT_BAND_NAME};
use bandsync_common::Result;
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

/// Band ids clients send when they have no real band yet
const PLACEHOLDER_BAND_IDS: &[&str] = &["default", "placeholder-band-id"];

/// Resolve the band a new song should attach to
///
/// Priority: the requested band if it exists, otherwise the existing default
/// band, otherwise a newly created default band (reusing the requested id
/// unless it is a placeholder).
pub async fn resolve_band(conn: &mut SqliteConnection, requested_id: &str) -> Result<Band> {
    let existing = sqlx::query_as::<_, Band>(
        r#"
        SELECT id, name, created_at
        FROM bands
        WHERE id = ? OR name = ?
        ORDER BY CASE WHEN id = ? THEN 0 ELSE 1 END
        LIMIT 1
        "#,
    )
    .bind(requested_id)
    .bind(DEFAULT_BAND_NAME)
    .bind(requested_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(band) = existing {
        return Ok(band);
    }

    let id = if PLACEHOLDER_BAND_IDS.contains(&requested_id) {
        Uuid::new_v4().to_string()
    } else {
        requested_id.to_string()
    };

    let band = Band {
        id,
        name: DEFAULT_BAND_NAME.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query("INSERT INTO bands (id, name, created_at) VALUES (?, ?, ?)")
        .bind(&band.id)
        .bind(&band.name)
        .bind(band.created_at)
        .execute(&mut *conn)
        .await?;

    info!(band_id = %band.id, "Created default band");
    Ok(band)
}
