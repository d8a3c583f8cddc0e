//! Song endpoints

use super::server::AppState;
use super::validation::{
    validate_new_song, validate_song_update, CreateSongRequest, JsonBody, UpdateSongRequest,
};
use crate::db::songs;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bandsync_common::db::{Song, SongWithRecordings};
use tracing::info;

/// GET /songs - every song with recordings and comments attached
pub async fn list_songs(State(state): State<AppState>) -> ApiResult<Json<Vec<SongWithRecordings>>> {
    Ok(Json(songs::list_songs(&state.db).await?))
}

/// GET /songs/:id
pub async fn get_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SongWithRecordings>> {
    Ok(Json(songs::get_song(&state.db, &id).await?))
}

/// POST /songs
pub async fn create_song(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateSongRequest>,
) -> ApiResult<(StatusCode, Json<Song>)> {
    let new_song = validate_new_song(req)?;
    let song = songs::create_song(&state.db, new_song).await?;

    info!(song_id = %song.id, band_id = %song.band_id, "Song created");
    Ok((StatusCode::CREATED, Json(song)))
}

/// PUT /songs/:id
pub async fn update_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateSongRequest>,
) -> ApiResult<Json<Song>> {
    let update = validate_song_update(req)?;
    Ok(Json(songs::update_song(&state.db, &id, update).await?))
}

/// DELETE /songs/:id - cascades to recordings and their comments
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Song>> {
    let song = songs::delete_song(&state.db, &id).await?;

    info!(song_id = %song.id, "Song deleted");
    Ok(Json(song))
}
