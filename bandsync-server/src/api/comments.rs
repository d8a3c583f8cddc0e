//! Comment endpoints

use super::server::AppState;
use super::validation::{
    validate_comment_update, validate_new_comment, CreateCommentRequest, JsonBody,
    UpdateCommentRequest,
};
use crate::db::comments;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bandsync_common::db::Comment;

/// POST /comments
pub async fn create_comment(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let new_comment = validate_new_comment(req)?;
    let comment = comments::create_comment(&state.db, new_comment).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PATCH /comments/:id
pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let update = validate_comment_update(req)?;
    Ok(Json(comments::update_comment(&state.db, &id, update).await?))
}

/// DELETE /comments/:id
pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Comment>> {
    Ok(Json(comments::delete_comment(&state.db, &id).await?))
}
