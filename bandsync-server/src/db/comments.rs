//! Comment persistence
//!
//! `timestamp_seconds` is stored as given; it is not compared with the
//! recording's duration.

use bandsync_common::db::Comment;
use bandsync_common::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const COMMENT_COLUMNS: &str = "id, recording_id, text, author_name, timestamp_seconds, created_at";

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub recording_id: String,
    pub text: String,
    pub author_name: String,
    pub timestamp_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentUpdate {
    pub text: Option<String>,
    pub author_name: Option<String>,
}

/// Insert a comment; an unknown recording id is reported as not found
pub async fn create_comment(pool: &SqlitePool, new_comment: NewComment) -> Result<Comment> {
    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        recording_id: new_comment.recording_id,
        text: new_comment.text,
        author_name: new_comment.author_name,
        timestamp_seconds: new_comment.timestamp_seconds,
        created_at: Utc::now(),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO comments (id, recording_id, text, author_name, timestamp_seconds, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&comment.id)
    .bind(&comment.recording_id)
    .bind(&comment.text)
    .bind(&comment.author_name)
    .bind(comment.timestamp_seconds)
    .bind(comment.created_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(comment),
        Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => Err(Error::NotFound(
            format!("recording {}", comment.recording_id),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn update_comment(pool: &SqlitePool, id: &str, update: CommentUpdate) -> Result<Comment> {
    sqlx::query_as::<_, Comment>(&format!(
        r#"
        UPDATE comments
        SET text = COALESCE(?, text),
            author_name = COALESCE(?, author_name)
        WHERE id = ?
        RETURNING {}
        "#,
        COMMENT_COLUMNS
    ))
    .bind(update.text)
    .bind(update.author_name)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("comment {}", id)))
}

pub async fn delete_comment(pool: &SqlitePool, id: &str) -> Result<Comment> {
    sqlx::query_as::<_, Comment>(&format!(
        "DELETE FROM comments WHERE id = ? RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("comment {}", id)))
}

/// Number of comments stored across all recordings
pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
