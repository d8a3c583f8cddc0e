//! Domain models shared by the store and the HTTP layer
//!
//! Ownership forms a strict tree: Band -> Song -> Recording -> Comment.
//! JSON uses camelCase field names; enum values are SCREAMING_CASE strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version name used when an upload does not supply one
pub const DEFAULT_VERSION_NAME: &str = "Take 1";

/// MIME type used when an upload does not supply one
pub const DEFAULT_MIME_TYPE: &str = "audio/mpeg";

/// Name of the band auto-provisioned for new songs
pub const DEFAULT_BAND_NAME: &str = "Default Band";

/// Lifecycle of a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SongStatus {
    #[default]
    Idea,
    Recorded,
    Published,
}

impl SongStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SongStatus::Idea => "IDEA",
            SongStatus::Recorded => "RECORDED",
            SongStatus::Published => "PUBLISHED",
        }
    }
}

impl FromStr for SongStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDEA" => Ok(SongStatus::Idea),
            "RECORDED" => Ok(SongStatus::Recorded),
            "PUBLISHED" => Ok(SongStatus::Published),
            other => Err(format!(
                "unknown song status '{}' (expected IDEA, RECORDED or PUBLISHED)",
                other
            )),
        }
    }
}

impl fmt::Display for SongStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context a recording was captured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingCategory {
    #[default]
    Rehearsal,
    Studio,
    Live,
    Demo,
}

impl RecordingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingCategory::Rehearsal => "REHEARSAL",
            RecordingCategory::Studio => "STUDIO",
            RecordingCategory::Live => "LIVE",
            RecordingCategory::Demo => "DEMO",
        }
    }
}

impl FromStr for RecordingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REHEARSAL" => Ok(RecordingCategory::Rehearsal),
            "STUDIO" => Ok(RecordingCategory::Studio),
            "LIVE" => Ok(RecordingCategory::Live),
            "DEMO" => Ok(RecordingCategory::Demo),
            other => Err(format!(
                "unknown recording category '{}' (expected REHEARSAL, STUDIO, LIVE or DEMO)",
                other
            )),
        }
    }
}

impl fmt::Display for RecordingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    pub status: SongStatus,
    pub band_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored recording
///
/// `url` points into the media provider and is only ever written once, after
/// the provider accepted the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    pub song_id: String,
    pub url: String,
    pub version_name: String,
    pub category: RecordingCategory,
    pub recorded_at: DateTime<Utc>,
    pub is_final: bool,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Seconds, as reported by the media provider (0 when unknown)
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub recording_id: String,
    pub text: String,
    pub author_name: String,
    /// Offset into the recording; not checked against its duration
    pub timestamp_seconds: f64,
    pub created_at: DateTime<Utc>,
}

/// Recording with its comments attached (read paths)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingWithComments {
    #[serde(flatten)]
    pub recording: Recording,
    pub comments: Vec<Comment>,
}

/// Song with its recordings and their comments attached (read paths)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongWithRecordings {
    #[serde(flatten)]
    pub song: Song,
    pub recordings: Vec<RecordingWithComments>,
}
