//! Shared fixtures for router-level integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bandsync_common::api::{admin_claims, issue_token};
use bandsync_common::db::init_database;
use bandsync_common::Config;
use bandsync_server::services::{MediaRelay, RelayError, RelayedAsset};
use bandsync_server::{build_router, AppState};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const SIGNING_SECRET: &str = "test-signing-secret-0123456789abcdef";
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse";
pub const REMOTE_URL: &str = "https://res.cloudinary.com/demo/video/upload/band-sync/recordings/take.mp3";

const BOUNDARY: &str = "bandsync-test-boundary";

/// In-process stand-in for the media provider
///
/// Unlike the real relay it leaves the staged file in place, so tests prove
/// the orchestrator's own cleanup.
pub struct FakeRelay {
    outcome: Result<f64, String>,
    calls: AtomicUsize,
    saw_staged_file: AtomicUsize,
}

impl FakeRelay {
    pub fn succeeding(duration: f64) -> Self {
        Self {
            outcome: Ok(duration),
            calls: AtomicUsize::new(0),
            saw_staged_file: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            saw_staged_file: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn saw_staged_file(&self) -> usize {
        self.saw_staged_file.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaRelay for FakeRelay {
    async fn upload(&self, local_path: &Path) -> Result<RelayedAsset, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if local_path.exists() {
            self.saw_staged_file.fetch_add(1, Ordering::SeqCst);
        }

        match &self.outcome {
            Ok(duration) => Ok(RelayedAsset {
                url: REMOTE_URL.to_string(),
                duration: *duration,
            }),
            Err(message) => Err(RelayError::Rejected {
                status: 400,
                message: message.clone(),
            }),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub relay: Arc<FakeRelay>,
    pub upload_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(FakeRelay::succeeding(132.0), false).await
}

pub async fn spawn_app_with(relay: FakeRelay, guard_comments: bool) -> TestApp {
    spawn_configured(relay, guard_comments, &[]).await
}

/// App whose upload cap is `max_upload_bytes`
pub async fn spawn_app_with_upload_limit(max_upload_bytes: usize) -> TestApp {
    let limit = max_upload_bytes.to_string();
    spawn_configured(
        FakeRelay::succeeding(132.0),
        false,
        &["--max-upload-bytes", limit.as_str()],
    )
    .await
}

async fn spawn_configured(relay: FakeRelay, guard_comments: bool, extra_args: &[&str]) -> TestApp {
    let upload_dir = TempDir::new().expect("temp upload dir");
    let upload_dir_arg = upload_dir.path().to_string_lossy().to_string();
    let guard_arg = guard_comments.to_string();

    let mut args = vec![
        "bandsync-server",
        "--database-url",
        "sqlite::memory:",
        "--cloud-name",
        "demo",
        "--cloud-api-key",
        "key",
        "--cloud-api-secret",
        "secret",
        "--admin-user",
        ADMIN_USER,
        "--admin-password",
        ADMIN_PASSWORD,
        "--signing-secret",
        SIGNING_SECRET,
        "--allowed-origins",
        "http://localhost:3000",
        "--upload-dir",
        upload_dir_arg.as_str(),
        "--guard-comments",
        guard_arg.as_str(),
    ];
    args.extend_from_slice(extra_args);

    let config = Config::try_load_from(args).expect("test config");

    let db = init_database("sqlite::memory:").await.expect("in-memory database");
    let relay = Arc::new(relay);

    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        relay: relay.clone(),
    };

    TestApp {
        router: build_router(state),
        db,
        relay,
        upload_dir,
    }
}

impl TestApp {
    /// Send a request and decode the JSON response body (Null when empty)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.expect("router");
        let status = response.status();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON response body")
        };
        (status, json)
    }

    /// Files currently left in the upload directory
    pub fn staged_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.upload_dir.path())
            .expect("read upload dir")
            .map(|entry| entry.expect("dir entry").path())
            .collect()
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.db)
            .await
            .expect("count rows")
    }

    /// Create a song through the API and return its id
    pub async fn create_song(&self, title: &str) -> String {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/songs",
                Some(&admin_token()),
                serde_json::json!({ "title": title, "bandId": "default" }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create song: {}", body);
        body["id"].as_str().expect("song id").to_string()
    }

    /// Upload a recording through the API and return its JSON
    pub async fn upload(&self, song_id: &str, extra: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut fields = vec![("songId", song_id)];
        fields.extend_from_slice(extra);
        self.send(multipart_upload(
            Some(&admin_token()),
            &fields,
            Some(("take.mp3", b"ID3 fake audio payload")),
        ))
        .await
    }
}

pub fn admin_token() -> String {
    token_signed_with(SIGNING_SECRET, Utc::now().timestamp())
}

pub fn token_signed_with(secret: &str, issued_at: i64) -> String {
    issue_token(&admin_claims(ADMIN_USER, issued_at), secret).expect("sign token")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn authed(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Hand-built multipart/form-data upload request
pub fn multipart_upload(
    token: Option<&str>,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: audio/mpeg\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/recordings/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}
