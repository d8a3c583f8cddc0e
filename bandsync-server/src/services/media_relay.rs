//! Media relay: hands staged files to the remote media provider
//!
//! The provider stores the asset, detects its format, and reports a public
//! URL and duration. Every failure (network, rejection, unreadable reply)
//! surfaces as a [`RelayError`]; the orchestrator folds them all into
//! `UPLOAD_FAILED`.
//!
//! The relay deletes the local file it was given on every exit path. Callers
//! may still release their own guard; a second delete is a no-op.

use async_trait::async_trait;
use bandsync_common::Config;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

const CLOUDINARY_BASE_URL: &str = "https://api.cloudinary.com";
const UPLOAD_FOLDER: &str = "band-sync/recordings";
const USER_AGENT: &str = concat!("bandsync/", env!("CARGO_PKG_VERSION"));

/// Provider result for a stored asset
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedAsset {
    /// Public (https) URL of the stored asset
    pub url: String,
    /// Duration in seconds; 0 when the provider could not determine one
    pub duration: f64,
}

/// Media relay errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider timed out")]
    Timeout,

    #[error("Provider rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unreadable provider response: {0}")]
    Parse(String),

    #[error("Staged file unreadable: {0}")]
    Io(#[from] io::Error),
}

/// Uploads a local file to remote media storage
#[async_trait]
pub trait MediaRelay: Send + Sync {
    /// Store the file at `local_path` remotely and delete the local copy
    async fn upload(&self, local_path: &Path) -> Result<RelayedAsset, RelayError>;
}

/// Cloudinary upload API client
///
/// Uploads go to the `video` resource type, which also covers audio
/// containers.
pub struct CloudinaryRelay {
    http_client: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryRelay {
    pub fn new(config: &Config) -> Result<Self, RelayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.relay_timeout_secs))
            .build()
            .map_err(|e| RelayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: CLOUDINARY_BASE_URL.to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.cloud_api_key.clone(),
            api_secret: config.cloud_api_secret.clone(),
        })
    }

    /// Point the client at a different API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn upload_endpoint(&self) -> String {
        format!("{}/v1_1/{}/video/upload", self.base_url, self.cloud_name)
    }

    async fn send(&self, local_path: &Path) -> Result<RelayedAsset, RelayError> {
        // Streamed from disk; the staged file is never held in memory whole
        let file = tokio::fs::File::open(local_path).await?;
        let len = file.metadata().await?.len();
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", UPLOAD_FOLDER), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", UPLOAD_FOLDER)
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part(
                "file",
                Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
                    .file_name(file_name),
            );

        debug!(endpoint = %self.upload_endpoint(), "Sending upload to media provider");

        let response = self
            .http_client
            .post(self.upload_endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Timeout
                } else {
                    RelayError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RelayError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|r| r.error.message)
                .unwrap_or(body);
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|e| RelayError::Parse(e.to_string()))?;

        info!(url = %parsed.secure_url, duration = ?parsed.duration, "Media provider stored asset");

        Ok(RelayedAsset {
            url: parsed.secure_url,
            duration: parsed.duration.unwrap_or(0.0),
        })
    }
}

#[async_trait]
impl MediaRelay for CloudinaryRelay {
    async fn upload(&self, local_path: &Path) -> Result<RelayedAsset, RelayError> {
        let result = self.send(local_path).await;

        if let Err(e) = tokio::fs::remove_file(local_path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %local_path.display(), error = %e, "Relay could not remove staged file");
            }
        }

        result
    }
}

/// Request signature: SHA-256 hex of `k1=v1&k2=v2...` (keys sorted) + secret
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(k, _)| *k);

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
