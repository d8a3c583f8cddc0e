//! Service configuration
//!
//! All settings come from the process environment (or equivalent command-line
//! flags) and are read exactly once at startup. The resulting [`Config`] is
//! immutable and shared by reference with every component that needs it.

use crate::{Error, Result};
use clap::{ArgAction, Parser};
use sqlx::sqlite::SqliteConnectOptions;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Minimum accepted length of the token signing secret
pub const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Immutable service configuration
#[derive(Parser, Clone)]
#[command(name = "bandsync-server")]
#[command(about = "Band song catalog with recording uploads and timestamped comments")]
#[command(version)]
pub struct Config {
    /// SQLite connection string (e.g. sqlite://bandsync.db)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Media provider account (cloud) name
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    pub cloud_name: String,

    /// Media provider API key
    #[arg(long, env = "CLOUDINARY_API_KEY")]
    pub cloud_api_key: String,

    /// Media provider API secret
    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub cloud_api_secret: String,

    /// Admin username accepted by /auth/login
    #[arg(long, env = "ADMIN_USER")]
    pub admin_user: String,

    /// Admin password accepted by /auth/login
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    /// Secret used to sign access tokens (at least 32 characters)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub signing_secret: String,

    /// Comma-separated list of origins allowed by CORS
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',', required = true)]
    pub allowed_origins: Vec<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// Directory where uploads are staged before relay
    #[arg(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// Largest accepted recording file, in bytes (default 100MB)
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "104857600")]
    pub max_upload_bytes: usize,

    /// Timeout for a single media provider upload, in seconds
    #[arg(long, env = "RELAY_TIMEOUT_SECS", default_value = "600")]
    pub relay_timeout_secs: u64,

    /// Require a bearer token for comment mutations
    #[arg(long, env = "GUARD_COMMENTS", default_value = "false", action = ArgAction::Set)]
    pub guard_comments: bool,
}

impl Config {
    /// Parse configuration from the environment and validate it
    ///
    /// Missing variables terminate the process with clap's diagnostic.
    /// Present-but-malformed values are reported as [`Error::Config`].
    pub fn load() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Parse from an explicit argument list (program name first)
    pub fn try_load_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let config = Self::try_parse_from(args).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value for shape, naming the offending variable on failure
    pub fn validate(&self) -> Result<()> {
        if !self.database_url.starts_with("sqlite:") {
            return Err(Error::Config(
                "DATABASE_URL must use the sqlite: scheme".to_string(),
            ));
        }
        SqliteConnectOptions::from_str(&self.database_url).map_err(|e| {
            Error::Config(format!("DATABASE_URL is not a valid SQLite URL: {}", e))
        })?;

        let required = [
            ("CLOUDINARY_CLOUD_NAME", &self.cloud_name),
            ("CLOUDINARY_API_KEY", &self.cloud_api_key),
            ("CLOUDINARY_API_SECRET", &self.cloud_api_secret),
            ("ADMIN_USER", &self.admin_user),
            ("ADMIN_PASSWORD", &self.admin_password),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", name)));
            }
        }

        if self.signing_secret.len() < MIN_SIGNING_SECRET_LEN {
            return Err(Error::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SIGNING_SECRET_LEN
            )));
        }

        if self.allowed_origins.is_empty() {
            return Err(Error::Config("ALLOWED_ORIGINS must list at least one origin".to_string()));
        }
        for origin in &self.allowed_origins {
            let origin = origin.trim();
            let has_scheme = origin.starts_with("http://") || origin.starts_with("https://");
            if !has_scheme || origin.ends_with('/') {
                return Err(Error::Config(format!(
                    "ALLOWED_ORIGINS entry '{}' must look like scheme://host[:port]",
                    origin
                )));
            }
        }

        if self.max_upload_bytes == 0 {
            return Err(Error::Config("MAX_UPLOAD_BYTES must be greater than 0".to_string()));
        }

        if self.relay_timeout_secs == 0 {
            return Err(Error::Config("RELAY_TIMEOUT_SECS must be greater than 0".to_string()));
        }

        Ok(())
    }
}

// Secrets stay out of logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("cloud_name", &self.cloud_name)
            .field("cloud_api_key", &self.cloud_api_key)
            .field("cloud_api_secret", &"<redacted>")
            .field("admin_user", &self.admin_user)
            .field("admin_password", &"<redacted>")
            .field("signing_secret", &"<redacted>")
            .field("allowed_origins", &self.allowed_origins)
            .field("port", &self.port)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("relay_timeout_secs", &self.relay_timeout_secs)
            .field("guard_comments", &self.guard_comments)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<String> {
        [
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
            "admin",
            "--admin-password",
            "pw",
            "--signing-secret",
            "0123456789abcdef0123456789abcdef",
            "--allowed-origins",
            "http://localhost:3000,https://band.example",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_valid_config_parses_with_defaults() {
        let config = Config::try_load_from(base_args()).expect("config should parse");
        assert_eq!(config.port, 3001);
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert!(!config.guard_comments);
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_zero_upload_limit_rejected() {
        let mut args = base_args();
        args.extend(["--max-upload-bytes".to_string(), "0".to_string()]);

        let err = Config::try_load_from(args).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_BYTES"));
    }

    #[test]
    fn test_short_signing_secret_rejected() {
        let mut args = base_args();
        let idx = args.iter().position(|a| a == "--signing-secret").unwrap();
        args[idx + 1] = "too-short".to_string();

        let err = Config::try_load_from(args).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_malformed_origin_rejected() {
        let mut args = base_args();
        let idx = args.iter().position(|a| a == "--allowed-origins").unwrap();
        args[idx + 1] = "localhost:3000".to_string();

        let err = Config::try_load_from(args).unwrap_err();
        assert!(err.to_string().contains("ALLOWED_ORIGINS"));
    }

    #[test]
    fn test_malformed_database_url_rejected() {
        let mut args = base_args();
        let idx = args.iter().position(|a| a == "--database-url").unwrap();
        args[idx + 1] = "postgres://nope".to_string();

        let err = Config::try_load_from(args).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::try_load_from(base_args()).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(rendered.contains("<redacted>"));
    }
}
