//! # BandSync Common Library
//!
//! Shared code for the BandSync service:
//! - Domain models (Band, Song, Recording, Comment)
//! - Database initialization and schema
//! - Access token issuing and verification
//! - Configuration loading and validation

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
