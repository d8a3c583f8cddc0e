//! Entity store for songs, recordings and comments
//!
//! Thin query layer over the shared SQLite pool. Every function returns
//! `bandsync_common::Result` so callers decide how to surface failures.

pub mod bands;
pub mod comments;
pub mod recordings;
pub mod songs;
