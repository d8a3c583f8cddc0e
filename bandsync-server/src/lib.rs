//! bandsync-server library
//!
//! Song catalog, recording uploads relayed to a cloud media provider, and
//! timestamped comments, behind a single admin bearer token.
//!
//! Exposed as a library so integration tests can build the router directly.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use api::{build_router, AppState};
pub use error::{ApiError, ApiResult};
