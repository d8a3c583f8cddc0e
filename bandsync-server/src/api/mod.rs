//! HTTP API for bandsync-server

pub mod auth;
pub mod auth_middleware;
pub mod comments;
pub mod health;
pub mod recordings;
pub mod server;
pub mod songs;
pub mod validation;

pub use auth_middleware::{AuthLayer, GuardMode};
pub use server::{build_router, run, AppState};
