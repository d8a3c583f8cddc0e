//! HTTP server setup and routing

use super::auth_middleware::{AuthLayer, GuardMode};
use super::recordings::upload_body_limit;
use super::{auth, comments, health, recordings, songs};
use crate::services::MediaRelay;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, patch, post, put},
    Router,
};
use bandsync_common::Config;
use sqlx::SqlitePool;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub relay: Arc<dyn MediaRelay>,
}

/// Build the full router
///
/// Route groups carry their own guard:
/// - catalog (songs, recordings): bearer token for everything but GET
/// - comments: open unless `GUARD_COMMENTS` is set
/// - `/auth/verify`: bearer token on every method
/// - `/auth/login`, `/health`: open
pub fn build_router(state: AppState) -> Router {
    let signing_secret = state.config.signing_secret.as_str();
    let mutations_guard = AuthLayer::new(signing_secret, GuardMode::MutationsOnly);
    let body_limit = upload_body_limit(state.config.max_upload_bytes);

    let catalog = Router::new()
        .route("/songs", get(songs::list_songs).post(songs::create_song))
        .route(
            "/songs/:id",
            get(songs::get_song)
                .put(songs::update_song)
                .delete(songs::delete_song),
        )
        .route(
            "/recordings/upload",
            post(recordings::upload_recording).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route(
            "/recordings/:id",
            put(recordings::update_recording).delete(recordings::delete_recording),
        )
        .route("/recordings/song/:song_id", get(recordings::list_for_song))
        .route_layer(mutations_guard.clone());

    let mut comment_routes = Router::new()
        .route("/comments", post(comments::create_comment))
        .route(
            "/comments/:id",
            patch(comments::update_comment).delete(comments::delete_comment),
        );
    if state.config.guard_comments {
        comment_routes = comment_routes.route_layer(mutations_guard);
    }

    let verify = Router::new()
        .route("/auth/verify", get(auth::verify))
        .route_layer(AuthLayer::new(signing_secret, GuardMode::AllMethods));

    let public = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/health", get(health::health));

    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(catalog)
        .merge(comment_routes)
        .merge(verify)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring unusable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

/// Bind the configured port and serve until `shutdown` resolves
pub async fn run(state: AppState, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")?;

    Ok(())
}
