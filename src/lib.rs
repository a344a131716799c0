pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod geo;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::Level;

use crate::services::nearby::NearbyStrategy;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub nearby_strategy: NearbyStrategy,
    /// Held while a visit log decides whether to create a location.
    pub placement: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: SqlitePool, nearby_strategy: NearbyStrategy) -> Self {
        Self {
            db,
            nearby_strategy,
            placement: Arc::new(Mutex::new(())),
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Build the full Axum application router.
///
/// Caller is responsible for running database migrations on `state.db`
/// beforehand. This function sets up the session store (and migrates its
/// table), then assembles all route modules, middleware, and state.
pub async fn build_app(state: AppState, secure_cookies: bool) -> Result<Router, sqlx::Error> {
    let session_store = SqliteStore::new(state.db.clone());
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_expiry(Expiry::OnInactivity(Duration::days(30)))
        .with_secure(secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax);

    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::locations::router())
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state);

    Ok(app)
}
