//! HTTP API used by the viewer.

pub mod health;
pub mod models;
pub mod sessions;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::logging::request_logger;
use crate::state::AppState;

/// Build the `/v1` API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(models::router())
        .merge(sessions::router())
}

/// The complete application: `/health`, `/v1`, CORS and request logging.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/v1", router())
        .route("/health", get(health::health))
        .layer(middleware::from_fn(request_logger))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
