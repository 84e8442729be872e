//! Health check endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
    offload: OffloadStatus,
}

#[derive(Debug, Serialize)]
struct OffloadStatus {
    capacity: usize,
    queued: usize,
    running: usize,
}

/// GET /health - Liveness plus offload pool load.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pool = state.orchestrator.pool();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.count().await,
        offload: OffloadStatus {
            capacity: pool.capacity(),
            queued: pool.queued(),
            running: pool.running(),
        },
    })
}
