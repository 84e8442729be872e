//! Models endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Build the models router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/models", get(list_models))
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    object: &'static str,
    data: Vec<ModelData>,
}

#[derive(Debug, Serialize)]
struct ModelData {
    /// The name the viewer stores as its model selection.
    id: &'static str,
    object: &'static str,
}

/// GET /v1/models - Names accepted as a model selection.
async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let data = state
        .orchestrator
        .dispatch()
        .names()
        .into_iter()
        .map(|id| ModelData { id, object: "model" })
        .collect();

    Json(ModelsResponse { object: "list", data })
}
