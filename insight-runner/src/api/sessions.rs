//! Client sessions and the orchestrated operations run inside them.
//!
//! A remote viewer keeps its images and analysis data in these session
//! stores; the two orchestrated endpoints read from and write back to them
//! exactly as they would to a live client.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use volview_insight_common::{PromptContext, WireImage};

use crate::error::{Error, Result};
use crate::orchestrator::{AnalysisRequest, SegmentationOutcome, SegmentationRequest};
use crate::state::AppState;
use crate::store::{AnalysisResult, ImageStore};

/// Build the sessions router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:session_id", delete(delete_session))
        .route(
            "/sessions/:session_id/images/:image_id",
            put(put_image).get(get_image),
        )
        .route("/sessions/:session_id/selected-model", put(select_model))
        .route(
            "/sessions/:session_id/analysis-input/:patient_id",
            put(put_analysis_input),
        )
        .route(
            "/sessions/:session_id/analysis-result/:patient_id",
            axum::routing::get(get_analysis_result),
        )
        .route(
            "/sessions/:session_id/multimodal-analysis",
            post(multimodal_analysis),
        )
        .route("/sessions/:session_id/segment-lungs", post(segment_lungs))
}

#[derive(Debug, Serialize)]
struct SessionCreated {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ModelSelection {
    model: String,
}

#[derive(Debug, Serialize)]
struct AnalysisResponse {
    patient_id: String,
    result: String,
}

/// POST /v1/sessions
async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionCreated>) {
    let hosted = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: hosted.session.id().to_string(),
        }),
    )
}

/// DELETE /v1/sessions/:session_id
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode> {
    state.sessions.remove(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/sessions/:session_id/images/:image_id
async fn put_image(
    State(state): State<Arc<AppState>>,
    Path((session_id, image_id)): Path<(String, String)>,
    Json(image): Json<WireImage>,
) -> Result<StatusCode> {
    let hosted = state.sessions.get(&session_id).await?;
    let volume = state.orchestrator.codec().decode(image)?;

    tracing::debug!(
        session_id = %session_id,
        image_id = %image_id,
        size = ?volume.size(),
        "Image uploaded"
    );
    hosted.images.insert(&image_id, volume).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/sessions/:session_id/images/:image_id
async fn get_image(
    State(state): State<Arc<AppState>>,
    Path((session_id, image_id)): Path<(String, String)>,
) -> Result<Json<WireImage>> {
    let hosted = state.sessions.get(&session_id).await?;
    let volume = hosted.images.get(&image_id).await?;
    Ok(Json(state.orchestrator.codec().encode(&volume)?))
}

/// PUT /v1/sessions/:session_id/selected-model
///
/// Any name is accepted; unknown names fail when an analysis runs.
async fn select_model(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(selection): Json<ModelSelection>,
) -> Result<StatusCode> {
    let hosted = state.sessions.get(&session_id).await?;
    hosted.analysis.select_model(&selection.model).await;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/sessions/:session_id/analysis-input/:patient_id
async fn put_analysis_input(
    State(state): State<Arc<AppState>>,
    Path((session_id, patient_id)): Path<(String, String)>,
    Json(context): Json<PromptContext>,
) -> Result<StatusCode> {
    let hosted = state.sessions.get(&session_id).await?;
    hosted.analysis.set_input(&patient_id, context).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/sessions/:session_id/analysis-result/:patient_id
async fn get_analysis_result(
    State(state): State<Arc<AppState>>,
    Path((session_id, patient_id)): Path<(String, String)>,
) -> Result<Json<AnalysisResult>> {
    let hosted = state.sessions.get(&session_id).await?;
    hosted
        .analysis
        .result(&patient_id)
        .await
        .map(Json)
        .ok_or(Error::ResultNotFound(patient_id))
}

/// POST /v1/sessions/:session_id/multimodal-analysis
async fn multimodal_analysis(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>> {
    let hosted = state.sessions.get(&session_id).await?;
    let result = state
        .orchestrator
        .multimodal_analysis(&hosted.session, &request)
        .await?;

    Ok(Json(AnalysisResponse {
        patient_id: request.patient_id,
        result,
    }))
}

/// POST /v1/sessions/:session_id/segment-lungs
async fn segment_lungs(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<SegmentationRequest>,
) -> Result<Json<SegmentationOutcome>> {
    let hosted = state.sessions.get(&session_id).await?;
    let outcome = state
        .orchestrator
        .segment_lungs(&hosted.session, &request)
        .await?;
    Ok(Json(outcome))
}
