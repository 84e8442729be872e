//! Error types for the insight runner.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use volview_insight_common::VolumeError;

/// Errors surfaced by orchestrators and the HTTP layer.
///
/// Orchestrators never retry; each request ends in exactly one of these or a
/// written result.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Volume(#[from] VolumeError),

    #[error("Unknown model specified: '{name}'. Available models: {available:?}")]
    UnknownModel { name: String, available: Vec<String> },

    #[error("missing model file '{path}'. Please ensure that the model has been downloaded and placed in the correct location")]
    MissingArtifact { path: String },

    #[error("Inference failed: {0}")]
    InferenceFailure(String),

    #[error("Unexpected error during {model} inference: {source}")]
    Analysis {
        model: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Lung segmentation failed: {source}")]
    Segmentation {
        #[source]
        source: Box<Error>,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Image conversion failed: {0}")]
    Codec(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),

    #[error("No analysis result for patient: {0}")]
    ResultNotFound(String),
}

impl Error {
    /// The innermost error, looking through orchestration wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Analysis { source, .. } | Error::Segmentation { source } => source.root(),
            other => other,
        }
    }

    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Volume(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_volume"),
            Error::UnknownModel { .. } => (StatusCode::BAD_REQUEST, "unknown_model"),
            Error::MissingArtifact { .. } => (StatusCode::SERVICE_UNAVAILABLE, "missing_artifact"),
            Error::InferenceFailure(_) => (StatusCode::INTERNAL_SERVER_ERROR, "inference_failed"),
            Error::Analysis { source, .. } | Error::Segmentation { source } => source.status(),
            Error::Store(_) => (StatusCode::BAD_GATEWAY, "store_error"),
            Error::Codec(_) => (StatusCode::UNPROCESSABLE_ENTITY, "codec_error"),
            Error::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            Error::ImageNotFound(_) => (StatusCode::NOT_FOUND, "image_not_found"),
            Error::ResultNotFound(_) => (StatusCode::NOT_FOUND, "result_not_found"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status();

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
