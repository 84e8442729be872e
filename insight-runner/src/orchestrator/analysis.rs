//! Multimodal LLM analysis.

use std::sync::Arc;

use serde::Deserialize;
use volview_insight_common::extract_plane;

use super::{adapter_failure, offload_failure, Orchestrator};
use crate::adapters::LlmAdapter;
use crate::error::{Error, Result};
use crate::session::ClientSession;

/// One analysis invocation from the viewer.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub patient_id: String,
    /// Image to show the model; without one the model only sees the context.
    #[serde(default)]
    pub image_id: Option<String>,
    /// Plane of a 3D image to use (default 0).
    #[serde(default)]
    pub active_layer: Option<usize>,
}

impl Orchestrator {
    /// Answer the patient's prompt with the model selected in the viewer and
    /// write the answer to the client's result store.
    ///
    /// An unknown model fails before the prompt context or any image is
    /// read. Later failures are reported as [`Error::Analysis`] naming the
    /// model, and leave the result store untouched.
    pub async fn multimodal_analysis(&self, session: &ClientSession, request: &AnalysisRequest) -> Result<String> {
        let selected_model = session.stores.model_selection.get().await?;
        tracing::info!(
            session_id = %session.id(),
            patient_id = %request.patient_id,
            model = %selected_model,
            "Starting multimodal LLM analysis"
        );

        let adapter = self.dispatch.resolve(&selected_model)?;

        self.run_analysis(session, request, adapter)
            .await
            .map_err(|source| {
                tracing::warn!(model = %selected_model, error = %source, "Analysis failed");
                Error::Analysis {
                    model: selected_model.clone(),
                    source: Box::new(source),
                }
            })
    }

    async fn run_analysis(
        &self,
        session: &ClientSession,
        request: &AnalysisRequest,
        adapter: Arc<dyn LlmAdapter>,
    ) -> Result<String> {
        let stores = &session.stores;
        let context = stores.analysis_inputs.get(&request.patient_id).await?;

        let image = match &request.image_id {
            Some(image_id) => {
                let base_id = session.state().resolve_base(image_id);
                let volume = stores.images.get(&base_id).await?;
                tracing::debug!(
                    image_id = %image_id,
                    base_image_id = %base_id,
                    size = ?volume.size(),
                    active_layer = ?request.active_layer,
                    "Preparing image for analysis"
                );
                let plane = extract_plane(&volume, request.active_layer)?;
                Some(self.codec.encode(&plane)?)
            }
            None => {
                tracing::info!(
                    patient_id = %request.patient_id,
                    "No image ID given, proceeding without image"
                );
                None
            }
        };

        let answer = self
            .pool
            .submit(move || adapter.infer(image.as_ref(), &context))
            .await
            .map_err(offload_failure)?
            .map_err(adapter_failure)?;

        stores
            .analysis_results
            .set(&request.patient_id, answer.clone())
            .await?;

        tracing::info!(
            patient_id = %request.patient_id,
            chars = answer.len(),
            "Analysis finished"
        );
        Ok(answer)
    }
}
