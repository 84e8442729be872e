//! Multimodal LLM adapter backed by an Ollama-compatible chat endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use volview_insight_common::{PromptContext, WireImage};

use super::prompt::{encode_png_base64, PromptPlan};
use super::{AdapterError, LlmAdapter};
use crate::dispatch::ModelId;

/// Runs one dispatchable model through Ollama's `/api/chat`.
///
/// Calls are blocking and must run on an offload worker, never on a runtime
/// thread. The HTTP client lives only for the duration of a call.
pub struct OllamaLlmAdapter {
    model: ModelId,
    engine_model: String,
    base_url: String,
    timeout: Duration,
}

impl OllamaLlmAdapter {
    pub fn new(model: ModelId, base_url: &str, engine_model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model,
            engine_model: engine_model.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

// ============================================================================
// Ollama API types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    /// Base64-encoded images attached to this message.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// LlmAdapter implementation
// ============================================================================

impl LlmAdapter for OllamaLlmAdapter {
    fn model(&self) -> ModelId {
        self.model
    }

    fn infer(&self, image: Option<&WireImage>, context: &PromptContext) -> Result<String, AdapterError> {
        let plan = PromptPlan::for_model(self.model, context, image.is_some())?;
        let encoded = image.map(encode_png_base64).transpose()?;

        let messages = plan
            .turns
            .into_iter()
            .map(|turn| OllamaMessage {
                role: turn.role.to_string(),
                content: turn.text,
                images: if turn.with_image {
                    encoded.iter().cloned().collect()
                } else {
                    Vec::new()
                },
            })
            .collect();

        let request = OllamaChatRequest {
            model: self.engine_model.clone(),
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: 0.0,
                num_predict: plan.max_new_tokens,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!(
            model = %self.model,
            engine_model = %self.engine_model,
            with_image = encoded.is_some(),
            "Sending chat request to {}",
            url
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AdapterError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        let response = client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| AdapterError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AdapterError::Backend(format!("{}: {}", status, body)));
        }

        let chat: OllamaChatResponse = response
            .json()
            .map_err(|e| AdapterError::Backend(e.to_string()))?;

        tracing::debug!(
            model = %self.model,
            tokens = chat.eval_count.unwrap_or_default(),
            "Chat response received"
        );

        Ok(chat.message.content.unwrap_or_default())
    }
}
