//! Inference adapters.
//!
//! Adapters are plain blocking calls. They are only ever invoked from inside
//! the offload pool, one call per job, and release everything they allocate
//! (HTTP clients, temp files, child processes) before returning.

mod ollama;
mod prompt;
mod segmentation;

pub use ollama::OllamaLlmAdapter;
pub use prompt::{ChatTurn, PromptPlan};
pub use segmentation::CommandSegmentationAdapter;

use volview_insight_common::{PromptContext, WireImage};

use crate::dispatch::ModelId;

/// Errors raised by adapters while running inside a worker.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    /// A model file the adapter needs is not on disk.
    #[error("Model file not found at '{path}'")]
    MissingArtifact { path: String },

    #[error("{0} requires an image for analysis")]
    ImageRequired(ModelId),

    #[error("Invalid prompt context: {0}")]
    InvalidContext(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("{0}")]
    Backend(String),
}

/// Multimodal question answering over an optional image.
pub trait LlmAdapter: Send + Sync {
    fn model(&self) -> ModelId;

    fn infer(&self, image: Option<&WireImage>, context: &PromptContext) -> Result<String, AdapterError>;
}

/// Lung segmentation of a single 2D image.
pub trait SegmentationAdapter: Send + Sync {
    fn segment(&self, image: &WireImage) -> Result<WireImage, AdapterError>;
}
