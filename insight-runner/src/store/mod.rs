//! Client-side stores the orchestrators read from and write back to.
//!
//! In the viewer these live on the client and every call is a round trip;
//! the orchestrators only see these async capabilities.

mod memory;

pub use memory::{AnalysisResult, MemoryAnalysisStore, MemoryImageStore};

use std::sync::Arc;

use async_trait::async_trait;
use volview_insight_common::{PromptContext, Volume};

use crate::error::Result;

/// The client's image repository.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Fetch an image by id.
    async fn get(&self, id: &str) -> Result<Volume>;

    /// Add a new image under a display name; returns the id the client assigned.
    async fn put(&self, name: &str, volume: Volume) -> Result<String>;

    /// Replace the data of an existing image.
    async fn update(&self, id: &str, volume: Volume) -> Result<()>;

    /// Whether the client still holds an image with this id.
    async fn exists(&self, id: &str) -> Result<bool>;
}

/// Prompt payloads keyed by patient.
#[async_trait]
pub trait AnalysisInputStore: Send + Sync {
    async fn get(&self, patient_id: &str) -> Result<PromptContext>;
}

/// Analysis answers keyed by patient.
#[async_trait]
pub trait AnalysisResultStore: Send + Sync {
    async fn set(&self, patient_id: &str, result: String) -> Result<()>;
}

/// The model the user picked in the viewer.
#[async_trait]
pub trait ModelSelectionStore: Send + Sync {
    async fn get(&self) -> Result<String>;
}

/// The set of stores one client session exposes.
#[derive(Clone)]
pub struct ClientStores {
    pub images: Arc<dyn ImageStore>,
    pub analysis_inputs: Arc<dyn AnalysisInputStore>,
    pub analysis_results: Arc<dyn AnalysisResultStore>,
    pub model_selection: Arc<dyn ModelSelectionStore>,
}

impl ClientStores {
    /// Stores backed by process memory.
    pub fn in_memory(images: Arc<MemoryImageStore>, analysis: Arc<MemoryAnalysisStore>) -> Self {
        Self {
            images,
            analysis_inputs: analysis.clone(),
            analysis_results: analysis.clone(),
            model_selection: analysis,
        }
    }
}
