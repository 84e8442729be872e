//! In-process store implementations.
//!
//! Used by the HTTP host, where the viewer pushes its data to the runner,
//! and by tests. Nothing here outlives the process.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use volview_insight_common::{PromptContext, Volume};

use super::{AnalysisInputStore, AnalysisResultStore, ImageStore, ModelSelectionStore};
use crate::error::{Error, Result};

struct StoredImage {
    name: String,
    volume: Volume,
}

/// Image repository keyed by image id.
#[derive(Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<String, StoredImage>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an image under an id chosen by the caller, replacing any previous one.
    pub async fn insert(&self, id: &str, volume: Volume) {
        let image = StoredImage {
            name: id.to_string(),
            volume,
        };
        self.images.write().await.insert(id.to_string(), image);
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.images.write().await.remove(id).is_some()
    }

    /// Display name an image was added under.
    pub async fn name(&self, id: &str) -> Option<String> {
        self.images.read().await.get(id).map(|i| i.name.clone())
    }

    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn get(&self, id: &str) -> Result<Volume> {
        self.images
            .read()
            .await
            .get(id)
            .map(|i| i.volume.clone())
            .ok_or_else(|| Error::ImageNotFound(id.to_string()))
    }

    async fn put(&self, name: &str, volume: Volume) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let image = StoredImage {
            name: name.to_string(),
            volume,
        };
        self.images.write().await.insert(id.clone(), image);
        Ok(id)
    }

    async fn update(&self, id: &str, volume: Volume) -> Result<()> {
        let mut images = self.images.write().await;
        let image = images
            .get_mut(id)
            .ok_or_else(|| Error::ImageNotFound(id.to_string()))?;
        image.volume = volume;
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.images.read().await.contains_key(id))
    }
}

/// A finished analysis answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub text: String,
    pub completed_at: DateTime<Utc>,
}

/// Model selection, prompt inputs and analysis results for one client.
#[derive(Default)]
pub struct MemoryAnalysisStore {
    selected_model: RwLock<Option<String>>,
    inputs: RwLock<HashMap<String, PromptContext>>,
    results: RwLock<HashMap<String, AnalysisResult>>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn select_model(&self, model: &str) {
        *self.selected_model.write().await = Some(model.to_string());
    }

    pub async fn set_input(&self, patient_id: &str, context: PromptContext) {
        self.inputs
            .write()
            .await
            .insert(patient_id.to_string(), context);
    }

    pub async fn result(&self, patient_id: &str) -> Option<AnalysisResult> {
        self.results.read().await.get(patient_id).cloned()
    }

    pub async fn result_count(&self) -> usize {
        self.results.read().await.len()
    }
}

#[async_trait]
impl ModelSelectionStore for MemoryAnalysisStore {
    async fn get(&self) -> Result<String> {
        self.selected_model
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Store("No model has been selected".to_string()))
    }
}

#[async_trait]
impl AnalysisInputStore for MemoryAnalysisStore {
    async fn get(&self, patient_id: &str) -> Result<PromptContext> {
        self.inputs
            .read()
            .await
            .get(patient_id)
            .cloned()
            .ok_or_else(|| Error::Store(format!("No analysis input for patient {}", patient_id)))
    }
}

#[async_trait]
impl AnalysisResultStore for MemoryAnalysisStore {
    async fn set(&self, patient_id: &str, result: String) -> Result<()> {
        let result = AnalysisResult {
            text: result,
            completed_at: Utc::now(),
        };
        self.results
            .write()
            .await
            .insert(patient_id.to_string(), result);
        Ok(())
    }
}
