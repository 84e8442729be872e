//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use insight_runner::adapters::{AdapterError, LlmAdapter, SegmentationAdapter};
use insight_runner::codec::VtkImageCodec;
use insight_runner::dispatch::{DispatchTable, ModelId};
use insight_runner::offload::OffloadPool;
use insight_runner::orchestrator::Orchestrator;
use volview_insight_common::{PromptContext, WireImage};

/// What an LLM adapter was called with.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub image: Option<WireImage>,
    pub prompt: Option<String>,
}

/// LLM adapter that answers with a canned string and records its inputs.
pub struct RecordingLlm {
    model: ModelId,
    answer: Result<String, AdapterError>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingLlm {
    pub fn answering(model: ModelId, answer: &str) -> Arc<Self> {
        Arc::new(Self {
            model,
            answer: Ok(answer.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(model: ModelId, error: AdapterError) -> Arc<Self> {
        Arc::new(Self {
            model,
            answer: Err(error),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl LlmAdapter for RecordingLlm {
    fn model(&self) -> ModelId {
        self.model
    }

    fn infer(&self, image: Option<&WireImage>, context: &PromptContext) -> Result<String, AdapterError> {
        self.calls.lock().unwrap().push(RecordedCall {
            image: image.cloned(),
            prompt: context.prompt().map(str::to_string),
        });
        self.answer.clone()
    }
}

/// LLM adapter that panics inside the worker.
pub struct PanickingLlm(pub ModelId);

impl LlmAdapter for PanickingLlm {
    fn model(&self) -> ModelId {
        self.0
    }

    fn infer(&self, _image: Option<&WireImage>, _context: &PromptContext) -> Result<String, AdapterError> {
        panic!("tokenizer exploded");
    }
}

/// Segmenter that thresholds the plane at `threshold` into a 0/1 mask.
pub struct ThresholdSegmenter {
    pub threshold: f32,
    calls: Mutex<Vec<[usize; 3]>>,
}

impl ThresholdSegmenter {
    pub fn new(threshold: f32) -> Arc<Self> {
        Arc::new(Self {
            threshold,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Dimensions of every image this segmenter received.
    pub fn calls(&self) -> Vec<[usize; 3]> {
        self.calls.lock().unwrap().clone()
    }
}

impl SegmentationAdapter for ThresholdSegmenter {
    fn segment(&self, image: &WireImage) -> Result<WireImage, AdapterError> {
        self.calls.lock().unwrap().push(image.dimensions);

        let mut mask = image.clone();
        for value in &mut mask.point_data.values {
            *value = if *value > self.threshold { 1.0 } else { 0.0 };
        }
        Ok(mask)
    }
}

/// Orchestrator over the given adapters with a two-worker pool.
pub fn orchestrator(
    medgemma: Arc<dyn LlmAdapter>,
    clara: Arc<dyn LlmAdapter>,
    segmenter: Arc<dyn SegmentationAdapter>,
) -> Orchestrator {
    let dispatch = DispatchTable::new(vec![medgemma, clara]).expect("complete dispatch table");
    Orchestrator::new(
        Arc::new(dispatch),
        segmenter,
        Arc::new(OffloadPool::new(2).expect("offload pool")),
        Arc::new(VtkImageCodec),
    )
}

/// Orchestrator with canned LLM answers and a threshold segmenter.
pub fn default_orchestrator() -> Orchestrator {
    orchestrator(
        RecordingLlm::answering(ModelId::MedGemma, "No acute findings."),
        RecordingLlm::answering(ModelId::ClaraNvReasonCxr3b, "Right-sided chest tube."),
        ThresholdSegmenter::new(3.0),
    )
}
