//! Request orchestration.
//!
//! Each orchestrated request runs end to end on the async side: store reads,
//! plane extraction and registry updates happen inline, and the model call is
//! the only thing handed to the offload pool. Results are written back only
//! after everything before them succeeded, and nothing is retried.

mod analysis;
mod segmentation;

pub use analysis::AnalysisRequest;
pub use segmentation::{SegmentationOutcome, SegmentationRequest};

use std::sync::Arc;

use crate::adapters::{AdapterError, SegmentationAdapter};
use crate::codec::ImageCodec;
use crate::dispatch::DispatchTable;
use crate::error::Error;
use crate::offload::{OffloadError, OffloadPool};

/// Composes dispatch, slicing, offloading and the session registry.
pub struct Orchestrator {
    dispatch: Arc<DispatchTable>,
    segmenter: Arc<dyn SegmentationAdapter>,
    pool: Arc<OffloadPool>,
    codec: Arc<dyn ImageCodec>,
}

impl Orchestrator {
    pub fn new(
        dispatch: Arc<DispatchTable>,
        segmenter: Arc<dyn SegmentationAdapter>,
        pool: Arc<OffloadPool>,
        codec: Arc<dyn ImageCodec>,
    ) -> Self {
        Self {
            dispatch,
            segmenter,
            pool,
            codec,
        }
    }

    pub fn dispatch(&self) -> &DispatchTable {
        &self.dispatch
    }

    pub fn pool(&self) -> &OffloadPool {
        &self.pool
    }

    pub fn codec(&self) -> &dyn ImageCodec {
        self.codec.as_ref()
    }
}

fn offload_failure(err: OffloadError) -> Error {
    Error::InferenceFailure(err.to_string())
}

fn adapter_failure(err: AdapterError) -> Error {
    match err {
        AdapterError::MissingArtifact { path } => Error::MissingArtifact { path },
        other => Error::InferenceFailure(other.to_string()),
    }
}
