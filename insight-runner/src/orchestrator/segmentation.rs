//! Lung segmentation with derived-image bookkeeping.

use serde::{Deserialize, Serialize};
use volview_insight_common::{extract_plane, paste_plane, Volume};

use super::{adapter_failure, offload_failure, Orchestrator};
use crate::error::{Error, Result};
use crate::session::ClientSession;

/// One segmentation invocation from the viewer.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationRequest {
    /// Either a base image or a segmentation derived from one.
    pub image_id: String,
    #[serde(default)]
    pub active_layer: Option<usize>,
}

/// Where the segmentation ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentationOutcome {
    pub base_image_id: String,
    pub derived_image_id: String,
    /// `false` when an existing derived image was overwritten.
    pub created: bool,
}

impl Orchestrator {
    /// Segment the lungs in one plane of an image and store the result as
    /// the base image's derived image.
    ///
    /// Re-running on either the base or its derived image always segments
    /// the base and overwrites the same derived image, as long as that image
    /// still exists in the client's store.
    ///
    /// A new derived image is named after the resolved base id
    /// (`"{base_id}_seg"`), not the requested id, so names never stack up.
    pub async fn segment_lungs(
        &self,
        session: &ClientSession,
        request: &SegmentationRequest,
    ) -> Result<SegmentationOutcome> {
        let base_id = session.state().resolve_base(&request.image_id);
        tracing::info!(
            session_id = %session.id(),
            image_id = %request.image_id,
            base_image_id = %base_id,
            active_layer = ?request.active_layer,
            "Starting lung segmentation"
        );

        self.run_segmentation(session, &base_id, request.active_layer)
            .await
            .map_err(|source| {
                tracing::warn!(base_image_id = %base_id, error = %source, "Lung segmentation failed");
                Error::Segmentation {
                    source: Box::new(source),
                }
            })
    }

    async fn run_segmentation(
        &self,
        session: &ClientSession,
        base_id: &str,
        active_layer: Option<usize>,
    ) -> Result<SegmentationOutcome> {
        let images = &session.stores.images;
        let volume = images.get(base_id).await?;
        let segmented = self.segment_volume(&volume, active_layer).await?;

        let previous = session.state().lookup_derived(base_id);
        let reusable = match previous {
            Some(derived_id) => {
                if images.exists(&derived_id).await? {
                    Some(derived_id)
                } else {
                    tracing::debug!(
                        base_image_id = %base_id,
                        derived_image_id = %derived_id,
                        "Derived image was removed by the client"
                    );
                    None
                }
            }
            None => None,
        };

        let outcome = match reusable {
            Some(derived_id) => {
                images.update(&derived_id, segmented).await?;
                SegmentationOutcome {
                    base_image_id: base_id.to_string(),
                    derived_image_id: derived_id,
                    created: false,
                }
            }
            None => {
                let derived_id = images.put(&format!("{}_seg", base_id), segmented).await?;
                session.state().associate(base_id, &derived_id);
                SegmentationOutcome {
                    base_image_id: base_id.to_string(),
                    derived_image_id: derived_id,
                    created: true,
                }
            }
        };

        tracing::info!(
            base_image_id = %outcome.base_image_id,
            derived_image_id = %outcome.derived_image_id,
            created = outcome.created,
            "Lung segmentation stored"
        );
        Ok(outcome)
    }

    async fn segment_volume(&self, volume: &Volume, active_layer: Option<usize>) -> Result<Volume> {
        let input = {
            let plane = extract_plane(volume, active_layer)?;
            self.codec.encode(&plane)?
        };

        let segmenter = self.segmenter.clone();
        let mask = self
            .pool
            .submit(move || segmenter.segment(&input))
            .await
            .map_err(offload_failure)?
            .map_err(adapter_failure)?;

        let processed = self.codec.decode(mask)?;
        Ok(paste_plane(volume, processed, active_layer)?)
    }
}
