//! Plane extraction and pasting for 2D-only models.
//!
//! Axis 2 is always the through-plane axis. Extraction is a no-op for 2D
//! volumes and pasting is a no-op unless the original was 3D and a slice
//! index was given, so callers must not assume that a paste produced a 3D
//! container.

use std::borrow::Cow;

use crate::volume::{Volume, VolumeError};

/// Extract the plane at `index` (default 0) along axis 2.
///
/// A 2D volume is returned as-is without copying. A 3D volume yields a 2D
/// volume with the same in-plane size, origin and spacing.
pub fn extract_plane(volume: &Volume, index: Option<usize>) -> Result<Cow<'_, Volume>, VolumeError> {
    match volume.dimension() {
        2 => Ok(Cow::Borrowed(volume)),
        3 => {
            let index = index.unwrap_or(0);
            let plane = volume.plane(index).ok_or(VolumeError::SliceOutOfRange {
                index,
                depth: volume.depth(),
            })?;

            let slice = Volume::new(volume.size()[..2].to_vec(), plane.to_vec())?
                .with_geometry(volume.origin()[..2].to_vec(), volume.spacing()[..2].to_vec())?;
            Ok(Cow::Owned(slice))
        }
        other => Err(VolumeError::InvalidDimension(other)),
    }
}

/// Paste a processed plane back at `index` along axis 2.
///
/// Only a 3D original with an explicit index is pasted into; the result is a
/// copy of the original where just that plane changed. In every other case
/// the processed plane itself is the result.
pub fn paste_plane(volume: &Volume, processed: Volume, index: Option<usize>) -> Result<Volume, VolumeError> {
    let index = match index {
        Some(index) if volume.dimension() == 3 => index,
        _ => return Ok(processed),
    };

    let expected = volume.size()[..2].to_vec();
    if processed.size() != expected.as_slice() {
        return Err(VolumeError::PlaneMismatch {
            expected,
            actual: processed.size().to_vec(),
        });
    }

    let mut pasted = volume.clone();
    let depth = pasted.depth();
    let target = pasted
        .plane_mut(index)
        .ok_or(VolumeError::SliceOutOfRange { index, depth })?;
    target.copy_from_slice(processed.data());

    Ok(pasted)
}
