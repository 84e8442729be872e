//! N-dimensional image volumes.

use std::fmt;

/// Errors raised while building or slicing volumes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VolumeError {
    #[error("Input image has an invalid dimension: {0} (expected 2 or 3)")]
    InvalidDimension(usize),

    #[error("Slice index {index} is out of range for a volume with {depth} planes")]
    SliceOutOfRange { index: usize, depth: usize },

    #[error("Processed plane has size {actual:?}, expected {expected:?}")]
    PlaneMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Voxel buffer holds {actual} values but the size requires {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Image size {0:?} has more voxels than can be addressed")]
    SizeOverflow(Vec<usize>),

    #[error("Geometry for a {dimension}D volume needs {dimension} values per axis (origin has {origin}, spacing has {spacing})")]
    GeometryMismatch {
        dimension: usize,
        origin: usize,
        spacing: usize,
    },
}

/// Number of voxels in an image of `size`, or `None` if that overflows.
pub fn voxel_count(size: &[usize]) -> Option<usize> {
    size.iter().try_fold(1usize, |count, &n| count.checked_mul(n))
}

/// Smallest and largest finite value, or `None` if there are none.
pub fn finite_range(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// An image buffer with per-axis size, origin and spacing.
///
/// Voxels are stored with the first axis varying fastest, so for a 3D volume
/// the voxel at `(x, y, z)` lives at `x + nx * (y + ny * z)` and every plane
/// along axis 2 is one contiguous run of `nx * ny` values.
#[derive(Clone, PartialEq)]
pub struct Volume {
    size: Vec<usize>,
    origin: Vec<f64>,
    spacing: Vec<f64>,
    data: Vec<f32>,
}

impl Volume {
    /// Create a volume at the physical origin with unit spacing.
    pub fn new(size: Vec<usize>, data: Vec<f32>) -> Result<Self, VolumeError> {
        let expected = voxel_count(&size).ok_or_else(|| VolumeError::SizeOverflow(size.clone()))?;
        if expected != data.len() {
            return Err(VolumeError::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        let dimension = size.len();
        Ok(Self {
            size,
            origin: vec![0.0; dimension],
            spacing: vec![1.0; dimension],
            data,
        })
    }

    /// Create a volume filled with a single value.
    pub fn filled(size: Vec<usize>, value: f32) -> Result<Self, VolumeError> {
        let len = voxel_count(&size).ok_or_else(|| VolumeError::SizeOverflow(size.clone()))?;
        Self::new(size, vec![value; len])
    }

    /// Replace the physical geometry of the volume.
    pub fn with_geometry(mut self, origin: Vec<f64>, spacing: Vec<f64>) -> Result<Self, VolumeError> {
        let dimension = self.dimension();
        if origin.len() != dimension || spacing.len() != dimension {
            return Err(VolumeError::GeometryMismatch {
                dimension,
                origin: origin.len(),
                spacing: spacing.len(),
            });
        }
        self.origin = origin;
        self.spacing = spacing;
        Ok(self)
    }

    pub fn dimension(&self) -> usize {
        self.size.len()
    }

    pub fn size(&self) -> &[usize] {
        &self.size
    }

    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    pub fn spacing(&self) -> &[f64] {
        &self.spacing
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Number of voxels in one plane across the first two axes.
    pub fn plane_len(&self) -> usize {
        self.size.iter().take(2).product()
    }

    /// Number of planes along axis 2 (1 for anything below 3D).
    pub fn depth(&self) -> usize {
        self.size.get(2).copied().unwrap_or(1)
    }

    /// Voxels of the plane at `index` along axis 2.
    pub fn plane(&self, index: usize) -> Option<&[f32]> {
        if index >= self.depth() {
            return None;
        }
        let len = self.plane_len();
        self.data.get(index * len..(index + 1) * len)
    }

    pub(crate) fn plane_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        if index >= self.depth() {
            return None;
        }
        let len = self.plane_len();
        self.data.get_mut(index * len..(index + 1) * len)
    }
}

// Voxel buffers run into the millions; keep debug output to the header.
impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("size", &self.size)
            .field("origin", &self.origin)
            .field("spacing", &self.spacing)
            .field("voxels", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_buffer_length() {
        let err = Volume::new(vec![2, 2, 2], vec![0.0; 7]).unwrap_err();
        assert_eq!(err, VolumeError::BufferSize { expected: 8, actual: 7 });
    }

    #[test]
    fn test_default_geometry() {
        let volume = Volume::new(vec![3, 2], vec![0.0; 6]).unwrap();
        assert_eq!(volume.dimension(), 2);
        assert_eq!(volume.origin(), &[0.0, 0.0]);
        assert_eq!(volume.spacing(), &[1.0, 1.0]);
        assert_eq!(volume.depth(), 1);
    }

    #[test]
    fn test_with_geometry_checks_axes() {
        let volume = Volume::filled(vec![2, 2, 2], 0.0).unwrap();
        let err = volume.with_geometry(vec![0.0, 0.0], vec![1.0, 1.0, 1.0]).unwrap_err();
        assert!(matches!(err, VolumeError::GeometryMismatch { dimension: 3, .. }));
    }

    #[test]
    fn test_plane_is_contiguous_along_axis_two() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let volume = Volume::new(vec![2, 2, 3], data).unwrap();

        assert_eq!(volume.plane_len(), 4);
        assert_eq!(volume.plane(1), Some(&[4.0, 5.0, 6.0, 7.0][..]));
        assert_eq!(volume.plane(3), None);
    }

    #[test]
    fn test_finite_range_skips_nan_and_infinity() {
        assert_eq!(
            finite_range(&[3.0, f32::NAN, -1.0, f32::INFINITY, 7.5]),
            Some((-1.0, 7.5))
        );
        assert_eq!(finite_range(&[f32::NAN]), None);
        assert_eq!(finite_range(&[]), None);
    }

    #[test]
    fn test_overflowing_size_is_rejected() {
        assert_eq!(voxel_count(&[usize::MAX, 2, 1]), None);
        assert_eq!(voxel_count(&[4, 3, 2]), Some(24));

        let err = Volume::new(vec![usize::MAX, 2], vec![]).unwrap_err();
        assert_eq!(err, VolumeError::SizeOverflow(vec![usize::MAX, 2]));
        assert!(Volume::filled(vec![usize::MAX, usize::MAX], 0.0).is_err());
    }
}
