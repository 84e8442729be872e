//! Conversion between volumes and the wire format.

use volview_insight_common::{PointData, Volume, WireImage};

use crate::error::{Error, Result};

/// Converts volumes to and from what travels to the client and to workers.
pub trait ImageCodec: Send + Sync {
    fn encode(&self, volume: &Volume) -> Result<WireImage>;

    fn decode(&self, image: WireImage) -> Result<Volume>;
}

/// vtk.js-style image data.
///
/// Encoding pads to three axes with unit size, zero origin and unit spacing.
/// Decoding drops a trailing unit axis, so a single plane comes back 2D.
#[derive(Debug, Clone, Copy, Default)]
pub struct VtkImageCodec;

impl ImageCodec for VtkImageCodec {
    fn encode(&self, volume: &Volume) -> Result<WireImage> {
        let dimension = volume.dimension();
        if dimension == 0 || dimension > 3 {
            return Err(Error::Codec(format!(
                "cannot encode a {}D volume",
                dimension
            )));
        }

        let mut dimensions = [1usize; 3];
        let mut origin = [0.0f64; 3];
        let mut spacing = [1.0f64; 3];
        for axis in 0..dimension {
            dimensions[axis] = volume.size()[axis];
            origin[axis] = volume.origin()[axis];
            spacing[axis] = volume.spacing()[axis];
        }

        Ok(WireImage {
            dimensions,
            origin,
            spacing,
            point_data: PointData {
                number_of_components: 1,
                values: volume.data().to_vec(),
            },
        })
    }

    fn decode(&self, image: WireImage) -> Result<Volume> {
        if image.point_data.number_of_components != 1 {
            return Err(Error::Codec(format!(
                "expected scalar images, got {} components",
                image.point_data.number_of_components
            )));
        }

        let axes = if image.dimensions[2] == 1 { 2 } else { 3 };
        let volume = Volume::new(image.dimensions[..axes].to_vec(), image.point_data.values)
            .and_then(|v| v.with_geometry(image.origin[..axes].to_vec(), image.spacing[..axes].to_vec()))
            .map_err(|e| Error::Codec(e.to_string()))?;

        Ok(volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pads_2d() {
        let volume = Volume::new(vec![2, 3], vec![0.0; 6])
            .unwrap()
            .with_geometry(vec![4.0, 5.0], vec![0.5, 0.5])
            .unwrap();

        let wire = VtkImageCodec.encode(&volume).unwrap();
        assert_eq!(wire.dimensions, [2, 3, 1]);
        assert_eq!(wire.origin, [4.0, 5.0, 0.0]);
        assert_eq!(wire.spacing, [0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_plane_decodes_as_2d() {
        let volume = Volume::filled(vec![3, 3], 2.0).unwrap();
        let decoded = VtkImageCodec
            .decode(VtkImageCodec.encode(&volume).unwrap())
            .unwrap();
        assert_eq!(decoded, volume);
    }

    #[test]
    fn test_3d_keeps_all_axes() {
        let volume = Volume::filled(vec![2, 2, 5], 1.0).unwrap()
            .with_geometry(vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 2.5])
            .unwrap();
        let decoded = VtkImageCodec
            .decode(VtkImageCodec.encode(&volume).unwrap())
            .unwrap();
        assert_eq!(decoded, volume);
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        let mut wire = VtkImageCodec.encode(&Volume::filled(vec![2, 2], 0.0).unwrap()).unwrap();
        wire.point_data.values.pop();
        assert!(matches!(VtkImageCodec.decode(wire), Err(Error::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_vector_images() {
        let mut wire = VtkImageCodec.encode(&Volume::filled(vec![1, 1], 0.0).unwrap()).unwrap();
        wire.point_data.number_of_components = 3;
        assert!(matches!(VtkImageCodec.decode(wire), Err(Error::Codec(_))));
    }

    #[test]
    fn test_encode_rejects_4d() {
        let volume = Volume::filled(vec![1, 1, 1, 2], 0.0).unwrap();
        assert!(matches!(VtkImageCodec.encode(&volume), Err(Error::Codec(_))));
    }

    #[test]
    fn test_decode_rejects_overflowing_dimensions() {
        let wire = WireImage {
            dimensions: [usize::MAX, 2, 1],
            origin: [0.0; 3],
            spacing: [1.0; 3],
            point_data: PointData {
                number_of_components: 1,
                values: vec![],
            },
        };
        match VtkImageCodec.decode(wire) {
            Err(Error::Codec(message)) => assert!(message.contains("more voxels than can be addressed")),
            other => panic!("Expected Codec error, got {:?}", other),
        }
    }
}
