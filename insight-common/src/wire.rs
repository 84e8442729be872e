//! Wire representation of images exchanged with the viewer and with
//! offloaded inference jobs.

use serde::{Deserialize, Serialize};

/// Image data in the shape vtk.js uses for `vtkImageData`.
///
/// Always three axes; 2D images carry a trailing dimension of 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireImage {
    pub dimensions: [usize; 3],
    #[serde(default = "default_origin")]
    pub origin: [f64; 3],
    #[serde(default = "default_spacing")]
    pub spacing: [f64; 3],
    pub point_data: PointData,
}

/// Scalar voxel values, first axis fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointData {
    #[serde(default = "default_components")]
    pub number_of_components: u32,
    pub values: Vec<f32>,
}

impl WireImage {
    /// `None` when the dimensions overflow.
    pub fn voxel_count(&self) -> Option<usize> {
        crate::volume::voxel_count(&self.dimensions)
    }
}

fn default_origin() -> [f64; 3] {
    [0.0; 3]
}

fn default_spacing() -> [f64; 3] {
    [1.0; 3]
}

fn default_components() -> u32 {
    1
}
