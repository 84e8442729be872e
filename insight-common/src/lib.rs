//! VolView Insight Common Types
//!
//! Volumes, plane slicing, prompt context and wire images shared by the
//! runner and its tests.

pub mod context;
pub mod slice;
pub mod volume;
pub mod wire;

pub use context::{PromptContext, VitalSign};
pub use slice::{extract_plane, paste_plane};
pub use volume::{finite_range, voxel_count, Volume, VolumeError};
pub use wire::{PointData, WireImage};
