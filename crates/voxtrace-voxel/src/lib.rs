//! Voxel storage for the voxtrace ray marcher.
//!
//! - [`codec`]: the four-word compressed voxel record and its decoded form
//! - [`occupancy`]: per-chunk 512-bit occupancy masks with rank/select

pub mod codec;
pub mod occupancy;

pub use codec::{CompressedVoxel, Voxel};
pub use occupancy::Chunk;
