//! Core types, math, and traits for the voxtrace ray marcher.
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Coordinate systems (map/chunk cells, chunk-local voxel slots)
//! - Ray, AABB and refraction math
//! - The branchless grid DDA shared by both traversal levels
//! - Materials and the material table
//! - Common error types

pub mod coords;
pub mod dda;
pub mod error;
pub mod math;
pub mod types;

pub use coords::{ChunkPos, LocalPos};
pub use dda::GridDda;
pub use error::{Error, Result};
pub use math::{reflect, refract, Aabb, Ray};
pub use types::{Material, MaterialId, MaterialTable};

/// Engine-wide constants
pub mod constants {
    /// Size of a chunk in voxels per axis
    pub const CHUNK_SIZE: usize = 8;
    /// Total voxel slots in a chunk (8^3)
    pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;
    /// Bits needed to represent position within a chunk (3 bits for 0-7)
    pub const CHUNK_BITS: u32 = 3;
    /// 32-bit words in a chunk occupancy mask
    pub const MASK_WORDS: usize = CHUNK_VOLUME / 32;
    /// Occupancy bits covered by one rank checkpoint
    pub const QUARTER_BITS: usize = CHUNK_VOLUME / 4;
    /// Mask words per checkpoint quarter
    pub const QUARTER_WORDS: usize = MASK_WORDS / 4;
    /// Refraction index of empty space
    pub const VACUUM_IOR: f32 = 1.0;
}
