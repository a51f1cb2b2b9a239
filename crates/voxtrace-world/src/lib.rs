//! World storage and paging for the voxtrace ray marcher.
//!
//! A [`VoxelWorld`] is a dense [`ChunkMap`] of handles over flat chunk and
//! voxel pools. Traversal reads it concurrently and only ever writes handle
//! flags; [`ChunkPager`] services those flags between frames.

pub mod chunk_handle;
pub mod chunk_map;
pub mod generation;
pub mod snapshot;
pub mod streaming;
pub mod world;

pub use chunk_handle::{ChunkHandle, LoadState};
pub use chunk_map::ChunkMap;
pub use generation::{TerrainConfig, TerrainGenerator};
pub use snapshot::{load_world, read_world, save_world, write_world};
pub use streaming::{ChunkPager, ChunkSource, PagerConfig, ServiceReport};
pub use world::{ChunkStore, VoxelWorld, WorldBuilder};

/// World seed for procedural generation.
pub type WorldSeed = u64;
