//! Reference servicing side of the chunk paging protocol.
//!
//! Traversal only flips handles from `Unloaded` to `Requested`, resets their
//! recency and marks the ones it hits as visible. Everything else happens
//! here between frames: aging, loading requested chunks from a
//! [`ChunkSource`] and evicting chunks that went unused.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::Vec3;
use hashbrown::HashMap;
use tracing::{debug, warn};
use voxtrace_core::{ChunkPos, Result};
use voxtrace_voxel::{Chunk, CompressedVoxel};

use crate::chunk_handle::LoadState;
use crate::world::{ChunkStore, VoxelWorld};

/// Provider of chunk data for cells the world does not hold yet.
pub trait ChunkSource {
    /// Packed chunk and voxel run for `pos`, `None` if the cell is empty.
    fn load(&self, pos: ChunkPos) -> Option<(Chunk, Vec<CompressedVoxel>)>;
}

impl ChunkSource for ChunkStore {
    fn load(&self, pos: ChunkPos) -> Option<(Chunk, Vec<CompressedVoxel>)> {
        self.get(pos).map(|(chunk, voxels)| (*chunk, voxels.to_vec()))
    }
}

/// Pager tuning.
#[derive(Debug, Clone)]
pub struct PagerConfig {
    /// Maximum chunks loaded per `service` call.
    pub max_loads_per_frame: usize,
    /// Loaded chunks untouched for more than this many frames are evicted.
    pub evict_after_ticks: u32,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            max_loads_per_frame: 64,
            evict_after_ticks: 120,
        }
    }
}

/// Outcome of one `service` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceReport {
    /// Requests turned into loaded chunks
    pub loaded: usize,
    /// Requests for cells the source had no data for
    pub missing: usize,
    /// Requests left for a later frame
    pub deferred: usize,
    /// Chunks dropped back to unloaded
    pub evicted: usize,
}

/// Priority entry for the load queue.
#[derive(Debug, Clone, Copy)]
struct LoadPriority {
    map_index: usize,
    /// Squared distance to the focus point, in chunks (lower = sooner).
    distance_sq: f32,
}

impl PartialEq for LoadPriority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LoadPriority {}

impl PartialOrd for LoadPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LoadPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap pops the closest cell, ties by map index.
        other
            .distance_sq
            .total_cmp(&self.distance_sq)
            .then_with(|| other.map_index.cmp(&self.map_index))
    }
}

/// Minimal load/evict policy driving the handle state machine.
pub struct ChunkPager {
    config: PagerConfig,
    /// Pool slots of chunks loaded before, reused when they come back.
    resident_slots: HashMap<usize, (u32, u32)>,
    frame: u64,
}

impl ChunkPager {
    pub fn new(config: PagerConfig) -> Self {
        Self {
            config,
            resident_slots: HashMap::new(),
            frame: 0,
        }
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    /// Frames started so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Age every handle by one tick and clear visibility. Call before
    /// rendering a frame.
    pub fn begin_frame(&mut self, world: &VoxelWorld) {
        self.frame += 1;
        for handle in world.map.handles() {
            handle.age();
            handle.clear_visible();
        }
    }

    /// Map indices currently requested by traversal.
    pub fn requested(&self, world: &VoxelWorld) -> Vec<usize> {
        world.map.cells_in_state(LoadState::Requested)
    }

    /// Evict stale chunks, then load requested ones nearest to `focus`
    /// (map space) first. Call after rendering a frame.
    pub fn service(
        &mut self,
        world: &mut VoxelWorld,
        source: &dyn ChunkSource,
        focus: Vec3,
    ) -> Result<ServiceReport> {
        let mut report = ServiceReport {
            evicted: self.evict(world),
            ..ServiceReport::default()
        };

        let mut queue: BinaryHeap<LoadPriority> = self
            .requested(world)
            .into_iter()
            .map(|map_index| {
                let center = world.map.position_of(map_index).to_vec3() + 0.5;
                LoadPriority {
                    map_index,
                    distance_sq: center.distance_squared(focus),
                }
            })
            .collect();

        while let Some(LoadPriority { map_index, .. }) = queue.pop() {
            if report.loaded >= self.config.max_loads_per_frame {
                report.deferred = queue.len() + 1;
                break;
            }

            if let Some(&(chunk_index, voxel_index)) = self.resident_slots.get(&map_index) {
                world
                    .map
                    .handle_mut(map_index)
                    .assign(LoadState::Loaded, chunk_index, voxel_index);
                report.loaded += 1;
                continue;
            }

            let pos = world.map.position_of(map_index);
            match source.load(pos) {
                Some((chunk, voxels)) => {
                    let slots = world.insert_chunk(map_index, chunk, &voxels, LoadState::Loaded)?;
                    self.resident_slots.insert(map_index, slots);
                    report.loaded += 1;
                }
                None => {
                    warn!(?pos, "requested chunk has no data, marking missing");
                    world.map.handle(map_index).set_state(LoadState::Missing);
                    report.missing += 1;
                }
            }
        }

        if report != ServiceReport::default() {
            debug!(
                frame = self.frame,
                loaded = report.loaded,
                missing = report.missing,
                deferred = report.deferred,
                evicted = report.evicted,
                "serviced chunk requests"
            );
        }
        Ok(report)
    }

    /// Drop loaded chunks not touched for too long. Visible chunks stay.
    fn evict(&mut self, world: &VoxelWorld) -> usize {
        let mut evicted = 0;
        for (map_index, handle) in world.map.handles().iter().enumerate() {
            if handle.is_loaded()
                && !handle.is_visible()
                && handle.last_used() > self.config.evict_after_ticks
            {
                handle.set_state(LoadState::Unloaded);
                self.resident_slots
                    .entry(map_index)
                    .or_insert((handle.chunk_index(), handle.voxel_index()));
                evicted += 1;
            }
        }
        evicted
    }
}

impl Default for ChunkPager {
    fn default() -> Self {
        Self::new(PagerConfig::default())
    }
}
