//! Dense 3D grid of chunk handles.

use glam::{IVec3, UVec3, Vec3};
use voxtrace_core::{Aabb, ChunkPos};

use crate::chunk_handle::{ChunkHandle, LoadState};

/// Map of `size.x * size.y * size.z` handles, x fastest.
#[derive(Debug, Clone)]
pub struct ChunkMap {
    size: UVec3,
    handles: Vec<ChunkHandle>,
}

impl ChunkMap {
    /// Number of cells in a map of `size`, `None` when an axis does not fit
    /// a chunk coordinate or the product overflows.
    pub fn volume(size: UVec3) -> Option<usize> {
        if size.max_element() > i32::MAX as u32 {
            return None;
        }
        (size.x as usize)
            .checked_mul(size.y as usize)?
            .checked_mul(size.z as usize)
    }

    /// Map with every cell missing.
    ///
    /// # Panics
    ///
    /// Panics if [`Self::volume`] rejects `size`.
    pub fn new(size: UVec3) -> Self {
        let len = Self::volume(size).expect("chunk map size overflows");
        Self {
            size,
            handles: (0..len).map(|_| ChunkHandle::missing()).collect(),
        }
    }

    /// Map from handles already in map-index order. `None` if the count
    /// does not match `size`.
    pub fn from_handles(size: UVec3, handles: Vec<ChunkHandle>) -> Option<Self> {
        (Self::volume(size) == Some(handles.len())).then_some(Self { size, handles })
    }

    /// Size in chunks.
    #[inline]
    pub const fn size(&self) -> UVec3 {
        self.size
    }

    #[inline]
    pub fn size_ivec3(&self) -> IVec3 {
        self.size.as_ivec3()
    }

    /// Map bounds in map space (one unit per chunk).
    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::new(Vec3::ZERO, self.size.as_vec3())
    }

    #[inline]
    pub fn index_of(&self, pos: ChunkPos) -> Option<usize> {
        pos.map_index(self.size)
    }

    #[inline]
    pub fn position_of(&self, index: usize) -> ChunkPos {
        ChunkPos::from_map_index(index, self.size)
    }

    #[inline]
    pub fn get(&self, pos: ChunkPos) -> Option<&ChunkHandle> {
        self.index_of(pos).map(|i| &self.handles[i])
    }

    #[inline]
    pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut ChunkHandle> {
        self.index_of(pos).map(|i| &mut self.handles[i])
    }

    /// Handle at a DDA cell, `None` outside the map.
    #[inline]
    pub fn at_cell(&self, cell: IVec3) -> Option<(usize, &ChunkHandle)> {
        let index = ChunkPos::from(cell).map_index(self.size)?;
        Some((index, &self.handles[index]))
    }

    #[inline]
    pub fn handle(&self, index: usize) -> &ChunkHandle {
        &self.handles[index]
    }

    #[inline]
    pub fn handle_mut(&mut self, index: usize) -> &mut ChunkHandle {
        &mut self.handles[index]
    }

    /// All handles in map-index order.
    pub fn handles(&self) -> &[ChunkHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Map indices of cells in `state`.
    pub fn cells_in_state(&self, state: LoadState) -> Vec<usize> {
        self.handles
            .iter()
            .enumerate()
            .filter(|(_, h)| h.state() == state)
            .map(|(i, _)| i)
            .collect()
    }

    /// Count handles per state, indexed by `LoadState as usize`.
    pub fn state_counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for handle in &self.handles {
            counts[handle.state() as usize] += 1;
        }
        counts
    }
}
