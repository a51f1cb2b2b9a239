//! Voxel world pools and the builder that packs them.

use glam::{IVec3, UVec3};
use hashbrown::HashMap;
use tracing::debug;
use voxtrace_core::constants::CHUNK_VOLUME;
use voxtrace_core::{ChunkPos, Error, LocalPos, MaterialTable, Result};
use voxtrace_voxel::{Chunk, CompressedVoxel, Voxel};

use crate::chunk_handle::{ChunkHandle, LoadState, MAX_CHUNK_INDEX};
use crate::chunk_map::ChunkMap;

/// Everything traversal reads: the handle map, the chunk and voxel pools,
/// and the material table.
///
/// Pools only grow. Handles refer to pool entries by index, so entries stay
/// valid for as long as the world lives.
#[derive(Debug, Clone)]
pub struct VoxelWorld {
    pub map: ChunkMap,
    pub chunks: Vec<Chunk>,
    pub voxels: Vec<CompressedVoxel>,
    pub materials: MaterialTable,
}

impl VoxelWorld {
    /// Empty world of `map_size` chunks.
    pub fn new(map_size: UVec3, materials: MaterialTable) -> Self {
        Self {
            map: ChunkMap::new(map_size),
            chunks: Vec::new(),
            voxels: Vec::new(),
            materials,
        }
    }

    /// Chunk record a handle points at.
    #[inline]
    pub fn chunk(&self, handle: &ChunkHandle) -> &Chunk {
        &self.chunks[handle.chunk_index() as usize]
    }

    /// Storage offset of the voxel at `pos` in the chunk at `map_index`,
    /// `None` when the chunk is not loaded or the slot is empty.
    pub fn voxel_offset(&self, map_index: usize, pos: LocalPos) -> Option<u32> {
        let handle = self.map.handle(map_index);
        if !handle.is_loaded() {
            return None;
        }
        let chunk = self.chunk(handle);
        chunk
            .exists(pos)
            .then(|| chunk.voxel_offset(handle.voxel_index(), pos))
    }

    /// Compressed voxel at a voxel-space coordinate, loaded chunks only.
    pub fn voxel_at(&self, voxel: IVec3) -> Option<CompressedVoxel> {
        let (chunk_pos, local) = ChunkPos::containing_voxel(voxel);
        let map_index = self.map.index_of(chunk_pos)?;
        let offset = self.voxel_offset(map_index, local)?;
        self.voxels.get(offset as usize).copied()
    }

    /// Append a chunk and its voxel run to the pools and point the handle at
    /// `map_index` to them with `state`.
    pub fn insert_chunk(
        &mut self,
        map_index: usize,
        chunk: Chunk,
        voxels: &[CompressedVoxel],
        state: LoadState,
    ) -> Result<(u32, u32)> {
        if voxels.len() != chunk.voxel_count() as usize {
            return Err(Error::InvalidData(format!(
                "chunk at {:?} has {} occupied slots but {} voxels",
                chunk.position,
                chunk.voxel_count(),
                voxels.len()
            )));
        }
        if map_index >= self.map.len() {
            return Err(Error::OutOfBounds(format!(
                "map index {map_index} outside map of {} cells",
                self.map.len()
            )));
        }
        let chunk_index = u32::try_from(self.chunks.len())
            .ok()
            .filter(|&i| i <= MAX_CHUNK_INDEX)
            .ok_or_else(|| Error::OutOfBounds("chunk pool full".into()))?;
        let voxel_index = u32::try_from(self.voxels.len())
            .ok()
            .filter(|i| i.checked_add(voxels.len() as u32).is_some())
            .ok_or_else(|| Error::OutOfBounds("voxel pool full".into()))?;

        self.chunks.push(chunk);
        self.voxels.extend_from_slice(voxels);
        self.map
            .handle_mut(map_index)
            .assign(state, chunk_index, voxel_index);
        Ok((chunk_index, voxel_index))
    }

    /// Pool sizes in bytes.
    pub fn memory_usage(&self) -> usize {
        self.chunks.len() * std::mem::size_of::<Chunk>()
            + self.voxels.len() * std::mem::size_of::<CompressedVoxel>()
            + self.map.len() * std::mem::size_of::<ChunkHandle>()
    }
}

/// Packed chunk data kept outside the pools, the backing store a pager
/// loads from.
#[derive(Debug, Clone, Default)]
pub struct ChunkStore {
    chunks: HashMap<ChunkPos, (Chunk, Vec<CompressedVoxel>)>,
}

impl ChunkStore {
    pub fn get(&self, pos: ChunkPos) -> Option<(&Chunk, &[CompressedVoxel])> {
        self.chunks.get(&pos).map(|(c, v)| (c, v.as_slice()))
    }

    pub fn insert(&mut self, chunk: Chunk, voxels: Vec<CompressedVoxel>) {
        self.chunks.insert(chunk.chunk_pos(), (chunk, voxels));
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Sparse voxel contents of one chunk while building.
type SparseChunk = Box<[Option<CompressedVoxel>; CHUNK_VOLUME]>;

/// Collects voxels sparsely and packs them into pools.
#[derive(Clone)]
pub struct WorldBuilder {
    map_size: UVec3,
    materials: MaterialTable,
    chunks: HashMap<ChunkPos, SparseChunk>,
}

impl WorldBuilder {
    pub fn new(map_size: UVec3) -> Self {
        Self {
            map_size,
            materials: MaterialTable::default(),
            chunks: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_materials(mut self, materials: MaterialTable) -> Self {
        self.materials = materials;
        self
    }

    /// Map size in voxels.
    pub fn voxel_extent(&self) -> IVec3 {
        self.map_size.as_ivec3() * voxtrace_core::constants::CHUNK_SIZE as i32
    }

    /// Place a voxel at a voxel-space coordinate.
    pub fn set_voxel(&mut self, voxel: IVec3, value: &Voxel) -> Result<()> {
        self.set_compressed(voxel, value.compress())
    }

    /// Place an already compressed voxel.
    pub fn set_compressed(&mut self, voxel: IVec3, value: CompressedVoxel) -> Result<()> {
        let (chunk_pos, local) = ChunkPos::containing_voxel(voxel);
        if chunk_pos.map_index(self.map_size).is_none() {
            return Err(Error::OutOfBounds(format!(
                "voxel {voxel} outside map of {} chunks",
                self.map_size
            )));
        }
        let slots = self
            .chunks
            .entry(chunk_pos)
            .or_insert_with(|| Box::new([None; CHUNK_VOLUME]));
        slots[local.to_index()] = Some(value);
        Ok(())
    }

    /// Clear a voxel. Out-of-map coordinates are ignored.
    pub fn remove_voxel(&mut self, voxel: IVec3) {
        let (chunk_pos, local) = ChunkPos::containing_voxel(voxel);
        if let Some(slots) = self.chunks.get_mut(&chunk_pos) {
            slots[local.to_index()] = None;
        }
    }

    /// Fill the inclusive voxel box `[min, max]`.
    pub fn fill_box(&mut self, min: IVec3, max: IVec3, value: &Voxel) -> Result<()> {
        let compressed = value.compress();
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    self.set_compressed(IVec3::new(x, y, z), compressed)?;
                }
            }
        }
        Ok(())
    }

    /// Number of chunks holding at least one voxel.
    pub fn occupied_chunks(&self) -> usize {
        self.chunks
            .values()
            .filter(|slots| slots.iter().any(Option::is_some))
            .count()
    }

    /// Pack each chunk's voxels in ascending slot order.
    fn packed(&self) -> Vec<(usize, Chunk, Vec<CompressedVoxel>)> {
        let mut packed: Vec<_> = self
            .chunks
            .iter()
            .filter_map(|(&pos, slots)| {
                let map_index = pos.map_index(self.map_size)?;
                let voxels: Vec<CompressedVoxel> = slots.iter().flatten().copied().collect();
                if voxels.is_empty() {
                    return None;
                }
                let chunk = Chunk::with_occupied(
                    pos,
                    slots
                        .iter()
                        .enumerate()
                        .filter(|(_, v)| v.is_some())
                        .map(|(i, _)| LocalPos::from_index(i)),
                );
                Some((map_index, chunk, voxels))
            })
            .collect();
        packed.sort_unstable_by_key(|(map_index, _, _)| *map_index);
        packed
    }

    /// Build a world with every non-empty chunk loaded into the pools.
    pub fn build(self) -> Result<VoxelWorld> {
        let mut world = VoxelWorld::new(self.map_size, self.materials.clone());
        for (map_index, chunk, voxels) in self.packed() {
            world.insert_chunk(map_index, chunk, &voxels, LoadState::Loaded)?;
        }
        debug!(
            chunks = world.chunks.len(),
            voxels = world.voxels.len(),
            map_size = %self.map_size,
            "built resident world"
        );
        Ok(world)
    }

    /// Build a world whose non-empty chunks start unloaded, together with
    /// the store they can be paged in from.
    pub fn build_paged(self) -> (VoxelWorld, ChunkStore) {
        let mut world = VoxelWorld::new(self.map_size, self.materials.clone());
        let mut store = ChunkStore::default();
        for (map_index, chunk, voxels) in self.packed() {
            world.map.handle(map_index).set_state(LoadState::Unloaded);
            store.insert(chunk, voxels);
        }
        debug!(
            chunks = store.len(),
            map_size = %self.map_size,
            "built paged world"
        );
        (world, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use voxtrace_core::MaterialId;

    fn voxel(material: u8) -> Voxel {
        Voxel::new(Vec3::Y, MaterialId(material), Vec3::splat(0.5))
    }

    #[test]
    fn build_packs_runs_in_slot_order() {
        let mut builder = WorldBuilder::new(UVec3::splat(2));
        builder.set_voxel(IVec3::new(9, 0, 0), &voxel(3)).unwrap();
        builder.set_voxel(IVec3::new(1, 0, 0), &voxel(1)).unwrap();
        builder.set_voxel(IVec3::new(0, 0, 0), &voxel(0)).unwrap();
        builder.set_voxel(IVec3::new(0, 1, 0), &voxel(2)).unwrap();
        let world = builder.build().unwrap();

        assert_eq!(world.chunks.len(), 2);
        assert_eq!(world.voxels.len(), 4);
        let materials: Vec<u8> = world.voxels.iter().map(|v| v.material().0).collect();
        assert_eq!(materials, vec![0, 1, 2, 3]);

        for (coord, material) in [
            (IVec3::new(0, 0, 0), 0),
            (IVec3::new(1, 0, 0), 1),
            (IVec3::new(0, 1, 0), 2),
            (IVec3::new(9, 0, 0), 3),
        ] {
            assert_eq!(world.voxel_at(coord).unwrap().material(), MaterialId(material));
        }
        assert!(world.voxel_at(IVec3::new(2, 0, 0)).is_none());
    }

    #[test]
    fn empty_chunks_are_missing() {
        let mut builder = WorldBuilder::new(UVec3::splat(2));
        builder.set_voxel(IVec3::new(3, 3, 3), &voxel(0)).unwrap();
        builder.remove_voxel(IVec3::new(3, 3, 3));
        builder.set_voxel(IVec3::new(12, 12, 12), &voxel(0)).unwrap();
        let world = builder.build().unwrap();

        assert_eq!(world.map.state_counts(), [7, 0, 1, 0]);
        let handle = world.map.get(ChunkPos::new(1, 1, 1)).unwrap();
        assert!(handle.is_loaded());
        assert_eq!(handle.chunk_index(), 0);
    }

    #[test]
    fn set_voxel_outside_map_fails() {
        let mut builder = WorldBuilder::new(UVec3::splat(1));
        assert!(builder.set_voxel(IVec3::new(8, 0, 0), &voxel(0)).is_err());
        assert!(builder.set_voxel(IVec3::new(-1, 0, 0), &voxel(0)).is_err());
        assert!(builder.set_voxel(IVec3::new(7, 7, 7), &voxel(0)).is_ok());
    }

    #[test]
    fn paged_build_keeps_pools_empty() {
        let mut builder = WorldBuilder::new(UVec3::splat(2));
        builder
            .fill_box(IVec3::ZERO, IVec3::splat(9), &voxel(1))
            .unwrap();
        let (world, store) = builder.build_paged();

        assert!(world.chunks.is_empty());
        assert!(world.voxels.is_empty());
        assert_eq!(world.map.state_counts(), [0, 8, 0, 0]);
        assert_eq!(store.len(), 8);
        let (chunk, voxels) = store.get(ChunkPos::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.voxel_count(), 512);
        assert_eq!(voxels.len(), 512);
        let (chunk, _) = store.get(ChunkPos::new(1, 1, 1)).unwrap();
        assert_eq!(chunk.voxel_count(), 8);
    }

    #[test]
    fn insert_chunk_rejects_mismatched_run() {
        let mut world = VoxelWorld::new(UVec3::ONE, MaterialTable::default());
        let chunk = Chunk::with_occupied(ChunkPos::default(), [LocalPos::new(0, 0, 0)]);
        assert!(world
            .insert_chunk(0, chunk, &[], LoadState::Loaded)
            .is_err());
        assert!(world
            .insert_chunk(0, chunk, &[voxel(0).compress()], LoadState::Loaded)
            .is_ok());
        assert!(world.voxel_at(IVec3::ZERO).is_some());
    }
}
