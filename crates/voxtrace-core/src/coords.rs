//! Coordinate systems for the chunk map.

use crate::constants::{CHUNK_BITS, CHUNK_SIZE, CHUNK_VOLUME};
use bytemuck::{Pod, Zeroable};
use glam::{IVec3, UVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Voxel slot within a chunk (0 to CHUNK_SIZE-1 per axis).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub _pad: u8,
}

impl LocalPos {
    /// Sentinel returned by select queries that run past the populated slots.
    pub const INVALID: Self = Self {
        x: u8::MAX,
        y: u8::MAX,
        z: u8::MAX,
        _pad: 0,
    };

    /// Create a new local position
    #[inline]
    pub const fn new(x: u8, y: u8, z: u8) -> Self {
        debug_assert!((x as usize) < CHUNK_SIZE);
        debug_assert!((y as usize) < CHUNK_SIZE);
        debug_assert!((z as usize) < CHUNK_SIZE);
        Self { x, y, z, _pad: 0 }
    }

    /// Create from a DDA cell, returning `None` outside the chunk.
    #[inline]
    pub fn from_cell(cell: IVec3) -> Option<Self> {
        let size = CHUNK_SIZE as i32;
        if cell.cmpge(IVec3::ZERO).all() && cell.cmplt(IVec3::splat(size)).all() {
            Some(Self::new(cell.x as u8, cell.y as u8, cell.z as u8))
        } else {
            None
        }
    }

    /// Linear slot index, `x + 8 * (y + 8 * z)`.
    #[inline]
    pub const fn to_index(self) -> usize {
        self.x as usize + CHUNK_SIZE * (self.y as usize + CHUNK_SIZE * self.z as usize)
    }

    /// Create from linear index
    #[inline]
    pub const fn from_index(index: usize) -> Self {
        debug_assert!(index < CHUNK_VOLUME);
        let x = (index % CHUNK_SIZE) as u8;
        let y = ((index / CHUNK_SIZE) % CHUNK_SIZE) as u8;
        let z = (index / (CHUNK_SIZE * CHUNK_SIZE)) as u8;
        Self { x, y, z, _pad: 0 }
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        (self.x as usize) < CHUNK_SIZE
            && (self.y as usize) < CHUNK_SIZE
            && (self.z as usize) < CHUNK_SIZE
    }

    #[inline]
    pub const fn to_ivec3(self) -> IVec3 {
        IVec3::new(self.x as i32, self.y as i32, self.z as i32)
    }

    /// Iterate every slot of a chunk in ascending linear index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..CHUNK_VOLUME).map(Self::from_index)
    }
}

/// Chunk cell in map coordinates.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub _pad: i32,
}

impl ChunkPos {
    /// Create a new chunk position
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z, _pad: 0 }
    }

    /// Chunk containing a voxel-space coordinate.
    #[inline]
    pub const fn containing_voxel(voxel: IVec3) -> (Self, LocalPos) {
        let mask = (CHUNK_SIZE - 1) as i32;
        (
            Self::new(
                voxel.x >> CHUNK_BITS,
                voxel.y >> CHUNK_BITS,
                voxel.z >> CHUNK_BITS,
            ),
            LocalPos {
                x: (voxel.x & mask) as u8,
                y: (voxel.y & mask) as u8,
                z: (voxel.z & mask) as u8,
                _pad: 0,
            },
        )
    }

    /// Linear index into a dense map of the given size, `None` outside it.
    #[inline]
    pub fn map_index(self, map_size: UVec3) -> Option<usize> {
        let size = map_size.as_ivec3();
        let p = self.to_ivec3();
        if p.cmpge(IVec3::ZERO).all() && p.cmplt(size).all() {
            Some(p.x as usize + size.x as usize * (p.y as usize + size.y as usize * p.z as usize))
        } else {
            None
        }
    }

    /// Inverse of [`Self::map_index`].
    #[inline]
    pub const fn from_map_index(index: usize, map_size: UVec3) -> Self {
        let sx = map_size.x as usize;
        let sy = map_size.y as usize;
        Self::new(
            (index % sx) as i32,
            ((index / sx) % sy) as i32,
            (index / (sx * sy)) as i32,
        )
    }

    /// Minimum corner of this cell in map space (one unit per chunk).
    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        self.to_ivec3().as_vec3()
    }

    /// Convert to glam IVec3
    #[inline]
    pub const fn to_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for ChunkPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}
