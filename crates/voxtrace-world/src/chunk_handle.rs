//! Per-cell chunk handle with packed, atomically updated flags.
//!
//! Flags layout (persisted):
//!
//! | bits  | meaning                     |
//! |-------|-----------------------------|
//! | 0..2  | [`LoadState`]               |
//! | 2     | visible this frame          |
//! | 3..32 | index into the chunk pool   |
//!
//! Traversal workers write to handles concurrently without locks. Every
//! write they make is idempotent (reset recency, set the visible bit, move
//! `Unloaded` to `Requested`), so relaxed ordering is enough.

use std::sync::atomic::{AtomicU32, Ordering};

const STATE_MASK: u32 = 0b11;
const VISIBLE_BIT: u32 = 0b100;
const INDEX_SHIFT: u32 = 3;

/// Largest chunk pool index that fits in the flags word.
pub const MAX_CHUNK_INDEX: u32 = u32::MAX >> INDEX_SHIFT;

/// Residency of a map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LoadState {
    /// No chunk exists at this cell
    Missing = 0,
    /// A chunk exists but its data is not in the pools
    Unloaded = 1,
    /// Chunk data is in the pools and may be traversed
    Loaded = 2,
    /// A traversal asked for this chunk to be loaded
    Requested = 3,
}

impl LoadState {
    #[inline]
    const fn from_bits(bits: u32) -> Self {
        match bits & STATE_MASK {
            0 => Self::Missing,
            1 => Self::Unloaded,
            2 => Self::Loaded,
            _ => Self::Requested,
        }
    }
}

/// Map cell entry pointing at a chunk's pool slots.
#[derive(Debug, Default)]
pub struct ChunkHandle {
    flags: AtomicU32,
    last_used: AtomicU32,
    voxel_index: u32,
}

impl ChunkHandle {
    /// Handle for a cell with no chunk.
    pub const fn missing() -> Self {
        Self {
            flags: AtomicU32::new(0),
            last_used: AtomicU32::new(0),
            voxel_index: 0,
        }
    }

    /// Handle with the given state and pool slots.
    pub fn new(state: LoadState, chunk_index: u32, voxel_index: u32) -> Self {
        debug_assert!(chunk_index <= MAX_CHUNK_INDEX);
        Self {
            flags: AtomicU32::new((chunk_index << INDEX_SHIFT) | state as u32),
            last_used: AtomicU32::new(0),
            voxel_index,
        }
    }

    /// Rebuild from the persisted `[flags, last_used, voxel_index]` triple.
    pub const fn from_raw(raw: [u32; 3]) -> Self {
        Self {
            flags: AtomicU32::new(raw[0]),
            last_used: AtomicU32::new(raw[1]),
            voxel_index: raw[2],
        }
    }

    /// Persisted `[flags, last_used, voxel_index]` triple.
    pub fn to_raw(&self) -> [u32; 3] {
        [
            self.flags.load(Ordering::Relaxed),
            self.last_used.load(Ordering::Relaxed),
            self.voxel_index,
        ]
    }

    #[inline]
    pub fn state(&self) -> LoadState {
        LoadState::from_bits(self.flags.load(Ordering::Relaxed))
    }

    /// Whether traversal may step into this chunk.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.flags.load(Ordering::Relaxed) & VISIBLE_BIT != 0
    }

    /// Index of the chunk record in the chunk pool.
    #[inline]
    pub fn chunk_index(&self) -> u32 {
        self.flags.load(Ordering::Relaxed) >> INDEX_SHIFT
    }

    /// Index of the chunk's first voxel in the voxel pool.
    #[inline]
    pub const fn voxel_index(&self) -> u32 {
        self.voxel_index
    }

    /// Ticks since a traversal last touched this handle.
    #[inline]
    pub fn last_used(&self) -> u32 {
        self.last_used.load(Ordering::Relaxed)
    }

    /// Reset recency. Called by traversal on every visit.
    #[inline]
    pub fn touch(&self) {
        self.last_used.store(0, Ordering::Relaxed);
    }

    /// Flag the chunk as hit by a primary ray this frame.
    #[inline]
    pub fn mark_visible(&self) {
        self.flags.fetch_or(VISIBLE_BIT, Ordering::Relaxed);
    }

    /// Move `Unloaded` to `Requested`. Returns true if this call made the
    /// transition; any other state is left alone.
    #[inline]
    pub fn request(&self) -> bool {
        let mut current = self.flags.load(Ordering::Relaxed);
        while LoadState::from_bits(current) == LoadState::Unloaded {
            let requested = (current & !STATE_MASK) | LoadState::Requested as u32;
            match self.flags.compare_exchange_weak(
                current,
                requested,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    /// Overwrite the state, keeping the visible bit and chunk index.
    ///
    /// Two atomic steps, so readers may briefly see `Missing`. Only the
    /// pager calls this, between frames.
    pub fn set_state(&self, state: LoadState) {
        self.flags.fetch_and(!STATE_MASK, Ordering::Relaxed);
        self.flags.fetch_or(state as u32, Ordering::Relaxed);
    }

    /// Point this handle at new pool slots and set its state.
    pub fn assign(&mut self, state: LoadState, chunk_index: u32, voxel_index: u32) {
        debug_assert!(chunk_index <= MAX_CHUNK_INDEX);
        let visible = *self.flags.get_mut() & VISIBLE_BIT;
        *self.flags.get_mut() = (chunk_index << INDEX_SHIFT) | visible | state as u32;
        self.voxel_index = voxel_index;
    }

    /// Advance recency by one tick.
    pub fn age(&self) {
        self.last_used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |t| {
                Some(t.saturating_add(1))
            })
            .ok();
    }

    pub fn clear_visible(&self) {
        self.flags.fetch_and(!VISIBLE_BIT, Ordering::Relaxed);
    }
}

impl Clone for ChunkHandle {
    fn clone(&self) -> Self {
        Self::from_raw(self.to_raw())
    }
}
