//! Sparse chunk occupancy with rank/select.
//!
//! Each chunk keeps one bit per slot of its 8x8x8 grid. Slot `i` is bit
//! `i & 31` of word `i >> 5`. Voxels of a chunk are stored contiguously in
//! ascending slot order, so the storage offset of a voxel is the number of
//! set bits before it (its rank). `partial_counts` caches the rank at each
//! 128-slot quarter boundary so a query scans at most four words.

use bytemuck::{Pod, Zeroable};
use voxtrace_core::constants::{MASK_WORDS, QUARTER_WORDS};
use voxtrace_core::{ChunkPos, LocalPos};

/// Chunk record as stored in the chunk pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Chunk {
    /// Chunk-grid coordinates
    pub position: [i32; 3],
    /// Sample counter owned by the lighting accumulation pass
    pub num_indirect_samples: u32,
    /// Set bits before slots 128, 256 and 384
    pub partial_counts: [u32; 3],
    /// Occupancy, one bit per slot
    pub bit_mask: [u32; MASK_WORDS],
}

#[inline]
const fn split(index: usize) -> (usize, u32) {
    (index >> 5, 1u32 << (index & 31))
}

impl Chunk {
    /// Empty chunk at `position`.
    pub const fn new(position: ChunkPos) -> Self {
        Self {
            position: [position.x, position.y, position.z],
            num_indirect_samples: 0,
            partial_counts: [0; 3],
            bit_mask: [0; MASK_WORDS],
        }
    }

    /// Chunk with the given slots occupied.
    pub fn with_occupied(position: ChunkPos, slots: impl IntoIterator<Item = LocalPos>) -> Self {
        let mut chunk = Self::new(position);
        for pos in slots {
            let (word, bit) = split(pos.to_index());
            chunk.bit_mask[word] |= bit;
        }
        chunk.rebuild_partial_counts();
        chunk
    }

    /// Chunk from a raw mask, computing the checkpoints.
    pub fn from_mask(position: ChunkPos, bit_mask: [u32; MASK_WORDS]) -> Self {
        let mut chunk = Self {
            bit_mask,
            ..Self::new(position)
        };
        chunk.rebuild_partial_counts();
        chunk
    }

    #[inline]
    pub const fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::new(self.position[0], self.position[1], self.position[2])
    }

    /// Mark a slot occupied or empty, keeping the checkpoints current.
    pub fn set(&mut self, pos: LocalPos, occupied: bool) {
        let (word, bit) = split(pos.to_index());
        if occupied {
            self.bit_mask[word] |= bit;
        } else {
            self.bit_mask[word] &= !bit;
        }
        self.rebuild_partial_counts();
    }

    /// Recompute `partial_counts` from the mask.
    pub fn rebuild_partial_counts(&mut self) {
        let mut running = 0;
        for (quarter, words) in self.bit_mask.chunks_exact(QUARTER_WORDS).take(3).enumerate() {
            running += words.iter().map(|w| w.count_ones()).sum::<u32>();
            self.partial_counts[quarter] = running;
        }
    }

    /// Whether a voxel exists at `pos`.
    #[inline]
    pub const fn exists(&self, pos: LocalPos) -> bool {
        let (word, bit) = split(pos.to_index());
        self.bit_mask[word] & bit != 0
    }

    /// Number of occupied slots before `pos`.
    #[inline]
    pub fn rank(&self, pos: LocalPos) -> u32 {
        let index = pos.to_index();
        let word = index >> 5;
        let quarter = word / QUARTER_WORDS;

        let mut count = if quarter == 0 {
            0
        } else {
            self.partial_counts[quarter - 1]
        };
        for w in &self.bit_mask[quarter * QUARTER_WORDS..word] {
            count += w.count_ones();
        }
        let below = (1u32 << (index & 31)) - 1;
        count + (self.bit_mask[word] & below).count_ones()
    }

    /// Storage offset of the voxel at `pos` given the chunk's first voxel
    /// index. Only meaningful when [`Self::exists`] holds.
    #[inline]
    pub fn voxel_offset(&self, voxel_index: u32, pos: LocalPos) -> u32 {
        voxel_index + self.rank(pos)
    }

    /// Slot of the `n`th occupied voxel (0-based), or [`LocalPos::INVALID`]
    /// if the chunk holds `n` or fewer voxels.
    pub fn position_of(&self, n: u32) -> LocalPos {
        if n >= self.voxel_count() {
            return LocalPos::INVALID;
        }

        let mut quarter = 0;
        while quarter < 3 && self.partial_counts[quarter] <= n {
            quarter += 1;
        }
        let mut remaining = if quarter == 0 {
            n
        } else {
            n - self.partial_counts[quarter - 1]
        };

        for word in quarter * QUARTER_WORDS..MASK_WORDS {
            let mut bits = self.bit_mask[word];
            let count = bits.count_ones();
            if remaining >= count {
                remaining -= count;
                continue;
            }
            for _ in 0..remaining {
                bits &= bits - 1;
            }
            return LocalPos::from_index(word * 32 + bits.trailing_zeros() as usize);
        }

        LocalPos::INVALID
    }

    /// Total occupied slots.
    #[inline]
    pub fn voxel_count(&self) -> u32 {
        self.partial_counts[2]
            + self.bit_mask[3 * QUARTER_WORDS..]
                .iter()
                .map(|w| w.count_ones())
                .sum::<u32>()
    }

    /// Returns true if no slot is occupied
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bit_mask.iter().all(|&w| w == 0)
    }

    /// Occupied slots in storage order.
    pub fn occupied(&self) -> impl Iterator<Item = LocalPos> + '_ {
        self.bit_mask
            .iter()
            .enumerate()
            .flat_map(|(word, &bits)| {
                let mut bits = bits;
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let bit = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(LocalPos::from_index(word * 32 + bit))
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use voxtrace_core::constants::CHUNK_VOLUME;

    fn bit(chunk: &Chunk, index: usize) -> bool {
        (chunk.bit_mask[index / 32] >> (index % 32)) & 1 == 1
    }

    fn random_chunk(rng: &mut StdRng, density: f64) -> Chunk {
        let mut mask = [0u32; MASK_WORDS];
        for index in 0..CHUNK_VOLUME {
            if rng.gen_bool(density) {
                mask[index / 32] |= 1 << (index % 32);
            }
        }
        Chunk::from_mask(ChunkPos::new(1, 2, 3), mask)
    }

    fn checkerboard() -> Chunk {
        Chunk::with_occupied(
            ChunkPos::default(),
            LocalPos::all().filter(|p| (p.x + p.y + p.z) % 2 == 0),
        )
    }

    fn patterns() -> Vec<Chunk> {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let mut out = vec![
            Chunk::new(ChunkPos::default()),
            Chunk::from_mask(ChunkPos::default(), [u32::MAX; MASK_WORDS]),
            checkerboard(),
            // Only quarter boundaries occupied.
            Chunk::with_occupied(
                ChunkPos::default(),
                [0, 127, 128, 255, 256, 383, 384, 511].map(LocalPos::from_index),
            ),
            // Everything in the last quarter.
            Chunk::with_occupied(ChunkPos::default(), (384..512).map(LocalPos::from_index)),
        ];
        for density in [0.01, 0.1, 0.5, 0.9, 0.99] {
            for _ in 0..8 {
                out.push(random_chunk(&mut rng, density));
            }
        }
        out
    }

    #[test]
    fn record_layout() {
        assert_eq!(std::mem::size_of::<Chunk>(), 92);
        let chunk = Chunk::new(ChunkPos::new(-1, 2, 5));
        assert_eq!(chunk.chunk_pos(), ChunkPos::new(-1, 2, 5));
    }

    #[test]
    fn exists_matches_bits() {
        for chunk in patterns() {
            for pos in LocalPos::all() {
                assert_eq!(chunk.exists(pos), bit(&chunk, pos.to_index()));
            }
        }
    }

    #[test]
    fn partial_counts_are_prefix_popcounts() {
        for chunk in patterns() {
            for k in 0..3 {
                let expected = (0..128 * (k + 1)).filter(|&i| bit(&chunk, i)).count() as u32;
                assert_eq!(chunk.partial_counts[k], expected);
            }
            let last_quarter = (384..512).filter(|&i| bit(&chunk, i)).count() as u32;
            let total = (0..CHUNK_VOLUME).filter(|&i| bit(&chunk, i)).count() as u32;
            assert_eq!(chunk.voxel_count(), chunk.partial_counts[2] + last_quarter);
            assert_eq!(chunk.voxel_count(), total);
        }
    }

    #[test]
    fn rank_select_are_inverse() {
        for chunk in patterns() {
            let base = 1000;
            let mut expected_rank = 0;
            for pos in LocalPos::all() {
                if !chunk.exists(pos) {
                    continue;
                }
                assert_eq!(chunk.voxel_offset(base, pos), base + expected_rank);
                assert_eq!(chunk.position_of(expected_rank), pos);
                expected_rank += 1;
            }
            assert_eq!(expected_rank, chunk.voxel_count());
        }
    }

    #[test]
    fn position_of_past_end_is_invalid() {
        for chunk in patterns() {
            assert_eq!(chunk.position_of(chunk.voxel_count()), LocalPos::INVALID);
            assert_eq!(chunk.position_of(u32::MAX), LocalPos::INVALID);
        }
    }

    #[test]
    fn empty_and_full() {
        let empty = Chunk::new(ChunkPos::default());
        assert!(empty.is_empty());
        assert_eq!(empty.voxel_count(), 0);
        assert_eq!(empty.position_of(0), LocalPos::INVALID);

        let full = Chunk::from_mask(ChunkPos::default(), [u32::MAX; MASK_WORDS]);
        assert_eq!(full.partial_counts, [128, 256, 384]);
        assert_eq!(full.voxel_count(), 512);
        for pos in LocalPos::all() {
            assert_eq!(full.rank(pos) as usize, pos.to_index());
        }
    }

    #[test]
    fn set_keeps_counts_current() {
        let mut chunk = Chunk::new(ChunkPos::default());
        chunk.set(LocalPos::from_index(200), true);
        chunk.set(LocalPos::from_index(10), true);
        assert_eq!(chunk.partial_counts, [1, 2, 2]);
        assert_eq!(chunk.position_of(1), LocalPos::from_index(200));

        chunk.set(LocalPos::from_index(10), false);
        assert_eq!(chunk.partial_counts, [0, 1, 1]);
        assert_eq!(chunk.position_of(0), LocalPos::from_index(200));
    }

    #[test]
    fn occupied_iterates_in_storage_order() {
        for chunk in patterns() {
            let listed: Vec<_> = chunk.occupied().collect();
            assert_eq!(listed.len() as u32, chunk.voxel_count());
            for (n, pos) in listed.into_iter().enumerate() {
                assert_eq!(chunk.rank(pos), n as u32);
            }
        }
    }
}
