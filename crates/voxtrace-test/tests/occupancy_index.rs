//! Rank/select over chunk occupancy masks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use voxtrace_core::constants::{MASK_WORDS, QUARTER_WORDS};
use voxtrace_core::{ChunkPos, LocalPos};
use voxtrace_test::scenes::checkerboard_mask;
use voxtrace_voxel::Chunk;

fn random_mask(rng: &mut StdRng, density: f64) -> [u32; MASK_WORDS] {
    let mut mask = [0u32; MASK_WORDS];
    for index in 0..MASK_WORDS * 32 {
        if rng.gen_bool(density) {
            mask[index >> 5] |= 1 << (index & 31);
        }
    }
    mask
}

fn masks() -> Vec<(&'static str, [u32; MASK_WORDS])> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut masks = vec![
        ("empty", [0; MASK_WORDS]),
        ("full", [u32::MAX; MASK_WORDS]),
        ("checkerboard", checkerboard_mask()),
        ("first_slot", {
            let mut m = [0; MASK_WORDS];
            m[0] = 1;
            m
        }),
        ("last_slot", {
            let mut m = [0; MASK_WORDS];
            m[MASK_WORDS - 1] = 1 << 31;
            m
        }),
        ("quarter_edges", {
            // Last slot of each quarter and first slot of the next.
            let mut m = [0; MASK_WORDS];
            for q in 0..4 {
                m[q * QUARTER_WORDS] |= 1;
                m[q * QUARTER_WORDS + QUARTER_WORDS - 1] |= 1 << 31;
            }
            m
        }),
        ("fourth_quarter_only", {
            let mut m = [0; MASK_WORDS];
            m[3 * QUARTER_WORDS..].fill(0xAAAA_AAAA);
            m
        }),
    ];
    for density in [0.01, 0.1, 0.5, 0.9, 0.99] {
        for _ in 0..20 {
            masks.push(("random", random_mask(&mut rng, density)));
        }
    }
    masks
}

fn bit(mask: &[u32; MASK_WORDS], index: usize) -> bool {
    mask[index >> 5] & (1 << (index & 31)) != 0
}

#[test]
fn exists_matches_raw_bits() {
    for (name, mask) in masks() {
        let chunk = Chunk::from_mask(ChunkPos::new(0, 0, 0), mask);
        for pos in LocalPos::all() {
            assert_eq!(chunk.exists(pos), bit(&mask, pos.to_index()), "{name} {pos:?}");
        }
    }
}

#[test]
fn partial_counts_are_prefix_popcounts() {
    for (name, mask) in masks() {
        let chunk = Chunk::from_mask(ChunkPos::new(0, 0, 0), mask);
        for q in 0..3 {
            let prefix: u32 = mask[..(q + 1) * QUARTER_WORDS]
                .iter()
                .map(|w| w.count_ones())
                .sum();
            assert_eq!(chunk.partial_counts[q], prefix, "{name} quarter {q}");
        }
        let total: u32 = mask.iter().map(|w| w.count_ones()).sum();
        let last_quarter: u32 = mask[3 * QUARTER_WORDS..]
            .iter()
            .map(|w| w.count_ones())
            .sum();
        assert_eq!(total, chunk.partial_counts[2] + last_quarter, "{name}");
        assert_eq!(chunk.voxel_count(), total, "{name}");
    }
}

#[test]
fn rank_and_select_are_inverse() {
    const VOXEL_INDEX: u32 = 1_000;
    for (name, mask) in masks() {
        let chunk = Chunk::from_mask(ChunkPos::new(0, 0, 0), mask);
        let mut rank = 0u32;
        for index in 0..MASK_WORDS * 32 {
            if !bit(&mask, index) {
                continue;
            }
            let pos = LocalPos::from_index(index);
            assert_eq!(chunk.voxel_offset(VOXEL_INDEX, pos), VOXEL_INDEX + rank, "{name} slot {index}");
            assert_eq!(chunk.position_of(rank), pos, "{name} rank {rank}");
            rank += 1;
        }
        assert_eq!(chunk.position_of(rank), LocalPos::INVALID, "{name}");
        assert_eq!(chunk.position_of(rank + 100), LocalPos::INVALID, "{name}");
    }
}

#[test]
fn occupied_iterates_in_storage_order() {
    let mut rng = StdRng::seed_from_u64(9);
    let chunk = Chunk::from_mask(ChunkPos::new(1, 2, 3), random_mask(&mut rng, 0.3));
    for (n, pos) in chunk.occupied().enumerate() {
        assert_eq!(chunk.position_of(n as u32), pos);
    }
    assert_eq!(chunk.occupied().count() as u32, chunk.voxel_count());
}
