//! Rank/select throughput on chunk occupancy masks.
//!
//! Run with: cargo bench --package voxtrace-voxel --bench occupancy

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use voxtrace_core::constants::{CHUNK_VOLUME, MASK_WORDS};
use voxtrace_core::{ChunkPos, LocalPos};
use voxtrace_voxel::{Chunk, CompressedVoxel};

fn half_full_chunk() -> Chunk {
    let mut rng = StdRng::seed_from_u64(7);
    let mut mask = [0u32; MASK_WORDS];
    for word in &mut mask {
        *word = rng.gen();
    }
    Chunk::from_mask(ChunkPos::default(), mask)
}

fn benchmark_rank(c: &mut Criterion) {
    let chunk = half_full_chunk();
    let mut group = c.benchmark_group("occupancy");
    group.throughput(Throughput::Elements(CHUNK_VOLUME as u64));

    group.bench_function("rank_all_slots", |b| {
        b.iter(|| {
            let mut sum = 0u32;
            for pos in LocalPos::all() {
                sum = sum.wrapping_add(chunk.voxel_offset(0, black_box(pos)));
            }
            sum
        });
    });

    group.bench_function("exists_all_slots", |b| {
        b.iter(|| LocalPos::all().filter(|&p| chunk.exists(black_box(p))).count());
    });

    group.finish();
}

fn benchmark_select(c: &mut Criterion) {
    let chunk = half_full_chunk();
    let count = chunk.voxel_count();

    c.bench_function("select_all_voxels", |b| {
        b.iter(|| {
            for n in 0..count {
                black_box(chunk.position_of(black_box(n)));
            }
        });
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let voxels: Vec<CompressedVoxel> = (0..4096)
        .map(|_| CompressedVoxel::from_words(rng.gen()))
        .collect();

    c.bench_function("decode_4096_voxels", |b| {
        b.iter(|| {
            for v in &voxels {
                black_box(v.decode());
            }
        });
    });
}

criterion_group!(benches, benchmark_rank, benchmark_select, benchmark_decode);
criterion_main!(benches);
