//! World generation for the viewer.

use glam::UVec3;
use tracing::info;
use voxtrace_core::constants::CHUNK_SIZE;
use voxtrace_world::{ChunkStore, TerrainConfig, TerrainGenerator, VoxelWorld, WorldSeed};

/// World generation parameters.
#[derive(Debug, Clone)]
pub struct WorldParams {
    /// Map size in chunks
    pub map_size: UVec3,
    pub seed: WorldSeed,
    /// Build with every chunk loaded instead of paged.
    pub resident: bool,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            map_size: UVec3::new(12, 5, 12),
            seed: 42,
            resident: false,
        }
    }
}

/// A generated world, with the store its chunks page in from unless it was
/// built resident.
pub struct GeneratedWorld {
    pub world: VoxelWorld,
    pub store: Option<ChunkStore>,
}

/// Generate terrain filling the map.
pub fn generate_world(params: &WorldParams) -> anyhow::Result<GeneratedWorld> {
    let extent = params.map_size * CHUNK_SIZE as u32;
    info!(
        seed = params.seed,
        chunks = params.map_size.element_product(),
        "generating {}x{}x{} voxel terrain",
        extent.x,
        extent.y,
        extent.z
    );

    let generator = TerrainGenerator::new(TerrainConfig {
        seed: params.seed,
        terrain_height: (extent.y as f64 * 0.6).min(48.0),
        ..TerrainConfig::default()
    });
    let builder = generator.generate(params.map_size)?;
    info!(chunks = builder.occupied_chunks(), "terrain generated");

    if params.resident {
        let world = builder.build()?;
        info!(
            voxels = world.voxels.len(),
            memory_kib = world.memory_usage() / 1024,
            "world resident"
        );
        return Ok(GeneratedWorld { world, store: None });
    }

    let (world, store) = builder.build_paged();
    info!(chunks = store.len(), "world paged, chunks load on demand");
    Ok(GeneratedWorld {
        world,
        store: Some(store),
    })
}
