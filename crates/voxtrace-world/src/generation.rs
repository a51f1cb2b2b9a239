//! Procedural terrain generation.

use glam::{IVec3, UVec3, Vec3};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;
use tracing::debug;
use voxtrace_core::constants::CHUNK_SIZE;
use voxtrace_core::{Material, MaterialId, MaterialTable, Result};
use voxtrace_voxel::{CompressedVoxel, Voxel};

use crate::world::WorldBuilder;
use crate::WorldSeed;

/// Material slots written by the generator.
pub mod materials {
    use voxtrace_core::MaterialId;

    pub const STONE: MaterialId = MaterialId(0);
    pub const DIRT: MaterialId = MaterialId(1);
    pub const GRASS: MaterialId = MaterialId(2);
    pub const WATER: MaterialId = MaterialId(3);
}

/// Terrain generator configuration.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    /// Seed for noise generation.
    pub seed: WorldSeed,
    /// Lowest surface height in voxels.
    pub base_height: i32,
    /// Water fills empty voxels up to this height. Negative disables water.
    pub water_level: i32,
    /// Horizontal scale of terrain features.
    pub terrain_scale: f64,
    /// Maximum terrain height variation.
    pub terrain_height: f64,
    /// Number of noise octaves for detail.
    pub octaves: usize,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Depth of dirt layer below surface.
    pub dirt_depth: u32,
    /// Direction towards the sun used to bake light into generated voxels.
    pub sun_direction: Vec3,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            base_height: 3,
            water_level: 10,
            terrain_scale: 48.0,
            terrain_height: 20.0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            dirt_depth: 3,
            sun_direction: Vec3::new(0.4, 1.0, 0.3),
        }
    }
}

/// Procedural terrain generator using fractal noise.
///
/// Diffuse and specular light of generated voxels are baked from a single
/// sun so that lit output shows shape without a separate lighting pass.
pub struct TerrainGenerator {
    config: TerrainConfig,
    height_noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    /// Create a new terrain generator with the given configuration.
    pub fn new(config: TerrainConfig) -> Self {
        let height_noise = Fbm::<Perlin>::new(config.seed as u32)
            .set_octaves(config.octaves)
            .set_lacunarity(config.lacunarity)
            .set_persistence(config.persistence);

        Self {
            config,
            height_noise,
        }
    }

    /// Create a terrain generator with default configuration.
    pub fn with_seed(seed: WorldSeed) -> Self {
        Self::new(TerrainConfig {
            seed,
            ..Default::default()
        })
    }

    /// Get the terrain configuration.
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Material table matching the slots in [`materials`].
    pub fn material_table() -> MaterialTable {
        let mut table = MaterialTable::default();
        for material in [
            Material::OPAQUE,
            Material::OPAQUE,
            Material {
                specular: 0.1,
                shininess: 8.0,
                ..Material::OPAQUE
            },
            Material::WATER,
        ] {
            table.push(material);
        }
        table
    }

    /// Surface height in voxels at a voxel column.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let nx = f64::from(x) / self.config.terrain_scale;
        let nz = f64::from(z) / self.config.terrain_scale;

        // Noise returns roughly [-1, 1]
        let noise_value = self.height_noise.get([nx, nz]).clamp(-1.0, 1.0);
        ((noise_value + 1.0) * 0.5 * self.config.terrain_height) as i32 + self.config.base_height
    }

    fn surface_normal(&self, x: i32, z: i32) -> Vec3 {
        let dx = self.height_at(x - 1, z) - self.height_at(x + 1, z);
        let dz = self.height_at(x, z - 1) - self.height_at(x, z + 1);
        Vec3::new(dx as f32, 2.0, dz as f32).normalize()
    }

    fn material_at(&self, y: i32, surface: i32) -> Option<MaterialId> {
        if y > surface {
            (y <= self.config.water_level).then_some(materials::WATER)
        } else if y == surface {
            Some(materials::GRASS)
        } else if y > surface - self.config.dirt_depth as i32 {
            Some(materials::DIRT)
        } else {
            Some(materials::STONE)
        }
    }

    fn albedo(material: MaterialId, y: i32) -> Vec3 {
        match material {
            materials::DIRT => Vec3::new(0.45, 0.3, 0.17),
            materials::GRASS => Vec3::new(0.3, 0.6, 0.2),
            materials::WATER => Vec3::new(0.15, 0.35, 0.6),
            _ => {
                let shade = 0.45 + 0.05 * (y.rem_euclid(3) as f32);
                Vec3::splat(shade)
            }
        }
    }

    /// Voxels of one vertical column, bottom to top, up to `height` voxels.
    fn column(&self, x: i32, z: i32, height: i32) -> Vec<(IVec3, CompressedVoxel)> {
        let surface = self.height_at(x, z);
        let normal = self.surface_normal(x, z);
        let sun = self.config.sun_direction.normalize_or_zero();
        let light = Vec3::splat(normal.dot(sun).max(0.0));

        (0..height)
            .filter_map(|y| {
                let material = self.material_at(y, surface)?;
                let normal = if material == materials::WATER {
                    Vec3::Y
                } else {
                    normal
                };
                let voxel = Voxel {
                    normal,
                    material,
                    albedo: Self::albedo(material, y),
                    specular: light,
                    diffuse: light,
                };
                Some((IVec3::new(x, y, z), voxel.compress()))
            })
            .collect()
    }

    /// Fill a builder's whole map, columns generated in parallel.
    pub fn populate(&self, builder: &mut WorldBuilder) -> Result<()> {
        let extent = builder.voxel_extent();
        let columns: Vec<Vec<(IVec3, CompressedVoxel)>> = (0..extent.z)
            .into_par_iter()
            .flat_map_iter(|z| (0..extent.x).map(move |x| (x, z)))
            .map(|(x, z)| self.column(x, z, extent.y))
            .collect();

        let mut count = 0usize;
        for column in columns {
            for (pos, voxel) in column {
                builder.set_compressed(pos, voxel)?;
                count += 1;
            }
        }
        debug!(voxels = count, extent = %extent, "generated terrain");
        Ok(())
    }

    /// Builder for a world of `map_size` chunks filled with terrain.
    pub fn generate(&self, map_size: UVec3) -> Result<WorldBuilder> {
        let mut builder = WorldBuilder::new(map_size).with_materials(Self::material_table());
        self.populate(&mut builder)?;
        Ok(builder)
    }
}

impl Clone for TerrainGenerator {
    fn clone(&self) -> Self {
        Self::new(self.config.clone())
    }
}

/// Map size in voxels along one axis for a chunk count.
pub const fn voxels_for_chunks(chunks: u32) -> u32 {
    chunks * CHUNK_SIZE as u32
}
