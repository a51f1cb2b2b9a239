//! Scene fixtures shared by the integration tests.

use glam::{IVec3, UVec3, Vec3};
use voxtrace_core::constants::{CHUNK_SIZE, MASK_WORDS};
use voxtrace_core::{Material, MaterialTable, Result};
use voxtrace_render::Camera;
use voxtrace_voxel::Voxel;
use voxtrace_world::{TerrainGenerator, VoxelWorld, WorldBuilder, WorldSeed};

/// Material slots of [`scene_materials`].
pub mod materials {
    use voxtrace_core::MaterialId;

    pub const STONE: MaterialId = MaterialId(0);
    /// Emissive, half transparent
    pub const FILTER: MaterialId = MaterialId(1);
    pub const GLASS: MaterialId = MaterialId(2);
    /// Emissive, opaque
    pub const LAMP: MaterialId = MaterialId(3);
}

/// Materials every fixture world uses.
pub fn scene_materials() -> MaterialTable {
    MaterialTable::new(vec![
        Material::OPAQUE,
        Material {
            emissive: true,
            opacity: 0.5,
            ..Material::OPAQUE
        },
        Material::GLASS,
        Material::EMISSIVE,
    ])
}

fn builder(map_size: UVec3) -> WorldBuilder {
    WorldBuilder::new(map_size).with_materials(scene_materials())
}

/// Unlit voxel facing up.
pub fn voxel(material: voxtrace_core::MaterialId, albedo: Vec3) -> Voxel {
    Voxel::new(Vec3::Y, material, albedo)
}

/// Two-voxel-thick emissive floor over a 4x2x4 chunk map, checkered per
/// chunk in white and orange.
pub fn checker_floor() -> Result<WorldBuilder> {
    let mut b = builder(UVec3::new(4, 2, 4));
    let white = voxel(materials::LAMP, Vec3::ONE);
    let orange = voxel(materials::LAMP, Vec3::new(1.0, 0.5, 0.0));
    let size = CHUNK_SIZE as i32;
    for cz in 0..4 {
        for cx in 0..4 {
            let tile = if (cx + cz) % 2 == 0 { &white } else { &orange };
            let min = IVec3::new(cx * size, 0, cz * size);
            b.fill_box(min, min + IVec3::new(size - 1, 1, size - 1), tile)?;
        }
    }
    Ok(b)
}

/// Red then green filter voxel along +X at `y = z = 4`, starting at voxel
/// `x`.
pub fn transparent_stack(x: i32) -> Result<WorldBuilder> {
    let mut b = builder(UVec3::splat(4));
    b.set_voxel(IVec3::new(x, 4, 4), &voxel(materials::FILTER, Vec3::X))?;
    b.set_voxel(IVec3::new(x + 1, 4, 4), &voxel(materials::FILTER, Vec3::Y))?;
    Ok(b)
}

/// Glass slab across `x = 10..=13` filling the map's y and z, with its
/// normals facing -X.
pub fn glass_slab() -> Result<WorldBuilder> {
    let mut b = builder(UVec3::splat(4));
    let glass = Voxel::new(Vec3::NEG_X, materials::GLASS, Vec3::ONE);
    b.fill_box(IVec3::new(10, 0, 0), IVec3::new(13, 31, 31), &glass)?;
    Ok(b)
}

/// Procedural terrain over `map_size` chunks.
pub fn terrain(seed: WorldSeed, map_size: UVec3) -> Result<WorldBuilder> {
    TerrainGenerator::with_seed(seed).generate(map_size)
}

/// Camera above the middle of the map looking straight down, slightly
/// tilted so the view vector is not axis-aligned with `up`.
pub fn overhead_camera(world: &VoxelWorld) -> Camera {
    let extent = world.map.size().as_vec3() * CHUNK_SIZE as f32;
    let center = Vec3::new(extent.x * 0.5, 0.0, extent.z * 0.5);
    Camera::looking_at(
        center + Vec3::new(0.0, extent.y + extent.x, 0.5),
        center,
        1.0,
    )
}

/// Camera orbiting the map center, as the viewer does.
pub fn orbit_camera(world: &VoxelWorld, angle: f32) -> Camera {
    let extent = world.map.size().as_vec3() * CHUNK_SIZE as f32;
    let center = extent * Vec3::new(0.5, 0.25, 0.5);
    Camera::orbit(center, extent.x, extent.y, angle, 1.0)
}

/// Alternating occupancy: slot occupied when `x + y + z` is even.
pub fn checkerboard_mask() -> [u32; MASK_WORDS] {
    let mut mask = [0u32; MASK_WORDS];
    for index in 0..MASK_WORDS * 32 {
        let x = index % CHUNK_SIZE;
        let y = (index / CHUNK_SIZE) % CHUNK_SIZE;
        let z = index / (CHUNK_SIZE * CHUNK_SIZE);
        if (x + y + z) % 2 == 0 {
            mask[index >> 5] |= 1 << (index & 31);
        }
    }
    mask
}
