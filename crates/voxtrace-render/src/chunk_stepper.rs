//! Voxel-level traversal inside one loaded chunk.
//!
//! Works in chunk-local space: voxel units, `[0, 8)` per axis. Transparent
//! voxels are composited front to back into the [`RayContext`] and may bend
//! the ray; the caller learns about bends through
//! [`ChunkOutcome::Exited::refracted`].

use glam::{IVec3, Vec3};
use voxtrace_core::constants::{CHUNK_SIZE, VACUUM_IOR};
use voxtrace_core::{refract, GridDda, LocalPos, Material, MaterialTable, Ray};
use voxtrace_voxel::{Chunk, CompressedVoxel, Voxel};

use crate::context::RayContext;
use crate::shading::Lighting;

const CHUNK_EXTENT: f32 = CHUNK_SIZE as f32;

/// Where and how a ray enters a chunk.
#[derive(Clone, Copy, Debug)]
pub struct ChunkEntry {
    /// Chunk-local entry point, already clamped inside the chunk
    pub position: Vec3,
    /// Unit direction
    pub direction: Vec3,
    /// Normal of the chunk face the ray came through
    pub normal: Vec3,
    /// Limit on the map-space distance from `RayContext::origin`, negative
    /// for none. The same distance gates refraction: nothing bends while it
    /// is zero, which only happens in the first cell of a traversal since
    /// bends restart the walk without moving the origin.
    pub max_depth: f32,
    /// Skip whatever occupies the first cell
    pub ignore_first: bool,
}

/// Opaque voxel found inside a chunk.
#[derive(Clone, Copy, Debug)]
pub struct ChunkHit {
    pub voxel: Voxel,
    pub material: Material,
    /// Chunk-local point where the ray entered the voxel
    pub position: Vec3,
    /// Normal of the voxel face the ray entered through
    pub face_normal: Vec3,
    /// Ray direction at the hit, after any bends
    pub direction: Vec3,
    pub cell: IVec3,
}

#[derive(Clone, Copy, Debug)]
pub enum ChunkOutcome {
    Hit(ChunkHit),
    /// Left the chunk. `position` is chunk-local on the exit face.
    Exited {
        position: Vec3,
        direction: Vec3,
        refracted: bool,
    },
    /// Passed the depth of rasterized geometry.
    PastMaxDepth,
}

/// Borrowed view of one loaded chunk and the data needed to shade it.
pub struct ChunkStepper<'a> {
    pub chunk: &'a Chunk,
    /// Pool offset of the chunk's first voxel
    pub voxel_index: u32,
    pub voxels: &'a [CompressedVoxel],
    pub materials: &'a MaterialTable,
    pub lighting: &'a Lighting,
}

impl ChunkStepper<'_> {
    fn voxel(&self, pos: LocalPos) -> Option<CompressedVoxel> {
        if !self.chunk.exists(pos) {
            return None;
        }
        let offset = self.chunk.voxel_offset(self.voxel_index, pos);
        self.voxels.get(offset as usize).copied()
    }

    /// Map-space position of a chunk-local point.
    #[inline]
    fn to_map(&self, local: Vec3) -> Vec3 {
        self.chunk.chunk_pos().to_vec3() + local / CHUNK_EXTENT
    }

    /// Walk the chunk from `entry` until an opaque voxel, the chunk
    /// boundary, or the depth limit.
    pub fn trace(&self, entry: &ChunkEntry, ctx: &mut RayContext) -> ChunkOutcome {
        let mut ray = Ray::new(entry.position, entry.direction);
        let mut dda = GridDda::new(ray.origin, ray.direction, ray.inv_direction);
        let mut face_normal = entry.normal;
        let mut ignore = entry.ignore_first;
        let mut refracted = false;

        loop {
            let Some(pos) = LocalPos::from_cell(dda.cell) else {
                return ChunkOutcome::Exited {
                    position: ray.at(dda.t()),
                    direction: ray.direction,
                    refracted,
                };
            };
            ctx.stats.voxel_steps += 1;
            let entry_point = ray.at(dda.t());
            let from_origin = self.to_map(entry_point).distance(ctx.origin);

            if entry.max_depth >= 0.0 && from_origin > entry.max_depth {
                return ChunkOutcome::PastMaxDepth;
            }

            let occupant = if ignore { None } else { self.voxel(pos) };
            if let Some(compressed) = occupant {
                let voxel = compressed.decode();
                let material = self.materials.get(voxel.material);

                if material.is_opaque() {
                    return ChunkOutcome::Hit(ChunkHit {
                        voxel,
                        material,
                        position: entry_point,
                        face_normal,
                        direction: ray.direction,
                        cell: dda.cell,
                    });
                }

                let identity = compressed.identity();
                if ctx.last_identity != Some(identity) {
                    let light = self.lighting.light(&voxel, &material);
                    ctx.composite(material.opacity, voxel.albedo, light);

                    if ctx.refraction && from_origin > 0.0 {
                        let normal = if voxel.normal.dot(ray.direction) < 0.0 {
                            voxel.normal.normalize_or_zero()
                        } else {
                            face_normal
                        };
                        let eta = ctx.last_ior / material.refraction_index;
                        let bent = refract(ray.direction, normal, eta);
                        if bent != Vec3::ZERO {
                            ray = Ray::new(entry_point, bent);
                            dda = GridDda::with_cell(
                                ray.origin,
                                ray.direction,
                                ray.inv_direction,
                                dda.cell,
                            );
                            refracted = true;
                            ctx.stats.refractions += 1;
                        }
                    }
                    ctx.last_identity = Some(identity);
                    ctx.last_ior = material.refraction_index;
                }
            } else if !ignore && ctx.in_medium() {
                if ctx.refraction {
                    let bent = refract(ray.direction, face_normal, ctx.last_ior / VACUUM_IOR);
                    // Total internal reflection keeps the current direction.
                    if bent != Vec3::ZERO {
                        ray = Ray::new(entry_point, bent);
                        dda = GridDda::with_cell(
                            ray.origin,
                            ray.direction,
                            ray.inv_direction,
                            dda.cell,
                        );
                        refracted = true;
                        ctx.stats.refractions += 1;
                    }
                }
                ctx.enter_vacuum();
            }

            dda.step();
            face_normal = dda.face_normal();
            ignore = false;
        }
    }
}
