//! Chunk-level traversal over the whole map.
//!
//! Runs the grid DDA in map space (one unit per chunk), handing loaded
//! chunks to the [`ChunkStepper`] and filing at most one load request per
//! ray for chunks that are not resident.

use glam::{IVec3, Vec3};
use voxtrace_core::constants::{CHUNK_SIZE, VACUUM_IOR};
use voxtrace_core::{refract, Aabb, GridDda, Material, Ray};
use voxtrace_voxel::Voxel;
use voxtrace_world::VoxelWorld;

use crate::chunk_stepper::{ChunkEntry, ChunkOutcome, ChunkStepper};
use crate::context::RayContext;
use crate::shading::Lighting;

const CHUNK_EXTENT: f32 = CHUNK_SIZE as f32;

/// How far inside a chunk entry points are clamped, in voxels.
const LOCAL_EPSILON: f32 = 1e-4;

/// Distance a refracted ray is pushed past the chunk face it left through,
/// in map units.
const EXIT_NUDGE: f32 = 1e-4;

/// Opaque voxel hit, positions in map space.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceHit {
    pub voxel: Voxel,
    pub material: Material,
    pub position: Vec3,
    pub face_normal: Vec3,
    /// Ray direction at the surface
    pub direction: Vec3,
    /// Map index of the chunk holding the voxel
    pub map_index: usize,
    /// Voxel-space coordinate of the voxel
    pub voxel_cell: IVec3,
}

#[derive(Clone, Copy, Debug)]
pub enum MapOutcome {
    Hit(SurfaceHit),
    /// Left the map without hitting anything.
    Miss,
    /// Stopped at the depth of rasterized geometry.
    Occluded,
}

impl MapOutcome {
    pub fn hit(&self) -> Option<&SurfaceHit> {
        match self {
            Self::Hit(hit) => Some(hit),
            _ => None,
        }
    }
}

/// Shared, read-only view of a world for tracing rays through it.
#[derive(Clone, Copy)]
pub struct MapStepper<'a> {
    world: &'a VoxelWorld,
    lighting: &'a Lighting,
}

impl<'a> MapStepper<'a> {
    pub fn new(world: &'a VoxelWorld, lighting: &'a Lighting) -> Self {
        Self { world, lighting }
    }

    /// Trace a world-space ray (voxel units).
    ///
    /// `max_depth` is in voxel units, negative for no limit. `ignore_first`
    /// skips whatever occupies the first voxel visited.
    pub fn trace(
        &self,
        world_ray: &Ray,
        max_depth: f32,
        ignore_first: bool,
        ctx: &mut RayContext,
    ) -> MapOutcome {
        let map = &self.world.map;
        let size = map.size_ivec3();
        let bounds = map.bounds();

        let mut ray = Ray::new(world_ray.origin / CHUNK_EXTENT, world_ray.direction);
        let max_depth = if max_depth >= 0.0 {
            max_depth / CHUNK_EXTENT
        } else {
            -1.0
        };
        ctx.origin = ray.origin;
        ctx.direction = ray.direction;

        let inside = (ray.origin.cmpge(bounds.min) & ray.origin.cmplt(bounds.max)).all();
        let (mut dda, mut entry_t, mut entry_normal) = if inside {
            (
                GridDda::new(ray.origin, ray.direction, ray.inv_direction),
                0.0,
                Vec3::ZERO,
            )
        } else {
            let Some((near, _)) = bounds.intersect_ray(&ray) else {
                return MapOutcome::Miss;
            };
            let cell = ray
                .at(near)
                .floor()
                .as_ivec3()
                .clamp(IVec3::ZERO, size - IVec3::ONE);
            (
                GridDda::with_cell(ray.origin, ray.direction, ray.inv_direction, cell),
                near,
                entry_face_normal(&bounds, &ray),
            )
        };

        let mut requested = false;
        let mut ignore = ignore_first;

        loop {
            let Some((map_index, handle)) = map.at_cell(dda.cell) else {
                if ctx.in_medium() {
                    if let Some(bent) = leave_medium(ray.direction, entry_normal, ctx) {
                        ctx.direction = bent;
                    }
                }
                return MapOutcome::Miss;
            };
            ctx.stats.chunk_steps += 1;
            let cell = dda.cell;
            let entry_point = ray.at(entry_t);

            if max_depth >= 0.0 {
                let near = Aabb::cube(cell.as_vec3(), 1.0)
                    .intersect_ray(&ray)
                    .map_or(entry_t, |(near, _)| near);
                if ray.at(near).distance(ctx.origin) > max_depth {
                    return MapOutcome::Occluded;
                }
            }

            handle.touch();
            if handle.is_loaded() {
                let stepper = ChunkStepper {
                    chunk: self.world.chunk(handle),
                    voxel_index: handle.voxel_index(),
                    voxels: &self.world.voxels,
                    materials: &self.world.materials,
                    lighting: self.lighting,
                };
                let local = ((entry_point - cell.as_vec3()) * CHUNK_EXTENT).clamp(
                    Vec3::splat(LOCAL_EPSILON),
                    Vec3::splat(CHUNK_EXTENT - LOCAL_EPSILON),
                );
                let entry = ChunkEntry {
                    position: local,
                    direction: ray.direction,
                    normal: entry_normal,
                    max_depth,
                    ignore_first: ignore,
                };

                match stepper.trace(&entry, ctx) {
                    ChunkOutcome::Hit(hit) => {
                        if ctx.primary {
                            handle.mark_visible();
                        }
                        ctx.direction = hit.direction;
                        return MapOutcome::Hit(SurfaceHit {
                            voxel: hit.voxel,
                            material: hit.material,
                            position: cell.as_vec3() + hit.position / CHUNK_EXTENT,
                            face_normal: hit.face_normal,
                            direction: hit.direction,
                            map_index,
                            voxel_cell: cell * CHUNK_SIZE as i32 + hit.cell,
                        });
                    }
                    ChunkOutcome::PastMaxDepth => return MapOutcome::Occluded,
                    ChunkOutcome::Exited {
                        position,
                        direction,
                        refracted: true,
                    } => {
                        // The ray bent inside the chunk: restart the map walk
                        // from where it actually left.
                        let exit = cell.as_vec3() + position / CHUNK_EXTENT;
                        ray = Ray::new(exit, direction);
                        ctx.direction = ray.direction;
                        let next = (exit + ray.direction * EXIT_NUDGE).floor().as_ivec3();
                        dda = GridDda::with_cell(ray.origin, ray.direction, ray.inv_direction, next);
                        entry_t = 0.0;
                        if dda.cell == cell {
                            dda.step();
                            entry_t = dda.t();
                            entry_normal = dda.face_normal();
                        } else {
                            entry_normal = (cell - dda.cell).as_vec3().normalize_or_zero();
                        }
                        ignore = false;
                        continue;
                    }
                    ChunkOutcome::Exited { .. } => {}
                }
            } else {
                if !requested && handle.request() {
                    requested = true;
                    ctx.stats.requests_issued += 1;
                }
                // Non-resident chunks count as empty space.
                if ctx.in_medium() {
                    if let Some(bent) = leave_medium(ray.direction, entry_normal, ctx) {
                        ray = Ray::new(entry_point, bent);
                        ctx.direction = ray.direction;
                        dda = GridDda::with_cell(ray.origin, ray.direction, ray.inv_direction, cell);
                    }
                }
            }

            dda.step();
            entry_t = dda.t();
            entry_normal = dda.face_normal();
            ignore = false;
        }
    }
}

/// Leave a transparent medium through a face with `normal`, returning the
/// bent direction. `None` when refraction is off or the ray is totally
/// internally reflected, in which case it keeps going straight.
fn leave_medium(direction: Vec3, normal: Vec3, ctx: &mut RayContext) -> Option<Vec3> {
    let bent = ctx
        .refraction
        .then(|| refract(direction, normal, ctx.last_ior / VACUUM_IOR))
        .filter(|bent| *bent != Vec3::ZERO);
    if bent.is_some() {
        ctx.stats.refractions += 1;
    }
    ctx.enter_vacuum();
    bent
}

/// Normal of the map face a ray from outside enters through.
fn entry_face_normal(bounds: &Aabb, ray: &Ray) -> Vec3 {
    let t1 = (bounds.min - ray.origin) * ray.inv_direction;
    let t2 = (bounds.max - ray.origin) * ray.inv_direction;
    let t_near = t1.min(t2);
    let axis = if t_near.x >= t_near.y && t_near.x >= t_near.z {
        Vec3::X
    } else if t_near.y >= t_near.z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    -axis * ray.direction.signum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::UVec3;
    use voxtrace_core::{ChunkPos, MaterialId, MaterialTable};
    use voxtrace_world::{LoadState, WorldBuilder};

    fn lighting() -> Lighting {
        Lighting {
            ambient: 0.25,
            sun_intensity: 1.0,
            sun: Vec3::Y,
        }
    }

    fn materials() -> MaterialTable {
        MaterialTable::new(vec![
            Material::OPAQUE,
            Material {
                emissive: true,
                opacity: 0.5,
                ..Material::OPAQUE
            },
        ])
    }

    fn builder() -> WorldBuilder {
        WorldBuilder::new(UVec3::splat(4)).with_materials(materials())
    }

    fn solid(albedo: Vec3) -> Voxel {
        Voxel::new(Vec3::NEG_X, MaterialId(0), albedo)
    }

    fn trace(world: &VoxelWorld, origin: Vec3, direction: Vec3, ctx: &mut RayContext) -> MapOutcome {
        let lighting = lighting();
        MapStepper::new(world, &lighting).trace(&Ray::new(origin, direction), -1.0, false, ctx)
    }

    #[test]
    fn ray_missing_the_map_terminates() {
        let mut b = builder();
        b.fill_box(IVec3::ZERO, IVec3::splat(31), &solid(Vec3::ONE)).unwrap();
        let world = b.build().unwrap();

        let mut ctx = RayContext::default();
        let outcome = trace(&world, Vec3::new(-10.0, 40.0, 5.0), Vec3::NEG_Y, &mut ctx);
        assert!(matches!(outcome, MapOutcome::Miss));
        assert_eq!(ctx.stats.chunk_steps, 0);

        let outcome = trace(&world, Vec3::new(-10.0, 5.0, 5.0), Vec3::NEG_X, &mut ctx);
        assert!(matches!(outcome, MapOutcome::Miss));
    }

    #[test]
    fn hit_from_outside_the_map() {
        let mut b = builder();
        b.set_voxel(IVec3::new(20, 5, 5), &solid(Vec3::X)).unwrap();
        let world = b.build().unwrap();

        let mut ctx = RayContext::default();
        let outcome = trace(&world, Vec3::new(-10.0, 5.5, 5.5), Vec3::X, &mut ctx);
        let hit = outcome.hit().expect("hit");
        assert_eq!(hit.voxel_cell, IVec3::new(20, 5, 5));
        assert_relative_eq!(hit.position.x * CHUNK_EXTENT, 20.0, epsilon = 1e-3);
        assert_eq!(hit.face_normal, Vec3::NEG_X);
        assert_eq!(ctx.stats.chunk_steps, 3);
    }

    #[test]
    fn first_face_normal_comes_from_map_boundary() {
        let mut b = builder();
        b.set_voxel(IVec3::new(0, 5, 5), &solid(Vec3::X)).unwrap();
        let world = b.build().unwrap();

        let mut ctx = RayContext::default();
        let hit = *trace(&world, Vec3::new(-10.0, 5.5, 5.5), Vec3::X, &mut ctx)
            .hit()
            .expect("hit");
        assert_eq!(hit.face_normal, Vec3::NEG_X);
        assert_relative_eq!(hit.position.x, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn loaded_chunk_hit_marks_visible_without_request() {
        let mut b = builder();
        b.set_voxel(IVec3::new(12, 4, 4), &solid(Vec3::ONE)).unwrap();
        let world = b.build().unwrap();
        let index = world.map.index_of(ChunkPos::new(1, 0, 0)).unwrap();
        world.map.handle(index).age();

        let mut ctx = RayContext::default();
        let outcome = trace(&world, Vec3::new(1.5, 4.5, 4.5), Vec3::X, &mut ctx);
        assert!(outcome.hit().is_some());

        let handle = world.map.handle(index);
        assert_eq!(handle.state(), LoadState::Loaded);
        assert!(handle.is_visible());
        assert_eq!(handle.last_used(), 0);
        assert_eq!(ctx.stats.requests_issued, 0);
    }

    #[test]
    fn secondary_rays_do_not_mark_visible() {
        let mut b = builder();
        b.set_voxel(IVec3::new(12, 4, 4), &solid(Vec3::ONE)).unwrap();
        let world = b.build().unwrap();

        let mut ctx = RayContext::new(false, true);
        assert!(trace(&world, Vec3::new(1.5, 4.5, 4.5), Vec3::X, &mut ctx)
            .hit()
            .is_some());
        let index = world.map.index_of(ChunkPos::new(1, 0, 0)).unwrap();
        assert!(!world.map.handle(index).is_visible());
    }

    #[test]
    fn one_request_per_traversal() {
        let mut b = builder();
        for x in [4, 12, 20, 28] {
            b.set_voxel(IVec3::new(x, 4, 4), &solid(Vec3::ONE)).unwrap();
        }
        // Off the ray's path, must stay unloaded.
        b.set_voxel(IVec3::new(12, 12, 4), &solid(Vec3::ONE)).unwrap();
        let (world, _store) = b.build_paged();

        let mut ctx = RayContext::default();
        let outcome = trace(&world, Vec3::new(0.5, 4.5, 4.5), Vec3::X, &mut ctx);
        assert!(matches!(outcome, MapOutcome::Miss));
        assert_eq!(ctx.stats.requests_issued, 1);
        assert_eq!(world.map.cells_in_state(LoadState::Requested), vec![0]);
        assert_eq!(world.map.cells_in_state(LoadState::Unloaded).len(), 4);

        // A second ray skips the pending chunk and requests the next one.
        let mut ctx = RayContext::default();
        trace(&world, Vec3::new(0.5, 4.5, 4.5), Vec3::X, &mut ctx);
        assert_eq!(ctx.stats.requests_issued, 1);
        assert_eq!(world.map.cells_in_state(LoadState::Requested).len(), 2);
    }

    #[test]
    fn missing_chunks_are_never_requested() {
        let world = builder().build().unwrap();
        let mut ctx = RayContext::default();
        trace(&world, Vec3::new(0.5, 4.5, 4.5), Vec3::X, &mut ctx);
        assert_eq!(ctx.stats.requests_issued, 0);
        assert_eq!(world.map.state_counts()[LoadState::Missing as usize], 64);
    }

    #[test]
    fn transparent_layers_composite_across_chunks() {
        let mut b = builder();
        b.set_voxel(IVec3::new(7, 4, 4), &Voxel::new(Vec3::NEG_X, MaterialId(1), Vec3::X))
            .unwrap();
        b.set_voxel(IVec3::new(8, 4, 4), &Voxel::new(Vec3::NEG_X, MaterialId(1), Vec3::Y))
            .unwrap();
        let world = b.build().unwrap();

        let mut ctx = RayContext::new(true, false);
        let outcome = trace(&world, Vec3::new(0.5, 4.5, 4.5), Vec3::X, &mut ctx);
        assert!(matches!(outcome, MapOutcome::Miss));
        assert!(ctx.color_mult.abs_diff_eq(Vec3::splat(0.25), 1e-6));
        assert!(ctx.color_add.abs_diff_eq(Vec3::new(0.5, 0.25, 0.0), 1e-6));
        assert!(ctx.resolve(Vec3::ZERO).x > ctx.resolve(Vec3::ZERO).y);
    }

    #[test]
    fn max_depth_occludes() {
        let mut b = builder();
        b.set_voxel(IVec3::new(20, 4, 4), &solid(Vec3::ONE)).unwrap();
        let world = b.build().unwrap();
        let lighting = lighting();
        let stepper = MapStepper::new(&world, &lighting);
        let ray = Ray::new(Vec3::new(0.5, 4.5, 4.5), Vec3::X);

        let mut ctx = RayContext::default();
        assert!(matches!(
            stepper.trace(&ray, 10.0, false, &mut ctx),
            MapOutcome::Occluded
        ));
        // Occluded inside the hit chunk, before the voxel.
        let mut ctx = RayContext::default();
        assert!(matches!(
            stepper.trace(&ray, 18.0, false, &mut ctx),
            MapOutcome::Occluded
        ));
        let mut ctx = RayContext::default();
        assert!(stepper.trace(&ray, 25.0, false, &mut ctx).hit().is_some());
    }

    #[test]
    fn ignore_first_skips_origin_voxel() {
        let mut b = builder();
        b.set_voxel(IVec3::new(2, 4, 4), &solid(Vec3::X)).unwrap();
        b.set_voxel(IVec3::new(10, 4, 4), &solid(Vec3::Y)).unwrap();
        let world = b.build().unwrap();
        let lighting = lighting();
        let stepper = MapStepper::new(&world, &lighting);
        let ray = Ray::new(Vec3::new(2.5, 4.5, 4.5), Vec3::X);

        let mut ctx = RayContext::default();
        let hit = *stepper.trace(&ray, -1.0, true, &mut ctx).hit().expect("hit");
        assert_eq!(hit.voxel_cell, IVec3::new(10, 4, 4));

        let mut ctx = RayContext::default();
        let hit = *stepper.trace(&ray, -1.0, false, &mut ctx).hit().expect("hit");
        assert_eq!(hit.voxel_cell, IVec3::new(2, 4, 4));
    }

    #[test]
    fn refraction_carries_across_chunk_faces() {
        // Glass slab across the chunk boundary at x = 8.
        let mut b = WorldBuilder::new(UVec3::splat(4))
            .with_materials(MaterialTable::new(vec![Material::OPAQUE, Material::GLASS]));
        let glass = Voxel::new(Vec3::NEG_X, MaterialId(1), Vec3::ONE);
        b.fill_box(IVec3::new(6, 0, 0), IVec3::new(9, 31, 31), &glass).unwrap();
        let world = b.build().unwrap();

        let incident = Vec3::new(1.0, 0.4, 0.1).normalize();
        let mut ctx = RayContext::new(true, true);
        let outcome = trace(&world, Vec3::new(0.5, 4.2, 4.3), incident, &mut ctx);
        assert!(matches!(outcome, MapOutcome::Miss));
        assert_eq!(ctx.stats.refractions, 2);
        assert!(ctx.direction.abs_diff_eq(incident, 1e-2));
        assert!(!ctx.in_medium());
    }

    fn glass_world(glass_from: i32, glass_to: i32, wall: bool) -> VoxelWorld {
        let mut b = WorldBuilder::new(UVec3::splat(4))
            .with_materials(MaterialTable::new(vec![Material::OPAQUE, Material::GLASS]));
        let glass = Voxel::new(Vec3::NEG_X, MaterialId(1), Vec3::ONE);
        b.fill_box(IVec3::new(glass_from, 0, 0), IVec3::new(glass_to, 31, 31), &glass)
            .unwrap();
        if wall {
            b.fill_box(IVec3::new(24, 0, 0), IVec3::new(31, 31, 31), &solid(Vec3::ONE))
                .unwrap();
        }
        b.build().unwrap()
    }

    #[test]
    fn glass_ending_on_a_chunk_face_bends_back_in_empty_chunk() {
        let incident = Vec3::new(0.880, 0.440, 0.176).normalize();
        let origin = Vec3::new(0.5, 2.2, 2.3);

        // Far face inside chunk 0 and far face on the boundary with the
        // empty chunk 1 must leave the ray in the same direction.
        for glass_to in [5, 7] {
            let world = glass_world(4, glass_to, true);
            assert_eq!(
                world.map.handle(world.map.index_of(ChunkPos::new(1, 0, 0)).unwrap()).state(),
                LoadState::Missing
            );
            let mut ctx = RayContext::new(true, true);
            let hit = *trace(&world, origin, incident, &mut ctx).hit().expect("hit");
            assert_eq!(hit.voxel_cell.x, 24);
            assert_eq!(ctx.stats.refractions, 2);
            assert!(hit.direction.abs_diff_eq(incident, 1e-2));
            assert!(ctx.direction.abs_diff_eq(incident, 1e-2));
            assert!(!ctx.in_medium());
        }
    }

    #[test]
    fn leaving_the_map_inside_glass_bends_back() {
        let world = glass_world(28, 31, false);
        let incident = Vec3::new(0.880, 0.440, 0.176).normalize();

        let mut ctx = RayContext::new(true, true);
        let outcome = trace(&world, Vec3::new(20.5, 2.2, 2.3), incident, &mut ctx);
        assert!(matches!(outcome, MapOutcome::Miss));
        assert_eq!(ctx.stats.refractions, 2);
        assert!(ctx.direction.abs_diff_eq(incident, 1e-2));
        assert!(!ctx.in_medium());

        // Without refraction the ray still leaves the medium.
        let mut ctx = RayContext::new(true, false);
        trace(&world, Vec3::new(20.5, 2.2, 2.3), incident, &mut ctx);
        assert_eq!(ctx.stats.refractions, 0);
        assert!(ctx.direction.abs_diff_eq(incident, 1e-6));
        assert!(!ctx.in_medium());
    }
}
