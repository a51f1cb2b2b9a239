//! Per-pixel work: build the camera ray, trace it, write one color.

use glam::Vec3;
use voxtrace_world::VoxelWorld;

use crate::camera::CameraMatrices;
use crate::context::{RayContext, TraversalStats};
use crate::map_stepper::{MapOutcome, MapStepper};
use crate::raster::RasterSurface;
use crate::settings::RenderSettings;
use crate::shading::Lighting;
use crate::sky::Sky;
use crate::view::ViewMode;

/// Total steps that saturate the traversal cost heatmap.
const COST_SATURATION: f32 = 128.0;

/// Output of one pixel.
#[derive(Clone, Copy, Debug)]
pub struct PixelSample {
    /// Gamma-corrected color
    pub color: Vec3,
    pub hit: bool,
    pub stats: TraversalStats,
}

impl PixelSample {
    /// RGBA8 with fixed opaque alpha.
    #[inline]
    pub fn to_rgba8(&self) -> [u8; 4] {
        let c = (self.color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
        [c.x as u8, c.y as u8, c.z as u8, u8::MAX]
    }
}

/// Frame-constant inputs shared by every pixel worker.
pub struct PixelKernel<'a> {
    stepper: MapStepper<'a>,
    camera: CameraMatrices,
    settings: &'a RenderSettings,
    lighting: &'a Lighting,
    sky: &'a Sky,
    raster: Option<&'a RasterSurface>,
    width: u32,
    height: u32,
}

impl<'a> PixelKernel<'a> {
    /// `raster` is only consulted when the settings ask for composition.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        world: &'a VoxelWorld,
        camera: CameraMatrices,
        settings: &'a RenderSettings,
        lighting: &'a Lighting,
        sky: &'a Sky,
        raster: Option<&'a RasterSurface>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            stepper: MapStepper::new(world, lighting),
            camera,
            settings,
            lighting,
            sky,
            raster: raster.filter(|_| settings.compose_with_raster),
            width,
            height,
        }
    }

    /// Trace and shade pixel `(x, y)`, `(0, 0)` top left.
    pub fn shade(&self, x: u32, y: u32) -> PixelSample {
        let ndc = CameraMatrices::pixel_ndc(x, y, self.width, self.height);
        let ray = self.camera.ray(ndc);
        let mut ctx = RayContext::new(true, self.settings.refraction);

        let mut max_depth = -1.0;
        let mut raster_color = None;
        if let Some(raster) = self.raster {
            let depth = raster.depth(x, y);
            if let Some(distance) = self.camera.depth_distance(&ray, ndc, depth) {
                max_depth = distance;
                raster_color = Some(raster.color(x, y));
            }
        }

        let outcome = self.stepper.trace(&ray, max_depth, false, &mut ctx);
        let hit = outcome.hit();

        let color = match self.settings.view_mode {
            ViewMode::Lit => {
                let surface = match hit {
                    Some(hit) => self
                        .lighting
                        .shade(&hit.voxel, &hit.material, hit.direction, self.sky),
                    None => raster_color.unwrap_or_else(|| self.sky.sample(ctx.direction)),
                };
                ctx.resolve(surface)
            }
            ViewMode::Albedo => hit.map_or(Vec3::ZERO, |h| h.voxel.albedo),
            ViewMode::Diffuse => hit.map_or(Vec3::ZERO, |h| h.voxel.diffuse),
            ViewMode::Specular => hit.map_or(Vec3::ZERO, |h| h.voxel.specular),
            ViewMode::VoxelNormal => hit.map_or(Vec3::ZERO, |h| h.voxel.normal * 0.5 + 0.5),
            ViewMode::FaceNormal => hit.map_or(Vec3::ZERO, |h| h.face_normal * 0.5 + 0.5),
            ViewMode::TraversalCost => heat(ctx.stats.total_steps()),
        };

        PixelSample {
            color: color.max(Vec3::ZERO).powf(self.settings.gamma),
            hit: matches!(outcome, MapOutcome::Hit(_)),
            stats: ctx.stats,
        }
    }
}

/// Blue to red ramp over the step count.
fn heat(steps: u32) -> Vec3 {
    let t = (steps as f32 / COST_SATURATION).clamp(0.0, 1.0);
    Vec3::new(t, 0.0, 1.0 - t)
}
