//! Whole-frame rendering on the rayon pool.

use std::time::{Duration, Instant};

use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;
use voxtrace_world::VoxelWorld;

use crate::camera::Camera;
use crate::context::TraversalStats;
use crate::error::{RenderError, Result};
use crate::kernel::PixelKernel;
use crate::raster::RasterSurface;
use crate::settings::RenderSettings;
use crate::shading::Lighting;
use crate::sky::Sky;
use crate::view::ViewMode;

/// Edge of the square pixel tiles workers are scheduled in.
pub const TILE_SIZE: u32 = 16;

/// Totals over every pixel of a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub pixels: u64,
    pub hits: u64,
    pub chunk_steps: u64,
    pub voxel_steps: u64,
    /// Rays that filed a load request
    pub requests_issued: u64,
    pub refractions: u64,
}

impl FrameStats {
    fn add_pixel(&mut self, hit: bool, stats: &TraversalStats) {
        self.pixels += 1;
        self.hits += u64::from(hit);
        self.chunk_steps += u64::from(stats.chunk_steps);
        self.voxel_steps += u64::from(stats.voxel_steps);
        self.requests_issued += u64::from(stats.requests_issued);
        self.refractions += u64::from(stats.refractions);
    }

    #[must_use]
    fn merge(mut self, other: Self) -> Self {
        self.pixels += other.pixels;
        self.hits += other.hits;
        self.chunk_steps += other.chunk_steps;
        self.voxel_steps += other.voxel_steps;
        self.requests_issued += other.requests_issued;
        self.refractions += other.refractions;
        self
    }

    /// Average DDA steps per pixel at both levels.
    pub fn steps_per_pixel(&self) -> f64 {
        if self.pixels == 0 {
            return 0.0;
        }
        (self.chunk_steps + self.voxel_steps) as f64 / self.pixels as f64
    }
}

/// A rendered image with its statistics.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    pub stats: FrameStats,
    pub elapsed: Duration,
}

/// Renders frames of a [`VoxelWorld`] with fixed settings and sky.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    settings: RenderSettings,
    lighting: Lighting,
    sky: Sky,
}

impl FrameRenderer {
    /// Renderer for `settings`, loading the configured sky.
    pub fn new(settings: RenderSettings) -> Result<Self> {
        let sky = Sky::from_config(&settings.sky)?;
        Ok(Self::with_sky(settings, sky))
    }

    /// Renderer with an already built sky.
    pub fn with_sky(settings: RenderSettings, sky: Sky) -> Self {
        Self {
            lighting: Lighting::from(&settings),
            settings,
            sky,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn sky(&self) -> &Sky {
        &self.sky
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.settings.view_mode = view_mode;
    }

    /// Render voxels only.
    pub fn render(&self, world: &VoxelWorld, camera: &Camera, width: u32, height: u32) -> Result<Frame> {
        self.render_frame(world, camera, None, width, height)
    }

    /// Render voxels over a raster surface of the same size. The surface is
    /// only composed when the settings enable it.
    pub fn render_composed(
        &self,
        world: &VoxelWorld,
        camera: &Camera,
        raster: &RasterSurface,
    ) -> Result<Frame> {
        self.render_frame(world, camera, Some(raster), raster.width(), raster.height())
    }

    fn render_frame(
        &self,
        world: &VoxelWorld,
        camera: &Camera,
        raster: Option<&RasterSurface>,
        width: u32,
        height: u32,
    ) -> Result<Frame> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let _span = tracing::trace_span!("render_frame", width, height).entered();
        let start = Instant::now();

        let kernel = PixelKernel::new(
            world,
            camera.matrices(),
            &self.settings,
            &self.lighting,
            &self.sky,
            raster,
            width,
            height,
        );

        let row_bytes = width as usize * 4;
        let mut pixels = vec![0u8; row_bytes * height as usize];
        let stats = pixels
            .par_chunks_mut(row_bytes * TILE_SIZE as usize)
            .enumerate()
            .map(|(band, rows)| {
                let y0 = band as u32 * TILE_SIZE;
                let band_height = (rows.len() / row_bytes) as u32;
                let mut stats = FrameStats::default();
                for x0 in (0..width).step_by(TILE_SIZE as usize) {
                    for y in 0..band_height {
                        for x in x0..(x0 + TILE_SIZE).min(width) {
                            let sample = kernel.shade(x, y0 + y);
                            stats.add_pixel(sample.hit, &sample.stats);
                            let offset = y as usize * row_bytes + x as usize * 4;
                            rows[offset..offset + 4].copy_from_slice(&sample.to_rgba8());
                        }
                    }
                }
                stats
            })
            .reduce(FrameStats::default, FrameStats::merge);

        let image = RgbaImage::from_raw(width, height, pixels).ok_or(RenderError::InvalidImageData)?;
        let elapsed = start.elapsed();
        debug!(
            width,
            height,
            hits = stats.hits,
            steps_per_pixel = stats.steps_per_pixel(),
            requests = stats.requests_issued,
            ms = elapsed.as_secs_f64() * 1000.0,
            "rendered frame"
        );
        Ok(Frame {
            image,
            stats,
            elapsed,
        })
    }
}
