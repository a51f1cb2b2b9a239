//! Test harness for headless rendering and visual regression testing.
//!
//! Everything renders on the CPU, so these run anywhere `cargo test` does.

use std::path::Path;

use glam::Vec3;
use image::{Rgba, RgbaImage};
use tracing::info;
use voxtrace_render::{Camera, Frame, FrameRenderer, RasterSurface, RenderError, RenderSettings, Sky};
use voxtrace_world::{ChunkPager, ChunkSource, VoxelWorld};

use crate::{Result, TestError, VisualTestConfig};

/// Off-screen renderer with a fixed output size.
pub struct HeadlessRenderer {
    renderer: FrameRenderer,
    width: u32,
    height: u32,
}

impl HeadlessRenderer {
    /// Renderer with default settings and sky.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::from_renderer(
            FrameRenderer::with_sky(RenderSettings::default(), Sky::default()),
            width,
            height,
        )
    }

    /// Renderer with explicit settings; a cubemap sky is loaded from disk.
    pub fn with_settings(settings: RenderSettings, width: u32, height: u32) -> Result<Self> {
        Self::from_renderer(FrameRenderer::new(settings)?, width, height)
    }

    fn from_renderer(renderer: FrameRenderer, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height }.into());
        }
        Ok(Self {
            renderer,
            width,
            height,
        })
    }

    /// Render a world and return the image.
    pub fn render(&self, world: &VoxelWorld, camera: &Camera) -> Result<RgbaImage> {
        Ok(self.render_frame(world, camera)?.image)
    }

    /// Render a world, keeping the frame statistics.
    pub fn render_frame(&self, world: &VoxelWorld, camera: &Camera) -> Result<Frame> {
        Ok(self.renderer.render(world, camera, self.width, self.height)?)
    }

    /// Render over a raster surface, which must match the output size.
    pub fn render_composed(
        &self,
        world: &VoxelWorld,
        camera: &Camera,
        raster: &RasterSurface,
    ) -> Result<RgbaImage> {
        if (raster.width(), raster.height()) != self.dimensions() {
            return Err(RenderError::InvalidDimensions {
                width: raster.width(),
                height: raster.height(),
            }
            .into());
        }
        Ok(self.renderer.render_composed(world, camera, raster)?.image)
    }

    /// Render frames, servicing chunk requests between them, until a frame
    /// issues no requests or `max_frames` is reached. Returns the last frame
    /// and how many frames were rendered.
    pub fn render_until_resident(
        &self,
        world: &mut VoxelWorld,
        source: &dyn ChunkSource,
        pager: &mut ChunkPager,
        camera: &Camera,
        max_frames: u32,
    ) -> Result<(Frame, u32)> {
        let focus = camera.position / voxtrace_core::constants::CHUNK_SIZE as f32;
        let mut rendered = 0;
        loop {
            pager.begin_frame(world);
            let frame = self.render_frame(world, camera)?;
            rendered += 1;
            if frame.stats.requests_issued == 0 || rendered >= max_frames {
                return Ok((frame, rendered));
            }
            pager.service(world, source, focus)?;
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        self.renderer.settings()
    }

    /// Get the output dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Visual regression test runner.
///
/// Compares rendered images against baseline images and reports differences.
pub struct VisualRegressionTest {
    config: VisualTestConfig,
    renderer: HeadlessRenderer,
}

impl VisualRegressionTest {
    /// Runner producing 256x256 images.
    pub fn new(config: VisualTestConfig) -> Result<Self> {
        Self::with_dimensions(config, 256, 256)
    }

    /// Create with custom dimensions.
    pub fn with_dimensions(config: VisualTestConfig, width: u32, height: u32) -> Result<Self> {
        let renderer = HeadlessRenderer::new(width, height)?;
        Ok(Self { config, renderer })
    }

    /// Runner using an existing renderer.
    pub fn with_renderer(config: VisualTestConfig, renderer: HeadlessRenderer) -> Self {
        Self { config, renderer }
    }

    /// Render `world` and compare against the baseline called `name`.
    /// Without a baseline, the render becomes the new baseline.
    pub fn run_test(&self, name: &str, world: &VoxelWorld, camera: &Camera) -> Result<f64> {
        let image = self.renderer.render(world, camera)?;
        self.compare_and_save(name, &image)
    }

    fn compare_and_save(&self, name: &str, image: &RgbaImage) -> Result<f64> {
        std::fs::create_dir_all(&self.config.baseline_dir)?;
        std::fs::create_dir_all(&self.config.output_dir)?;

        let baseline_path = self.config.baseline_dir.join(format!("{name}.png"));
        let output_path = self.config.output_dir.join(format!("{name}.png"));
        image.save(&output_path)?;

        if !baseline_path.exists() {
            image.save(&baseline_path)?;
            info!(path = %baseline_path.display(), "created new baseline");
            return Ok(0.0);
        }

        let baseline = image::open(&baseline_path)?.to_rgba8();
        let diff = compare_images(&baseline, image)?;
        if diff > self.config.threshold {
            let diff_path = self.config.output_dir.join(format!("{name}_diff.png"));
            create_diff_image(&baseline, image).save(&diff_path)?;
            return Err(TestError::ImageComparison(format!(
                "Image difference {diff:.4} exceeds threshold {:.4} (see {})",
                self.config.threshold,
                diff_path.display()
            )));
        }
        Ok(diff)
    }
}

/// Normalized RGB difference of two images, 0 for identical, 1 for
/// black against white everywhere.
pub fn compare_images(a: &RgbaImage, b: &RgbaImage) -> Result<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(TestError::ImageComparison(format!(
            "Image dimensions don't match: {:?} vs {:?}",
            a.dimensions(),
            b.dimensions()
        )));
    }

    let total_diff: u64 = a
        .pixels()
        .zip(b.pixels())
        .map(|(pa, pb)| {
            (0..3)
                .map(|c| u64::from(pa[c].abs_diff(pb[c])))
                .sum::<u64>()
        })
        .sum();

    let max_diff = (u64::from(a.width()) * u64::from(a.height()) * 3 * 255) as f64;
    Ok(total_diff as f64 / max_diff)
}

/// Image marking differing pixels red over a dimmed copy of `a`.
pub fn create_diff_image(a: &RgbaImage, b: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(a.width(), a.height(), |x, y| {
        let pa = a.get_pixel(x, y);
        let differs = b
            .get_pixel_checked(x, y)
            .map_or(true, |pb| (0..3).any(|c| pa[c].abs_diff(pb[c]) > 10));
        if differs {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([pa[0] / 2, pa[1] / 2, pa[2] / 2, 255])
        }
    })
}

/// Camera looking down -Z at the center of a cube of `extent` voxels.
pub fn create_test_camera(extent: f32, distance_factor: f32) -> Camera {
    let center = extent / 2.0;
    Camera {
        position: Vec3::new(center, center, center + extent * distance_factor),
        direction: Vec3::NEG_Z,
        aspect: 1.0,
        ..Camera::default()
    }
}

/// Remove a directory tree, ignoring a missing one.
pub fn clean_dir(path: impl AsRef<Path>) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes;

    #[test]
    fn rejects_zero_size() {
        assert!(HeadlessRenderer::new(0, 16).is_err());
    }

    #[test]
    fn compare_identical_and_inverted() {
        let black = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let white = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        assert_eq!(compare_images(&black, &black).unwrap(), 0.0);
        assert_eq!(compare_images(&black, &white).unwrap(), 1.0);
        assert!(compare_images(&black, &RgbaImage::new(2, 2)).is_err());
    }

    #[test]
    fn diff_marks_changed_pixels() {
        let a = RgbaImage::from_pixel(2, 1, Rgba([100, 100, 100, 255]));
        let mut b = a.clone();
        b.put_pixel(1, 0, Rgba([0, 100, 100, 255]));
        let diff = create_diff_image(&a, &b);
        assert_eq!(diff.get_pixel(0, 0).0, [50, 50, 50, 255]);
        assert_eq!(diff.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn renders_fixture() {
        let world = scenes::checker_floor().unwrap().build().unwrap();
        let renderer = HeadlessRenderer::new(32, 32).unwrap();
        let image = renderer
            .render(&world, &scenes::overhead_camera(&world))
            .unwrap();
        assert_eq!(image.dimensions(), (32, 32));
    }
}
