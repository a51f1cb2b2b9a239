//! Rasterized color and depth to compose voxel output with.

use glam::Vec3;

use crate::error::{RenderError, Result};

/// Color plus depth surface produced by a raster pass.
///
/// Depth is post-projection in `[0, 1]`; `1.0` marks pixels with no
/// rasterized geometry.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    color: Vec<Vec3>,
    depth: Vec<f32>,
}

impl RasterSurface {
    /// Cleared surface: black, depth 1.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let len = (width * height) as usize;
        Ok(Self {
            width,
            height,
            color: vec![Vec3::ZERO; len],
            depth: vec![1.0; len],
        })
    }

    /// Surface from existing buffers in row-major order.
    pub fn from_buffers(width: u32, height: u32, color: Vec<Vec3>, depth: Vec<f32>) -> Result<Self> {
        let len = (width * height) as usize;
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        if color.len() != len || depth.len() != len {
            return Err(RenderError::InvalidImageData);
        }
        Ok(Self {
            width,
            height,
            color,
            depth,
        })
    }

    pub const fn width(&self) -> u32 {
        self.width
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    #[inline]
    pub fn color(&self, x: u32, y: u32) -> Vec3 {
        self.color[self.index(x, y)]
    }

    #[inline]
    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.depth[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Vec3, depth: f32) {
        let i = self.index(x, y);
        self.color[i] = color;
        self.depth[i] = depth;
    }

    /// Fill a rectangle `[x0, x1) x [y0, y1)` with one color and depth,
    /// clipped to the surface.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: Vec3, depth: f32) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.set(x, y, color, depth);
            }
        }
    }
}
