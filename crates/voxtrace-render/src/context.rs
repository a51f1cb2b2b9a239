//! Per-ray traversal state.

use glam::Vec3;
use voxtrace_core::constants::VACUUM_IOR;

/// Counters gathered while tracing one ray, summed per frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub chunk_steps: u32,
    pub voxel_steps: u32,
    pub requests_issued: u32,
    pub refractions: u32,
}

impl TraversalStats {
    /// Steps at both levels, the traversal cost heatmap input.
    #[inline]
    pub const fn total_steps(&self) -> u32 {
        self.chunk_steps + self.voxel_steps
    }

    #[inline]
    pub fn accumulate(&mut self, other: &Self) {
        self.chunk_steps += other.chunk_steps;
        self.voxel_steps += other.voxel_steps;
        self.requests_issued += other.requests_issued;
        self.refractions += other.refractions;
    }
}

/// State threaded through both steppers for the lifetime of one ray.
///
/// Lives on the worker's stack; nothing in it is shared between rays.
#[derive(Clone, Copy, Debug)]
pub struct RayContext {
    /// Light added by transparent layers passed so far
    pub color_add: Vec3,
    /// Transmittance left after those layers
    pub color_mult: Vec3,
    /// Identity of the transparent voxel the ray is inside, `None` in vacuum
    pub last_identity: Option<u32>,
    /// Refraction index of the medium the ray is inside
    pub last_ior: f32,
    /// Ray origin in map space, for depth tests
    pub origin: Vec3,
    /// Current direction in world space, updated by refraction
    pub direction: Vec3,
    /// Camera ray; only these mark chunks visible
    pub primary: bool,
    /// Bend at transparent boundaries
    pub refraction: bool,
    pub stats: TraversalStats,
}

impl Default for RayContext {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl RayContext {
    pub fn new(primary: bool, refraction: bool) -> Self {
        Self {
            color_add: Vec3::ZERO,
            color_mult: Vec3::ONE,
            last_identity: None,
            last_ior: VACUUM_IOR,
            origin: Vec3::ZERO,
            direction: Vec3::ZERO,
            primary,
            refraction,
            stats: TraversalStats::default(),
        }
    }

    /// Whether the ray is inside a transparent voxel run.
    #[inline]
    pub const fn in_medium(&self) -> bool {
        self.last_identity.is_some()
    }

    /// Front-to-back composite one transparent layer.
    #[inline]
    pub fn composite(&mut self, opacity: f32, albedo: Vec3, light: Vec3) {
        self.color_add += self.color_mult * opacity * albedo * light;
        self.color_mult *= 1.0 - opacity;
    }

    /// Record that the ray left all transparent media.
    #[inline]
    pub fn enter_vacuum(&mut self) {
        self.last_identity = None;
        self.last_ior = VACUUM_IOR;
    }

    /// Final color over `background`.
    #[inline]
    pub fn resolve(&self, background: Vec3) -> Vec3 {
        self.color_add + self.color_mult * background
    }
}
