//! Camera and per-pixel ray reconstruction.

use glam::{Mat4, Vec2, Vec3};
use voxtrace_core::Ray;

/// Camera for rendering. Positions are in voxel units.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Camera at `position` looking at `target`.
    pub fn looking_at(position: Vec3, target: Vec3, aspect: f32) -> Self {
        Self {
            position,
            direction: (target - position).normalize(),
            aspect,
            ..Self::default()
        }
    }

    /// Camera circling `center` at `radius`, `height` above it, `angle`
    /// radians around the Y axis.
    pub fn orbit(center: Vec3, radius: f32, height: f32, angle: f32, aspect: f32) -> Self {
        let position = center + Vec3::new(angle.cos() * radius, height, angle.sin() * radius);
        Self::looking_at(position, center, aspect)
    }

    /// Set the camera position.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Look at a target position.
    pub fn look_at(&mut self, target: Vec3) {
        self.direction = (target - self.position).normalize();
    }

    /// Set the aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Get the view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Matrices the pixel kernel reconstructs rays from.
    pub fn matrices(&self) -> CameraMatrices {
        CameraMatrices::from(self)
    }
}

/// Inverse camera transforms, constant over a frame.
#[derive(Clone, Copy, Debug)]
pub struct CameraMatrices {
    pub inverse_view: Mat4,
    pub inverse_projection: Mat4,
    pub inverse_view_projection: Mat4,
    pub position: Vec3,
}

impl From<&Camera> for CameraMatrices {
    fn from(camera: &Camera) -> Self {
        Self {
            inverse_view: camera.view_matrix().inverse(),
            inverse_projection: camera.projection_matrix().inverse(),
            inverse_view_projection: camera.view_projection_matrix().inverse(),
            position: camera.position,
        }
    }
}

impl CameraMatrices {
    /// Normalized device coordinates of a pixel center, y up.
    #[inline]
    pub fn pixel_ndc(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
        let uv = (Vec2::new(x as f32, y as f32) + 0.5) / Vec2::new(width as f32, height as f32);
        Vec2::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0)
    }

    /// Primary ray through an NDC position.
    #[inline]
    pub fn ray(&self, ndc: Vec2) -> Ray {
        let target = self
            .inverse_projection
            .project_point3(ndc.extend(1.0));
        let direction = self.inverse_view.transform_vector3(target);
        Ray::new(self.position, direction)
    }

    /// Distance along `ray` to the surface a raster depth in `[0, 1]`
    /// encodes, `None` for the cleared depth `1.0`.
    #[inline]
    pub fn depth_distance(&self, ray: &Ray, ndc: Vec2, depth: f32) -> Option<f32> {
        if depth >= 1.0 {
            return None;
        }
        let point = self.inverse_view_projection.project_point3(ndc.extend(depth));
        Some((point - self.position).dot(ray.direction).max(0.0))
    }
}
