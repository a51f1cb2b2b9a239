//! Math utilities and helpers.

use glam::Vec3;

/// Smallest magnitude allowed for a ray direction component.
///
/// Zero components would turn the inverse direction into infinities whose
/// products with zero distances are NaN inside the DDA.
const MIN_DIRECTION_COMPONENT: f32 = 1e-8;

/// Ray for raycasting operations.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// Ray origin
    pub origin: Vec3,
    /// Ray direction (normalized)
    pub direction: Vec3,
    /// Precomputed `1 / direction`
    pub inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        let direction = sanitize_direction(direction.normalize_or_zero());
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }

    /// Get a point along the ray at distance t
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Nudge near-zero components away from zero, keeping their sign.
fn sanitize_direction(direction: Vec3) -> Vec3 {
    let fix = |c: f32| {
        if c.abs() < MIN_DIRECTION_COMPONENT {
            MIN_DIRECTION_COMPONENT.copysign(c)
        } else {
            c
        }
    };
    Vec3::new(fix(direction.x), fix(direction.y), fix(direction.z))
}

/// Axis-Aligned Bounding Box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB for a cube of edge `size` with its minimum corner at `pos`
    #[inline]
    pub fn cube(pos: Vec3, size: f32) -> Self {
        Self {
            min: pos,
            max: pos + Vec3::splat(size),
        }
    }

    /// Slab test against a ray using its precomputed inverse direction.
    ///
    /// Returns `(t_near, t_far)` with `t_near` clamped to zero when the origin
    /// is inside, or `None` if the box is missed or entirely behind the ray.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        let t1 = (self.min - ray.origin) * ray.inv_direction;
        let t2 = (self.max - ray.origin) * ray.inv_direction;

        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();

        if t_near <= t_far && t_far >= 0.0 {
            Some((t_near.max(0.0), t_far))
        } else {
            None
        }
    }
}

/// Refract `incident` through a surface with `normal` facing against it.
///
/// `eta` is the ratio of the refraction index being left to the one being
/// entered. Returns `Vec3::ZERO` on total internal reflection.
#[inline]
pub fn refract(incident: Vec3, normal: Vec3, eta: f32) -> Vec3 {
    let cos_i = normal.dot(incident);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        Vec3::ZERO
    } else {
        eta * incident - (eta * cos_i + k.sqrt()) * normal
    }
}

/// Mirror `incident` about `normal`.
#[inline]
pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(5.0).x, 5.0);
    }

    #[test]
    fn ray_direction_has_no_zero_components() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert!(ray.inv_direction.is_finite());
        assert!(ray.direction.y != 0.0 && ray.direction.z != 0.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, -0.0, -1.0));
        assert!(ray.direction.y < 0.0);
    }

    #[test]
    fn aabb_ray_intersection_unit_cube() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new(Vec3::new(-2.0, 0.5, 0.5), Vec3::X);
        let (t_near, t_far) = aabb.intersect_ray(&ray).expect("ray should hit");
        assert_relative_eq!(t_near, 2.0, epsilon = 1e-5);
        assert_relative_eq!(t_far, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn aabb_ray_miss_and_behind() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let ray = Ray::new(Vec3::new(-2.0, 2.0, 0.5), Vec3::X);
        assert!(aabb.intersect_ray(&ray).is_none());

        let ray = Ray::new(Vec3::new(3.0, 0.5, 0.5), Vec3::X);
        assert!(aabb.intersect_ray(&ray).is_none());
    }

    #[test]
    fn aabb_ray_from_inside() {
        let aabb = Aabb::cube(Vec3::ZERO, 1.0);
        let ray = Ray::new(Vec3::splat(0.5), Vec3::Y);
        let (t_near, t_far) = aabb.intersect_ray(&ray).expect("inside hits");
        assert_eq!(t_near, 0.0);
        assert_relative_eq!(t_far, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn refract_normal_incidence_is_undeviated() {
        let incident = Vec3::Z;
        let bent = refract(incident, -Vec3::Z, 1.0 / 1.5);
        assert!(bent.abs_diff_eq(incident, 1e-6));
    }

    #[test]
    fn refract_obeys_snell() {
        let incident = Vec3::new(1.0, -1.0, 0.0).normalize();
        let bent = refract(incident, Vec3::Y, 1.0 / 1.5);
        let sin_in = incident.x.abs();
        let sin_out = bent.normalize().x.abs();
        assert_relative_eq!(sin_in, 1.5 * sin_out, epsilon = 1e-5);
    }

    #[test]
    fn refract_total_internal_reflection_is_zero() {
        let incident = Vec3::new(1.0, -0.2, 0.0).normalize();
        assert_eq!(refract(incident, Vec3::Y, 1.5), Vec3::ZERO);
    }

    #[test]
    fn reflect_flips_normal_component() {
        let r = reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::Y);
        assert_eq!(r, Vec3::new(1.0, 1.0, 0.0));
    }
}
