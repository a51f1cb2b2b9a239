//! Branchless grid DDA.
//!
//! One instance walks unit cells; the map stepper runs it in chunk units and
//! the chunk stepper in voxel units.

use glam::{BVec3, IVec3, Vec3, Vec3Swizzles};

/// Incremental unit-grid walker.
#[derive(Clone, Copy, Debug)]
pub struct GridDda {
    /// Current cell
    pub cell: IVec3,
    step: IVec3,
    delta: Vec3,
    side: Vec3,
    mask: BVec3,
    t: f32,
}

impl GridDda {
    /// Start at the cell containing `origin`.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3, inv_direction: Vec3) -> Self {
        Self::with_cell(origin, direction, inv_direction, origin.floor().as_ivec3())
    }

    /// Start at an explicit cell, used when the origin sits on a boundary and
    /// flooring would pick the neighbour.
    #[inline]
    pub fn with_cell(origin: Vec3, direction: Vec3, inv_direction: Vec3, cell: IVec3) -> Self {
        let step = direction.signum();
        let delta = inv_direction.abs();
        let side = (step * (cell.as_vec3() - origin) + step * 0.5 + 0.5) * delta;
        Self {
            cell,
            step: step.as_ivec3(),
            delta,
            side,
            mask: BVec3::FALSE,
            t: 0.0,
        }
    }

    /// Advance to the next cell along the ray.
    #[inline]
    pub fn step(&mut self) {
        self.mask = self.side.cmple(self.side.yzx().min(self.side.zxy()));
        self.t = self.side.min_element();
        let fmask = Vec3::select(self.mask, Vec3::ONE, Vec3::ZERO);
        self.side += fmask * self.delta;
        self.cell += IVec3::select(self.mask, self.step, IVec3::ZERO);
    }

    /// Distance from the origin to the boundary last crossed, 0 before the
    /// first step.
    #[inline]
    pub fn t(&self) -> f32 {
        self.t
    }

    /// Distance from the origin to where the ray leaves the current cell.
    #[inline]
    pub fn exit_t(&self) -> f32 {
        self.side.min_element()
    }

    /// Normal of the face crossed by the last step, zero before any step.
    #[inline]
    pub fn face_normal(&self) -> Vec3 {
        Vec3::select(self.mask, -self.step.as_vec3(), Vec3::ZERO)
    }

    /// Whether the current cell lies in `[0, size)` on every axis.
    #[inline]
    pub fn in_bounds(&self, size: IVec3) -> bool {
        self.cell.cmpge(IVec3::ZERO).all() && self.cell.cmplt(size).all()
    }
}
