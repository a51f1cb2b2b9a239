//! Surface lighting from voxel light fields and material response.

use glam::Vec3;
use voxtrace_core::{reflect, Material};
use voxtrace_voxel::Voxel;

use crate::settings::RenderSettings;
use crate::sky::Sky;

/// Global light constants for a frame.
#[derive(Clone, Copy, Debug)]
pub struct Lighting {
    pub ambient: f32,
    pub sun_intensity: f32,
    /// Unit direction towards the sun
    pub sun: Vec3,
}

impl From<&RenderSettings> for Lighting {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            ambient: settings.ambient,
            sun_intensity: settings.sun_intensity,
            sun: settings.sun(),
        }
    }
}

impl Lighting {
    /// Light reaching a voxel. Also weights transparent layers while
    /// compositing.
    #[inline]
    pub fn light(&self, voxel: &Voxel, material: &Material) -> Vec3 {
        if material.emissive {
            return Vec3::ONE;
        }
        let spec = material.specular.clamp(0.0, 1.0);
        let received = voxel.diffuse * (1.0 - spec) + voxel.specular * spec;
        Vec3::splat(self.ambient) + self.sun_intensity * received
    }

    /// Lit color of an opaque surface seen along `direction`.
    pub fn shade(&self, voxel: &Voxel, material: &Material, direction: Vec3, sky: &Sky) -> Vec3 {
        if material.emissive {
            return voxel.albedo;
        }
        let mut color = voxel.albedo * self.light(voxel, material);

        let spec = material.specular.clamp(0.0, 1.0);
        if spec > 0.0 {
            let normal = voxel.normal.normalize_or_zero();
            let reflected = reflect(direction, normal);
            if material.reflect_sky {
                color += sky.sample(reflected) * spec;
            }
            let highlight = reflected.dot(self.sun).max(0.0).powf(material.shininess);
            color += Vec3::splat(highlight * spec * self.sun_intensity);
        }
        color
    }
}
