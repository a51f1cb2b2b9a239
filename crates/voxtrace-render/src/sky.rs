//! Sky backgrounds.

use std::path::Path;

use glam::{Vec2, Vec3};
use tracing::info;

use crate::error::{RenderError, Result};
use crate::settings::SkyConfig;

/// Face file names in cube face order +X, -X, +Y, -Y, +Z, -Z.
pub const CUBEMAP_FACES: [&str; 6] = ["px.png", "nx.png", "py.png", "ny.png", "pz.png", "nz.png"];

/// One square cubemap face in linear color.
#[derive(Debug, Clone)]
pub struct CubeFace {
    size: u32,
    texels: Vec<Vec3>,
}

impl CubeFace {
    fn sample(&self, uv: Vec2) -> Vec3 {
        let max = (self.size - 1) as f32;
        let x = (uv.x * max).round().clamp(0.0, max) as usize;
        let y = (uv.y * max).round().clamp(0.0, max) as usize;
        self.texels[y * self.size as usize + x]
    }
}

/// Directional background lookup.
#[derive(Debug, Clone)]
pub enum Sky {
    Gradient { horizon: Vec3, zenith: Vec3 },
    Cubemap { faces: Box<[CubeFace; 6]> },
}

impl Default for Sky {
    fn default() -> Self {
        Self::from_gradient(&SkyConfig::default())
    }
}

impl Sky {
    /// Build the sky a config describes, loading cubemap faces from disk.
    pub fn from_config(config: &SkyConfig) -> Result<Self> {
        match config {
            SkyConfig::Gradient { .. } => Ok(Self::from_gradient(config)),
            SkyConfig::Cubemap { directory } => Self::load_cubemap(directory),
        }
    }

    fn from_gradient(config: &SkyConfig) -> Self {
        match config {
            SkyConfig::Gradient { horizon, zenith } => Self::Gradient {
                horizon: Vec3::from_array(*horizon),
                zenith: Vec3::from_array(*zenith),
            },
            SkyConfig::Cubemap { .. } => Self::Gradient {
                horizon: Vec3::ONE,
                zenith: Vec3::ONE,
            },
        }
    }

    /// Load six square faces of equal size. Texels are converted from sRGB
    /// to linear so output gamma applies uniformly.
    pub fn load_cubemap(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        let mut faces = Vec::with_capacity(6);
        for name in CUBEMAP_FACES {
            let image = image::open(directory.join(name))?.to_rgb32f();
            let (width, height) = image.dimensions();
            if width != height || width == 0 {
                return Err(RenderError::InvalidDimensions { width, height });
            }
            let texels = image
                .pixels()
                .map(|p| Vec3::from_array(p.0).powf(2.2))
                .collect();
            faces.push(CubeFace {
                size: width,
                texels,
            });
        }
        if faces.iter().any(|f| f.size != faces[0].size) {
            return Err(RenderError::InvalidImageData);
        }
        let faces: [CubeFace; 6] = faces
            .try_into()
            .map_err(|_| RenderError::InvalidImageData)?;
        info!(directory = %directory.display(), size = faces[0].size, "loaded cubemap sky");
        Ok(Self::Cubemap {
            faces: Box::new(faces),
        })
    }

    /// Background color seen along `direction`.
    pub fn sample(&self, direction: Vec3) -> Vec3 {
        match self {
            Self::Gradient { horizon, zenith } => {
                let up = direction.normalize_or_zero().y.clamp(0.0, 1.0);
                horizon.lerp(*zenith, up)
            }
            Self::Cubemap { faces } => {
                let (face, uv) = cube_face_uv(direction);
                faces[face].sample(uv)
            }
        }
    }
}

/// Face index and texture coordinates for a direction, top-left origin.
fn cube_face_uv(d: Vec3) -> (usize, Vec2) {
    let a = d.abs();
    let (face, ma, sc, tc) = if a.x >= a.y && a.x >= a.z {
        if d.x > 0.0 {
            (0, a.x, -d.z, -d.y)
        } else {
            (1, a.x, d.z, -d.y)
        }
    } else if a.y >= a.z {
        if d.y > 0.0 {
            (2, a.y, d.x, d.z)
        } else {
            (3, a.y, d.x, -d.z)
        }
    } else if d.z > 0.0 {
        (4, a.z, d.x, -d.y)
    } else {
        (5, a.z, -d.x, -d.y)
    };
    let ma = ma.max(f32::EPSILON);
    (face, Vec2::new(sc / ma, tc / ma) * 0.5 + 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_blends_by_height() {
        let sky = Sky::Gradient {
            horizon: Vec3::X,
            zenith: Vec3::Z,
        };
        assert_eq!(sky.sample(Vec3::Y), Vec3::Z);
        assert_eq!(sky.sample(Vec3::X), Vec3::X);
        assert_eq!(sky.sample(Vec3::NEG_Y), Vec3::X);
        let mid = sky.sample(Vec3::new(1.0, 1.0, 0.0));
        assert!(mid.x > 0.0 && mid.z > 0.0);
    }

    #[test]
    fn cube_faces_by_major_axis() {
        assert_eq!(cube_face_uv(Vec3::X).0, 0);
        assert_eq!(cube_face_uv(Vec3::NEG_X).0, 1);
        assert_eq!(cube_face_uv(Vec3::Y).0, 2);
        assert_eq!(cube_face_uv(Vec3::NEG_Y).0, 3);
        assert_eq!(cube_face_uv(Vec3::Z).0, 4);
        assert_eq!(cube_face_uv(Vec3::NEG_Z).0, 5);
        assert_eq!(cube_face_uv(Vec3::Z).1, Vec2::splat(0.5));
    }

    #[test]
    fn cubemap_roundtrip_through_files() {
        let dir = std::env::temp_dir().join(format!("voxtrace-sky-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for (i, name) in CUBEMAP_FACES.iter().enumerate() {
            let shade = (i as u8) * 40;
            let img = image::RgbImage::from_pixel(4, 4, image::Rgb([shade, shade, shade]));
            img.save(dir.join(name)).unwrap();
        }
        let sky = Sky::from_config(&SkyConfig::Cubemap {
            directory: dir.clone(),
        })
        .unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert_eq!(sky.sample(Vec3::X), Vec3::ZERO);
        assert!(sky.sample(Vec3::NEG_Z).x > sky.sample(Vec3::Z).x);
    }

    #[test]
    fn missing_cubemap_is_error() {
        let result = Sky::load_cubemap(std::env::temp_dir().join("voxtrace-no-sky-here"));
        assert!(result.is_err());
    }
}
