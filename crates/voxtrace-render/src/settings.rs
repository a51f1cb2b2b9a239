//! Render settings, loadable from TOML.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::view::ViewMode;

/// Background seen where no voxel is hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkyConfig {
    /// Vertical blend from `horizon` (and below) to `zenith`.
    Gradient { horizon: [f32; 3], zenith: [f32; 3] },
    /// Six faces `px.png nx.png py.png ny.png pz.png nz.png` in `directory`.
    Cubemap { directory: PathBuf },
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self::Gradient {
            horizon: [0.75, 0.85, 1.0],
            zenith: [0.25, 0.45, 0.85],
        }
    }
}

/// Frame-constant inputs of the pixel kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub view_mode: ViewMode,
    /// Bend rays at transparent material boundaries.
    pub refraction: bool,
    pub sun_intensity: f32,
    /// Light floor applied to every lit surface.
    pub ambient: f32,
    /// Direction towards the sun.
    pub sun_direction: [f32; 3],
    /// Output exponent applied to every written color.
    pub gamma: f32,
    /// Limit traversal by the raster depth and show raster color behind it.
    pub compose_with_raster: bool,
    pub sky: SkyConfig,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::Lit,
            refraction: true,
            sun_intensity: 1.0,
            ambient: 0.25,
            sun_direction: [0.4, 1.0, 0.3],
            gamma: 1.0 / 2.2,
            compose_with_raster: false,
            sky: SkyConfig::default(),
        }
    }
}

impl RenderSettings {
    /// Parse settings; missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: Self = toml::from_str(source)?;
        Ok(settings.sanitized())
    }

    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&source)?;
        info!(path = %path.display(), view = %settings.view_mode, "loaded render settings");
        Ok(settings)
    }

    /// Normalized direction towards the sun.
    pub fn sun(&self) -> Vec3 {
        Vec3::from_array(self.sun_direction).normalize_or_zero()
    }

    /// Replace values the kernel cannot use with defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            warn!(gamma = self.gamma, "invalid gamma, using default");
            self.gamma = defaults.gamma;
        }
        if Vec3::from_array(self.sun_direction).length_squared() == 0.0 {
            warn!("zero sun direction, using default");
            self.sun_direction = defaults.sun_direction;
        }
        self
    }
}
