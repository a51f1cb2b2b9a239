//! Output view modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Quantity written to the output surface.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Fully shaded color with transparency and sky.
    #[default]
    Lit = 0,
    /// Voxel albedo.
    Albedo = 1,
    /// Accumulated diffuse light.
    Diffuse = 2,
    /// Accumulated specular light.
    Specular = 3,
    /// Per-voxel normal as RGB.
    VoxelNormal = 4,
    /// Normal of the face the ray entered through, as RGB.
    FaceNormal = 5,
    /// Heatmap of chunk and voxel steps taken per pixel.
    TraversalCost = 6,
}

impl ViewMode {
    pub const ALL: [Self; 7] = [
        Self::Lit,
        Self::Albedo,
        Self::Diffuse,
        Self::Specular,
        Self::VoxelNormal,
        Self::FaceNormal,
        Self::TraversalCost,
    ];

    /// Cycle to the next view mode.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Lit => Self::Albedo,
            Self::Albedo => Self::Diffuse,
            Self::Diffuse => Self::Specular,
            Self::Specular => Self::VoxelNormal,
            Self::VoxelNormal => Self::FaceNormal,
            Self::FaceNormal => Self::TraversalCost,
            Self::TraversalCost => Self::Lit,
        }
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Lit => "lit",
            Self::Albedo => "albedo",
            Self::Diffuse => "diffuse",
            Self::Specular => "specular",
            Self::VoxelNormal => "voxel_normal",
            Self::FaceNormal => "face_normal",
            Self::TraversalCost => "traversal_cost",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|m| m.name()).collect();
                format!("unknown view mode '{s}', expected one of: {}", names.join(", "))
            })
    }
}
