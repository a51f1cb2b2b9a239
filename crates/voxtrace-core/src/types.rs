//! Materials and the flat material lookup table.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Material index as stored in the top byte of a compressed voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct MaterialId(pub u8);

impl MaterialId {
    /// Slot used as the fallback for unknown ids.
    pub const DEFAULT: Self = Self(0);
}

impl From<u8> for MaterialId {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

/// Surface response of a voxel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Output albedo unlit
    pub emissive: bool,
    /// Opacity (1.0 = opaque)
    pub opacity: f32,
    /// Refraction index of the medium inside the voxel
    pub refraction_index: f32,
    /// Specular fraction, remainder is diffuse
    pub specular: f32,
    /// Add the sky seen along the reflected direction
    pub reflect_sky: bool,
    /// Sun highlight exponent
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self::OPAQUE
    }
}

impl Material {
    /// Plain diffuse opaque surface
    pub const OPAQUE: Self = Self {
        emissive: false,
        opacity: 1.0,
        refraction_index: 1.0,
        specular: 0.0,
        reflect_sky: false,
        shininess: 1.0,
    };

    /// Clear glass
    pub const GLASS: Self = Self {
        emissive: false,
        opacity: 0.2,
        refraction_index: 1.5,
        specular: 0.6,
        reflect_sky: true,
        shininess: 64.0,
    };

    /// Water
    pub const WATER: Self = Self {
        emissive: false,
        opacity: 0.5,
        refraction_index: 1.33,
        specular: 0.4,
        reflect_sky: true,
        shininess: 32.0,
    };

    /// Light source
    pub const EMISSIVE: Self = Self {
        emissive: true,
        ..Self::OPAQUE
    };

    /// Returns true if rays stop at this material
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.opacity >= 1.0
    }
}

/// Flat material lookup, read-only during a frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    /// Create a table, slot `i` holding material id `i`.
    pub fn new(materials: Vec<Material>) -> Self {
        if materials.len() > 256 {
            warn!(
                count = materials.len(),
                "material table larger than the id space, extra entries are unreachable"
            );
        }
        Self { materials }
    }

    /// Append a material and return its id, `None` once all 256 ids are taken.
    pub fn push(&mut self, material: Material) -> Option<MaterialId> {
        let id = u8::try_from(self.materials.len()).ok()?;
        self.materials.push(material);
        Some(MaterialId(id))
    }

    /// Look up a material. Unknown ids fall back to slot 0, or a plain
    /// opaque material when the table is empty.
    #[inline]
    pub fn get(&self, id: MaterialId) -> Material {
        self.materials
            .get(id.0 as usize)
            .or_else(|| self.materials.first())
            .copied()
            .unwrap_or(Material::OPAQUE)
    }

    /// Whether `id` has its own slot.
    pub fn contains(&self, id: MaterialId) -> bool {
        (id.0 as usize) < self.materials.len()
    }

    /// Number of materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Returns true if the table holds no materials
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Iterate materials in id order
    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .iter()
            .enumerate()
            .map(|(i, m)| (MaterialId(i as u8), m))
    }
}
