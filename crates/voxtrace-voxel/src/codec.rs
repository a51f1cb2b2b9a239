//! Compressed voxel codec.
//!
//! A voxel is persisted as four little-endian-packed words, byte 0 being the
//! least significant:
//!
//! | word | byte 0     | byte 1     | byte 2      | byte 3      |
//! |------|------------|------------|-------------|-------------|
//! | 0    | normal.x   | normal.y   | normal.z    | material    |
//! | 1    | albedo.r   | albedo.g   | albedo.b    | specular.x  |
//! | 2    | specular.y | specular.z | diffuse.x hi| diffuse.x lo|
//! | 3    | diffuse.y hi| diffuse.y lo| diffuse.z hi| diffuse.z lo|
//!
//! Normals are biased into `[0, 1]` before quantizing. Diffuse light is kept
//! at 16 bits per channel, everything else at 8.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use voxtrace_core::MaterialId;

const UNORM8: f32 = 255.0;
const UNORM16: f32 = 65535.0;

/// Decoded voxel attributes. Transient; only ever produced from a
/// [`CompressedVoxel`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Voxel {
    /// Unit surface normal
    pub normal: Vec3,
    /// Material slot
    pub material: MaterialId,
    /// Reflectance, 0..1 per channel
    pub albedo: Vec3,
    /// Accumulated specular light
    pub specular: Vec3,
    /// Accumulated diffuse light
    pub diffuse: Vec3,
}

/// Persisted four-word voxel record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct CompressedVoxel {
    pub words: [u32; 4],
}

#[inline]
const fn byte(word: u32, index: u32) -> u32 {
    (word >> (index * 8)) & 0xFF
}

#[inline]
const fn pack_bytes(b0: u32, b1: u32, b2: u32, b3: u32) -> u32 {
    b0 | (b1 << 8) | (b2 << 16) | (b3 << 24)
}

#[inline]
fn unorm8(value: u32) -> f32 {
    value as f32 / UNORM8
}

#[inline]
fn unorm16(hi: u32, lo: u32) -> f32 {
    ((hi << 8) | lo) as f32 / UNORM16
}

#[inline]
fn quantize8(value: f32) -> u32 {
    (value * UNORM8).round().clamp(0.0, UNORM8) as u32
}

#[inline]
fn quantize16(value: f32) -> (u32, u32) {
    let v = (value * UNORM16).round().clamp(0.0, UNORM16) as u32;
    (v >> 8, v & 0xFF)
}

impl CompressedVoxel {
    /// Wrap raw words.
    #[inline]
    pub const fn from_words(words: [u32; 4]) -> Self {
        Self { words }
    }

    /// Material byte, readable without a full decode.
    #[inline]
    pub const fn material(&self) -> MaterialId {
        MaterialId((self.words[0] >> 24) as u8)
    }

    /// Fingerprint of albedo and material, used to tell whether a ray is
    /// still inside the same transparent block.
    #[inline]
    pub const fn identity(&self) -> u32 {
        (self.words[1] & 0x00FF_FFFF) | (self.words[0] & 0xFF00_0000)
    }

    /// Unpack every attribute.
    pub fn decode(&self) -> Voxel {
        let [w0, w1, w2, w3] = self.words;
        let normal = Vec3::new(
            unorm8(byte(w0, 0)),
            unorm8(byte(w0, 1)),
            unorm8(byte(w0, 2)),
        ) * 2.0
            - 1.0;
        Voxel {
            normal,
            material: self.material(),
            albedo: Vec3::new(
                unorm8(byte(w1, 0)),
                unorm8(byte(w1, 1)),
                unorm8(byte(w1, 2)),
            ),
            specular: Vec3::new(
                unorm8(byte(w1, 3)),
                unorm8(byte(w2, 0)),
                unorm8(byte(w2, 1)),
            ),
            diffuse: Vec3::new(
                unorm16(byte(w2, 2), byte(w2, 3)),
                unorm16(byte(w3, 0), byte(w3, 1)),
                unorm16(byte(w3, 2), byte(w3, 3)),
            ),
        }
    }

    /// Quantize a voxel. Components outside their range are clamped.
    pub fn encode(voxel: &Voxel) -> Self {
        let n = voxel.normal * 0.5 + 0.5;
        let (dx_hi, dx_lo) = quantize16(voxel.diffuse.x);
        let (dy_hi, dy_lo) = quantize16(voxel.diffuse.y);
        let (dz_hi, dz_lo) = quantize16(voxel.diffuse.z);
        Self {
            words: [
                pack_bytes(
                    quantize8(n.x),
                    quantize8(n.y),
                    quantize8(n.z),
                    u32::from(voxel.material.0),
                ),
                pack_bytes(
                    quantize8(voxel.albedo.x),
                    quantize8(voxel.albedo.y),
                    quantize8(voxel.albedo.z),
                    quantize8(voxel.specular.x),
                ),
                pack_bytes(
                    quantize8(voxel.specular.y),
                    quantize8(voxel.specular.z),
                    dx_hi,
                    dx_lo,
                ),
                pack_bytes(dy_hi, dy_lo, dz_hi, dz_lo),
            ],
        }
    }
}

impl From<&Voxel> for CompressedVoxel {
    fn from(voxel: &Voxel) -> Self {
        Self::encode(voxel)
    }
}

impl Voxel {
    /// Unlit voxel with a normal, material and albedo.
    pub fn new(normal: Vec3, material: MaterialId, albedo: Vec3) -> Self {
        Self {
            normal,
            material,
            albedo,
            ..Self::default()
        }
    }

    /// Quantize this voxel.
    #[inline]
    pub fn compress(&self) -> CompressedVoxel {
        CompressedVoxel::encode(self)
    }
}
