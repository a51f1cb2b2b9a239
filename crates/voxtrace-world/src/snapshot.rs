//! Binary world snapshots.
//!
//! All values are little-endian `u32` words:
//!
//! ```text
//! magic "VXTW" | version | map x | map y | map z
//! | handle count | chunk count | voxel count | material count
//! | handles  [flags, last_used, voxel_index] * handle count
//! | chunks   23 words each
//! | voxels   4 words each
//! | materials 6 words each
//! ```
//!
//! Handles, chunks and voxels keep their in-memory layouts word for word.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::UVec3;
use tracing::info;
use voxtrace_core::constants::CHUNK_VOLUME;
use voxtrace_core::{Error, Material, MaterialTable, Result};
use voxtrace_voxel::{Chunk, CompressedVoxel};

use crate::chunk_handle::ChunkHandle;
use crate::chunk_map::ChunkMap;
use crate::world::VoxelWorld;

/// File magic, `VXTW` read as little-endian bytes.
pub const SNAPSHOT_MAGIC: u32 = u32::from_le_bytes(*b"VXTW");
/// Current format version.
pub const SNAPSHOT_VERSION: u32 = 1;

const HEADER_WORDS: usize = 9;

/// Persisted form of a [`Material`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct MaterialRecord {
    emissive: u32,
    opacity: f32,
    refraction_index: f32,
    specular: f32,
    reflect_sky: u32,
    shininess: f32,
}

impl From<&Material> for MaterialRecord {
    fn from(m: &Material) -> Self {
        Self {
            emissive: u32::from(m.emissive),
            opacity: m.opacity,
            refraction_index: m.refraction_index,
            specular: m.specular,
            reflect_sky: u32::from(m.reflect_sky),
            shininess: m.shininess,
        }
    }
}

impl From<MaterialRecord> for Material {
    fn from(r: MaterialRecord) -> Self {
        Self {
            emissive: r.emissive != 0,
            opacity: r.opacity,
            refraction_index: r.refraction_index,
            specular: r.specular,
            reflect_sky: r.reflect_sky != 0,
            shininess: r.shininess,
        }
    }
}

fn write_words<W: Write>(writer: &mut W, words: &[u32]) -> Result<()> {
    for word in words {
        writer.write_all(&word.to_le_bytes())?;
    }
    Ok(())
}

fn read_words<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u32>> {
    let mut bytes = vec![0u8; count * 4];
    reader.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn read_records<R: Read, T: Pod>(reader: &mut R, count: usize) -> Result<Vec<T>> {
    let words_per = std::mem::size_of::<T>() / 4;
    let words = read_words(reader, count * words_per)?;
    Ok(bytemuck::cast_slice::<u32, T>(&words).to_vec())
}

/// Serialize a world.
pub fn write_world<W: Write>(world: &VoxelWorld, writer: &mut W) -> Result<()> {
    let size = world.map.size();
    let materials: Vec<MaterialRecord> = world
        .materials
        .iter()
        .map(|(_, m)| MaterialRecord::from(m))
        .collect();
    let header: [u32; HEADER_WORDS] = [
        SNAPSHOT_MAGIC,
        SNAPSHOT_VERSION,
        size.x,
        size.y,
        size.z,
        world.map.len() as u32,
        world.chunks.len() as u32,
        world.voxels.len() as u32,
        materials.len() as u32,
    ];
    write_words(writer, &header)?;

    let handles: Vec<u32> = world.map.handles().iter().flat_map(ChunkHandle::to_raw).collect();
    write_words(writer, &handles)?;
    write_words(writer, bytemuck::cast_slice(&world.chunks))?;
    write_words(writer, bytemuck::cast_slice(&world.voxels))?;
    write_words(writer, bytemuck::cast_slice(&materials))?;
    Ok(())
}

/// Deserialize a world written by [`write_world`].
pub fn read_world<R: Read>(reader: &mut R) -> Result<VoxelWorld> {
    let header = read_words(reader, HEADER_WORDS)?;
    if header[0] != SNAPSHOT_MAGIC {
        return Err(Error::InvalidData("not a voxtrace world snapshot".into()));
    }
    if header[1] != SNAPSHOT_VERSION {
        return Err(Error::InvalidData(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            header[1]
        )));
    }
    let size = UVec3::new(header[2], header[3], header[4]);
    let [handle_count, chunk_count, voxel_count, material_count] =
        [header[5], header[6], header[7], header[8]].map(|n| n as usize);
    check_counts(size, handle_count, chunk_count, voxel_count, material_count)?;

    let handles: Vec<ChunkHandle> = read_words(reader, handle_count * 3)?
        .chunks_exact(3)
        .map(|w| ChunkHandle::from_raw([w[0], w[1], w[2]]))
        .collect();
    let map = ChunkMap::from_handles(size, handles).ok_or_else(|| {
        Error::InvalidData(format!(
            "{handle_count} handles do not fill a {size} chunk map"
        ))
    })?;
    let chunks: Vec<Chunk> = read_records(reader, chunk_count)?;
    let voxels: Vec<CompressedVoxel> = read_records(reader, voxel_count)?;
    let materials: Vec<MaterialRecord> = read_records(reader, material_count)?;

    let world = VoxelWorld {
        map,
        chunks,
        voxels,
        materials: MaterialTable::new(materials.into_iter().map(Material::from).collect()),
    };
    validate(&world)?;
    Ok(world)
}

/// Reject header counts no valid world can have, before allocating for them.
fn check_counts(
    size: UVec3,
    handles: usize,
    chunks: usize,
    voxels: usize,
    materials: usize,
) -> Result<()> {
    let volume = ChunkMap::volume(size)
        .ok_or_else(|| Error::InvalidData(format!("chunk map size {size} overflows")))?;
    if handles != volume {
        return Err(Error::InvalidData(format!(
            "{handles} handles do not fill a {size} chunk map"
        )));
    }
    if chunks > volume {
        return Err(Error::InvalidData(format!(
            "{chunks} chunks do not fit a {size} chunk map"
        )));
    }
    if voxels > chunks.saturating_mul(CHUNK_VOLUME) {
        return Err(Error::InvalidData(format!(
            "{voxels} voxels do not fit in {chunks} chunks"
        )));
    }
    if materials > usize::from(u8::MAX) + 1 {
        return Err(Error::InvalidData(format!(
            "{materials} materials exceed the material id range"
        )));
    }
    Ok(())
}

/// Check that loaded handles point inside the pools.
fn validate(world: &VoxelWorld) -> Result<()> {
    for (index, handle) in world.map.handles().iter().enumerate() {
        if !handle.is_loaded() {
            continue;
        }
        let chunk = world.chunks.get(handle.chunk_index() as usize).ok_or_else(|| {
            Error::OutOfBounds(format!("handle {index} points past the chunk pool"))
        })?;
        let end = handle.voxel_index() as usize + chunk.voxel_count() as usize;
        if end > world.voxels.len() {
            return Err(Error::OutOfBounds(format!(
                "handle {index} voxel run ends at {end}, pool holds {}",
                world.voxels.len()
            )));
        }
    }
    Ok(())
}

/// Save a world snapshot to a file.
pub fn save_world(world: &VoxelWorld, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_world(world, &mut writer)?;
    writer.flush()?;
    info!(
        path = %path.display(),
        chunks = world.chunks.len(),
        voxels = world.voxels.len(),
        "saved world snapshot"
    );
    Ok(())
}

/// Load a world snapshot from a file.
pub fn load_world(path: impl AsRef<Path>) -> Result<VoxelWorld> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        _ => Error::Io(e),
    })?;
    let world = read_world(&mut BufReader::new(file))?;
    info!(
        path = %path.display(),
        chunks = world.chunks.len(),
        voxels = world.voxels.len(),
        "loaded world snapshot"
    );
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::TerrainGenerator;
    use crate::world::WorldBuilder;
    use glam::{IVec3, Vec3};
    use voxtrace_core::MaterialId;
    use voxtrace_voxel::Voxel;

    fn small_world() -> VoxelWorld {
        TerrainGenerator::with_seed(3)
            .generate(UVec3::new(2, 2, 2))
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn world_survives_snapshot() {
        let world = small_world();
        world.map.handle(0).mark_visible();
        world.map.handle(1).age();

        let mut bytes = Vec::new();
        write_world(&world, &mut bytes).unwrap();
        assert_eq!(&bytes[..4], b"VXTW");

        let loaded = read_world(&mut bytes.as_slice()).unwrap();
        assert_eq!(loaded.map.size(), world.map.size());
        assert_eq!(loaded.chunks, world.chunks);
        assert_eq!(loaded.voxels, world.voxels);
        assert_eq!(loaded.materials, world.materials);
        for (a, b) in loaded.map.handles().iter().zip(world.map.handles()) {
            assert_eq!(a.to_raw(), b.to_raw());
        }
    }

    #[test]
    fn snapshot_size_matches_layout() {
        let mut builder = WorldBuilder::new(UVec3::ONE);
        builder
            .set_voxel(IVec3::ZERO, &Voxel::new(Vec3::Y, MaterialId(0), Vec3::ONE))
            .unwrap();
        let world = builder.build().unwrap();

        let mut bytes = Vec::new();
        write_world(&world, &mut bytes).unwrap();
        assert_eq!(bytes.len(), 4 * (HEADER_WORDS + 3 + 23 + 4));
    }

    #[test]
    fn rejects_bad_magic_and_truncation() {
        let mut bytes = Vec::new();
        write_world(&small_world(), &mut bytes).unwrap();

        let mut corrupt = bytes.clone();
        corrupt[0] = b'X';
        assert!(matches!(
            read_world(&mut corrupt.as_slice()),
            Err(Error::InvalidData(_))
        ));

        let truncated = &bytes[..bytes.len() - 8];
        assert!(matches!(
            read_world(&mut &truncated[..]),
            Err(Error::Io(_))
        ));
    }

    fn header(words: [u32; HEADER_WORDS]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn rejects_impossible_header_counts() {
        let cases = [
            // Map volume wraps to zero in 32 bits.
            [SNAPSHOT_MAGIC, SNAPSHOT_VERSION, 65536, 65536, 1, 0, 0, 0, 0],
            [SNAPSHOT_MAGIC, SNAPSHOT_VERSION, u32::MAX, u32::MAX, u32::MAX, 0, 0, 0, 0],
            // Handle count disagrees with the map size.
            [SNAPSHOT_MAGIC, SNAPSHOT_VERSION, 2, 2, 2, u32::MAX, 0, 0, 0],
            // More chunks than cells, then more voxels than chunks can hold.
            [SNAPSHOT_MAGIC, SNAPSHOT_VERSION, 1, 1, 1, 1, u32::MAX, 0, 0],
            [SNAPSHOT_MAGIC, SNAPSHOT_VERSION, 1, 1, 1, 1, 1, 513, 0],
            [SNAPSHOT_MAGIC, SNAPSHOT_VERSION, 1, 1, 1, 1, 0, 0, u32::MAX],
        ];
        for words in cases {
            let bytes = header(words);
            assert!(
                matches!(read_world(&mut bytes.as_slice()), Err(Error::InvalidData(_))),
                "header {words:?} accepted"
            );
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = std::env::temp_dir().join("voxtrace-no-such-snapshot.vxtw");
        assert!(matches!(load_world(&path), Err(Error::NotFound(_))));
    }

    #[test]
    fn save_and_load_file() {
        let world = small_world();
        let path = std::env::temp_dir().join(format!(
            "voxtrace-snapshot-{}.vxtw",
            std::process::id()
        ));
        save_world(&world, &path).unwrap();
        let loaded = load_world(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.voxels.len(), world.voxels.len());
    }
}
