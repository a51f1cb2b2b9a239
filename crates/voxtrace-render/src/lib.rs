//! Two-level CPU ray marching for voxtrace worlds.
//!
//! This crate provides:
//! - Map and chunk steppers with transparency and refraction
//! - The per-pixel kernel and tiled frame rendering
//! - Camera, sky and raster composition inputs
//! - Render settings and screenshot output

pub mod camera;
pub mod chunk_stepper;
pub mod context;
pub mod error;
pub mod frame;
pub mod kernel;
pub mod map_stepper;
pub mod raster;
pub mod screenshot;
pub mod settings;
pub mod shading;
pub mod sky;
pub mod view;

pub use camera::{Camera, CameraMatrices};
pub use chunk_stepper::{ChunkEntry, ChunkHit, ChunkOutcome, ChunkStepper};
pub use context::{RayContext, TraversalStats};
pub use error::{RenderError, Result};
pub use frame::{Frame, FrameRenderer, FrameStats, TILE_SIZE};
pub use kernel::{PixelKernel, PixelSample};
pub use map_stepper::{MapOutcome, MapStepper, SurfaceHit};
pub use raster::RasterSurface;
pub use screenshot::{parse_frame_indices, save_frame, ScreenshotConfig};
pub use settings::{RenderSettings, SkyConfig};
pub use shading::Lighting;
pub use sky::Sky;
pub use view::ViewMode;
