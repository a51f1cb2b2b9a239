//! voxtrace demo viewer
//!
//! Generates procedural terrain, orbits a camera around it and writes the
//! rendered frames to PNG files. Unless `--resident` is given the world
//! starts with every chunk unloaded, and chunks are paged in between frames
//! as traversal requests them.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -p voxtrace-viewer -- [OPTIONS]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Eight frames of the default orbit
//! cargo run --release -p voxtrace-viewer
//!
//! # Normals of a resident world, frames 0 and 30 only
//! cargo run --release -p voxtrace-viewer -- --resident --view face_normal -f 0,30
//!
//! # Settings from a file
//! cargo run --release -p voxtrace-viewer -- --config render.toml -o out/orbit_{}.png
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod app;
mod terrain;

use tracing_subscriber::EnvFilter;

use crate::app::{Viewer, ViewerConfig};

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ViewerConfig::from_args(std::env::args().skip(1))?;
    Viewer::new(config)?.run()
}

fn print_help() {
    eprintln!(
        "voxtrace demo viewer

USAGE:
    cargo run --release -p voxtrace-viewer -- [OPTIONS]

OUTPUT OPTIONS:
    -W, --width <N>         Image width in pixels (default: 640)
    -H, --height <N>        Image height in pixels (default: 360)
    -f, --frames <FRAMES>   Frames to save; rendering stops after the last one
                            Examples: \"0\" \"0,10,20\" \"0-5\" \"0,5-10,20\"
                            Default: 0-7
    -o, --output <PATTERN>  Output path pattern (use {{}} for frame number)
                            Default: frame_{{}}.png

RENDER OPTIONS:
    -c, --config <PATH>     Load render settings from a TOML file
    --view <MODE>           lit, albedo, diffuse, specular, voxel_normal,
                            face_normal or traversal_cost
    --no-refraction         Keep rays straight through transparent voxels

WORLD OPTIONS:
    --seed <N>              World generation seed (default: 42)
    --resident              Load every chunk up front instead of paging

OTHER:
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)"
    );
}
