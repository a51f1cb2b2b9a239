//! Frame loop: orbit, render, page, save.

use std::time::Instant;

use anyhow::{bail, Context};
use glam::Vec3;
use tracing::{debug, info};
use voxtrace_core::constants::CHUNK_SIZE;
use voxtrace_render::{save_frame, Camera, FrameRenderer, RenderSettings, ScreenshotConfig, ViewMode};
use voxtrace_world::{ChunkPager, ChunkStore, VoxelWorld};

use crate::terrain::{generate_world, WorldParams};

/// Orbit angle advanced per frame, in radians.
const ORBIT_SPEED: f32 = 0.05;

/// Viewer options from the command line.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub width: u32,
    pub height: u32,
    pub screenshots: ScreenshotConfig,
    pub settings: RenderSettings,
    pub world: WorldParams,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            screenshots: ScreenshotConfig::new("frame_{}.png").with_frames(0..8),
            settings: RenderSettings::default(),
            world: WorldParams::default(),
        }
    }
}

impl ViewerConfig {
    /// Parse options, program name excluded. `--config` is applied first so
    /// the other flags override it regardless of order.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let args: Vec<String> = args.into_iter().collect();
        let mut config = Self::default();

        if let Some(path) = flag_value(&args, &["-c", "--config"]) {
            config.settings = RenderSettings::load(path)
                .with_context(|| format!("loading render settings from {path}"))?;
        }

        let mut args = args.iter();
        while let Some(flag) = args.next() {
            let flag = flag.as_str();
            match flag {
                "-W" | "--width" => config.width = next_value(&mut args, flag)?.parse().context("--width")?,
                "-H" | "--height" => config.height = next_value(&mut args, flag)?.parse().context("--height")?,
                "-f" | "--frames" => {
                    let output = config.screenshots.output_pattern.clone();
                    config.screenshots =
                        ScreenshotConfig::new(output).with_selection(next_value(&mut args, flag)?)?;
                }
                "-o" | "--output" => {
                    config.screenshots.output_pattern = next_value(&mut args, flag)?.to_string();
                }
                "-c" | "--config" => {
                    next_value(&mut args, flag)?;
                }
                "--view" => {
                    config.settings.view_mode = next_value(&mut args, flag)?
                        .parse::<ViewMode>()
                        .map_err(anyhow::Error::msg)?;
                }
                "--seed" => config.world.seed = next_value(&mut args, flag)?.parse().context("--seed")?,
                "--no-refraction" => config.settings.refraction = false,
                "--resident" => config.world.resident = true,
                other => bail!("unknown option '{other}', see --help"),
            }
        }

        if config.width == 0 || config.height == 0 {
            bail!("image size must be non-zero, got {}x{}", config.width, config.height);
        }
        Ok(config)
    }

    /// Frames to render: up to and including the last one saved.
    fn frame_count(&self) -> u64 {
        self.screenshots.last_frame().map_or(1, |last| last + 1)
    }
}

fn next_value<'a>(args: &mut std::slice::Iter<'a, String>, flag: &str) -> anyhow::Result<&'a str> {
    args.next()
        .map(String::as_str)
        .with_context(|| format!("{flag} needs a value"))
}

fn flag_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|arg| names.contains(&arg.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Viewer state.
pub struct Viewer {
    config: ViewerConfig,
    world: VoxelWorld,
    /// Chunk data not yet resident, `None` for a resident world.
    store: Option<ChunkStore>,
    pager: ChunkPager,
    renderer: FrameRenderer,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> anyhow::Result<Self> {
        let generated = generate_world(&config.world)?;
        let renderer = FrameRenderer::new(config.settings.clone())?;
        info!(
            width = config.width,
            height = config.height,
            view = %config.settings.view_mode,
            refraction = config.settings.refraction,
            "viewer ready"
        );
        Ok(Self {
            config,
            world: generated.world,
            store: generated.store,
            pager: ChunkPager::default(),
            renderer,
        })
    }

    /// Camera for a frame: orbiting the map center above the terrain.
    fn camera(&self, frame: u64) -> Camera {
        let extent = self.world.map.size().as_vec3() * CHUNK_SIZE as f32;
        let center = extent * Vec3::new(0.5, 0.3, 0.5);
        Camera::orbit(
            center,
            extent.x * 0.75,
            extent.y * 0.6,
            frame as f32 * ORBIT_SPEED,
            self.config.width as f32 / self.config.height as f32,
        )
    }

    /// Render every frame, saving the selected ones.
    pub fn run(mut self) -> anyhow::Result<()> {
        let frames = self.config.frame_count();
        let start = Instant::now();

        for index in 0..frames {
            let camera = self.camera(index);
            self.pager.begin_frame(&self.world);

            let frame = self
                .renderer
                .render(&self.world, &camera, self.config.width, self.config.height)?;

            if let Some(store) = &self.store {
                let focus = camera.position / CHUNK_SIZE as f32;
                let report = self.pager.service(&mut self.world, store, focus)?;
                debug!(
                    frame = index,
                    loaded = report.loaded,
                    deferred = report.deferred,
                    evicted = report.evicted,
                    "paged chunks"
                );
            }

            let [missing, unloaded, loaded, requested] = self.world.map.state_counts();
            info!(
                frame = index,
                ms = frame.elapsed.as_secs_f64() * 1000.0,
                hits = frame.stats.hits,
                steps_per_pixel = frame.stats.steps_per_pixel(),
                requests = frame.stats.requests_issued,
                loaded,
                unloaded,
                requested,
                missing,
                "frame rendered"
            );

            if self.config.screenshots.should_capture(index) {
                save_frame(&frame, self.config.screenshots.output_path(index))?;
            }
        }

        info!(frames, seconds = start.elapsed().as_secs_f64(), "done");
        Ok(())
    }
}
