//! Test harness for voxtrace.
//!
//! Provides CPU headless rendering, visual regression testing and shared
//! scene fixtures.

pub mod harness;
pub mod scenes;

use std::path::PathBuf;

pub use harness::{
    clean_dir, compare_images, create_diff_image, create_test_camera, HeadlessRenderer,
    VisualRegressionTest,
};

use thiserror::Error;
use voxtrace_render::RenderError;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("World error: {0}")]
    World(#[from] voxtrace_core::Error),
    #[error("Image comparison failed: {0}")]
    ImageComparison(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Visual regression test configuration.
#[derive(Debug, Clone)]
pub struct VisualTestConfig {
    /// Maximum allowed normalized difference (0.0-1.0).
    pub threshold: f64,
    /// Directory for baseline images.
    pub baseline_dir: PathBuf,
    /// Directory for test output images.
    pub output_dir: PathBuf,
}

impl Default for VisualTestConfig {
    fn default() -> Self {
        Self {
            threshold: 0.001,
            baseline_dir: PathBuf::from("assets/test_data/baselines"),
            output_dir: PathBuf::from("target/test_output"),
        }
    }
}
