//! Render-side error type.

use thiserror::Error;

/// Errors from setting up or writing out a render. Tracing itself never
/// fails.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Image decode or encode failure
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Malformed settings file
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output or raster surface with unusable dimensions
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Unparseable frame selection such as `"3-x"`
    #[error("Invalid frame selection: {0}")]
    InvalidFrames(String),

    /// Pixel buffer does not match its declared dimensions
    #[error("Invalid image data")]
    InvalidImageData,

    /// World-level failure
    #[error(transparent)]
    World(#[from] voxtrace_core::Error),
}

/// Result type alias for rendering.
pub type Result<T> = std::result::Result<T, RenderError>;
