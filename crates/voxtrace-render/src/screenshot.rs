//! Writing rendered frames to image files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{RenderError, Result};
use crate::frame::Frame;

/// Which frames to save and where.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScreenshotConfig {
    /// Output path pattern, `{}` is replaced by the frame number.
    pub output_pattern: String,
    /// Frame indices to save. Empty saves every frame.
    pub frames: BTreeSet<u64>,
}

impl ScreenshotConfig {
    pub fn new(output_pattern: impl Into<String>) -> Self {
        Self {
            output_pattern: output_pattern.into(),
            frames: BTreeSet::new(),
        }
    }

    /// Restrict saving to `frames`.
    #[must_use]
    pub fn with_frames(mut self, frames: impl IntoIterator<Item = u64>) -> Self {
        self.frames.extend(frames);
        self
    }

    /// Restrict saving to a selection like `"0,5-10"`.
    pub fn with_selection(self, selection: &str) -> Result<Self> {
        let frames = parse_frame_indices(selection)?;
        Ok(self.with_frames(frames))
    }

    /// Path the given frame is saved to. A pattern without `{}` gets the
    /// frame number appended before the extension.
    pub fn output_path(&self, frame: u64) -> PathBuf {
        if self.output_pattern.contains("{}") {
            return PathBuf::from(self.output_pattern.replace("{}", &frame.to_string()));
        }
        let pattern = Path::new(&self.output_pattern);
        let stem = pattern
            .file_stem()
            .map_or_else(|| "frame".into(), |s| s.to_string_lossy());
        let name = match pattern.extension() {
            Some(ext) => format!("{stem}_{frame}.{}", ext.to_string_lossy()),
            None => format!("{stem}_{frame}.png"),
        };
        pattern.with_file_name(name)
    }

    /// Whether the given frame should be saved.
    pub fn should_capture(&self, frame: u64) -> bool {
        self.frames.is_empty() || self.frames.contains(&frame)
    }

    /// Highest selected frame, if the selection is bounded.
    pub fn last_frame(&self) -> Option<u64> {
        self.frames.last().copied()
    }
}

/// Parse frame indices from a string like `"0,5,10-15,20"`.
///
/// Ranges are inclusive. Empty parts are skipped.
pub fn parse_frame_indices(s: &str) -> Result<BTreeSet<u64>> {
    let invalid = || RenderError::InvalidFrames(s.to_string());
    let mut frames = BTreeSet::new();

    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u64 = start.trim().parse().map_err(|_| invalid())?;
                let end: u64 = end.trim().parse().map_err(|_| invalid())?;
                if start > end {
                    return Err(invalid());
                }
                frames.extend(start..=end);
            }
            None => {
                frames.insert(part.parse().map_err(|_| invalid())?);
            }
        }
    }

    Ok(frames)
}

/// Save a frame's image; the format follows the path's extension. Missing
/// parent directories are created.
pub fn save_frame(frame: &Frame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    frame.image.save(path)?;
    info!(
        path = %path.display(),
        width = frame.image.width(),
        height = frame.image.height(),
        "saved frame"
    );
    Ok(())
}
