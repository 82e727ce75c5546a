//! Video sources.
//!
//! This module provides the frame sources the capture worker reads from:
//! - Synthetic scenes (`stub://` URLs) for demos and tests
//! - Image directories (JPEG/PNG playback)
//!
//! All sources produce RGB `Frame`s. The source handle is exclusively owned
//! by the capture worker; concurrent reads from one handle are not supported.
//! A source that cannot be opened fails loudly at startup; a dead camera
//! must not look like an empty stream.

mod camera;
mod file;

pub use camera::SyntheticScene;
pub use file::ImageDirSource;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// Source configuration.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// `stub://<scene>` for a synthetic scene, otherwise a directory of
    /// image frames.
    pub source: String,
    /// Frame width (synthetic scenes only).
    pub width: u32,
    /// Frame height (synthetic scenes only).
    pub height: u32,
    /// Target frame rate; the capture worker paces to this.
    pub target_fps: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            source: "stub://site".to_string(),
            width: 640,
            height: 480,
            target_fps: 10,
        }
    }
}

/// Statistics for a video source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub description: String,
}

/// A video source: synthetic scene or image-directory playback.
pub struct VideoSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticScene),
    ImageDir(ImageDirSource),
}

impl VideoSource {
    pub fn open(config: &VideoConfig) -> Result<Self> {
        if config.source.starts_with("stub://") {
            return Ok(Self {
                backend: SourceBackend::Synthetic(SyntheticScene::new(config.clone())),
            });
        }
        let path = std::path::Path::new(&config.source);
        if path.is_dir() {
            return Ok(Self {
                backend: SourceBackend::ImageDir(ImageDirSource::open(path)?),
            });
        }
        Err(anyhow!(
            "video source '{}' is neither a stub:// scene nor an existing directory",
            config.source
        ))
    }

    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.connect(),
            SourceBackend::ImageDir(source) => source.connect(),
        }
    }

    /// Capture the next frame. `Ok(None)` signals end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(),
            SourceBackend::ImageDir(source) => source.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.is_healthy(),
            SourceBackend::ImageDir(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.stats(),
            SourceBackend::ImageDir(source) => source.stats(),
        }
    }
}
