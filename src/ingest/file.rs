//! Image-directory playback source.
//!
//! Plays the JPEG/PNG files of a directory in filename order, decoding each
//! to an RGB frame. Undecodable files are skipped with a warning (a single
//! bad frame must not halt monitoring); running out of files ends the
//! stream.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::SourceStats;
use crate::frame::Frame;

pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    frame_count: u64,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("open frame directory {}", dir.display()))?
        {
            let path = entry?.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            if matches!(ext.as_deref(), Some("jpg" | "jpeg" | "png")) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(anyhow!(
                "frame directory {} contains no jpg/jpeg/png files",
                dir.display()
            ));
        }
        files.sort();
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            cursor: 0,
            frame_count: 0,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "image directory {} connected ({} frames)",
            self.dir.display(),
            self.files.len()
        );
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        while let Some(path) = self.files.get(self.cursor) {
            self.cursor += 1;
            match decode_image(path) {
                Ok(frame) => {
                    self.frame_count += 1;
                    return Ok(Some(frame));
                }
                Err(err) => {
                    log::warn!("skipping unreadable frame {}: {}", path.display(), err);
                }
            }
        }
        Ok(None)
    }

    pub fn is_healthy(&self) -> bool {
        self.cursor < self.files.len()
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            description: self.dir.display().to_string(),
        }
    }
}

fn decode_image(path: &Path) -> Result<Frame> {
    let bytes = std::fs::read(path).context("read image file")?;
    let image = image::load_from_memory(&bytes)
        .context("decode image")?
        .to_rgb8();
    let (width, height) = image.dimensions();
    Frame::new(image.into_raw(), width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_jpeg(dir: &Path, name: &str, rgb: [u8; 3]) {
        let frame = Frame::filled(8, 8, rgb);
        std::fs::write(dir.join(name), frame.to_jpeg(90).unwrap()).unwrap();
    }

    #[test]
    fn plays_files_in_name_order_then_ends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_jpeg(dir.path(), "b.jpg", [200, 0, 0]);
        write_jpeg(dir.path(), "a.jpg", [0, 200, 0]);

        let mut source = ImageDirSource::open(dir.path())?;
        source.connect()?;

        let first = source.next_frame()?.unwrap();
        // a.jpg first: green dominates.
        let px = first.pixel(4, 4);
        assert!(px[1] > px[0]);

        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn unreadable_files_are_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.jpg"), b"not a jpeg")?;
        write_jpeg(dir.path(), "b.jpg", [10, 10, 10]);

        let mut source = ImageDirSource::open(dir.path())?;
        assert!(source.next_frame()?.is_some());
        assert!(source.next_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn empty_directory_fails_at_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageDirSource::open(dir.path()).is_err());
    }
}
