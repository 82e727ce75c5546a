//! RGB frame container.
//!
//! A `Frame` owns a packed RGB8 pixel buffer. Analysis code reads pixels
//! through clamped `Region`s: a region is always inside frame bounds and may
//! be empty, so pixel reads never go out of range and clamping never fails.
//!
//! Frames also carry the small amount of drawing the monitor needs for alert
//! thumbnails (box outlines) and synthetic test scenes (filled rectangles).

use anyhow::{anyhow, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ImageEncoder;

use crate::BoundingBox;

/// Rectangular sub-area of a frame. Always within bounds; may have zero area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Packed RGB8 frame, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(anyhow!(
                "frame buffer size mismatch: got {} bytes, expected {} for {}x{} RGB",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Solid-color frame.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Caller must stay in bounds; analysis code goes through `Region`s.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    /// Clamp an arbitrary rectangle to frame bounds. Never fails; the result
    /// may be empty when the rectangle lies entirely outside the frame.
    pub fn clamp(&self, x: i32, y: i32, width: u32, height: u32) -> Region {
        let x0 = x.clamp(0, self.width as i32);
        let y0 = y.clamp(0, self.height as i32);
        let x1 = x.saturating_add(width.min(i32::MAX as u32) as i32)
            .clamp(0, self.width as i32);
        let y1 = y.saturating_add(height.min(i32::MAX as u32) as i32)
            .clamp(0, self.height as i32);
        Region {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }

    /// Visit every pixel of a clamped region.
    pub fn for_each_region_pixel<F: FnMut(u8, u8, u8)>(&self, region: Region, mut f: F) {
        for y in region.y..region.y + region.height {
            let row = y as usize * self.width as usize;
            for x in region.x..region.x + region.width {
                let idx = (row + x as usize) * 3;
                f(self.data[idx], self.data[idx + 1], self.data[idx + 2]);
            }
        }
    }

    /// Filled axis-aligned rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, rgb: [u8; 3]) {
        let region = self.clamp(x, y, width, height);
        for py in region.y..region.y + region.height {
            for px in region.x..region.x + region.width {
                self.set_pixel(px, py, rgb);
            }
        }
    }

    /// Rectangle outline for alert thumbnails.
    pub fn draw_rect(&mut self, bbox: &BoundingBox, rgb: [u8; 3]) {
        let region = self.clamp(bbox.x, bbox.y, bbox.width, bbox.height);
        if region.is_empty() {
            return;
        }
        let (x0, y0) = (region.x, region.y);
        let (x1, y1) = (region.x + region.width - 1, region.y + region.height - 1);
        for x in x0..=x1 {
            self.set_pixel(x, y0, rgb);
            self.set_pixel(x, y1, rgb);
        }
        for y in y0..=y1 {
            self.set_pixel(x0, y, rgb);
            self.set_pixel(x1, y, rgb);
        }
    }

    /// Encode as JPEG for thumbnails and the video snapshot endpoint.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, quality);
        encoder
            .write_image(
                &self.data,
                self.width,
                self.height,
                image::ExtendedColorType::Rgb8,
            )
            .context("encode frame as jpeg")?;
        Ok(out)
    }
}
