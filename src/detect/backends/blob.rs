use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::frame::Frame;
use crate::BoundingBox;

/// Background-difference blob detector, the built-in CPU baseline.
///
/// The first frame seen becomes the background. Later frames are compared
/// per-pixel on luminance; pixels that moved past `diff_threshold` form a
/// foreground mask, and 4-connected components large enough to be a person
/// are returned as bounding boxes.
///
/// This is a presence detector, not a person classifier: anything that enters
/// a static scene and is big enough will be boxed.
pub struct BlobBackend {
    diff_threshold: u8,
    min_area: u32,
    background: Option<Vec<u8>>,
}

impl BlobBackend {
    pub fn new(diff_threshold: u8, min_area: u32) -> Self {
        Self {
            diff_threshold,
            min_area,
            background: None,
        }
    }

    /// Drop the stored background; the next frame re-seeds it.
    pub fn reset(&mut self) {
        self.background = None;
    }

    fn luminance(frame: &Frame) -> Vec<u8> {
        let raw = frame.as_raw();
        let mut luma = Vec::with_capacity(raw.len() / 3);
        for px in raw.chunks_exact(3) {
            let y = (px[0] as u32 * 299 + px[1] as u32 * 587 + px[2] as u32 * 114) / 1000;
            luma.push(y as u8);
        }
        luma
    }
}

impl Default for BlobBackend {
    fn default() -> Self {
        Self::new(30, 600)
    }
}

impl DetectorBackend for BlobBackend {
    fn name(&self) -> &'static str {
        "blob"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
        let luma = Self::luminance(frame);

        let Some(background) = &self.background else {
            // First frame seeds the background; nothing to report yet.
            self.background = Some(luma);
            return Ok(Vec::new());
        };

        if background.len() != luma.len() {
            // Source changed resolution; re-seed.
            self.background = Some(luma);
            return Ok(Vec::new());
        }

        let width = frame.width as usize;
        let height = frame.height as usize;
        let mask: Vec<bool> = luma
            .iter()
            .zip(background.iter())
            .map(|(&a, &b)| a.abs_diff(b) > self.diff_threshold)
            .collect();

        Ok(connected_boxes(&mask, width, height, self.min_area))
    }
}

/// Bounding boxes of 4-connected foreground components with at least
/// `min_area` pixels.
fn connected_boxes(mask: &[bool], width: usize, height: usize, min_area: u32) -> Vec<BoundingBox> {
    let mut visited = vec![false; mask.len()];
    let mut boxes = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        let mut area = 0u32;
        let (mut min_x, mut min_y) = (width, height);
        let (mut max_x, mut max_y) = (0usize, 0usize);

        visited[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            area += 1;
            let x = idx % width;
            let y = idx / width;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            let mut push = |n: usize| {
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            };
            if x > 0 {
                push(idx - 1);
            }
            if x + 1 < width {
                push(idx + 1);
            }
            if y > 0 {
                push(idx - width);
            }
            if y + 1 < height {
                push(idx + width);
            }
        }

        if area >= min_area {
            if let Ok(bbox) = BoundingBox::new(
                min_x as i32,
                min_y as i32,
                (max_x - min_x + 1) as u32,
                (max_y - min_y + 1) as u32,
            ) {
                boxes.push(bbox);
            }
        }
    }

    boxes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_seeds_background() {
        let mut backend = BlobBackend::new(30, 10);
        let frame = Frame::filled(40, 40, [50, 50, 50]);
        assert!(backend.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn new_bright_blob_is_boxed() {
        let mut backend = BlobBackend::new(30, 10);
        let background = Frame::filled(40, 40, [50, 50, 50]);
        backend.detect(&background).unwrap();

        let mut scene = background.clone();
        scene.fill_rect(10, 5, 8, 16, [250, 250, 250]);
        let boxes = backend.detect(&scene).unwrap();

        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0], BoundingBox::new(10, 5, 8, 16).unwrap());
    }

    #[test]
    fn small_noise_is_ignored() {
        let mut backend = BlobBackend::new(30, 50);
        let background = Frame::filled(40, 40, [50, 50, 50]);
        backend.detect(&background).unwrap();

        let mut scene = background.clone();
        scene.fill_rect(10, 10, 3, 3, [250, 250, 250]);
        assert!(backend.detect(&scene).unwrap().is_empty());
    }

    #[test]
    fn separate_blobs_get_separate_boxes() {
        let mut backend = BlobBackend::new(30, 10);
        let background = Frame::filled(60, 40, [50, 50, 50]);
        backend.detect(&background).unwrap();

        let mut scene = background.clone();
        scene.fill_rect(5, 5, 6, 10, [250, 250, 250]);
        scene.fill_rect(40, 20, 6, 10, [250, 250, 250]);
        let boxes = backend.detect(&scene).unwrap();
        assert_eq!(boxes.len(), 2);
    }
}
