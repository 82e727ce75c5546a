//! Synthetic scene source.
//!
//! Generates a deterministic construction-site scene for demos and tests:
//! a flat background, then painted "persons" entering and moving across the
//! view. Persons alternate between a compliant look (hi-vis head and torso
//! bands) and a violating look (dark bands), so the full pipeline has
//! something to find without a camera attached.

use anyhow::Result;

use super::{SourceStats, VideoConfig};
use crate::frame::Frame;

const BACKGROUND: [u8; 3] = [70, 72, 75];
const HI_VIS: [u8; 3] = [255, 220, 0];
const DARK_CLOTHING: [u8; 3] = [25, 25, 30];
const SUIT: [u8; 3] = [120, 118, 115];

/// Frames of empty background emitted before persons appear, so
/// background-difference detectors can seed.
const WARMUP_FRAMES: u64 = 2;

pub struct SyntheticScene {
    config: VideoConfig,
    frame_count: u64,
}

impl SyntheticScene {
    pub fn new(config: VideoConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    pub fn connect(&mut self) -> Result<()> {
        log::info!(
            "synthetic scene '{}' connected ({}x{})",
            self.config.source,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut frame = Frame::filled(self.config.width, self.config.height, BACKGROUND);

        if self.frame_count >= WARMUP_FRAMES {
            let step = (self.frame_count - WARMUP_FRAMES) as i32;
            let person_w = (self.config.width / 12).max(8);
            let person_h = (self.config.height / 3).max(24);
            let y = (self.config.height / 3) as i32;

            // Compliant worker walking right.
            let x1 = 10 + step * 4;
            self.paint_person(&mut frame, x1, y, person_w, person_h, HI_VIS, HI_VIS);

            // Violator trailing behind, closing the distance.
            let x2 = x1 - (person_w as i32 * 3) + step;
            self.paint_person(
                &mut frame,
                x2,
                y,
                person_w,
                person_h,
                DARK_CLOTHING,
                DARK_CLOTHING,
            );
        }

        self.frame_count += 1;
        Ok(Some(frame))
    }

    fn paint_person(
        &self,
        frame: &mut Frame,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        helmet: [u8; 3],
        vest: [u8; 3],
    ) {
        let head_h = (h as f32 * 0.4) as u32;
        let torso_h = (h as f32 * 0.8) as u32 - head_h;
        frame.fill_rect(x, y, w, h, SUIT);
        frame.fill_rect(x, y, w, head_h, helmet);
        frame.fill_rect(x, y + head_h as i32, w, torso_h, vest);
    }

    pub fn is_healthy(&self) -> bool {
        true
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            description: self.config.source.clone(),
        }
    }
}
