//! Head/torso region extraction.
//!
//! A person bounding box is split into vertical bands by fixed fractions:
//! the head band covers the top of the box, the torso band the stretch below
//! it. Detection quality depends on these fractions, so they are carried in
//! configuration rather than hardcoded at the call site.

use anyhow::{anyhow, Result};

use crate::frame::{Frame, Region};
use crate::BoundingBox;

/// Vertical split of a person box into head and torso bands.
///
/// The head band spans `[0, head_frac)` of the box height, the torso band
/// `[head_frac, torso_frac)`. Both bands use the full box width. The default
/// split (0.40 / 0.80) matches typical upright person proportions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoiSplit {
    pub head_frac: f32,
    pub torso_frac: f32,
}

impl Default for RoiSplit {
    fn default() -> Self {
        Self {
            head_frac: 0.40,
            torso_frac: 0.80,
        }
    }
}

impl RoiSplit {
    pub fn new(head_frac: f32, torso_frac: f32) -> Result<Self> {
        if !(head_frac > 0.0 && head_frac < torso_frac && torso_frac <= 1.0) {
            return Err(anyhow!(
                "roi fractions must satisfy 0 < head_frac < torso_frac <= 1 (got {} / {})",
                head_frac,
                torso_frac
            ));
        }
        Ok(Self {
            head_frac,
            torso_frac,
        })
    }

    fn head_height(&self, bbox: &BoundingBox) -> u32 {
        (bbox.height as f32 * self.head_frac) as u32
    }

    /// Head band, clamped to the frame. May be empty at frame edges.
    pub fn head_region(&self, bbox: &BoundingBox, frame: &Frame) -> Region {
        frame.clamp(bbox.x, bbox.y, bbox.width, self.head_height(bbox))
    }

    /// Torso band, clamped to the frame. Starts exactly where the head band
    /// ends, so the two never overlap.
    pub fn torso_region(&self, bbox: &BoundingBox, frame: &Frame) -> Region {
        let head_h = self.head_height(bbox);
        let torso_end = (bbox.height as f32 * self.torso_frac) as u32;
        frame.clamp(
            bbox.x,
            bbox.y + head_h as i32,
            bbox.width,
            torso_end.saturating_sub(head_h),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_split_on_reference_box() {
        // bbox (10,10,40,100) with the default 0.40 head fraction:
        // head = (10,10,40,40), torso = (10,50,40,40).
        let frame = Frame::filled(200, 200, [0, 0, 0]);
        let bbox = BoundingBox::new(10, 10, 40, 100).unwrap();
        let split = RoiSplit::default();

        let head = split.head_region(&bbox, &frame);
        assert_eq!(
            head,
            Region {
                x: 10,
                y: 10,
                width: 40,
                height: 40
            }
        );

        let torso = split.torso_region(&bbox, &frame);
        assert_eq!(
            torso,
            Region {
                x: 10,
                y: 50,
                width: 40,
                height: 40
            }
        );

        // Disjoint bands: torso starts where head ends.
        assert_eq!(head.y + head.height, torso.y);
    }

    #[test]
    fn regions_clamp_at_frame_edges() {
        let frame = Frame::filled(50, 50, [0, 0, 0]);
        let bbox = BoundingBox::new(40, 40, 40, 100).unwrap();
        let split = RoiSplit::default();

        let head = split.head_region(&bbox, &frame);
        assert_eq!(head.x, 40);
        assert_eq!(head.width, 10);
        assert_eq!(head.height, 10);

        // Torso band starts below the frame entirely.
        let torso = split.torso_region(&bbox, &frame);
        assert!(torso.is_empty());
    }

    #[test]
    fn invalid_fractions_rejected() {
        assert!(RoiSplit::new(0.0, 0.8).is_err());
        assert!(RoiSplit::new(0.5, 0.5).is_err());
        assert!(RoiSplit::new(0.4, 1.1).is_err());
        assert!(RoiSplit::new(0.35, 0.75).is_ok());
    }
}
