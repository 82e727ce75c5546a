//! HSV color-ratio garment classification.
//!
//! The classifier answers one question: does a helmet/vest-like colored
//! object occupy the expected band of a person box? It converts the band to
//! HSV, masks pixels inside an inclusive per-channel range, and compares the
//! matching fraction against a threshold. This is a cheap proxy, not object
//! detection; it will misfire on similarly colored clothing or background.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::frame::{Frame, Region};

/// Inclusive HSV bounds in the 8-bit convention: hue 0-179, sat/val 0-255.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub h1: u8,
    pub h2: u8,
    pub s1: u8,
    pub s2: u8,
    pub v1: u8,
    pub v2: u8,
}

impl HsvRange {
    /// Yellow/orange hi-vis family: hue 15-45, strongly saturated and bright.
    pub fn hi_vis() -> Self {
        Self {
            h1: 15,
            h2: 45,
            s1: 120,
            s2: 255,
            v1: 120,
            v2: 255,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.h1 > 179 || self.h2 > 179 {
            return Err(anyhow!("hue bounds must be within 0-179"));
        }
        if self.h1 > self.h2 || self.s1 > self.s2 || self.v1 > self.v2 {
            return Err(anyhow!("hsv range bounds must be ordered (lo <= hi)"));
        }
        Ok(())
    }

    pub fn contains(&self, h: u8, s: u8, v: u8) -> bool {
        (self.h1..=self.h2).contains(&h)
            && (self.s1..=self.s2).contains(&s)
            && (self.v1..=self.v2).contains(&v)
    }
}

/// RGB to 8-bit HSV (hue halved into 0-179, sat/val 0-255).
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let rf = r as f32;
    let gf = g as f32;
    let bf = b as f32;
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { delta / max * 255.0 };

    let h_deg = if delta == 0.0 {
        0.0
    } else if max == rf {
        let mut h = 60.0 * (gf - bf) / delta;
        if h < 0.0 {
            h += 360.0;
        }
        h
    } else if max == gf {
        60.0 * (bf - rf) / delta + 120.0
    } else {
        60.0 * (rf - gf) / delta + 240.0
    };

    let h = ((h_deg / 2.0).round() as i32).rem_euclid(180) as u8;
    (h, s.round() as u8, v.round() as u8)
}

/// Fraction of region pixels inside the range. A zero-area region yields 0.0.
pub fn mask_ratio(frame: &Frame, region: Region, range: &HsvRange) -> f64 {
    let total = region.area();
    if total == 0 {
        return 0.0;
    }
    let mut matching = 0u64;
    frame.for_each_region_pixel(region, |r, g, b| {
        let (h, s, v) = rgb_to_hsv(r, g, b);
        if range.contains(h, s, v) {
            matching += 1;
        }
    });
    matching as f64 / total as f64
}

/// Garment presence by color-ratio thresholding.
///
/// Two independent instances are used per frame: one for helmets over the
/// head band, one for vests over the torso band, each with its own range and
/// threshold.
#[derive(Clone, Copy, Debug)]
pub struct ColorRatioClassifier {
    range: HsvRange,
    threshold: f64,
}

impl ColorRatioClassifier {
    pub fn new(range: HsvRange, threshold: f64) -> Result<Self> {
        range.validate()?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!("ratio threshold must be within 0.0-1.0"));
        }
        Ok(Self { range, threshold })
    }

    pub fn ratio(&self, frame: &Frame, region: Region) -> f64 {
        mask_ratio(frame, region, &self.range)
    }

    /// Strictly greater than the threshold. An empty region never matches.
    pub fn present(&self, frame: &Frame, region: Region) -> bool {
        self.ratio(frame, region) > self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YELLOW: [u8; 3] = [255, 255, 0];
    const BLACK: [u8; 3] = [0, 0, 0];

    #[test]
    fn pure_yellow_maps_into_hi_vis_range() {
        let (h, s, v) = rgb_to_hsv(255, 255, 0);
        assert_eq!(h, 30);
        assert_eq!(s, 255);
        assert_eq!(v, 255);
        assert!(HsvRange::hi_vis().contains(h, s, v));
    }

    #[test]
    fn primaries_map_to_expected_hues() {
        assert_eq!(rgb_to_hsv(255, 0, 0).0, 0); // red
        assert_eq!(rgb_to_hsv(0, 255, 0).0, 60); // green
        assert_eq!(rgb_to_hsv(0, 0, 255).0, 120); // blue
        // grays carry no hue and no saturation
        assert_eq!(rgb_to_hsv(128, 128, 128), (0, 0, 128));
    }

    #[test]
    fn all_matching_region_yields_ratio_one() {
        let frame = Frame::filled(20, 20, YELLOW);
        let region = frame.clamp(0, 0, 20, 20);
        let ratio = mask_ratio(&frame, region, &HsvRange::hi_vis());
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn all_non_matching_region_yields_ratio_zero() {
        let frame = Frame::filled(20, 20, BLACK);
        let region = frame.clamp(0, 0, 20, 20);
        let ratio = mask_ratio(&frame, region, &HsvRange::hi_vis());
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn ratio_grows_with_matching_pixels() {
        let range = HsvRange::hi_vis();
        let mut frame = Frame::filled(10, 10, BLACK);
        let region = frame.clamp(0, 0, 10, 10);

        let mut last = mask_ratio(&frame, region, &range);
        for rows in [2u32, 5, 8] {
            frame.fill_rect(0, 0, 10, rows, YELLOW);
            let ratio = mask_ratio(&frame, region, &range);
            assert!(ratio > last, "ratio must grow as matching pixels are added");
            last = ratio;
        }
    }

    #[test]
    fn zero_area_region_classifies_absent() {
        let frame = Frame::filled(10, 10, YELLOW);
        let empty = frame.clamp(50, 50, 10, 10);
        assert!(empty.is_empty());
        let classifier = ColorRatioClassifier::new(HsvRange::hi_vis(), 0.15).unwrap();
        assert!(!classifier.present(&frame, empty));
    }

    #[test]
    fn threshold_is_strict() {
        // Exactly half the region matches; a threshold of 0.5 must not pass.
        let mut frame = Frame::filled(10, 10, BLACK);
        frame.fill_rect(0, 0, 10, 5, YELLOW);
        let region = frame.clamp(0, 0, 10, 10);

        let at = ColorRatioClassifier::new(HsvRange::hi_vis(), 0.5).unwrap();
        assert!(!at.present(&frame, region));
        let below = ColorRatioClassifier::new(HsvRange::hi_vis(), 0.49).unwrap();
        assert!(below.present(&frame, region));
    }

    #[test]
    fn invalid_ranges_rejected() {
        let mut range = HsvRange::hi_vis();
        range.h2 = 200;
        assert!(range.validate().is_err());
        let mut range = HsvRange::hi_vis();
        range.s1 = 200;
        range.s2 = 100;
        assert!(range.validate().is_err());
    }
}
