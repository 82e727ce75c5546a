//! Per-frame analysis pipeline.
//!
//! Turns the detector's person boxes into violations: ROI extraction, garment
//! classification, zone testing, and proximity checking, in that order. The
//! analyzer is pure over the current frame's data; every frame's analysis is
//! self-contained and nothing is carried across frames.

use serde_json::json;

use crate::frame::Frame;
use crate::ppe::{ColorRatioClassifier, RoiSplit};
use crate::proximity::close_pairs;
use crate::zones::Zone;
use crate::{BoundingBox, PersonObservation, Violation, ViolationType};

/// Everything the analyzer needs, owned explicitly and injected at
/// construction. A `None` classifier means that check is skipped: the
/// observation carries no verdict and no violation is produced for it.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    pub roi: RoiSplit,
    pub helmet: Option<ColorRatioClassifier>,
    pub vest: Option<ColorRatioClassifier>,
    pub zones: Vec<Zone>,
    pub proximity_pixels: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            roi: RoiSplit::default(),
            helmet: None,
            vest: None,
            zones: Vec::new(),
            proximity_pixels: 0,
        }
    }
}

/// Output of one frame's analysis.
#[derive(Clone, Debug, Default)]
pub struct FrameAnalysis {
    pub observations: Vec<PersonObservation>,
    pub violations: Vec<Violation>,
}

pub struct FrameAnalyzer {
    cfg: AnalyzerConfig,
}

impl FrameAnalyzer {
    pub fn new(cfg: AnalyzerConfig) -> Self {
        Self { cfg }
    }

    /// Analyze one frame's detections.
    pub fn analyze(&self, frame: &Frame, persons: &[BoundingBox]) -> FrameAnalysis {
        let mut analysis = FrameAnalysis::default();

        for bbox in persons {
            let centroid = bbox.centroid();

            let helmet_ok = self.cfg.helmet.as_ref().map(|classifier| {
                let region = self.cfg.roi.head_region(bbox, frame);
                let ratio = classifier.ratio(frame, region);
                let ok = classifier.present(frame, region);
                if !ok {
                    analysis.violations.push(
                        Violation::new(ViolationType::NoHelmet)
                            .with_bbox(*bbox)
                            .with_meta("ratio", json!(ratio)),
                    );
                }
                ok
            });

            let vest_ok = self.cfg.vest.as_ref().map(|classifier| {
                let region = self.cfg.roi.torso_region(bbox, frame);
                let ratio = classifier.ratio(frame, region);
                let ok = classifier.present(frame, region);
                if !ok {
                    analysis.violations.push(
                        Violation::new(ViolationType::NoVest)
                            .with_bbox(*bbox)
                            .with_meta("ratio", json!(ratio)),
                    );
                }
                ok
            });

            for zone in &self.cfg.zones {
                if zone.contains(centroid) {
                    analysis.violations.push(
                        Violation::new(ViolationType::ZoneIntrusion)
                            .with_bbox(*bbox)
                            .with_zone(&zone.name),
                    );
                }
            }

            analysis.observations.push(PersonObservation {
                bbox: *bbox,
                centroid,
                helmet_ok,
                vest_ok,
            });
        }

        if self.cfg.proximity_pixels > 0 {
            let centroids: Vec<_> = analysis.observations.iter().map(|o| o.centroid).collect();
            for pair in close_pairs(&centroids, self.cfg.proximity_pixels) {
                analysis.violations.push(
                    Violation::new(ViolationType::Proximity)
                        .with_meta("distance", json!(pair.distance))
                        .with_meta(
                            "centroids",
                            json!([
                                [centroids[pair.a].x, centroids[pair.a].y],
                                [centroids[pair.b].x, centroids[pair.b].y],
                            ]),
                        ),
                );
            }
        }

        analysis
    }
}
