//! Model-based PPE detection.
//!
//! The richer alternative to color-ratio thresholding: a box model labels
//! heads and helmets in the full frame, and a head with no helmet overlapping
//! above an IoU threshold is a violation. The box model itself is an opaque
//! capability behind `HeadgearModel`; the matching logic here is pure.

use anyhow::Result;

use crate::frame::Frame;
use crate::BoundingBox;

/// Intersection over union of two boxes. 0.0 when they do not overlap.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let xi1 = a.x.max(b.x);
    let yi1 = a.y.max(b.y);
    let xi2 = a.right().min(b.right());
    let yi2 = a.bottom().min(b.bottom());

    let inter_w = (xi2 - xi1).max(0) as u64;
    let inter_h = (yi2 - yi1).max(0) as u64;
    let inter = inter_w * inter_h;

    let union = a.area() + b.area() - inter;
    if union == 0 {
        return 0.0;
    }
    inter as f64 / union as f64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadgearLabel {
    Head,
    Helmet,
}

/// One labeled detection from the box model.
#[derive(Clone, Debug)]
pub struct LabeledBox {
    pub bbox: BoundingBox,
    pub label: HeadgearLabel,
    pub confidence: f32,
}

/// Opaque head/helmet box model. Implementations run whatever inference they
/// like; the kernel only consumes labeled boxes.
pub trait HeadgearModel: Send {
    fn name(&self) -> &'static str;

    fn infer_boxes(&mut self, frame: &Frame) -> Result<Vec<LabeledBox>>;
}

/// Per-frame PPE inference output: heads left unprotected, and the PPE boxes
/// that were detected.
#[derive(Clone, Debug, Default)]
pub struct PpeInference {
    pub violations: Vec<BoundingBox>,
    pub ppe: Vec<BoundingBox>,
}

/// Drop-in alternative to the color-ratio classifier seam.
pub trait PpeModel: Send {
    fn name(&self) -> &'static str;

    fn infer(&mut self, frame: &Frame) -> Result<PpeInference>;
}

/// Heads with no helmet overlapping above `iou_threshold`.
pub fn unprotected_heads(
    heads: &[BoundingBox],
    helmets: &[BoundingBox],
    iou_threshold: f64,
) -> Vec<BoundingBox> {
    heads
        .iter()
        .filter(|head| {
            !helmets
                .iter()
                .any(|helmet| iou(head, helmet) > iou_threshold)
        })
        .copied()
        .collect()
}

/// PPE inference over any `HeadgearModel`: filter by confidence, split by
/// label, match heads against helmets.
pub struct HeadgearPpe<M: HeadgearModel> {
    model: M,
    confidence_threshold: f32,
    iou_threshold: f64,
}

impl<M: HeadgearModel> HeadgearPpe<M> {
    pub fn new(model: M, confidence_threshold: f32) -> Self {
        Self {
            model,
            confidence_threshold,
            iou_threshold: 0.3,
        }
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f64) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }
}

impl<M: HeadgearModel> PpeModel for HeadgearPpe<M> {
    fn name(&self) -> &'static str {
        self.model.name()
    }

    fn infer(&mut self, frame: &Frame) -> Result<PpeInference> {
        let boxes = self.model.infer_boxes(frame)?;

        let mut heads = Vec::new();
        let mut helmets = Vec::new();
        for b in boxes {
            if b.confidence < self.confidence_threshold {
                continue;
            }
            match b.label {
                HeadgearLabel::Head => heads.push(b.bbox),
                HeadgearLabel::Helmet => helmets.push(b.bbox),
            }
        }

        let violations = unprotected_heads(&heads, &helmets, self.iou_threshold);
        Ok(PpeInference {
            violations,
            ppe: helmets,
        })
    }
}

/// Scripted model for tests: returns the same labeled boxes every frame.
pub struct StubHeadgearModel {
    boxes: Vec<LabeledBox>,
}

impl StubHeadgearModel {
    pub fn new(boxes: Vec<LabeledBox>) -> Self {
        Self { boxes }
    }
}

impl HeadgearModel for StubHeadgearModel {
    fn name(&self) -> &'static str {
        "stub-headgear"
    }

    fn infer_boxes(&mut self, _frame: &Frame) -> Result<Vec<LabeledBox>> {
        Ok(self.boxes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: i32, y: i32, w: u32, h: u32) -> BoundingBox {
        BoundingBox::new(x, y, w, h).unwrap()
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = bbox(10, 10, 20, 20);
        assert_eq!(iou(&a, &a), 1.0);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = bbox(0, 0, 10, 10);
        let b = bbox(100, 100, 10, 10);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        // 10x10 boxes offset by 5 in x: intersection 50, union 150.
        let a = bbox(0, 0, 10, 10);
        let b = bbox(5, 0, 10, 10);
        let value = iou(&a, &b);
        assert!((value - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn head_with_overlapping_helmet_is_protected() {
        let heads = vec![bbox(10, 10, 20, 20)];
        let helmets = vec![bbox(12, 8, 20, 20)];
        assert!(unprotected_heads(&heads, &helmets, 0.3).is_empty());
    }

    #[test]
    fn head_without_helmet_is_a_violation() {
        let heads = vec![bbox(10, 10, 20, 20), bbox(100, 10, 20, 20)];
        let helmets = vec![bbox(12, 8, 20, 20)];
        let violations = unprotected_heads(&heads, &helmets, 0.3);
        assert_eq!(violations, vec![bbox(100, 10, 20, 20)]);
    }

    #[test]
    fn headgear_ppe_filters_by_confidence() {
        let model = StubHeadgearModel::new(vec![
            LabeledBox {
                bbox: bbox(10, 10, 20, 20),
                label: HeadgearLabel::Head,
                confidence: 0.9,
            },
            // Helmet below the confidence threshold: discarded, so the head
            // above stays unprotected.
            LabeledBox {
                bbox: bbox(12, 8, 20, 20),
                label: HeadgearLabel::Helmet,
                confidence: 0.2,
            },
        ]);
        let mut ppe = HeadgearPpe::new(model, 0.5);
        let frame = Frame::filled(200, 200, [0, 0, 0]);
        let out = ppe.infer(&frame).unwrap();
        assert_eq!(out.violations.len(), 1);
        assert!(out.ppe.is_empty());
    }
}
