use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::frame::Frame;
use crate::BoundingBox;

/// Stub backend for tests and demos: returns scripted boxes.
///
/// `fixed` repeats the same boxes every frame; `sequence` plays a per-frame
/// script and returns nothing once exhausted.
pub struct StubBackend {
    fixed: Vec<BoundingBox>,
    script: Vec<Vec<BoundingBox>>,
    cursor: usize,
}

impl StubBackend {
    pub fn fixed(boxes: Vec<BoundingBox>) -> Self {
        Self {
            fixed: boxes,
            script: Vec::new(),
            cursor: 0,
        }
    }

    pub fn sequence(frames: Vec<Vec<BoundingBox>>) -> Self {
        Self {
            fixed: Vec::new(),
            script: frames,
            cursor: 0,
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::fixed(Vec::new())
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>> {
        if self.script.is_empty() {
            return Ok(self.fixed.clone());
        }
        let boxes = self.script.get(self.cursor).cloned().unwrap_or_default();
        self.cursor += 1;
        Ok(boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_boxes_repeat() {
        let bbox = BoundingBox::new(1, 2, 3, 4).unwrap();
        let mut backend = StubBackend::fixed(vec![bbox]);
        let frame = Frame::filled(10, 10, [0, 0, 0]);
        assert_eq!(backend.detect(&frame).unwrap(), vec![bbox]);
        assert_eq!(backend.detect(&frame).unwrap(), vec![bbox]);
    }

    #[test]
    fn sequence_plays_then_runs_dry() {
        let bbox = BoundingBox::new(1, 2, 3, 4).unwrap();
        let mut backend = StubBackend::sequence(vec![vec![bbox], vec![]]);
        let frame = Frame::filled(10, 10, [0, 0, 0]);
        assert_eq!(backend.detect(&frame).unwrap().len(), 1);
        assert!(backend.detect(&frame).unwrap().is_empty());
        assert!(backend.detect(&frame).unwrap().is_empty());
    }
}
