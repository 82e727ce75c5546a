use anyhow::Result;

use crate::frame::Frame;
use crate::BoundingBox;

/// Person detector trait.
///
/// The detector is an opaque capability: frame in, axis-aligned person boxes
/// out. The kernel makes no assumption about the algorithm behind it; the
/// decision pipeline only consumes bounding boxes.
///
/// Implementations must treat the frame as read-only and ephemeral, and must
/// not retain pixel data beyond the `detect` call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Detect persons in a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
