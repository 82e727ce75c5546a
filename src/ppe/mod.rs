//! PPE compliance checks.
//!
//! Two instantiations of the same garment-presence question live here:
//!
//! - `color`: the cheap baseline. A person box is split into head and torso
//!   bands (`roi`), and each band is tested for the fraction of pixels inside
//!   a configured HSV range. Hue isolates color identity from brightness far
//!   better than RGB, which is why hi-vis garments are detected this way.
//! - `model`: the richer variant. A box model labels heads and helmets; a
//!   head with no helmet overlapping above an IoU threshold is a violation.
//!
//! Both are pure over the current frame's data.

pub mod color;
pub mod model;
pub mod roi;

pub use color::{mask_ratio, rgb_to_hsv, ColorRatioClassifier, HsvRange};
pub use model::{
    iou, unprotected_heads, HeadgearLabel, HeadgearModel, HeadgearPpe, LabeledBox, PpeInference,
    PpeModel, StubHeadgearModel,
};
pub use roi::RoiSplit;
