//! SafeSite Kernel
//!
//! This crate implements the core of a construction-site safety monitor.
//! A video source is scanned for persons, each person is checked for hard-hat
//! and hi-vis-vest presence, restricted-zone intrusions and unsafe proximity
//! are flagged, and violations are delivered to an alert store served over a
//! small HTTP API.
//!
//! # Architecture
//!
//! Per-frame control flow:
//!
//! 1. **Detector** (black box): frame in, person bounding boxes out.
//! 2. **ROI extraction**: each box is split into head and torso bands.
//! 3. **Garment classification**: HSV color-ratio thresholding per band.
//! 4. **Zone testing**: centroid-in-polygon against configured zones.
//! 5. **Proximity checking**: pairwise centroid distances.
//! 6. **Alert emission**: structured events, delivered best-effort.
//!
//! The capture loop runs in its own worker and publishes encoded frames to a
//! shared hub; HTTP handlers read the hub and the alert store, never the
//! camera handle.
//!
//! # Module Structure
//!
//! - `frame`: RGB frame container and clamped region access
//! - `ingest`: video sources (synthetic scenes, image directories)
//! - `detect`: person detector trait, backends, registry
//! - `ppe`: ROI split, HSV color-ratio classifier, model-based variant
//! - `zones`: polygonal zones and the point-in-polygon test
//! - `proximity`: pairwise distance checks
//! - `pipeline`: per-frame analyzer tying the above together
//! - `alert`: violation packaging and sink delivery
//! - `storage`: capped in-memory alert log
//! - `api`: HTTP API (alerts, stats, video snapshot, voice)
//! - `voice`: emergency call placement
//! - `capture`: capture worker and frame hub

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod alert;
pub mod api;
pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod ppe;
pub mod proximity;
pub mod storage;
pub mod voice;
pub mod zones;

pub use alert::{AlertEmitter, AlertSink, HttpAlertSink, MemoryAlertSink};
pub use capture::{CaptureHandle, FrameHub, MonitorState};
pub use detect::{BackendRegistry, BlobBackend, DetectorBackend, StubBackend};
pub use frame::{Frame, Region};
pub use ingest::{VideoConfig, VideoSource};
pub use pipeline::{AnalyzerConfig, FrameAnalysis, FrameAnalyzer};
pub use ppe::{ColorRatioClassifier, HsvRange, RoiSplit};
pub use proximity::{close_pairs, ProximityPair};
pub use storage::{AlertLog, SharedAlertLog, ALERT_LOG_CAPACITY};
pub use zones::Zone;

// -------------------- Geometry --------------------

/// Axis-aligned bounding box in pixel coordinates, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Width and height must be positive.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("bounding box must have positive width and height"));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Geometric center, used as the person's position proxy.
    pub fn centroid(&self) -> Point {
        Point {
            x: self.x + (self.width / 2) as i32,
            y: self.y + (self.height / 2) as i32,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Integer pixel coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

// -------------------- Violations --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    NoHelmet,
    NoVest,
    ZoneIntrusion,
    Proximity,
}

/// A violation found by the per-frame analyzer. Pure data, no timestamp yet;
/// the alert emitter stamps and delivers it.
#[derive(Clone, Debug, PartialEq)]
pub struct Violation {
    pub violation_type: ViolationType,
    pub bbox: Option<BoundingBox>,
    pub zone: Option<String>,
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Violation {
    pub fn new(violation_type: ViolationType) -> Self {
        Self {
            violation_type,
            bbox: None,
            zone: None,
            meta: serde_json::Map::new(),
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_zone(mut self, zone: &str) -> Self {
        self.zone = Some(zone.to_string());
        self
    }

    pub fn with_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        self.meta.insert(key.to_string(), value);
        self
    }
}

/// Wire shape delivered to the alert sink and stored in the alert log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(rename = "type")]
    pub alert_type: ViolationType,
    /// Millisecond epoch timestamp.
    pub ts: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_path: Option<String>,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

/// One detected person in one frame. Ephemeral: created per frame, never
/// carried across frames (no tracking or identity continuity).
///
/// `helmet_ok`/`vest_ok` are `None` when the corresponding color range is
/// absent from configuration: the check was skipped, no verdict either way.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonObservation {
    pub bbox: BoundingBox,
    pub centroid: Point,
    pub helmet_ok: Option<bool>,
    pub vest_ok: Option<bool>,
}

// -------------------- Time --------------------

pub fn now_ms() -> Result<u64> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(now.as_millis() as u64)
}

// -------------------- Zone Name Discipline --------------------

/// Zone names come from site configuration and end up in alert payloads and
/// log lines. Enforce a positive allowlist so a malformed config cannot smuggle
/// arbitrary bytes into either.
///
/// Allowed: "crane_radius", "Loading Bay 2", "pit-edge"
pub fn validate_zone_name(name: &str) -> Result<()> {
    // Compile once for hot paths.
    static ZONE_NAME_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = ZONE_NAME_RE
        .get_or_init(|| regex::Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _-]{0,63}$").unwrap());

    if !re.is_match(name) {
        return Err(anyhow!(
            "zone name must match ^[A-Za-z0-9][A-Za-z0-9 _-]{{0,63}}$"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_rejects_zero_dimensions() {
        assert!(BoundingBox::new(0, 0, 0, 10).is_err());
        assert!(BoundingBox::new(0, 0, 10, 0).is_err());
        assert!(BoundingBox::new(-5, -5, 10, 10).is_ok());
    }

    #[test]
    fn centroid_is_box_center() {
        let bbox = BoundingBox::new(10, 10, 40, 100).unwrap();
        assert_eq!(bbox.centroid(), Point::new(30, 60));
    }

    #[test]
    fn violation_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&ViolationType::NoHelmet).unwrap();
        assert_eq!(json, r#""NO_HELMET""#);
        let json = serde_json::to_string(&ViolationType::ZoneIntrusion).unwrap();
        assert_eq!(json, r#""ZONE_INTRUSION""#);
    }

    #[test]
    fn alert_payload_round_trips_optional_fields() {
        let payload = AlertPayload {
            alert_type: ViolationType::Proximity,
            ts: 1234,
            zone: None,
            frame_path: None,
            meta: serde_json::Map::new(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(!json.contains("zone"));
        let back: AlertPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn zone_name_allowlist() {
        assert!(validate_zone_name("crane_radius").is_ok());
        assert!(validate_zone_name("Loading Bay 2").is_ok());
        assert!(validate_zone_name("").is_err());
        assert!(validate_zone_name("bad/name").is_err());
        assert!(validate_zone_name(" leading-space").is_err());
    }
}
