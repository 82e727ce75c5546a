//! Alert packaging and delivery.
//!
//! The emitter turns analyzer violations into wire payloads: it stamps the
//! timestamp, saves an annotated frame thumbnail when a frames directory is
//! configured, and hands the payload to the sink.
//!
//! Delivery is best-effort: the sink call is bounded by a short timeout and
//! failures are logged and dropped. A slow or dead sink must never stall the
//! capture loop; monitoring continuity wins over alert completeness.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rand::RngCore;

use crate::frame::Frame;
use crate::storage::SharedAlertLog;
use crate::{now_ms, AlertPayload, Violation};

/// Sink delivery timeout. Keeps a dead network endpoint from stalling the
/// per-frame loop for more than about a second.
const SINK_TIMEOUT: Duration = Duration::from_secs(1);

const THUMBNAIL_JPEG_QUALITY: u8 = 80;

/// Alert delivery target.
pub trait AlertSink: Send {
    fn deliver(&self, alert: &AlertPayload) -> Result<()>;
}

/// POSTs alerts as JSON to an HTTP endpoint (the alert API's `/alerts`).
pub struct HttpAlertSink {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpAlertSink {
    pub fn new(endpoint: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(SINK_TIMEOUT)
            .build();
        Self {
            endpoint: endpoint.to_string(),
            agent,
        }
    }
}

impl AlertSink for HttpAlertSink {
    fn deliver(&self, alert: &AlertPayload) -> Result<()> {
        self.agent
            .post(&self.endpoint)
            .send_json(alert)
            .with_context(|| format!("post alert to {}", self.endpoint))?;
        Ok(())
    }
}

/// Appends alerts directly to a shared in-memory log. Used when the daemon
/// and the API live in one process.
pub struct MemoryAlertSink {
    log: SharedAlertLog,
}

impl MemoryAlertSink {
    pub fn new(log: SharedAlertLog) -> Self {
        Self { log }
    }
}

impl AlertSink for MemoryAlertSink {
    fn deliver(&self, alert: &AlertPayload) -> Result<()> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| anyhow!("alert log lock poisoned"))?;
        log.append(alert.clone());
        Ok(())
    }
}

/// Collects alerts for tests.
#[derive(Clone, Default)]
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<AlertPayload>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<AlertPayload> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl AlertSink for RecordingSink {
    fn deliver(&self, alert: &AlertPayload) -> Result<()> {
        self.delivered
            .lock()
            .map_err(|_| anyhow!("recording sink lock poisoned"))?
            .push(alert.clone());
        Ok(())
    }
}

/// Packages violations and hands them to the sink.
pub struct AlertEmitter {
    sink: Box<dyn AlertSink>,
    frames_dir: Option<PathBuf>,
}

impl AlertEmitter {
    pub fn new(sink: Box<dyn AlertSink>, frames_dir: Option<PathBuf>) -> Self {
        Self { sink, frames_dir }
    }

    /// Emit one violation. Never fails: thumbnail and delivery problems are
    /// logged and swallowed so the capture loop keeps running.
    pub fn emit(&self, violation: &Violation, frame: &Frame) {
        let ts = match now_ms() {
            Ok(ts) => ts,
            Err(err) => {
                log::warn!("alert dropped: clock error: {}", err);
                return;
            }
        };

        let frame_path = self.save_thumbnail(violation, frame, ts);

        let payload = AlertPayload {
            alert_type: violation.violation_type,
            ts,
            zone: violation.zone.clone(),
            frame_path,
            meta: {
                let mut meta = violation.meta.clone();
                if let Some(bbox) = &violation.bbox {
                    meta.insert(
                        "bbox".to_string(),
                        serde_json::json!([bbox.x, bbox.y, bbox.width, bbox.height]),
                    );
                }
                meta
            },
        };

        if let Err(err) = self.sink.deliver(&payload) {
            log::warn!("alert delivery failed (dropped): {}", err);
        }
    }

    /// Save an annotated thumbnail. Returns the path on success; any failure
    /// is logged and the alert goes out without one.
    fn save_thumbnail(&self, violation: &Violation, frame: &Frame, ts: u64) -> Option<String> {
        let dir = self.frames_dir.as_ref()?;
        match self.write_thumbnail(dir, violation, frame, ts) {
            Ok(path) => Some(path),
            Err(err) => {
                log::warn!("thumbnail not saved: {}", err);
                None
            }
        }
    }

    fn write_thumbnail(
        &self,
        dir: &PathBuf,
        violation: &Violation,
        frame: &Frame,
        ts: u64,
    ) -> Result<String> {
        std::fs::create_dir_all(dir).context("create frames directory")?;

        let mut annotated = frame.clone();
        if let Some(bbox) = &violation.bbox {
            annotated.draw_rect(bbox, [255, 0, 0]);
        }
        let jpeg = annotated.to_jpeg(THUMBNAIL_JPEG_QUALITY)?;

        let mut suffix = [0u8; 3];
        rand::thread_rng().fill_bytes(&mut suffix);
        let path = dir.join(format!("{}_{}.jpg", ts, hex::encode(suffix)));
        std::fs::write(&path, jpeg).context("write thumbnail")?;
        Ok(path.display().to_string())
    }
}
