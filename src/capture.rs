//! Capture worker and frame hub.
//!
//! The capture loop runs in its own thread and exclusively owns the video
//! source handle: read frame → detect → analyze → emit → publish → repeat.
//! HTTP handlers never touch the camera; they read the latest encoded frame
//! from the `FrameHub`, which decouples camera cadence from response cadence.
//!
//! A frame that cannot be read or analyzed is skipped, never fatal. End of
//! stream or the shutdown flag stops the loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::alert::AlertEmitter;
use crate::detect::DetectorBackend;
use crate::frame::Frame;
use crate::ingest::VideoSource;
use crate::now_ms;
use crate::pipeline::FrameAnalyzer;

const HUB_JPEG_QUALITY: u8 = 75;

/// Latest encoded frame, published by the worker for API consumers.
#[derive(Clone, Debug)]
pub struct PublishedFrame {
    pub jpeg: Vec<u8>,
    pub ts: u64,
    pub seq: u64,
}

/// Single-slot frame exchange between the capture worker and the API.
#[derive(Clone, Default)]
pub struct FrameHub {
    slot: Arc<Mutex<Option<PublishedFrame>>>,
}

impl FrameHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: PublishedFrame) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(frame);
        }
    }

    pub fn latest(&self) -> Option<PublishedFrame> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Shared, read-mostly view of the worker's state for `/monitor/status`.
#[derive(Default)]
pub struct MonitorState {
    running: AtomicBool,
    frames_processed: AtomicU64,
    violations_emitted: AtomicU64,
    source: Mutex<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MonitorSnapshot {
    pub running: bool,
    pub frames_processed: u64,
    pub violations_emitted: u64,
    pub source: String,
}

impl MonitorState {
    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            running: self.running.load(Ordering::SeqCst),
            frames_processed: self.frames_processed.load(Ordering::SeqCst),
            violations_emitted: self.violations_emitted.load(Ordering::SeqCst),
            source: self
                .source
                .lock()
                .map(|s| s.clone())
                .unwrap_or_default(),
        }
    }
}

/// Handle to a running capture worker.
pub struct CaptureHandle {
    shutdown: Arc<AtomicBool>,
    state: Arc<MonitorState>,
    join: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    pub fn state(&self) -> Arc<MonitorState> {
        self.state.clone()
    }

    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("capture worker thread panicked"))?;
        }
        Ok(())
    }

    /// True while the worker loop is alive.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }
}

/// Spawn the capture worker. The source must already be connected; a source
/// that cannot be opened is a startup failure, handled before this point.
pub fn spawn_capture(
    mut source: VideoSource,
    mut detector: Box<dyn DetectorBackend>,
    analyzer: FrameAnalyzer,
    emitter: AlertEmitter,
    hub: FrameHub,
    target_fps: u32,
) -> Result<CaptureHandle> {
    detector.warm_up()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let state = Arc::new(MonitorState::default());
    if let Ok(mut desc) = state.source.lock() {
        *desc = source.stats().description;
    }
    state.running.store(true, Ordering::SeqCst);

    let frame_interval = if target_fps == 0 {
        Duration::from_millis(100)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    };

    let shutdown_thread = shutdown.clone();
    let state_thread = state.clone();
    let join = std::thread::spawn(move || {
        let mut seq = 0u64;
        loop {
            if shutdown_thread.load(Ordering::SeqCst) {
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("video source reached end of stream");
                    break;
                }
                Err(err) => {
                    log::warn!("frame read failed, skipping: {}", err);
                    std::thread::sleep(frame_interval);
                    continue;
                }
            };

            process_frame(
                &frame,
                detector.as_mut(),
                &analyzer,
                &emitter,
                &state_thread,
            );

            seq += 1;
            publish_frame(&hub, &frame, seq);
            state_thread.frames_processed.fetch_add(1, Ordering::SeqCst);

            std::thread::sleep(frame_interval);
        }
        state_thread.running.store(false, Ordering::SeqCst);
    });

    Ok(CaptureHandle {
        shutdown,
        state,
        join: Some(join),
    })
}

fn process_frame(
    frame: &Frame,
    detector: &mut dyn DetectorBackend,
    analyzer: &FrameAnalyzer,
    emitter: &AlertEmitter,
    state: &MonitorState,
) {
    let persons = match detector.detect(frame) {
        Ok(persons) => persons,
        Err(err) => {
            log::warn!("detection failed, skipping frame: {}", err);
            return;
        }
    };

    let analysis = analyzer.analyze(frame, &persons);
    for violation in &analysis.violations {
        emitter.emit(violation, frame);
        state.violations_emitted.fetch_add(1, Ordering::SeqCst);
    }
    if !analysis.violations.is_empty() {
        log::debug!(
            "frame: {} persons, {} violations",
            analysis.observations.len(),
            analysis.violations.len()
        );
    }
}

fn publish_frame(hub: &FrameHub, frame: &Frame, seq: u64) {
    let ts = match now_ms() {
        Ok(ts) => ts,
        Err(_) => return,
    };
    match frame.to_jpeg(HUB_JPEG_QUALITY) {
        Ok(jpeg) => hub.publish(PublishedFrame { jpeg, ts, seq }),
        Err(err) => log::warn!("frame publish skipped: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::RecordingSink;
    use crate::detect::StubBackend;
    use crate::ingest::VideoConfig;
    use crate::pipeline::AnalyzerConfig;
    use crate::ppe::{ColorRatioClassifier, HsvRange};

    #[test]
    fn worker_processes_synthetic_frames_and_stops() -> Result<()> {
        let mut source = VideoSource::open(&VideoConfig {
            width: 64,
            height: 48,
            ..VideoConfig::default()
        })?;
        source.connect()?;

        let sink = RecordingSink::new();
        let emitter = AlertEmitter::new(Box::new(sink.clone()), None);
        let analyzer = FrameAnalyzer::new(AnalyzerConfig {
            vest: Some(ColorRatioClassifier::new(HsvRange::hi_vis(), 0.15)?),
            ..AnalyzerConfig::default()
        });
        let detector = Box::new(StubBackend::fixed(vec![crate::BoundingBox::new(
            4, 4, 10, 20,
        )?]));
        let hub = FrameHub::new();

        let handle = spawn_capture(source, detector, analyzer, emitter, hub.clone(), 100)?;
        std::thread::sleep(Duration::from_millis(200));
        let state = handle.state();
        handle.stop()?;

        let snapshot = state.snapshot();
        assert!(snapshot.frames_processed > 0);
        assert!(!snapshot.running);
        // The stub box sits on plain background: every frame is a NoVest.
        assert!(!sink.delivered().is_empty());
        assert!(hub.latest().is_some());
        Ok(())
    }
}
