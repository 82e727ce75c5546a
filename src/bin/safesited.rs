//! safesited - SafeSite monitoring daemon
//!
//! This daemon:
//! 1. Loads site configuration (zones, HSV ranges, thresholds)
//! 2. Opens the configured video source (fatal on failure)
//! 3. Spawns the capture worker: detect -> classify -> zone-test ->
//!    proximity-test -> emit, publishing frames to the hub
//! 4. Serves the HTTP API (alerts, stats, video snapshot, voice)
//! 5. Stops cleanly on Ctrl-C or end of stream

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use safesite_kernel::{
    api::{ApiConfig, ApiContext, ApiServer},
    capture::spawn_capture,
    config::SiteConfig,
    voice::{EmergencyDialer, VoiceConfig},
    AlertEmitter, AlertLog, AlertSink, BackendRegistry, FrameAnalyzer, FrameHub, HttpAlertSink,
    MemoryAlertSink, VideoSource,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the TOML config file (falls back to SAFESITE_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => SiteConfig::load_from(path)?,
        None => SiteConfig::load()?,
    };

    // Camera open failure is fatal: a dead source must not look like an
    // empty stream.
    let mut source = VideoSource::open(&cfg.video)?;
    source.connect()?;

    let registry = BackendRegistry::builtin();
    let detector = registry.create(&cfg.detector)?;

    let alerts = AlertLog::shared();
    let sink: Box<dyn AlertSink> = match &cfg.alerts.sink_url {
        Some(url) => {
            log::info!("alerts will be posted to {}", url);
            Box::new(HttpAlertSink::new(url))
        }
        None => Box::new(MemoryAlertSink::new(alerts.clone())),
    };
    let emitter = AlertEmitter::new(sink, cfg.alerts.frames_dir.clone());
    let analyzer = FrameAnalyzer::new(cfg.analyzer_config()?);

    let hub = FrameHub::new();
    let capture = spawn_capture(
        source,
        detector,
        analyzer,
        emitter,
        hub.clone(),
        cfg.video.target_fps,
    )?;

    let dialer = Arc::new(EmergencyDialer::new(VoiceConfig::from_env()));
    if !dialer.status().configured {
        log::warn!("emergency calling not configured (TWILIO_* env vars unset)");
    }

    let api_ctx = ApiContext {
        alerts: alerts.clone(),
        hub: Some(hub),
        monitor: Some(capture.state()),
        dialer,
    };
    let api = ApiServer::new(
        ApiConfig {
            addr: cfg.api_addr.clone(),
        },
        api_ctx,
    )
    .spawn()?;
    log::info!("alert api listening on {}", api.addr);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::SeqCst);
    })?;

    log::info!(
        "safesited running. source={} detector={} zones={}",
        cfg.video.source,
        cfg.detector,
        cfg.zones.len()
    );

    while !stop.load(Ordering::SeqCst) && capture.is_running() {
        std::thread::sleep(Duration::from_millis(200));
    }

    log::info!("shutting down");
    capture.stop()?;
    api.stop()?;
    log::info!("safesited stopped");
    Ok(())
}
