//! demo - end-to-end synthetic run of the SafeSite pipeline
//!
//! Plays a synthetic scene through the full chain (blob detector, color
//! classifiers, a restricted zone, proximity) with an in-memory sink, then
//! prints the alerts and stats it produced. No camera or network needed.

use anyhow::{anyhow, Result};
use clap::Parser;

use safesite_kernel::{
    pipeline::AnalyzerConfig,
    ppe::HsvRange,
    AlertEmitter, AlertLog, BackendRegistry, ColorRatioClassifier, FrameAnalyzer, MemoryAlertSink,
    Point, VideoConfig, VideoSource, Zone,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to process.
    #[arg(long, default_value_t = 120)]
    frames: u64,
    /// Scene width in pixels.
    #[arg(long, default_value_t = 320)]
    width: u32,
    /// Scene height in pixels.
    #[arg(long, default_value_t = 240)]
    height: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.frames == 0 {
        return Err(anyhow!("frames must be >= 1"));
    }

    stage("open synthetic source");
    let video = VideoConfig {
        source: "stub://demo-site".to_string(),
        width: args.width,
        height: args.height,
        target_fps: 30,
    };
    let mut source = VideoSource::open(&video)?;
    source.connect()?;

    stage("build pipeline");
    let registry = BackendRegistry::builtin();
    let mut detector = registry.create("blob")?;

    let zone = Zone::new(
        "crane radius",
        vec![
            Point::new((args.width / 2) as i32, 0),
            Point::new(args.width as i32, 0),
            Point::new(args.width as i32, args.height as i32),
            Point::new((args.width / 2) as i32, args.height as i32),
        ],
        [255, 0, 0],
    )?;
    let analyzer = FrameAnalyzer::new(AnalyzerConfig {
        helmet: Some(ColorRatioClassifier::new(HsvRange::hi_vis(), 0.10)?),
        vest: Some(ColorRatioClassifier::new(HsvRange::hi_vis(), 0.15)?),
        zones: vec![zone],
        proximity_pixels: 60,
        ..AnalyzerConfig::default()
    });

    let alerts = AlertLog::shared();
    let emitter = AlertEmitter::new(Box::new(MemoryAlertSink::new(alerts.clone())), None);

    stage("run pipeline");
    let mut frames_processed = 0u64;
    let mut persons_seen = 0u64;
    for _ in 0..args.frames {
        let Some(frame) = source.next_frame()? else {
            break;
        };
        let persons = detector.detect(&frame)?;
        persons_seen += persons.len() as u64;
        let analysis = analyzer.analyze(&frame, &persons);
        for violation in &analysis.violations {
            emitter.emit(violation, &frame);
        }
        frames_processed += 1;
    }

    stage("report");
    let log = alerts
        .lock()
        .map_err(|_| anyhow!("alert log lock poisoned"))?;
    println!("frames processed:  {}", frames_processed);
    println!("person detections: {}", persons_seen);
    println!("alerts stored:     {}", log.len());
    let stats = log.stats(safesite_kernel::now_ms()?);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    for alert in log.recent(5) {
        println!(
            "latest: {} zone={:?}",
            serde_json::to_string(&alert.alert_type)?,
            alert.zone
        );
    }

    Ok(())
}

fn stage(name: &str) {
    println!("==> {}", name);
}
