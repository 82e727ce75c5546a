//! Site configuration.
//!
//! Loaded from a TOML file named by `SAFESITE_CONFIG`, with environment
//! overrides applied on top and a validation pass at the end. The config owns
//! everything the decision pipeline tunes on: zones, HSV ranges, ratio
//! thresholds, ROI fractions, and the proximity distance.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ingest::VideoConfig;
use crate::pipeline::AnalyzerConfig;
use crate::ppe::{ColorRatioClassifier, HsvRange, RoiSplit};
use crate::zones::Zone;
use crate::Point;

const DEFAULT_API_ADDR: &str = "127.0.0.1:8700";
const DEFAULT_DETECTOR: &str = "blob";
const DEFAULT_HELMET_RATIO_THRESH: f64 = 0.10;
const DEFAULT_VEST_RATIO_THRESH: f64 = 0.15;

#[derive(Debug, Deserialize, Default)]
struct SiteConfigFile {
    api_addr: Option<String>,
    detector: Option<String>,
    helmet_hsv: Option<HsvRangeFile>,
    vest_hsv: Option<HsvRangeFile>,
    helmet_ratio_thresh: Option<f64>,
    vest_ratio_thresh: Option<f64>,
    proximity_pixels: Option<u32>,
    video: Option<VideoConfigFile>,
    roi: Option<RoiConfigFile>,
    alerts: Option<AlertConfigFile>,
    zones: Option<Vec<ZoneConfigFile>>,
}

#[derive(Debug, Deserialize)]
struct HsvRangeFile {
    h1: u8,
    h2: u8,
    s1: u8,
    s2: u8,
    v1: u8,
    v2: u8,
}

#[derive(Debug, Deserialize, Default)]
struct VideoConfigFile {
    source: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RoiConfigFile {
    head_frac: Option<f32>,
    torso_frac: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    sink_url: Option<String>,
    frames_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ZoneConfigFile {
    name: String,
    polygon: Vec<[i32; 2]>,
    color: Option<[u8; 3]>,
}

#[derive(Debug, Clone, Default)]
pub struct AlertSettings {
    /// HTTP endpoint to POST alerts to. Absent means in-memory append.
    pub sink_url: Option<String>,
    /// Directory for annotated violation thumbnails. Absent disables them.
    pub frames_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub api_addr: String,
    pub detector: String,
    pub video: VideoConfig,
    pub roi: RoiSplit,
    pub helmet_hsv: Option<HsvRange>,
    pub vest_hsv: Option<HsvRange>,
    pub helmet_ratio_thresh: f64,
    pub vest_ratio_thresh: f64,
    pub proximity_pixels: u32,
    pub zones: Vec<Zone>,
    pub alerts: AlertSettings,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_addr: DEFAULT_API_ADDR.to_string(),
            detector: DEFAULT_DETECTOR.to_string(),
            video: VideoConfig::default(),
            roi: RoiSplit::default(),
            helmet_hsv: None,
            vest_hsv: None,
            helmet_ratio_thresh: DEFAULT_HELMET_RATIO_THRESH,
            vest_ratio_thresh: DEFAULT_VEST_RATIO_THRESH,
            proximity_pixels: 0,
            zones: Vec::new(),
            alerts: AlertSettings::default(),
        }
    }
}

impl SiteConfig {
    /// Load from `SAFESITE_CONFIG` (if set), apply env overrides, validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SAFESITE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SiteConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let video = VideoConfig {
            source: file
                .video
                .as_ref()
                .and_then(|v| v.source.clone())
                .unwrap_or(defaults.video.source),
            width: file
                .video
                .as_ref()
                .and_then(|v| v.width)
                .unwrap_or(defaults.video.width),
            height: file
                .video
                .as_ref()
                .and_then(|v| v.height)
                .unwrap_or(defaults.video.height),
            target_fps: file
                .video
                .as_ref()
                .and_then(|v| v.target_fps)
                .unwrap_or(defaults.video.target_fps),
        };
        let roi = RoiSplit {
            head_frac: file
                .roi
                .as_ref()
                .and_then(|r| r.head_frac)
                .unwrap_or(defaults.roi.head_frac),
            torso_frac: file
                .roi
                .as_ref()
                .and_then(|r| r.torso_frac)
                .unwrap_or(defaults.roi.torso_frac),
        };
        let alerts = AlertSettings {
            sink_url: file.alerts.as_ref().and_then(|a| a.sink_url.clone()),
            frames_dir: file.alerts.and_then(|a| a.frames_dir),
        };
        let zones = file
            .zones
            .unwrap_or_default()
            .into_iter()
            .map(|z| {
                let polygon = z.polygon.iter().map(|[x, y]| Point::new(*x, *y)).collect();
                Zone::new(&z.name, polygon, z.color.unwrap_or([255, 0, 0]))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            api_addr: file.api_addr.unwrap_or(defaults.api_addr),
            detector: file.detector.unwrap_or(defaults.detector),
            video,
            roi,
            helmet_hsv: file.helmet_hsv.map(|r| HsvRange {
                h1: r.h1,
                h2: r.h2,
                s1: r.s1,
                s2: r.s2,
                v1: r.v1,
                v2: r.v2,
            }),
            vest_hsv: file.vest_hsv.map(|r| HsvRange {
                h1: r.h1,
                h2: r.h2,
                s1: r.s1,
                s2: r.s2,
                v1: r.v1,
                v2: r.v2,
            }),
            helmet_ratio_thresh: file
                .helmet_ratio_thresh
                .unwrap_or(defaults.helmet_ratio_thresh),
            vest_ratio_thresh: file.vest_ratio_thresh.unwrap_or(defaults.vest_ratio_thresh),
            proximity_pixels: file.proximity_pixels.unwrap_or(defaults.proximity_pixels),
            zones,
            alerts,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("SAFESITE_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(source) = std::env::var("SAFESITE_SOURCE") {
            if !source.trim().is_empty() {
                self.video.source = source;
            }
        }
        if let Ok(detector) = std::env::var("SAFESITE_DETECTOR") {
            if !detector.trim().is_empty() {
                self.detector = detector;
            }
        }
        if let Ok(url) = std::env::var("SAFESITE_SINK_URL") {
            if !url.trim().is_empty() {
                self.alerts.sink_url = Some(url);
            }
        }
        if let Ok(dir) = std::env::var("SAFESITE_FRAMES_DIR") {
            if !dir.trim().is_empty() {
                self.alerts.frames_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(pixels) = std::env::var("SAFESITE_PROXIMITY_PIXELS") {
            let pixels: u32 = pixels
                .parse()
                .map_err(|_| anyhow!("SAFESITE_PROXIMITY_PIXELS must be an integer"))?;
            self.proximity_pixels = pixels;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if let Some(range) = &self.helmet_hsv {
            range.validate().context("helmet_hsv")?;
        }
        if let Some(range) = &self.vest_hsv {
            range.validate().context("vest_hsv")?;
        }
        if !(0.0..=1.0).contains(&self.helmet_ratio_thresh) {
            return Err(anyhow!("helmet_ratio_thresh must be within 0.0-1.0"));
        }
        if !(0.0..=1.0).contains(&self.vest_ratio_thresh) {
            return Err(anyhow!("vest_ratio_thresh must be within 0.0-1.0"));
        }
        // Re-run the constructor checks on the roi fractions.
        self.roi = RoiSplit::new(self.roi.head_frac, self.roi.torso_frac)?;
        if self.video.target_fps == 0 {
            return Err(anyhow!("video.target_fps must be >= 1"));
        }
        if let Some(url) = &self.alerts.sink_url {
            url::Url::parse(url).with_context(|| format!("invalid alerts.sink_url '{}'", url))?;
        }
        for zone in &self.zones {
            if !zone.is_active() {
                log::warn!(
                    "zone '{}' has fewer than 3 vertices and will never match",
                    zone.name
                );
            }
        }
        Ok(())
    }

    /// Build the analyzer configuration. A missing HSV range disables that
    /// garment check entirely.
    pub fn analyzer_config(&self) -> Result<AnalyzerConfig> {
        let helmet = self
            .helmet_hsv
            .map(|range| ColorRatioClassifier::new(range, self.helmet_ratio_thresh))
            .transpose()?;
        let vest = self
            .vest_hsv
            .map(|range| ColorRatioClassifier::new(range, self.vest_ratio_thresh))
            .transpose()?;
        Ok(AnalyzerConfig {
            roi: self.roi,
            helmet,
            vest,
            zones: self.zones.clone(),
            proximity_pixels: self.proximity_pixels,
        })
    }
}

fn read_config_file(path: &Path) -> Result<SiteConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
