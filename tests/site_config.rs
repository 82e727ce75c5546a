use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use safesite_kernel::config::SiteConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SAFESITE_CONFIG",
        "SAFESITE_API_ADDR",
        "SAFESITE_SOURCE",
        "SAFESITE_DETECTOR",
        "SAFESITE_SINK_URL",
        "SAFESITE_FRAMES_DIR",
        "SAFESITE_PROXIMITY_PIXELS",
    ] {
        std::env::remove_var(key);
    }
}

const FULL_CONFIG: &str = r#"
api_addr = "0.0.0.0:9100"
detector = "stub"
helmet_ratio_thresh = 0.2
vest_ratio_thresh = 0.25
proximity_pixels = 75

[video]
source = "stub://yard"
width = 800
height = 600
target_fps = 12

[roi]
head_frac = 0.35
torso_frac = 0.75

[helmet_hsv]
h1 = 20
h2 = 40
s1 = 100
s2 = 255
v1 = 100
v2 = 255

[vest_hsv]
h1 = 15
h2 = 45
s1 = 120
s2 = 255
v1 = 120
v2 = 255

[alerts]
sink_url = "http://127.0.0.1:9100/alerts"
frames_dir = "/tmp/safesite-frames"

[[zones]]
name = "crane radius"
polygon = [[10, 10], [200, 10], [200, 200]]
color = [255, 0, 0]
"#;

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(FULL_CONFIG.as_bytes()).expect("write config");

    std::env::set_var("SAFESITE_CONFIG", file.path());
    std::env::set_var("SAFESITE_SOURCE", "stub://override");
    std::env::set_var("SAFESITE_PROXIMITY_PIXELS", "99");

    let cfg = SiteConfig::load().expect("load config");

    assert_eq!(cfg.api_addr, "0.0.0.0:9100");
    assert_eq!(cfg.detector, "stub");
    assert_eq!(cfg.video.source, "stub://override");
    assert_eq!(cfg.video.width, 800);
    assert_eq!(cfg.video.height, 600);
    assert_eq!(cfg.video.target_fps, 12);
    assert_eq!(cfg.roi.head_frac, 0.35);
    assert_eq!(cfg.roi.torso_frac, 0.75);
    assert_eq!(cfg.helmet_ratio_thresh, 0.2);
    assert_eq!(cfg.vest_ratio_thresh, 0.25);
    assert_eq!(cfg.proximity_pixels, 99);
    assert_eq!(
        cfg.alerts.sink_url.as_deref(),
        Some("http://127.0.0.1:9100/alerts")
    );
    assert_eq!(cfg.zones.len(), 1);
    assert_eq!(cfg.zones[0].name, "crane radius");
    assert!(cfg.zones[0].is_active());

    let helmet = cfg.helmet_hsv.expect("helmet range");
    assert_eq!((helmet.h1, helmet.h2), (20, 40));

    clear_env();
}

#[test]
fn defaults_apply_without_a_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SiteConfig::load().expect("load defaults");

    assert_eq!(cfg.api_addr, "127.0.0.1:8700");
    assert_eq!(cfg.detector, "blob");
    assert_eq!(cfg.video.source, "stub://site");
    // No configured ranges: both garment checks are skipped.
    assert!(cfg.helmet_hsv.is_none());
    assert!(cfg.vest_hsv.is_none());
    let analyzer = cfg.analyzer_config().expect("analyzer config");
    assert!(analyzer.helmet.is_none());
    assert!(analyzer.vest.is_none());

    clear_env();
}

#[test]
fn out_of_range_threshold_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"helmet_ratio_thresh = 1.5\n")
        .expect("write config");
    std::env::set_var("SAFESITE_CONFIG", file.path());

    assert!(SiteConfig::load().is_err());

    clear_env();
}

#[test]
fn invalid_zone_name_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(
        br#"
[[zones]]
name = "bad/name"
polygon = [[0, 0], [10, 0], [10, 10]]
"#,
    )
    .expect("write config");
    std::env::set_var("SAFESITE_CONFIG", file.path());

    assert!(SiteConfig::load().is_err());

    clear_env();
}

#[test]
fn invalid_sink_url_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(
        br#"
[alerts]
sink_url = "not a url"
"#,
    )
    .expect("write config");
    std::env::set_var("SAFESITE_CONFIG", file.path());

    assert!(SiteConfig::load().is_err());

    clear_env();
}
