//! safesite_api - API-only service
//!
//! This daemon:
//! 1. Serves the alert store over HTTP (POST /alerts from remote monitors)
//! 2. Serves stats and emergency calling
//! 3. Does NOT open a video source; /video/frame and /monitor/status report
//!    accordingly

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use safesite_kernel::{
    api::{ApiConfig, ApiContext, ApiServer},
    config::SiteConfig,
    voice::{EmergencyDialer, VoiceConfig},
    AlertLog,
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

    let alerts = AlertLog::shared();
    let dialer = Arc::new(EmergencyDialer::new(VoiceConfig::from_env()));
    if !dialer.status().configured {
        log::warn!("emergency calling not configured (TWILIO_* env vars unset)");
    }

    let api_ctx = ApiContext {
        alerts,
        hub: None,
        monitor: None,
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

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    log::info!("shutting down");
    api.stop()?;
    Ok(())
}
