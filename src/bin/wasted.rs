//! wasted - motion-triggered waste capture daemon
//!
//! This daemon:
//! 1. Loads configuration (file, env, CLI)
//! 2. Waits for the motion sensor to settle
//! 3. Opens the camera (fatal if unavailable)
//! 4. Polls the sensor and runs one capture cycle per rising edge
//! 5. Stops on Ctrl-C

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use waste_tally::motion::sensor_from_source;
use waste_tally::{CaptureCycle, RisingEdge, WastedConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Camera device number (opens /dev/video<N>).
    #[arg(long)]
    camera: Option<u32>,
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "WASTE_CONFIG")]
    config: Option<PathBuf>,
    /// Log cycle failures and keep polling instead of exiting.
    #[arg(long)]
    keep_going: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => WastedConfig::load_from(path)?,
        None => WastedConfig::load()?,
    };
    if let Some(index) = args.camera {
        cfg.set_camera_index(index);
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    }

    let mut sensor = sensor_from_source(&cfg.motion.source)?;
    log::info!(
        "motion sensor {} initializing ({}s settle)",
        sensor.name(),
        cfg.motion.settle.as_secs()
    );
    std::thread::sleep(cfg.motion.settle);

    let mut cycle = CaptureCycle::from_config(&cfg).map_err(|e| {
        anyhow!(
            "unable to read from camera {}: {:#}. Verify the camera settings.",
            cfg.camera.device,
            e
        )
    })?;

    log::info!("wasted running. writing tallies to {}", cfg.db_path);
    log::info!("press Ctrl-C to stop");

    let mut edge = RisingEdge::new();
    let mut cycles = 0u64;
    let mut failures = 0u64;
    let mut last_health_log = Instant::now();

    while running.load(Ordering::SeqCst) {
        let level = sensor.read()?;
        if edge.update(level) {
            log::info!("motion detected");
            match cycle.run_once() {
                Ok(report) => {
                    cycles += 1;
                    log::info!(
                        "cycle #{}: {} items ({} recyclable) from {}",
                        cycles,
                        report.tally.total(),
                        report.tally.recyclable_total(),
                        report.object.key
                    );
                }
                Err(e) if args.keep_going => {
                    failures += 1;
                    log::error!("capture cycle failed: {:#}", e);
                }
                Err(e) => return Err(e),
            }
        }

        if last_health_log.elapsed() >= Duration::from_secs(60) {
            let stats = cycle.camera().stats();
            log::info!(
                "camera health={} frames_kept={} device={} cycles={} failures={}",
                cycle.camera().is_healthy(),
                stats.frames_kept,
                stats.device,
                cycles,
                failures
            );
            last_health_log = Instant::now();
        }

        std::thread::sleep(cfg.motion.poll_interval);
    }

    log::info!(
        "shutdown signal received; {} cycles completed, {} failed",
        cycles,
        failures
    );
    Ok(())
}
