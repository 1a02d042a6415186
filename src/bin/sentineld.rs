//! sentineld - PPE compliance monitoring daemon
//!
//! This daemon:
//! 1. Captures frames from the configured video source (file or stub)
//! 2. Samples every Nth frame into the detector backend
//! 3. Evaluates detections into per-frame compliance verdicts
//! 4. Fires edge-triggered alerts (audible alarm + append-only alert log)
//! 5. Saves throttled, annotated evidence stills
//! 6. Writes the session summary CSV on shutdown

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ppe_sentinel::ingest::{SourceConfig, VideoSource};
use ppe_sentinel::{create_backend, sample_due, CommandSounder, Monitor, SentinelConfig};

#[derive(Parser, Debug)]
#[command(name = "sentineld", version, about = "PPE compliance monitoring daemon")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "SENTINEL_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Video source override: a file path or stub://name.
    #[arg(long, value_name = "SOURCE")]
    source: Option<String>,
    /// Detector backend override (scripted|tract).
    #[arg(long, value_name = "BACKEND")]
    backend: Option<String>,
    /// Stop after this many captured frames (default: run until Ctrl-C).
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = SentinelConfig::load_from(args.config.as_deref())?;
    if let Some(source) = args.source {
        cfg.source.path = source;
    }
    if let Some(backend) = args.backend {
        cfg.detector.backend = backend;
    }

    let running = Arc::new(AtomicBool::new(true));
    let shutdown_flag = running.clone();
    ctrlc::set_handler(move || {
        shutdown_flag.store(false, Ordering::SeqCst);
    })
    .context("installing shutdown handler")?;

    let mut source = VideoSource::new(SourceConfig {
        path: cfg.source.path.clone(),
        width: cfg.source.width,
        height: cfg.source.height,
        target_fps: cfg.source.target_fps,
    })?;
    source.connect()?;

    let mut backend = create_backend(
        &cfg.detector.backend,
        cfg.detector.model_path.as_deref(),
        cfg.source.width,
        cfg.source.height,
        cfg.detector.model_floor,
    )?;
    backend.warm_up()?;

    let sounder = CommandSounder::new(&cfg.alerts.sound_command, &cfg.alerts.sound_file);
    let mut monitor = Monitor::open(&cfg, Box::new(sounder))?;

    log::info!(
        "sentineld running: source={} backend={} sample_interval={}",
        cfg.source.path,
        backend.name(),
        cfg.detector.sample_interval
    );
    log::info!(
        "evidence root={} summary={} alert_log={}",
        cfg.evidence.root.display(),
        cfg.evidence.summary_path.display(),
        cfg.alerts.log_path.display()
    );

    let frame_interval = Duration::from_millis(1000 / u64::from(cfg.source.target_fps.max(1)));
    let mut last_health_log = Instant::now();

    while running.load(Ordering::SeqCst) {
        let frame = source.next_frame()?;

        if sample_due(frame.index, cfg.detector.sample_interval) {
            let detections = backend.infer(&frame)?;
            // An unknown class id is a model/taxonomy mismatch; treat it as
            // fatal rather than guessing at what the detector meant.
            let outcome = monitor.process_frame(&frame, &detections)?;
            if let Some(path) = &outcome.evidence_path {
                log::debug!("evidence saved to {}", path.display());
            }
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = source.stats();
            log::info!(
                "source health={} frames={} loops={} path={}",
                source.is_healthy(),
                stats.frames_captured,
                stats.loops_completed,
                stats.path
            );
            last_health_log = Instant::now();
        }

        if let Some(max) = args.max_frames {
            if frame.index >= max {
                log::info!("reached max frames ({}), stopping", max);
                break;
            }
        }

        std::thread::sleep(frame_interval);
    }

    let report = monitor.finish();
    log::info!(
        "session complete: evaluated={} compliant={} non_compliant={} alerts={} stills={}",
        report.frames_evaluated,
        report.compliant_frames,
        report.non_compliant_frames,
        report.alerts_fired,
        report.evidence_saved
    );
    match &report.summary_path {
        Some(path) => log::info!(
            "session summary ({} rows) written to {}",
            report.summary_rows,
            path.display()
        ),
        None => log::info!("no saved violations; summary not written"),
    }
    Ok(())
}
