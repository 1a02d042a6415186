//! demo - end-to-end synthetic run for the PPE sentinel
//!
//! Drives the full pipeline with a scripted detector over the synthetic
//! frame source, then verifies that the written artifacts agree with the
//! session report. Everything lands under --out.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use ppe_sentinel::config::{AlertSettings, DetectorSettings, EvidenceSettings, SourceSettings};
use ppe_sentinel::ingest::{SourceConfig, VideoSource};
use ppe_sentinel::summary::SUMMARY_HEADER;
use ppe_sentinel::{
    sample_due, BBox, Detection, Monitor, PpeClass, PpeDetector, ScriptedBackend, SentinelConfig,
    SessionReport, SilentSounder, DEFAULT_CONFIDENCE_THRESHOLD, MODEL_CONFIDENCE_FLOOR,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of synthetic frames to capture.
    #[arg(long, default_value_t = 300)]
    frames: u64,
    /// Deterministic seed for the scripted detection scenes.
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory for evidence, logs, and the summary CSV.
    #[arg(long, default_value = "demo_out")]
    out: String,
    /// UI mode for stderr progress (auto|plain|pretty).
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.frames == 0 {
        return Err(anyhow!("frames must be >= 1"));
    }

    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let is_tty = std::io::stderr().is_terminal();
    let ui = ui::Ui::new(ui::UiMode::from_flag(Some(&args.ui)), is_tty);

    let cfg = SentinelConfig {
        source: SourceSettings {
            path: "stub://demo".to_string(),
            target_fps: 10,
            width: 320,
            height: 240,
        },
        detector: DetectorSettings {
            backend: "scripted".to_string(),
            model_path: None,
            model_floor: MODEL_CONFIDENCE_FLOOR,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            sample_interval: 10,
        },
        evidence: EvidenceSettings {
            root: out_dir.join("saved_frames"),
            save_interval: 5,
            summary_path: out_dir.join("alerts_summary.csv"),
        },
        alerts: AlertSettings {
            log_path: out_dir.join("alert_logs").join("ppe_alerts.log"),
            sound_command: "aplay".to_string(),
            sound_file: out_dir.join("alert.wav"),
            debounce_secs: 60,
            enforce_debounce_window: false,
        },
    };

    let (mut source, mut backend, mut monitor) = {
        let _stage = ui.stage("open monitor");
        let mut source = VideoSource::new(SourceConfig {
            path: cfg.source.path.clone(),
            width: cfg.source.width,
            height: cfg.source.height,
            target_fps: cfg.source.target_fps,
        })?;
        source.connect()?;

        let scene_count = (args.frames / cfg.detector.sample_interval).max(1) as usize;
        let backend = ScriptedBackend::from_scenes(scripted_scenes(args.seed, scene_count));
        let monitor = Monitor::open(&cfg, Box::new(SilentSounder::new()))?;
        (source, backend, monitor)
    };

    {
        let run_stage = ui.stage("run synthetic session");
        for _ in 0..args.frames {
            let frame = source.next_frame()?;
            if !sample_due(frame.index, cfg.detector.sample_interval) {
                continue;
            }
            let detections = backend.infer(&frame)?;
            let outcome = monitor.process_frame(&frame, &detections)?;
            if outcome.alert_fired {
                run_stage.note(&format!(
                    "alert at frame {}: missing {}",
                    frame.index,
                    outcome.verdict.joined_items()
                ));
            }
        }
    }

    let report = {
        let _stage = ui.stage("flush session summary");
        monitor.finish()
    };

    let verify_result = verify_artifacts(&cfg, &report);

    println!("demo summary:");
    println!("  frames captured: {}", args.frames);
    println!("  frames evaluated: {}", report.frames_evaluated);
    println!(
        "  compliant / non-compliant: {} / {}",
        report.compliant_frames, report.non_compliant_frames
    );
    println!("  alerts fired: {}", report.alerts_fired);
    println!("  stills saved: {}", report.evidence_saved);
    println!("  evidence root: {}", cfg.evidence.root.display());
    match &report.summary_path {
        Some(path) => println!("  summary csv: {} ({} rows)", path.display(), report.summary_rows),
        None => println!("  summary csv: not written (no saved violations)"),
    }
    println!(
        "  verify: {}",
        if verify_result.is_ok() { "OK" } else { "FAIL" }
    );
    println!("next steps:");
    println!("  ls -la {}", cfg.evidence.root.join("non_compliant").display());
    println!("  cat {}", cfg.alerts.log_path.display());

    verify_result
}

/// Random but seedable detection scenes: usually a person, sometimes with a
/// vest, sometimes missing helmet or gloves. One scene per evaluated frame.
fn scripted_scenes(seed: Option<u64>, count: usize) -> Vec<Vec<Detection>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut scenes = Vec::with_capacity(count);
    for _ in 0..count {
        let mut scene = Vec::new();
        if rng.gen_bool(0.9) {
            scene.push(det(PpeClass::Person, rng.gen_range(0.6..0.98), 40.0, 30.0, 220.0, 230.0));
            if rng.gen_bool(0.55) {
                scene.push(det(PpeClass::Vest, rng.gen_range(0.55..0.95), 60.0, 80.0, 200.0, 160.0));
            }
            if rng.gen_bool(0.3) {
                scene.push(det(
                    PpeClass::NoHelmet,
                    rng.gen_range(0.55..0.9),
                    70.0,
                    20.0,
                    150.0,
                    60.0,
                ));
            }
            if rng.gen_bool(0.15) {
                scene.push(det(
                    PpeClass::NoGloves,
                    rng.gen_range(0.55..0.9),
                    50.0,
                    150.0,
                    120.0,
                    210.0,
                ));
            }
        }
        scenes.push(scene);
    }
    scenes
}

fn det(class: PpeClass, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new(
        class.id(),
        confidence,
        BBox::new(x1, y1, x2, y2).expect("demo box coordinates"),
    )
}

/// Cross-check written artifacts against the session report.
fn verify_artifacts(cfg: &SentinelConfig, report: &SessionReport) -> Result<()> {
    match &report.summary_path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading summary csv {}", path.display()))?;
            let mut lines = contents.lines();
            if lines.next() != Some(SUMMARY_HEADER) {
                return Err(anyhow!("summary csv is missing its header row"));
            }
            let rows = lines.count();
            if rows != report.summary_rows {
                return Err(anyhow!(
                    "summary csv has {} rows, report says {}",
                    rows,
                    report.summary_rows
                ));
            }
        }
        None => {
            if report.summary_rows != 0 {
                return Err(anyhow!("report has rows but no summary file was written"));
            }
        }
    }

    if report.alerts_fired > 0 {
        let contents = fs::read_to_string(&cfg.alerts.log_path)
            .with_context(|| format!("reading alert log {}", cfg.alerts.log_path.display()))?;
        let lines = contents.lines().count() as u64;
        if lines != report.alerts_fired {
            return Err(anyhow!(
                "alert log has {} lines, report says {} alerts",
                lines,
                report.alerts_fired
            ));
        }
    }
    Ok(())
}
