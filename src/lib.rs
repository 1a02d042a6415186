//! PPE Sentinel
//!
//! Continuous personal-protective-equipment monitoring over a video stream.
//! Frames are sampled, run through a detector, and judged against a fixed
//! PPE taxonomy; violations raise an audible alert, save annotated evidence
//! stills, and accumulate into a session summary CSV.
//!
//! # Behavior
//!
//! The pipeline holds these properties by construction:
//!
//! 1. **Sampled evaluation**: only every Nth captured frame is evaluated
//!    (default 10); skipped frames can neither alert nor save evidence.
//! 2. **Derived compliance**: a verdict is compliant exactly when its
//!    missing-item list is empty; the two cannot disagree.
//! 3. **Edge-triggered alerts**: one alert per non-compliance episode,
//!    rearmed by a compliant evaluated frame.
//! 4. **Throttled persistence**: compliant and non-compliant stills save on
//!    independent modulo counters; a burst of one class never starves the
//!    other.
//! 5. **Summary at shutdown**: the session ledger is written exactly once,
//!    at the end; an empty session leaves no file behind.
//! 6. **Fail-fast taxonomy**: a detection with an unknown class id aborts
//!    the frame with a typed error instead of guessing.
//!
//! # Module Structure
//!
//! - `ingest`: frame acquisition (synthetic stub, optional looping file decode)
//! - `detect`: detector backends behind `PpeDetector` (scripted, optional ONNX)
//! - `taxonomy`: the eleven-class PPE label set and missing-item mapping
//! - `evaluate`: per-frame compliance verdicts and overlay payloads
//! - `overlay`, `evidence`, `summary`: annotated stills and the session CSV
//! - `alert`: debouncing, the alert log, audible alarms

use std::path::PathBuf;

use anyhow::Result;
use log::{error, warn};

pub mod alert;
pub mod config;
pub mod detect;
pub mod evaluate;
pub mod evidence;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod summary;
pub mod taxonomy;

pub use alert::{AlarmSounder, AlertDebouncer, AlertLog, CommandSounder, SilentSounder};
pub use config::SentinelConfig;
pub use detect::{
    create_backend, BBox, Detection, PpeDetector, ScriptedBackend, MODEL_CONFIDENCE_FLOOR,
};
pub use evaluate::{
    sample_due, ComplianceVerdict, DrawInstruction, FrameEvaluation, FrameEvaluator, OverlayColor,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use evidence::{EvidenceStore, SaveThrottle};
pub use frame::Frame;
pub use ingest::{SourceConfig, SourceStats, VideoSource};
pub use summary::{SessionSummary, SummaryRecord};
pub use taxonomy::{MissingItem, PpeClass, UnknownClassError};

// -------------------- Monitor --------------------

/// Per-frame result handed back to the caller's loop.
#[derive(Debug)]
pub struct FrameOutcome {
    pub verdict: ComplianceVerdict,
    pub alert_fired: bool,
    /// Where the evidence still landed, when this frame was saved.
    pub evidence_path: Option<PathBuf>,
}

/// Session totals, produced once by [`Monitor::finish`].
#[derive(Clone, Debug)]
pub struct SessionReport {
    pub frames_evaluated: u64,
    pub compliant_frames: u64,
    pub non_compliant_frames: u64,
    pub alerts_fired: u64,
    pub evidence_saved: u64,
    pub summary_rows: usize,
    /// Set when a summary CSV was actually written.
    pub summary_path: Option<PathBuf>,
}

/// The compliance pipeline behind the daemon: evaluation, alerting,
/// evidence persistence, and the session ledger, wired in a fixed order.
///
/// Per evaluated frame: evaluate first, then save evidence (throttled),
/// then alert (alarm before log line). Evidence and alarm failures degrade
/// to log output and the monitor keeps running; only an unknown class id
/// aborts a frame, and that leaves the monitor itself usable.
pub struct Monitor {
    evaluator: FrameEvaluator,
    debouncer: AlertDebouncer,
    throttle: SaveThrottle,
    evidence: EvidenceStore,
    summary: SessionSummary,
    alert_log: AlertLog,
    sounder: Box<dyn AlarmSounder>,
    frames_evaluated: u64,
    compliant_frames: u64,
    non_compliant_frames: u64,
    alerts_fired: u64,
    evidence_saved: u64,
}

impl Monitor {
    /// Build the pipeline from configuration. Creates the evidence and
    /// alert log directories up front so an unwritable location fails
    /// here, not minutes into a session.
    pub fn open(cfg: &SentinelConfig, sounder: Box<dyn AlarmSounder>) -> Result<Self> {
        let evidence = EvidenceStore::open(&cfg.evidence.root)?;
        let alert_log = AlertLog::open(&cfg.alerts.log_path)?;
        let summary = SessionSummary::new(&cfg.evidence.summary_path);
        let debouncer = match cfg.alerts.cooldown() {
            Some(window) => AlertDebouncer::with_cooldown(window),
            None => AlertDebouncer::new(),
        };
        Ok(Self {
            evaluator: FrameEvaluator::with_threshold(cfg.detector.confidence_threshold),
            debouncer,
            throttle: SaveThrottle::new(cfg.evidence.save_interval),
            evidence,
            summary,
            alert_log,
            sounder,
            frames_evaluated: 0,
            compliant_frames: 0,
            non_compliant_frames: 0,
            alerts_fired: 0,
            evidence_saved: 0,
        })
    }

    /// Run one sampled frame through the pipeline.
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
    ) -> Result<FrameOutcome> {
        let evaluation = self.evaluator.evaluate(detections, frame.index)?;
        let verdict = evaluation.verdict.clone();
        self.frames_evaluated += 1;
        if verdict.is_compliant() {
            self.compliant_frames += 1;
        } else {
            self.non_compliant_frames += 1;
        }

        let mut evidence_path = None;
        if self.throttle.observe(verdict.is_compliant()) {
            let pixels = overlay::render(frame, &evaluation.draw);
            match self
                .evidence
                .save(&pixels, frame.width, frame.height, &verdict)
            {
                Ok(path) => {
                    if !verdict.is_compliant() {
                        self.summary.append(&verdict, &path);
                    }
                    self.evidence_saved += 1;
                    evidence_path = Some(path);
                }
                Err(err) => {
                    // No still, so no ledger row either.
                    warn!("evidence save failed at frame {}: {:#}", frame.index, err);
                }
            }
        }

        let mut alert_fired = false;
        if self.debouncer.observe(&verdict) {
            alert_fired = true;
            self.alerts_fired += 1;
            if let Err(err) = self.sounder.sound() {
                warn!("alarm playback failed: {:#}", err);
            }
            if let Err(err) = self.alert_log.append(&verdict) {
                error!("alert log append failed: {:#}", err);
            }
            warn!(
                "non-compliance at frame {}: missing {}",
                frame.index,
                verdict.joined_items()
            );
        }

        Ok(FrameOutcome {
            verdict,
            alert_fired,
            evidence_path,
        })
    }

    /// End the session: flush the summary ledger and report totals.
    /// Flush failures are logged, not returned; shutdown always completes.
    pub fn finish(self) -> SessionReport {
        let summary_rows = self.summary.len();
        let summary_path = match self.summary.flush() {
            Ok(true) => Some(self.summary.path().to_path_buf()),
            Ok(false) => None,
            Err(err) => {
                error!("session summary flush failed: {:#}", err);
                None
            }
        };
        SessionReport {
            frames_evaluated: self.frames_evaluated,
            compliant_frames: self.compliant_frames,
            non_compliant_frames: self.non_compliant_frames,
            alerts_fired: self.alerts_fired,
            evidence_saved: self.evidence_saved,
            summary_rows,
            summary_path,
        }
    }
}

// -------------------- Pipeline Tests --------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlertSettings, DetectorSettings, EvidenceSettings, SourceSettings};
    use std::path::Path;

    fn test_config(root: &Path, save_interval: u64) -> SentinelConfig {
        SentinelConfig {
            source: SourceSettings {
                path: "stub://test".to_string(),
                target_fps: 10,
                width: 32,
                height: 24,
            },
            detector: DetectorSettings {
                backend: "scripted".to_string(),
                model_path: None,
                model_floor: MODEL_CONFIDENCE_FLOOR,
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                sample_interval: 10,
            },
            evidence: EvidenceSettings {
                root: root.join("saved_frames"),
                save_interval,
                summary_path: root.join("alerts_summary.csv"),
            },
            alerts: AlertSettings {
                log_path: root.join("alert_logs").join("ppe_alerts.log"),
                sound_command: "aplay".to_string(),
                sound_file: root.join("absent.wav"),
                debounce_secs: 60,
                enforce_debounce_window: false,
            },
        }
    }

    fn monitor(root: &Path, save_interval: u64) -> Monitor {
        Monitor::open(
            &test_config(root, save_interval),
            Box::new(SilentSounder::new()),
        )
        .unwrap()
    }

    fn frame(index: u64) -> Frame {
        Frame::new(vec![0u8; 32 * 24 * 3], 32, 24, index).unwrap()
    }

    fn det(class: PpeClass, confidence: f32) -> Detection {
        Detection::new(
            class.id(),
            confidence,
            BBox::new(2.0, 2.0, 20.0, 20.0).unwrap(),
        )
    }

    #[test]
    fn alerts_fire_once_per_episode() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = monitor(dir.path(), 10);

        let violation = [det(PpeClass::Person, 0.9), det(PpeClass::NoHelmet, 0.8)];
        let compliant = [det(PpeClass::Person, 0.9), det(PpeClass::Vest, 0.9)];

        let mut fired = Vec::new();
        for (i, dets) in [
            &violation[..],
            &violation[..],
            &violation[..],
            &compliant[..],
            &violation[..],
        ]
        .iter()
        .enumerate()
        {
            let outcome = monitor
                .process_frame(&frame((i as u64 + 1) * 10), dets)
                .unwrap();
            fired.push(outcome.alert_fired);
        }
        assert_eq!(fired, vec![true, false, false, false, true]);

        let report = monitor.finish();
        assert_eq!(report.alerts_fired, 2);
        assert_eq!(report.frames_evaluated, 5);
        assert_eq!(report.non_compliant_frames, 4);

        let log = std::fs::read_to_string(dir.path().join("alert_logs/ppe_alerts.log")).unwrap();
        assert_eq!(log.lines().count(), 2);
        assert!(log.contains("Non-compliance at frame 10: Missing helmet, vest/harness"));
        assert!(log.contains("Non-compliance at frame 50"));
    }

    #[test]
    fn sustained_violation_saves_every_tenth_evaluated_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = monitor(dir.path(), 10);
        let violation = [det(PpeClass::Person, 0.9)];

        let mut saved_at = Vec::new();
        for i in 1..=30u64 {
            let outcome = monitor.process_frame(&frame(i * 10), &violation).unwrap();
            if outcome.evidence_path.is_some() {
                saved_at.push(i);
            }
        }
        assert_eq!(saved_at, vec![10, 20, 30]);

        let report = monitor.finish();
        assert_eq!(report.evidence_saved, 3);
        assert_eq!(report.summary_rows, 3);
        let summary = std::fs::read_to_string(report.summary_path.unwrap()).unwrap();
        assert_eq!(summary.lines().count(), 4);
    }

    #[test]
    fn compliant_saves_never_reach_the_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = monitor(dir.path(), 1);
        let compliant = [det(PpeClass::Person, 0.9), det(PpeClass::Vest, 0.9)];

        let outcome = monitor.process_frame(&frame(10), &compliant).unwrap();
        let path = outcome.evidence_path.expect("saved with interval 1");
        assert_eq!(
            path.parent().unwrap(),
            dir.path().join("saved_frames").join("compliant")
        );

        let report = monitor.finish();
        assert_eq!(report.summary_rows, 0);
        assert!(report.summary_path.is_none());
        assert!(!dir.path().join("alerts_summary.csv").exists());
    }

    #[test]
    fn failed_save_skips_the_ledger_and_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = monitor(dir.path(), 1);

        // Replace the non_compliant directory with a file so saves fail.
        let nc_dir = dir.path().join("saved_frames").join("non_compliant");
        std::fs::remove_dir(&nc_dir).unwrap();
        std::fs::write(&nc_dir, b"").unwrap();

        let violation = [det(PpeClass::Person, 0.9)];
        let outcome = monitor.process_frame(&frame(10), &violation).unwrap();
        assert!(outcome.evidence_path.is_none());
        assert!(outcome.alert_fired);

        // The monitor is still healthy afterwards.
        let outcome = monitor.process_frame(&frame(20), &violation).unwrap();
        assert!(!outcome.verdict.is_compliant());

        let report = monitor.finish();
        assert_eq!(report.summary_rows, 0);
        assert_eq!(report.evidence_saved, 0);
    }

    #[test]
    fn unknown_class_aborts_the_frame_not_the_monitor() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = monitor(dir.path(), 10);

        let bad = Detection::new(99, 0.9, BBox::new(0.0, 0.0, 5.0, 5.0).unwrap());
        let err = monitor.process_frame(&frame(10), &[bad]).unwrap_err();
        assert_eq!(err.downcast_ref::<UnknownClassError>().unwrap().class_id, 99);

        // The next frame still processes.
        let outcome = monitor.process_frame(&frame(20), &[]).unwrap();
        assert!(outcome.verdict.is_compliant());
    }

    #[test]
    fn duplicate_episodes_append_separate_summary_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = monitor(dir.path(), 1);
        let violation = [det(PpeClass::NoGloves, 0.8)];

        monitor.process_frame(&frame(10), &violation).unwrap();
        monitor.process_frame(&frame(10), &violation).unwrap();

        let report = monitor.finish();
        assert_eq!(report.summary_rows, 2);
        let summary = std::fs::read_to_string(report.summary_path.unwrap()).unwrap();
        let rows: Vec<&str> = summary.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert!(row.starts_with("10,"));
            assert!(row.contains("gloves"));
        }
    }
}
