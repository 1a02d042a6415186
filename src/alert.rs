//! Alerting.
//!
//! Three pieces: the edge-triggered debouncer deciding *whether* an alert
//! fires, the append-only alert log recording that it fired, and the
//! `AlarmSounder` seam for the audible side. The monitor wires them in the
//! fixed order sound-then-log.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Local;
use log::debug;

use crate::evaluate::ComplianceVerdict;

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Edge-triggered alert gate.
///
/// Fires exactly once per non-compliance episode: on the transition from
/// compliant (or session start) to non-compliant. Sustained non-compliance
/// stays quiet until a compliant frame closes the episode.
///
/// An optional cooldown window adds a minimum gap between firings: a new
/// episode opening inside the window is silenced entirely, it does not fire
/// late when the window expires.
#[derive(Debug)]
pub struct AlertDebouncer {
    active: bool,
    last_fired: Option<Instant>,
    cooldown: Option<Duration>,
}

impl AlertDebouncer {
    pub fn new() -> Self {
        Self {
            active: false,
            last_fired: None,
            cooldown: None,
        }
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            active: false,
            last_fired: None,
            cooldown: Some(cooldown),
        }
    }

    /// Feed one evaluated verdict. Returns true when an alert should fire.
    pub fn observe(&mut self, verdict: &ComplianceVerdict) -> bool {
        self.observe_at(verdict, Instant::now())
    }

    fn observe_at(&mut self, verdict: &ComplianceVerdict, now: Instant) -> bool {
        if verdict.is_compliant() {
            self.active = false;
            return false;
        }
        if self.active {
            return false;
        }
        self.active = true;
        if let (Some(cooldown), Some(last)) = (self.cooldown, self.last_fired) {
            if now.duration_since(last) < cooldown {
                debug!(
                    "alert for frame {} suppressed by cooldown window",
                    verdict.frame_index
                );
                return false;
            }
        }
        self.last_fired = Some(now);
        true
    }
}

impl Default for AlertDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Alert log
// ---------------------------------------------------------------------------

/// Append-only text log of fired alerts.
///
/// One line per alert:
/// `2026-08-25 14:03:21.418502: Non-compliance at frame 120: Missing helmet, vest/harness`
pub struct AlertLog {
    path: PathBuf,
}

impl AlertLog {
    /// Prepare the log at `path`, creating parent directories. The file
    /// itself is created lazily on first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("creating alert log directory {}", parent.display())
                })?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, verdict: &ComplianceVerdict) -> Result<()> {
        let items = if verdict.missing_items.is_empty() {
            "unknown".to_string()
        } else {
            verdict.joined_items()
        };
        let line = format!(
            "{}: Non-compliance at frame {}: Missing {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
            verdict.frame_index,
            items
        );
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening alert log {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("appending to alert log {}", self.path.display()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sounders
// ---------------------------------------------------------------------------

/// Audible alarm seam.
///
/// Implementations MUST:
/// - return only after playback has been handed off or completed
/// - treat a missing sound asset as a silent success, not an error
/// - be safe to call repeatedly within one session
pub trait AlarmSounder: Send {
    fn sound(&mut self) -> Result<()>;
}

/// Plays the alarm by invoking an external player command.
///
/// Playback is synchronous: the caller waits for the player to exit. When
/// the sound file does not exist the alarm is skipped without error; a
/// failing player command is reported so the caller can warn and continue.
pub struct CommandSounder {
    command: String,
    sound_file: PathBuf,
}

impl CommandSounder {
    pub fn new(command: impl Into<String>, sound_file: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            sound_file: sound_file.into(),
        }
    }
}

impl AlarmSounder for CommandSounder {
    fn sound(&mut self) -> Result<()> {
        if !self.sound_file.exists() {
            debug!(
                "alarm sound file {} not found, skipping playback",
                self.sound_file.display()
            );
            return Ok(());
        }
        let status = Command::new(&self.command)
            .arg(&self.sound_file)
            .status()
            .with_context(|| format!("spawning alarm player {}", self.command))?;
        if !status.success() {
            bail!("alarm player {} exited with {}", self.command, status);
        }
        Ok(())
    }
}

/// No-op sounder that counts invocations. Used by the demo and tests.
#[derive(Debug, Default)]
pub struct SilentSounder {
    invocations: u64,
}

impl SilentSounder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }
}

impl AlarmSounder for SilentSounder {
    fn sound(&mut self) -> Result<()> {
        self.invocations += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::MissingItem;

    fn non_compliant(frame_index: u64) -> ComplianceVerdict {
        ComplianceVerdict {
            frame_index,
            missing_items: vec![MissingItem::Helmet],
        }
    }

    fn compliant(frame_index: u64) -> ComplianceVerdict {
        ComplianceVerdict {
            frame_index,
            missing_items: Vec::new(),
        }
    }

    #[test]
    fn fires_once_per_episode() {
        let mut debouncer = AlertDebouncer::new();
        let fired: Vec<bool> = [
            non_compliant(10),
            non_compliant(20),
            non_compliant(30),
            compliant(40),
            non_compliant(50),
        ]
        .iter()
        .map(|v| debouncer.observe(v))
        .collect();
        assert_eq!(fired, vec![true, false, false, false, true]);
    }

    #[test]
    fn compliant_frames_never_fire() {
        let mut debouncer = AlertDebouncer::new();
        assert!(!debouncer.observe(&compliant(10)));
        assert!(!debouncer.observe(&compliant(20)));
    }

    #[test]
    fn cooldown_silences_a_new_episode_inside_the_window() {
        let mut debouncer = AlertDebouncer::with_cooldown(Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(debouncer.observe_at(&non_compliant(10), t0));
        assert!(!debouncer.observe_at(&compliant(20), t0 + Duration::from_secs(5)));
        // New episode 30s later: edge transition, but inside the window.
        assert!(!debouncer.observe_at(&non_compliant(30), t0 + Duration::from_secs(30)));
        assert!(!debouncer.observe_at(&compliant(40), t0 + Duration::from_secs(35)));
        // Window elapsed: the next episode fires again.
        assert!(debouncer.observe_at(&non_compliant(50), t0 + Duration::from_secs(61)));
    }

    #[test]
    fn without_cooldown_every_episode_fires() {
        let mut debouncer = AlertDebouncer::new();
        assert!(debouncer.observe(&non_compliant(10)));
        assert!(!debouncer.observe(&compliant(20)));
        assert!(debouncer.observe(&non_compliant(30)));
    }

    #[test]
    fn log_appends_one_line_per_alert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert_logs").join("ppe_alerts.log");
        let log = AlertLog::open(&path).unwrap();

        let verdict = ComplianceVerdict {
            frame_index: 42,
            missing_items: vec![MissingItem::Helmet, MissingItem::VestHarness],
        };
        log.append(&verdict).unwrap();
        log.append(&verdict).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            assert!(line.contains("Non-compliance at frame 42: Missing helmet, vest/harness"));
        }
    }

    #[test]
    fn log_writes_unknown_for_empty_item_list() {
        let dir = tempfile::tempdir().unwrap();
        let log = AlertLog::open(dir.path().join("alerts.log")).unwrap();
        log.append(&compliant(7)).unwrap();
        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert!(contents.contains("Non-compliance at frame 7: Missing unknown"));
    }

    #[test]
    fn command_sounder_skips_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sounder = CommandSounder::new("definitely-not-a-player", dir.path().join("absent.wav"));
        assert!(sounder.sound().is_ok());
    }

    #[test]
    fn command_sounder_reports_player_failure() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("alert.wav");
        std::fs::write(&wav, b"").unwrap();
        let mut sounder = CommandSounder::new("ppe-sentinel-no-such-player", &wav);
        assert!(sounder.sound().is_err());
    }

    #[test]
    fn silent_sounder_counts_invocations() {
        let mut sounder = SilentSounder::new();
        sounder.sound().unwrap();
        sounder.sound().unwrap();
        assert_eq!(sounder.invocations(), 2);
    }
}
