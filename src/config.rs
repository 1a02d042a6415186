use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SOURCE_PATH: &str = "stub://line_a";
const DEFAULT_SOURCE_FPS: u32 = 10;
const DEFAULT_SOURCE_WIDTH: u32 = 640;
const DEFAULT_SOURCE_HEIGHT: u32 = 480;
const DEFAULT_BACKEND: &str = "scripted";
const DEFAULT_SAMPLE_INTERVAL: u64 = 10;
const DEFAULT_EVIDENCE_ROOT: &str = "saved_frames";
const DEFAULT_SAVE_INTERVAL: u64 = 10;
const DEFAULT_SUMMARY_PATH: &str = "alerts_summary.csv";
const DEFAULT_ALERT_LOG_PATH: &str = "alert_logs/ppe_alerts.log";
const DEFAULT_SOUND_COMMAND: &str = "aplay";
const DEFAULT_SOUND_FILE: &str = "alert.wav";
const DEFAULT_DEBOUNCE_SECS: u64 = 60;

#[derive(Debug, Deserialize, Default)]
struct SentinelConfigFile {
    source: Option<SourceConfigFile>,
    detector: Option<DetectorConfigFile>,
    evidence: Option<EvidenceConfigFile>,
    alerts: Option<AlertConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    path: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    model_floor: Option<f32>,
    confidence_threshold: Option<f32>,
    sample_interval: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct EvidenceConfigFile {
    root: Option<PathBuf>,
    save_interval: Option<u64>,
    summary_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    log_path: Option<PathBuf>,
    sound_command: Option<String>,
    sound_file: Option<PathBuf>,
    debounce_secs: Option<u64>,
    enforce_debounce_window: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SentinelConfig {
    pub source: SourceSettings,
    pub detector: DetectorSettings,
    pub evidence: EvidenceSettings,
    pub alerts: AlertSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub path: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub model_floor: f32,
    pub confidence_threshold: f32,
    pub sample_interval: u64,
}

#[derive(Debug, Clone)]
pub struct EvidenceSettings {
    pub root: PathBuf,
    pub save_interval: u64,
    pub summary_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub log_path: PathBuf,
    pub sound_command: String,
    pub sound_file: PathBuf,
    pub debounce_secs: u64,
    pub enforce_debounce_window: bool,
}

impl AlertSettings {
    pub fn cooldown(&self) -> Option<Duration> {
        self.enforce_debounce_window
            .then(|| Duration::from_secs(self.debounce_secs))
    }
}

impl SentinelConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTINEL_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentinelConfigFile) -> Self {
        let source = SourceSettings {
            path: file
                .source
                .as_ref()
                .and_then(|source| source.path.clone())
                .unwrap_or_else(|| DEFAULT_SOURCE_PATH.to_string()),
            target_fps: file
                .source
                .as_ref()
                .and_then(|source| source.target_fps)
                .unwrap_or(DEFAULT_SOURCE_FPS),
            width: file
                .source
                .as_ref()
                .and_then(|source| source.width)
                .unwrap_or(DEFAULT_SOURCE_WIDTH),
            height: file
                .source
                .as_ref()
                .and_then(|source| source.height)
                .unwrap_or(DEFAULT_SOURCE_HEIGHT),
        };
        let detector = DetectorSettings {
            backend: file
                .detector
                .as_ref()
                .and_then(|detector| detector.backend.clone())
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model_path: file.detector.as_ref().and_then(|d| d.model_path.clone()),
            model_floor: file
                .detector
                .as_ref()
                .and_then(|detector| detector.model_floor)
                .unwrap_or(crate::detect::MODEL_CONFIDENCE_FLOOR),
            confidence_threshold: file
                .detector
                .as_ref()
                .and_then(|detector| detector.confidence_threshold)
                .unwrap_or(crate::evaluate::DEFAULT_CONFIDENCE_THRESHOLD),
            sample_interval: file
                .detector
                .as_ref()
                .and_then(|detector| detector.sample_interval)
                .unwrap_or(DEFAULT_SAMPLE_INTERVAL),
        };
        let evidence = EvidenceSettings {
            root: file
                .evidence
                .as_ref()
                .and_then(|evidence| evidence.root.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_EVIDENCE_ROOT)),
            save_interval: file
                .evidence
                .as_ref()
                .and_then(|evidence| evidence.save_interval)
                .unwrap_or(DEFAULT_SAVE_INTERVAL),
            summary_path: file
                .evidence
                .as_ref()
                .and_then(|evidence| evidence.summary_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SUMMARY_PATH)),
        };
        let alerts = AlertSettings {
            log_path: file
                .alerts
                .as_ref()
                .and_then(|alerts| alerts.log_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ALERT_LOG_PATH)),
            sound_command: file
                .alerts
                .as_ref()
                .and_then(|alerts| alerts.sound_command.clone())
                .unwrap_or_else(|| DEFAULT_SOUND_COMMAND.to_string()),
            sound_file: file
                .alerts
                .as_ref()
                .and_then(|alerts| alerts.sound_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOUND_FILE)),
            debounce_secs: file
                .alerts
                .as_ref()
                .and_then(|alerts| alerts.debounce_secs)
                .unwrap_or(DEFAULT_DEBOUNCE_SECS),
            enforce_debounce_window: file
                .alerts
                .as_ref()
                .and_then(|alerts| alerts.enforce_debounce_window)
                .unwrap_or(false),
        };
        Self {
            source,
            detector,
            evidence,
            alerts,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("SENTINEL_SOURCE") {
            if !path.trim().is_empty() {
                self.source.path = path;
            }
        }
        if let Ok(backend) = std::env::var("SENTINEL_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend;
            }
        }
        if let Ok(path) = std::env::var("SENTINEL_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(root) = std::env::var("SENTINEL_EVIDENCE_ROOT") {
            if !root.trim().is_empty() {
                self.evidence.root = PathBuf::from(root);
            }
        }
        if let Ok(path) = std::env::var("SENTINEL_ALERT_LOG") {
            if !path.trim().is_empty() {
                self.alerts.log_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("SENTINEL_SUMMARY_PATH") {
            if !path.trim().is_empty() {
                self.evidence.summary_path = PathBuf::from(path);
            }
        }
        if let Ok(interval) = std::env::var("SENTINEL_SAMPLE_INTERVAL") {
            let frames: u64 = interval.parse().map_err(|_| {
                anyhow!("SENTINEL_SAMPLE_INTERVAL must be an integer number of frames")
            })?;
            self.detector.sample_interval = frames;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.source.path.trim().is_empty() {
            return Err(anyhow!("source path must not be empty"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source dimensions must be at least 1x1"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be greater than zero"));
        }
        if self.detector.backend.trim().is_empty() {
            return Err(anyhow!("detector backend must not be empty"));
        }
        if self.detector.sample_interval == 0 {
            return Err(anyhow!("sample_interval must be at least 1"));
        }
        if self.evidence.save_interval == 0 {
            return Err(anyhow!("save_interval must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.detector.model_floor) {
            return Err(anyhow!("model_floor must be within 0.0..=1.0"));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within 0.0..=1.0"));
        }
        if self.alerts.enforce_debounce_window && self.alerts.debounce_secs == 0 {
            return Err(anyhow!(
                "debounce_secs must be greater than zero when the window is enforced"
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentinelConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
