use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use ppe_sentinel::config::SentinelConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SENTINEL_CONFIG",
        "SENTINEL_SOURCE",
        "SENTINEL_BACKEND",
        "SENTINEL_MODEL_PATH",
        "SENTINEL_EVIDENCE_ROOT",
        "SENTINEL_ALERT_LOG",
        "SENTINEL_SUMMARY_PATH",
        "SENTINEL_SAMPLE_INTERVAL",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "path": "videos/line_a.mp4",
            "target_fps": 15,
            "width": 1280,
            "height": 720
        },
        "detector": {
            "backend": "tract",
            "model_path": "models/ppe.onnx",
            "model_floor": 0.25,
            "confidence_threshold": 0.6,
            "sample_interval": 5
        },
        "evidence": {
            "root": "prod_frames",
            "save_interval": 20,
            "summary_path": "prod_summary.csv"
        },
        "alerts": {
            "log_path": "prod_logs/alerts.log",
            "sound_command": "paplay",
            "sound_file": "siren.wav",
            "debounce_secs": 120,
            "enforce_debounce_window": true
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SENTINEL_CONFIG", file.path());
    std::env::set_var("SENTINEL_EVIDENCE_ROOT", "env_frames");
    std::env::set_var("SENTINEL_SAMPLE_INTERVAL", "7");

    let cfg = SentinelConfig::load().expect("load config");

    assert_eq!(cfg.source.path, "videos/line_a.mp4");
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!(cfg.source.width, 1280);
    assert_eq!(cfg.source.height, 720);
    assert_eq!(cfg.detector.backend, "tract");
    assert_eq!(
        cfg.detector.model_path.as_deref(),
        Some(std::path::Path::new("models/ppe.onnx"))
    );
    assert_eq!(cfg.detector.model_floor, 0.25);
    assert_eq!(cfg.detector.confidence_threshold, 0.6);
    assert_eq!(cfg.detector.sample_interval, 7);
    assert_eq!(cfg.evidence.root.to_str(), Some("env_frames"));
    assert_eq!(cfg.evidence.save_interval, 20);
    assert_eq!(cfg.evidence.summary_path.to_str(), Some("prod_summary.csv"));
    assert_eq!(cfg.alerts.log_path.to_str(), Some("prod_logs/alerts.log"));
    assert_eq!(cfg.alerts.sound_command, "paplay");
    assert_eq!(cfg.alerts.sound_file.to_str(), Some("siren.wav"));
    assert_eq!(cfg.alerts.debounce_secs, 120);
    assert!(cfg.alerts.enforce_debounce_window);
    assert_eq!(cfg.alerts.cooldown(), Some(Duration::from_secs(120)));

    clear_env();
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SentinelConfig::load().expect("load defaults");

    assert_eq!(cfg.source.path, "stub://line_a");
    assert_eq!(cfg.source.target_fps, 10);
    assert_eq!(cfg.source.width, 640);
    assert_eq!(cfg.source.height, 480);
    assert_eq!(cfg.detector.backend, "scripted");
    assert_eq!(cfg.detector.model_path, None);
    assert_eq!(cfg.detector.sample_interval, 10);
    assert_eq!(cfg.evidence.root.to_str(), Some("saved_frames"));
    assert_eq!(cfg.evidence.save_interval, 10);
    assert_eq!(cfg.evidence.summary_path.to_str(), Some("alerts_summary.csv"));
    assert_eq!(cfg.alerts.log_path.to_str(), Some("alert_logs/ppe_alerts.log"));
    assert_eq!(cfg.alerts.sound_command, "aplay");
    assert_eq!(cfg.alerts.debounce_secs, 60);
    assert_eq!(cfg.alerts.cooldown(), None);

    clear_env();
}

#[test]
fn rejects_zero_sample_interval() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SENTINEL_SAMPLE_INTERVAL", "0");
    let err = SentinelConfig::load().unwrap_err();
    assert!(err.to_string().contains("sample_interval must be at least 1"));

    clear_env();
}

#[test]
fn rejects_non_numeric_sample_interval() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SENTINEL_SAMPLE_INTERVAL", "every-ten");
    let err = SentinelConfig::load().unwrap_err();
    assert!(err
        .to_string()
        .contains("SENTINEL_SAMPLE_INTERVAL must be an integer number of frames"));

    clear_env();
}

#[test]
fn rejects_unparseable_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, b"sample_interval: 10").expect("write config");

    std::env::set_var("SENTINEL_CONFIG", file.path());
    let err = SentinelConfig::load().unwrap_err();
    assert!(err.to_string().contains("invalid config file"));

    clear_env();
}

#[test]
fn enforced_debounce_requires_a_nonzero_window() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "alerts": { "debounce_secs": 0, "enforce_debounce_window": true } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SENTINEL_CONFIG", file.path());
    let err = SentinelConfig::load().unwrap_err();
    assert!(err.to_string().contains("debounce_secs"));

    clear_env();
}
