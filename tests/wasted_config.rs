use std::sync::Mutex;

use tempfile::NamedTempFile;

use waste_tally::config::WastedConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "WASTE_CONFIG",
        "WASTE_DB_PATH",
        "WASTE_CAPTURE_DIR",
        "WASTE_CAMERA_DEVICE",
        "WASTE_MOTION_SOURCE",
        "WASTE_UPLOAD_URL",
        "WASTE_BUCKET",
        "WASTE_UPLOAD_TOKEN",
        "WASTE_LABELS_URL",
        "WASTE_LABELS_TOKEN",
        "WASTE_MIN_CONFIDENCE",
        "WASTE_MAX_LABELS",
        "WASTE_RETRY_ATTEMPTS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = WastedConfig::load().expect("load defaults");

    assert_eq!(cfg.db_path, "waste_tally.db");
    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!(cfg.camera.warmup_frames, 2);
    assert_eq!(cfg.upload.bucket, "waste-images");
    assert_eq!(cfg.upload.key_prefix, "images/");
    assert_eq!(cfg.labels.max_labels, 10);
    assert_eq!(cfg.labels.min_confidence, 70.0);
    assert_eq!(cfg.retry.max_attempts, 1);
    assert!(!cfg.keep_local);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "db_path": "station_7.db",
        "capture_dir": "/var/lib/waste/captures",
        "keep_local": true,
        "camera": { "index": 2, "width": 1280, "height": 720, "warmup_frames": 3 },
        "motion": { "source": "stub://every/20", "poll_ms": 50, "settle_secs": 0 },
        "upload": {
            "location": "https://objects.example.net",
            "bucket": "hackathon-ce-bucket",
            "key_prefix": "/captures"
        },
        "labels": {
            "location": "https://labels.example.net/detect",
            "max_labels": 25,
            "min_confidence": 60
        },
        "retry": { "max_attempts": 3, "base_delay_ms": 100 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("WASTE_CONFIG", file.path());
    std::env::set_var("WASTE_MIN_CONFIDENCE", "80");
    std::env::set_var("WASTE_BUCKET", "station-7-images");

    let cfg = WastedConfig::load().expect("load config");

    assert_eq!(cfg.db_path, "station_7.db");
    assert_eq!(cfg.capture_dir.to_str(), Some("/var/lib/waste/captures"));
    assert!(cfg.keep_local);
    assert_eq!(cfg.camera.device, "/dev/video2");
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.warmup_frames, 3);
    assert_eq!(cfg.motion.source, "stub://every/20");
    assert_eq!(cfg.motion.poll_interval.as_millis(), 50);
    assert_eq!(cfg.upload.location, "https://objects.example.net");
    assert_eq!(cfg.upload.bucket, "station-7-images");
    assert_eq!(cfg.upload.key_prefix, "captures/");
    assert_eq!(cfg.labels.max_labels, 25);
    assert_eq!(cfg.labels.min_confidence, 80.0);
    assert_eq!(cfg.retry.max_attempts, 3);
    assert_eq!(cfg.retry.base_delay.as_millis(), 100);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("wasted.toml");
    std::fs::write(
        &path,
        r#"
db_path = "toml.db"

[camera]
device = "stub://bench"

[labels]
location = "stub://labels"
min_confidence = 55.5
"#,
    )
    .expect("write config");

    let mut cfg = WastedConfig::load_from(&path).expect("load toml");
    assert_eq!(cfg.db_path, "toml.db");
    assert_eq!(cfg.camera.device, "stub://bench");
    assert_eq!(cfg.labels.min_confidence, 55.5);

    cfg.set_camera_index(1);
    assert_eq!(cfg.camera.device, "/dev/video1");
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("WASTE_MIN_CONFIDENCE", "150");
    assert!(WastedConfig::load().is_err());

    std::env::set_var("WASTE_MIN_CONFIDENCE", "high");
    assert!(WastedConfig::load().is_err());
    clear_env();

    std::env::set_var("WASTE_MAX_LABELS", "0");
    assert!(WastedConfig::load().is_err());
    clear_env();

    std::env::set_var("WASTE_RETRY_ATTEMPTS", "0");
    assert!(WastedConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"camera": {"width": 0, "height": 480}}"#)
        .expect("write config");
    assert!(WastedConfig::load_from(file.path()).is_err());

    std::env::set_var("WASTE_CONFIG", "/nonexistent/wasted.json");
    assert!(WastedConfig::load().is_err());
    clear_env();
}
