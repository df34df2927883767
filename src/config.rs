use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::CameraConfig;
use crate::retry::RetryPolicy;

const DEFAULT_DB_PATH: &str = "waste_tally.db";
const DEFAULT_CAPTURE_DIR: &str = "objects";
const DEFAULT_CAMERA_INDEX: u32 = 0;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_WARMUP_FRAMES: u32 = 2;
const DEFAULT_MOTION_SOURCE: &str = "/sys/class/gpio/gpio8/value";
const DEFAULT_MOTION_POLL_MS: u64 = 100;
const DEFAULT_MOTION_SETTLE_SECS: u64 = 2;
const DEFAULT_UPLOAD_LOCATION: &str = "uploads";
const DEFAULT_BUCKET: &str = "waste-images";
const DEFAULT_KEY_PREFIX: &str = "images/";
const DEFAULT_LABELS_LOCATION: &str = "stub://labels";
const DEFAULT_MAX_LABELS: u32 = 10;
const DEFAULT_MIN_CONFIDENCE: f32 = 70.0;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 1;
const DEFAULT_RETRY_BASE_MS: u64 = 500;
const DEFAULT_RETRY_MAX_MS: u64 = 10_000;

#[derive(Debug, Deserialize, Default)]
struct WastedConfigFile {
    db_path: Option<String>,
    capture_dir: Option<PathBuf>,
    keep_local: Option<bool>,
    camera: Option<CameraConfigFile>,
    motion: Option<MotionConfigFile>,
    upload: Option<UploadConfigFile>,
    labels: Option<LabelsConfigFile>,
    retry: Option<RetryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    index: Option<u32>,
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    warmup_frames: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct MotionConfigFile {
    source: Option<String>,
    poll_ms: Option<u64>,
    settle_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct UploadConfigFile {
    location: Option<String>,
    bucket: Option<String>,
    key_prefix: Option<String>,
    token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LabelsConfigFile {
    location: Option<String>,
    fixture: Option<PathBuf>,
    token: Option<String>,
    max_labels: Option<u32>,
    min_confidence: Option<f32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RetryConfigFile {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct WastedConfig {
    pub db_path: String,
    pub capture_dir: PathBuf,
    pub keep_local: bool,
    pub camera: CameraConfig,
    pub motion: MotionSettings,
    pub upload: UploadSettings,
    pub labels: LabelSettings,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct MotionSettings {
    /// GPIO value path or `stub://every/N`.
    pub source: String,
    pub poll_interval: Duration,
    pub settle: Duration,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    /// http(s) endpoint or local directory.
    pub location: String,
    pub bucket: String,
    pub key_prefix: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LabelSettings {
    /// http(s) endpoint or `stub://`.
    pub location: String,
    pub fixture: Option<PathBuf>,
    pub token: Option<String>,
    pub max_labels: u32,
    pub min_confidence: f32,
    pub timeout: Duration,
}

impl WastedConfig {
    /// Loads defaults, then the file named by `WASTE_CONFIG`, then `WASTE_*`
    /// environment overrides, and validates the result.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WASTE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads from an explicit file path instead of `WASTE_CONFIG`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Points the camera at `/dev/video<index>`.
    pub fn set_camera_index(&mut self, index: u32) {
        self.camera.device = CameraConfig::device_for_index(index);
    }

    fn from_file(file: WastedConfigFile) -> Self {
        let camera_file = file.camera.unwrap_or_default();
        let motion_file = file.motion.unwrap_or_default();
        let upload_file = file.upload.unwrap_or_default();
        let labels_file = file.labels.unwrap_or_default();
        let retry_file = file.retry.unwrap_or_default();

        let camera = CameraConfig {
            device: camera_file.device.unwrap_or_else(|| {
                CameraConfig::device_for_index(camera_file.index.unwrap_or(DEFAULT_CAMERA_INDEX))
            }),
            width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            warmup_frames: camera_file.warmup_frames.unwrap_or(DEFAULT_WARMUP_FRAMES),
        };
        let motion = MotionSettings {
            source: motion_file
                .source
                .unwrap_or_else(|| DEFAULT_MOTION_SOURCE.to_string()),
            poll_interval: Duration::from_millis(
                motion_file.poll_ms.unwrap_or(DEFAULT_MOTION_POLL_MS),
            ),
            settle: Duration::from_secs(
                motion_file
                    .settle_secs
                    .unwrap_or(DEFAULT_MOTION_SETTLE_SECS),
            ),
        };
        let upload = UploadSettings {
            location: upload_file
                .location
                .unwrap_or_else(|| DEFAULT_UPLOAD_LOCATION.to_string()),
            bucket: upload_file
                .bucket
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            key_prefix: upload_file
                .key_prefix
                .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
            token: upload_file.token,
            timeout: Duration::from_secs(upload_file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        };
        let labels = LabelSettings {
            location: labels_file
                .location
                .unwrap_or_else(|| DEFAULT_LABELS_LOCATION.to_string()),
            fixture: labels_file.fixture,
            token: labels_file.token,
            max_labels: labels_file.max_labels.unwrap_or(DEFAULT_MAX_LABELS),
            min_confidence: labels_file.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
            timeout: Duration::from_secs(labels_file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        };
        let retry = RetryPolicy {
            max_attempts: retry_file.max_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            base_delay: Duration::from_millis(
                retry_file.base_delay_ms.unwrap_or(DEFAULT_RETRY_BASE_MS),
            ),
            max_delay: Duration::from_millis(retry_file.max_delay_ms.unwrap_or(DEFAULT_RETRY_MAX_MS)),
        };

        Self {
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            capture_dir: file
                .capture_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CAPTURE_DIR)),
            keep_local: file.keep_local.unwrap_or(false),
            camera,
            motion,
            upload,
            labels,
            retry,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = non_empty_env("WASTE_DB_PATH") {
            self.db_path = path;
        }
        if let Some(dir) = non_empty_env("WASTE_CAPTURE_DIR") {
            self.capture_dir = PathBuf::from(dir);
        }
        if let Some(device) = non_empty_env("WASTE_CAMERA_DEVICE") {
            self.camera.device = device;
        }
        if let Some(source) = non_empty_env("WASTE_MOTION_SOURCE") {
            self.motion.source = source;
        }
        if let Some(location) = non_empty_env("WASTE_UPLOAD_URL") {
            self.upload.location = location;
        }
        if let Some(bucket) = non_empty_env("WASTE_BUCKET") {
            self.upload.bucket = bucket;
        }
        if let Some(token) = non_empty_env("WASTE_UPLOAD_TOKEN") {
            self.upload.token = Some(token);
        }
        if let Some(location) = non_empty_env("WASTE_LABELS_URL") {
            self.labels.location = location;
        }
        if let Some(token) = non_empty_env("WASTE_LABELS_TOKEN") {
            self.labels.token = Some(token);
        }
        if let Some(value) = non_empty_env("WASTE_MIN_CONFIDENCE") {
            self.labels.min_confidence = value
                .parse()
                .map_err(|_| anyhow!("WASTE_MIN_CONFIDENCE must be a number between 0 and 100"))?;
        }
        if let Some(value) = non_empty_env("WASTE_MAX_LABELS") {
            self.labels.max_labels = value
                .parse()
                .map_err(|_| anyhow!("WASTE_MAX_LABELS must be a positive integer"))?;
        }
        if let Some(value) = non_empty_env("WASTE_RETRY_ATTEMPTS") {
            self.retry.max_attempts = value
                .parse()
                .map_err(|_| anyhow!("WASTE_RETRY_ATTEMPTS must be a positive integer"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let min_confidence = self.labels.min_confidence;
        if !(0.0..=100.0).contains(&min_confidence) {
            return Err(anyhow!(
                "min_confidence must be within 0..=100 (got {})",
                min_confidence
            ));
        }
        if self.labels.max_labels == 0 {
            return Err(anyhow!("max_labels must be greater than zero"));
        }
        if self.upload.bucket.trim().is_empty() {
            return Err(anyhow!("upload bucket must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry max_attempts must be at least 1"));
        }
        self.camera.rgb_frame_len()?;
        if self.motion.poll_interval.is_zero() {
            return Err(anyhow!("motion poll_ms must be greater than zero"));
        }
        self.upload.key_prefix = self.upload.key_prefix.trim_start_matches('/').to_string();
        if !self.upload.key_prefix.is_empty() && !self.upload.key_prefix.ends_with('/') {
            self.upload.key_prefix.push('/');
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<WastedConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path.extension().and_then(|ext| ext.to_str()) == Some("toml");
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
