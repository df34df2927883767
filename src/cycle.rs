//! One capture → upload → label → classify → persist run.
//!
//! The label → classify → persist tail is also available on its own as
//! [`tally_object`], for images that are already in storage.
//!
//! `CaptureCycle` owns its collaborators; nothing here is process-global, so
//! separate cycles (e.g. one per camera) never share state.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::classify::{ClassificationTally, WasteClassifier};
use crate::config::WastedConfig;
use crate::ingest::{write_snapshot, CameraSource};
use crate::labels::{detector_from_location, LabelDetector};
use crate::retry::RetryPolicy;
use crate::storage::{SqliteTallyStore, TallyStore};
use crate::upload::{store_from_location, upload_then_remove, ObjectRef, ObjectStore};

/// Cycle parameters that are not collaborators.
#[derive(Clone, Debug)]
pub struct CycleSettings {
    pub capture_dir: PathBuf,
    pub keep_local: bool,
    pub bucket: String,
    pub key_prefix: String,
    pub max_labels: u32,
    pub min_confidence: f32,
    pub retry: RetryPolicy,
}

impl CycleSettings {
    pub fn from_config(cfg: &WastedConfig) -> Self {
        Self {
            capture_dir: cfg.capture_dir.clone(),
            keep_local: cfg.keep_local,
            bucket: cfg.upload.bucket.clone(),
            key_prefix: cfg.upload.key_prefix.clone(),
            max_labels: cfg.labels.max_labels,
            min_confidence: cfg.labels.min_confidence,
            retry: cfg.retry,
        }
    }
}

/// Outcome of one cycle.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub object: ObjectRef,
    pub time_stamp: String,
    pub labels_seen: usize,
    pub tally: ClassificationTally,
    pub rows_written: usize,
}

pub struct CaptureCycle {
    camera: CameraSource,
    store: Box<dyn ObjectStore>,
    detector: Box<dyn LabelDetector>,
    tallies: Box<dyn TallyStore>,
    classifier: WasteClassifier,
    settings: CycleSettings,
}

impl CaptureCycle {
    pub fn new(
        camera: CameraSource,
        store: Box<dyn ObjectStore>,
        detector: Box<dyn LabelDetector>,
        tallies: Box<dyn TallyStore>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            camera,
            store,
            detector,
            tallies,
            classifier: WasteClassifier::new(settings.min_confidence),
            settings,
        }
    }

    /// Builds every collaborator from configuration and connects the camera.
    ///
    /// Fails when the camera is unavailable.
    pub fn from_config(cfg: &WastedConfig) -> Result<Self> {
        let mut camera = CameraSource::new(cfg.camera.clone())?;
        camera
            .connect()
            .with_context(|| format!("open camera {}", cfg.camera.device))?;
        let store = store_from_location(
            &cfg.upload.location,
            cfg.upload.token.clone(),
            cfg.upload.timeout,
        )?;
        let detector = detector_from_location(
            &cfg.labels.location,
            cfg.labels.fixture.as_deref(),
            cfg.labels.token.clone(),
            cfg.labels.timeout,
        )?;
        let tallies = SqliteTallyStore::open(&cfg.db_path)
            .with_context(|| format!("open tally database {}", cfg.db_path))?;
        log::info!(
            "capture cycle ready: camera={} upload={} labels={} db={}",
            cfg.camera.device,
            store.name(),
            detector.name(),
            cfg.db_path
        );
        Ok(Self::new(
            camera,
            store,
            detector,
            Box::new(tallies),
            CycleSettings::from_config(cfg),
        ))
    }

    pub fn camera(&self) -> &CameraSource {
        &self.camera
    }

    pub fn tallies(&self) -> &dyn TallyStore {
        self.tallies.as_ref()
    }

    /// Runs one full cycle. Any collaborator failure propagates.
    pub fn run_once(&mut self) -> Result<CycleReport> {
        let frame = self.camera.capture().context("capture frame")?;
        let path = write_snapshot(&self.settings.capture_dir, &frame)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .context("snapshot path has no file name")?
            .to_string();
        let key = format!("{}{}", self.settings.key_prefix, file_name);

        let settings = &self.settings;
        let store = self.store.as_ref();
        let object = settings
            .retry
            .run("upload", || {
                upload_then_remove(store, &path, &settings.bucket, &key, settings.keep_local)
            })
            .with_context(|| format!("upload {} from {}", key, path.display()))?;

        tally_object(
            self.detector.as_ref(),
            self.tallies.as_mut(),
            &self.classifier,
            &object,
            settings.max_labels,
            &settings.retry,
        )
    }
}

/// Labels an object already in storage, classifies the labels and records
/// the tally. Label calls go through `retry`.
pub fn tally_object(
    detector: &dyn LabelDetector,
    tallies: &mut dyn TallyStore,
    classifier: &WasteClassifier,
    object: &ObjectRef,
    max_labels: u32,
    retry: &RetryPolicy,
) -> Result<CycleReport> {
    let labels = retry
        .run("detect labels", || {
            detector.detect_labels(object, max_labels, classifier.min_confidence())
        })
        .with_context(|| format!("detect labels for {}", object.key))?;
    for label in &labels {
        log::debug!("{} - {:.1}%", label.name, label.confidence);
    }

    let tally = classifier.classify(&labels);
    let time_stamp = crate::now_iso8601();
    let rows_written = tallies
        .record_tally(&time_stamp, Some(object.key.as_str()), &tally)
        .context("persist tally")?;

    for (category, count) in tally.iter() {
        log::info!("{} item count: {}", category, count);
    }
    log::info!(
        "tally complete: {} labels, {} items recorded for {}",
        labels.len(),
        rows_written,
        object.key
    );

    Ok(CycleReport {
        object: object.clone(),
        time_stamp,
        labels_seen: labels.len(),
        tally,
        rows_written,
    })
}
