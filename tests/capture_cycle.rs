use std::cell::Cell;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};

use waste_tally::cycle::CycleSettings;
use waste_tally::{
    tally_object, CameraConfig, CameraSource, CaptureCycle, Detection, FilesystemObjectStore,
    FixedLabelDetector, InMemoryTallyStore, LabelDetector, ObjectRef, ObjectStore, RetryPolicy,
    TallyStore, TransientError, WasteCategory, WasteClassifier,
};

fn stub_camera() -> Result<CameraSource> {
    let mut camera = CameraSource::new(CameraConfig {
        device: "stub://bench".to_string(),
        width: 16,
        height: 12,
        warmup_frames: 2,
    })?;
    camera.connect()?;
    Ok(camera)
}

fn settings(capture_dir: &Path, max_attempts: u32) -> CycleSettings {
    CycleSettings {
        capture_dir: capture_dir.to_path_buf(),
        keep_local: false,
        bucket: "waste-images".to_string(),
        key_prefix: "images/".to_string(),
        max_labels: 10,
        min_confidence: 70.0,
        retry: RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        },
    }
}

fn scenario_labels() -> FixedLabelDetector {
    FixedLabelDetector::new(vec![
        Detection::new("Bottle", 95.0),
        Detection::new("Banana", 88.0),
        Detection::new("XYZ", 99.0),
        Detection::new("Soda Can", 65.0),
    ])
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|it| it.count()).unwrap_or(0)
}

struct RejectingStore;

impl ObjectStore for RejectingStore {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn put(&self, _local_path: &Path, _bucket: &str, _key: &str) -> Result<ObjectRef> {
        Err(anyhow!("access denied"))
    }
}

struct FlakyDetector {
    failures_left: Cell<u32>,
    inner: FixedLabelDetector,
}

impl LabelDetector for FlakyDetector {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn detect_labels(
        &self,
        image: &ObjectRef,
        max_labels: u32,
        min_confidence: f32,
    ) -> Result<Vec<Detection>> {
        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            return Err(TransientError::new("service unavailable").into());
        }
        self.inner.detect_labels(image, max_labels, min_confidence)
    }
}

#[test]
fn cycle_uploads_classifies_and_persists() -> Result<()> {
    let work = tempfile::tempdir()?;
    let captures = work.path().join("captures");
    let objects = work.path().join("objects");

    let mut cycle = CaptureCycle::new(
        stub_camera()?,
        Box::new(FilesystemObjectStore::new(&objects)),
        Box::new(scenario_labels()),
        Box::new(InMemoryTallyStore::new()),
        settings(&captures, 1),
    );

    let report = cycle.run_once()?;

    assert_eq!(report.object.bucket, "waste-images");
    assert!(report.object.key.starts_with("images/image_"));
    assert!(report.object.key.ends_with(".png"));
    assert_eq!(report.labels_seen, 3);
    assert_eq!(report.tally.get(WasteCategory::RecyclableBottles), 1);
    assert_eq!(report.tally.get(WasteCategory::Other), 2);
    assert_eq!(report.tally.total(), 3);
    assert_eq!(report.rows_written, 3);

    // Uploaded copy exists; local snapshot was removed.
    let uploaded = objects.join("waste-images").join(&report.object.key);
    assert!(uploaded.exists());
    assert_eq!(files_in(&captures), 0);

    let totals = cycle.tallies().totals()?;
    assert_eq!(totals, report.tally);
    let recent = cycle.tallies().recent(10)?;
    assert!(recent
        .iter()
        .all(|r| r.image_key.as_deref() == Some(report.object.key.as_str())));
    assert!(recent.iter().all(|r| r.time_stamp == report.time_stamp));
    Ok(())
}

#[test]
fn failed_upload_keeps_snapshot_and_records_nothing() -> Result<()> {
    let work = tempfile::tempdir()?;
    let captures = work.path().join("captures");

    let mut cycle = CaptureCycle::new(
        stub_camera()?,
        Box::new(RejectingStore),
        Box::new(scenario_labels()),
        Box::new(InMemoryTallyStore::new()),
        settings(&captures, 3),
    );

    let err = cycle.run_once().unwrap_err();
    assert!(format!("{:#}", err).contains("access denied"));
    assert_eq!(files_in(&captures), 1);
    assert!(cycle.tallies().totals()?.is_empty());
    Ok(())
}

#[test]
fn transient_label_failures_are_retried_when_enabled() -> Result<()> {
    let work = tempfile::tempdir()?;

    let mut cycle = CaptureCycle::new(
        stub_camera()?,
        Box::new(FilesystemObjectStore::new(work.path().join("objects"))),
        Box::new(FlakyDetector {
            failures_left: Cell::new(2),
            inner: scenario_labels(),
        }),
        Box::new(InMemoryTallyStore::new()),
        settings(&work.path().join("captures"), 3),
    );

    let report = cycle.run_once()?;
    assert_eq!(report.tally.total(), 3);
    Ok(())
}

#[test]
fn transient_label_failure_propagates_without_retries() -> Result<()> {
    let work = tempfile::tempdir()?;

    let mut cycle = CaptureCycle::new(
        stub_camera()?,
        Box::new(FilesystemObjectStore::new(work.path().join("objects"))),
        Box::new(FlakyDetector {
            failures_left: Cell::new(1),
            inner: scenario_labels(),
        }),
        Box::new(InMemoryTallyStore::new()),
        settings(&work.path().join("captures"), 1),
    );

    let err = cycle.run_once().unwrap_err();
    assert!(waste_tally::retry::is_transient(&err));
    assert!(cycle.tallies().totals()?.is_empty());

    // The next motion event succeeds on its own.
    let report = cycle.run_once()?;
    assert_eq!(cycle.tallies().totals()?, report.tally);
    Ok(())
}

#[test]
fn stored_object_is_tallied_after_label_failure() -> Result<()> {
    let work = tempfile::tempdir()?;
    let captures = work.path().join("captures");
    let objects = work.path().join("objects");

    let mut cycle = CaptureCycle::new(
        stub_camera()?,
        Box::new(FilesystemObjectStore::new(&objects)),
        Box::new(FlakyDetector {
            failures_left: Cell::new(1),
            inner: scenario_labels(),
        }),
        Box::new(InMemoryTallyStore::new()),
        settings(&captures, 1),
    );
    assert!(cycle.run_once().is_err());

    // Uploaded and removed locally, but never tallied.
    assert_eq!(files_in(&captures), 0);
    assert!(cycle.tallies().totals()?.is_empty());
    let uploaded_dir = objects.join("waste-images").join("images");
    let file_name = std::fs::read_dir(&uploaded_dir)?
        .next()
        .expect("uploaded object")?
        .file_name()
        .into_string()
        .expect("utf-8 file name");

    let object = ObjectRef::from_event_key("waste-images", &format!("images%2F{}", file_name))?;
    assert_eq!(object.key, format!("images/{}", file_name));

    let mut tallies = InMemoryTallyStore::new();
    let report = tally_object(
        &scenario_labels(),
        &mut tallies,
        &WasteClassifier::new(70.0),
        &object,
        10,
        &RetryPolicy::default(),
    )?;

    assert_eq!(report.object, object);
    assert_eq!(report.rows_written, 3);
    assert_eq!(tallies.totals()?.get(WasteCategory::RecyclableBottles), 1);
    assert_eq!(tallies.totals()?.get(WasteCategory::Other), 2);
    let recent = tallies.recent(10)?;
    assert_eq!(recent.len(), 3);
    assert!(recent
        .iter()
        .all(|r| r.image_key.as_deref() == Some(object.key.as_str())));
    Ok(())
}

#[test]
fn from_config_builds_stub_station() -> Result<()> {
    let work = tempfile::tempdir()?;
    let fixture = work.path().join("labels.json");
    std::fs::write(
        &fixture,
        r#"{"Labels":[{"Name":"Battery","Confidence":91.0},{"Name":"Cardboard","Confidence":77.0}]}"#,
    )?;
    let config_path = work.path().join("wasted.json");
    let config = serde_json::json!({
        "db_path": work.path().join("tally.db"),
        "capture_dir": work.path().join("captures"),
        "camera": { "device": "stub://bench", "width": 8, "height": 8 },
        "upload": { "location": work.path().join("objects") },
        "labels": { "location": "stub://labels", "fixture": fixture },
    });
    std::fs::write(&config_path, serde_json::to_vec(&config)?)?;

    let cfg = waste_tally::WastedConfig::load_from(&config_path)?;
    let mut cycle = CaptureCycle::from_config(&cfg)?;
    cycle.run_once()?;
    cycle.run_once()?;

    let totals = cycle.tallies().totals()?;
    assert_eq!(totals.get(WasteCategory::Hazardous), 2);
    assert_eq!(totals.get(WasteCategory::RecyclableCardboard), 2);
    assert_eq!(totals.total(), 4);
    Ok(())
}

#[test]
fn from_config_fails_when_camera_unavailable() -> Result<()> {
    let work = tempfile::tempdir()?;
    let config_path = work.path().join("wasted.json");
    let config = serde_json::json!({
        "db_path": work.path().join("tally.db"),
        "camera": { "device": "/dev/video-missing" },
    });
    std::fs::write(&config_path, serde_json::to_vec(&config)?)?;

    let cfg = waste_tally::WastedConfig::load_from(&config_path)?;
    assert!(CaptureCycle::from_config(&cfg).is_err());
    Ok(())
}
