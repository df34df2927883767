//! Waste Tally
//!
//! This crate implements a motion-triggered capture station that counts
//! recyclable waste.
//!
//! # Architecture
//!
//! One capture cycle runs per motion event:
//!
//! 1. **Capture**: grab a fresh frame from the camera and write it to disk.
//! 2. **Upload**: put the snapshot in object storage; the local copy is
//!    removed only after a successful upload.
//! 3. **Label**: ask the label-detection service what the image contains.
//! 4. **Classify**: map each label to a waste category with a fixed keyword
//!    table (pure, deterministic, no shared state).
//! 5. **Persist**: write one `(timestamp, category id)` row per item.
//!
//! # Module Structure
//!
//! - `classify`: keyword table, `WasteCategory`, `classify`
//! - `ingest`: camera sources and snapshot files
//! - `motion`: motion sensors and rising-edge trigger
//! - `upload`: object storage backends
//! - `labels`: label-detection backends
//! - `storage`: tally persistence
//! - `retry`: transient-error marker and backoff policy
//! - `cycle`: the capture cycle tying them together, and reprocessing of
//!   already-stored objects
//! - `config`: layered configuration

pub mod classify;
pub mod config;
pub mod cycle;
pub mod ingest;
pub mod labels;
pub mod motion;
pub mod retry;
pub mod storage;
pub mod upload;

pub use classify::{
    categorize, classify, ClassificationTally, Detection, WasteCategory, WasteClassifier,
};
pub use config::WastedConfig;
pub use cycle::{tally_object, CaptureCycle, CycleReport, CycleSettings};
pub use ingest::{CameraConfig, CameraSource, CapturedFrame, FramePixels};
pub use labels::{FixedLabelDetector, HttpLabelDetector, LabelDetector};
pub use motion::{MotionSensor, RisingEdge};
pub use retry::{RetryPolicy, TransientError};
pub use storage::{InMemoryTallyStore, SqliteTallyStore, TallyRecord, TallyStore};
pub use upload::{FilesystemObjectStore, HttpObjectStore, ObjectRef, ObjectStore};

/// Current local time as ISO-8601 with seconds precision
/// (e.g. `2024-03-09T14:05:07`), the format stored in the tally table.
pub fn now_iso8601() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_has_seconds_precision() {
        let ts = now_iso8601();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S").is_ok());
    }
}
