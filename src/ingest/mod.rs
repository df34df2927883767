//! Frame capture.
//!
//! This module provides the camera side of the capture cycle:
//! - `CameraSource`: on-demand frame capture (stub or V4L2)
//! - `write_snapshot`: persists a frame to the local capture directory
//!
//! V4L2 devices require the `ingest-v4l2` feature; `stub://` cameras are
//! always available.

pub mod camera;
mod frame;
pub mod snapshot;
#[cfg(feature = "ingest-v4l2")]
mod v4l2;

pub use camera::{CameraConfig, CameraSource, CameraStats};
pub use frame::{CapturedFrame, FramePixels};
pub use snapshot::{snapshot_file_name, write_snapshot};
