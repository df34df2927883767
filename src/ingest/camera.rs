//! Camera frame source.
//!
//! `CameraSource` grabs single frames on demand for the capture cycle.
//! - `stub://<name>` devices produce synthetic RGB frames (tests, dry runs)
//! - `/dev/videoN` devices use V4L2 (feature: ingest-v4l2)
//!
//! Cameras buffer frames internally, so each capture discards
//! `warmup_frames` stale frames before keeping one.

use anyhow::{anyhow, Result};

use super::frame::{CapturedFrame, FramePixels};
#[cfg(feature = "ingest-v4l2")]
use super::v4l2::DeviceCamera;

/// Configuration for a camera source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or "stub://<name>".
    pub device: String,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Frames read and dropped before the kept frame.
    pub warmup_frames: u32,
}

impl CameraConfig {
    /// Device path for a numbered video device.
    pub fn device_for_index(index: u32) -> String {
        format!("/dev/video{}", index)
    }

    /// Byte length of one packed RGB frame at the configured size.
    pub fn rgb_frame_len(&self) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow!(
                "camera frame size {}x{} must be non-zero",
                self.width,
                self.height
            ));
        }
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(3))
            .ok_or_else(|| {
                anyhow!(
                    "camera frame size {}x{} is too large",
                    self.width,
                    self.height
                )
            })
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: Self::device_for_index(0),
            width: 640,
            height: 480,
            warmup_frames: 2,
        }
    }
}

/// Camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.trim().is_empty() {
            return Err(anyhow!("camera device must not be empty"));
        }
        let frame_len = config.rgb_frame_len()?;
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config, frame_len)),
            });
        }
        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(DeviceCamera::new(config)),
            })
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(anyhow!(
                "camera device {} unavailable: built without the ingest-v4l2 feature",
                config.device
            ))
        }
    }

    /// Open the device. Fails when the device is unavailable.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.connect(),
        }
    }

    /// Capture one fresh frame.
    pub fn capture(&mut self) -> Result<CapturedFrame> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.capture(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.capture(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(_) => true,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.is_healthy(),
        }
    }

    /// Get capture statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.stats(),
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_read: u64,
    pub frames_kept: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    frame_len: usize,
    connected: bool,
    frames_read: u64,
    frames_kept: u64,
}

impl SyntheticCamera {
    fn new(config: CameraConfig, frame_len: usize) -> Self {
        Self {
            config,
            frame_len,
            connected: false,
            frames_read: 0,
            frames_kept: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("CameraSource: connected to {} (synthetic)", self.config.device);
        Ok(())
    }

    fn capture(&mut self) -> Result<CapturedFrame> {
        if !self.connected {
            return Err(anyhow!(
                "camera {} not connected; call connect() first",
                self.config.device
            ));
        }
        for _ in 0..self.config.warmup_frames {
            self.generate_pixels();
        }
        let pixels = self.generate_pixels();
        self.frames_kept += 1;
        Ok(CapturedFrame::new(
            self.config.width,
            self.config.height,
            FramePixels::Rgb8(pixels),
        ))
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        self.frames_read += 1;
        let mut pixels = vec![0u8; self.frame_len];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frames_read) % 256) as u8;
        }
        pixels
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_read: self.frames_read,
            frames_kept: self.frames_kept,
            device: self.config.device.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://test".to_string(),
            width: 32,
            height: 24,
            warmup_frames: 2,
        }
    }

    #[test]
    fn stub_camera_produces_rgb_frames() -> Result<()> {
        let mut camera = CameraSource::new(stub_config())?;
        camera.connect()?;

        let frame = camera.capture()?;
        assert_eq!(frame.width, 32);
        assert_eq!(frame.height, 24);
        assert_eq!(frame.byte_len(), 32 * 24 * 3);
        assert_eq!(frame.extension(), "png");
        Ok(())
    }

    #[test]
    fn capture_discards_warmup_frames() -> Result<()> {
        let mut camera = CameraSource::new(stub_config())?;
        camera.connect()?;
        camera.capture()?;
        camera.capture()?;

        let stats = camera.stats();
        assert_eq!(stats.frames_kept, 2);
        assert_eq!(stats.frames_read, 6);
        Ok(())
    }

    #[test]
    fn capture_before_connect_fails() -> Result<()> {
        let mut camera = CameraSource::new(stub_config())?;
        assert!(camera.capture().is_err());
        Ok(())
    }

    #[test]
    fn missing_device_is_unavailable() {
        let config = CameraConfig {
            device: "/dev/video-does-not-exist".to_string(),
            ..CameraConfig::default()
        };
        let result = CameraSource::new(config).and_then(|mut camera| camera.connect());
        assert!(result.is_err());
    }

    #[test]
    fn oversized_or_empty_frames_are_rejected() {
        let huge = CameraConfig {
            width: u32::MAX,
            height: u32::MAX,
            ..stub_config()
        };
        assert!(huge.rgb_frame_len().is_err());
        assert!(CameraSource::new(huge).is_err());

        let empty = CameraConfig {
            width: 0,
            ..stub_config()
        };
        assert!(CameraSource::new(empty).is_err());

        let large = CameraConfig {
            width: 40_000,
            height: 40_000,
            ..stub_config()
        };
        assert_eq!(large.rgb_frame_len().ok(), Some(40_000 * 40_000 * 3));
    }

    #[test]
    fn index_maps_to_video_device() {
        assert_eq!(CameraConfig::device_for_index(2), "/dev/video2");
        assert_eq!(CameraConfig::default().device, "/dev/video0");
    }
}
