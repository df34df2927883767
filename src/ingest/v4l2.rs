//! V4L2 camera backend.
//!
//! The device is opened and configured once in `connect`; a short-lived mmap
//! stream is created per capture so no stale buffers are held between
//! motion events.

use anyhow::{anyhow, Context, Result};

use super::camera::{CameraConfig, CameraStats};
use super::frame::{CapturedFrame, FramePixels};

const CAPTURE_FPS: u32 = 2;
const STREAM_BUFFERS: u32 = 1;

pub(crate) struct DeviceCamera {
    config: CameraConfig,
    device: Option<v4l::Device>,
    jpeg: bool,
    active_width: u32,
    active_height: u32,
    frames_read: u64,
    frames_kept: u64,
    last_error: Option<String>,
}

impl DeviceCamera {
    pub(crate) fn new(config: CameraConfig) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            device: None,
            jpeg: false,
            frames_read: 0,
            frames_kept: 0,
            last_error: None,
        }
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        use v4l::video::Capture;

        let device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("camera device {} unavailable", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "CameraSource: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let params = v4l::video::capture::Parameters::with_fps(CAPTURE_FPS);
        if let Err(err) = device.set_params(&params) {
            log::warn!(
                "CameraSource: failed to set fps on {}: {}",
                self.config.device,
                err
            );
        }

        self.jpeg = match &format.fourcc.repr {
            b"RGB3" => false,
            b"MJPG" | b"JPEG" => true,
            other => {
                return Err(anyhow!(
                    "camera {} negotiated unsupported pixel format {}",
                    self.config.device,
                    String::from_utf8_lossy(other)
                ))
            }
        };
        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;
        self.device = Some(device);

        log::info!(
            "CameraSource: connected to {} ({}x{}, {})",
            self.config.device,
            self.active_width,
            self.active_height,
            if self.jpeg { "jpeg" } else { "rgb" }
        );
        Ok(())
    }

    pub(crate) fn capture(&mut self) -> Result<CapturedFrame> {
        use v4l::buffer::Type;
        use v4l::io::traits::CaptureStream;

        let device = self.device.as_mut().context("camera device not connected")?;
        let mut stream =
            v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
                .context("create v4l2 buffer stream")?;

        let mut kept = Vec::new();
        for _ in 0..=self.config.warmup_frames {
            let (buf, _meta) = match stream.next() {
                Ok(frame) => frame,
                Err(err) => {
                    self.last_error = Some(err.to_string());
                    return Err(anyhow::Error::new(err).context("capture v4l2 frame"));
                }
            };
            self.frames_read += 1;
            kept.clear();
            kept.extend_from_slice(buf);
        }

        self.frames_kept += 1;
        let pixels = if self.jpeg {
            FramePixels::Jpeg(kept)
        } else {
            FramePixels::Rgb8(kept)
        };
        Ok(CapturedFrame::new(
            self.active_width,
            self.active_height,
            pixels,
        ))
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.last_error.is_none() && self.device.is_some()
    }

    pub(crate) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_read: self.frames_read,
            frames_kept: self.frames_kept,
            device: self.config.device.clone(),
        }
    }
}
