use chrono::{DateTime, Local};

/// Pixel payload of a captured frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FramePixels {
    /// Packed 8-bit RGB, `width * height * 3` bytes.
    Rgb8(Vec<u8>),
    /// Already-encoded JPEG (e.g. MJPEG devices).
    Jpeg(Vec<u8>),
}

/// One frame grabbed from a camera.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Local>,
    pub pixels: FramePixels,
}

impl CapturedFrame {
    pub fn new(width: u32, height: u32, pixels: FramePixels) -> Self {
        Self {
            width,
            height,
            captured_at: Local::now(),
            pixels,
        }
    }

    /// File extension used when the frame is written to disk.
    pub fn extension(&self) -> &'static str {
        match self.pixels {
            FramePixels::Rgb8(_) => "png",
            FramePixels::Jpeg(_) => "jpg",
        }
    }

    pub fn byte_len(&self) -> usize {
        match &self.pixels {
            FramePixels::Rgb8(bytes) | FramePixels::Jpeg(bytes) => bytes.len(),
        }
    }
}
