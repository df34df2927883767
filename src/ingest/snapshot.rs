//! Local snapshot files.
//!
//! Captured frames are written as `image_YYYYMMDD-HHMMSS.<ext>` under the
//! capture directory. The file stays on disk until an upload succeeds.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::frame::{CapturedFrame, FramePixels};

/// Snapshot file name for a frame, without collision handling.
pub fn snapshot_file_name(frame: &CapturedFrame) -> String {
    format!(
        "image_{}.{}",
        frame.captured_at.format("%Y%m%d-%H%M%S"),
        frame.extension()
    )
}

/// Writes `frame` into `dir` and returns the written path.
///
/// Two captures within the same second get `-1`, `-2`, ... suffixes instead of
/// overwriting each other.
pub fn write_snapshot(dir: &Path, frame: &CapturedFrame) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create capture directory {}", dir.display()))?;
    let path = unique_path(dir, &snapshot_file_name(frame));

    match &frame.pixels {
        FramePixels::Rgb8(pixels) => {
            let image = image::RgbImage::from_raw(frame.width, frame.height, pixels.clone())
                .ok_or_else(|| {
                    anyhow!(
                        "frame buffer of {} bytes does not match {}x{} rgb",
                        pixels.len(),
                        frame.width,
                        frame.height
                    )
                })?;
            image
                .save_with_format(&path, image::ImageFormat::Png)
                .with_context(|| format!("write snapshot {}", path.display()))?;
        }
        FramePixels::Jpeg(bytes) => {
            std::fs::write(&path, bytes)
                .with_context(|| format!("write snapshot {}", path.display()))?;
        }
    }

    log::debug!("snapshot written to {}", path.display());
    Ok(path)
}

fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (file_name, None),
    };
    let mut n = 1u32;
    loop {
        let name = match ext {
            Some(ext) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", stem, n),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn rgb_frame(width: u32, height: u32) -> CapturedFrame {
        let mut frame = CapturedFrame::new(
            width,
            height,
            FramePixels::Rgb8(vec![128u8; (width * height * 3) as usize]),
        );
        frame.captured_at = chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("unambiguous local time");
        frame
    }

    #[test]
    fn file_name_uses_capture_time() {
        assert_eq!(snapshot_file_name(&rgb_frame(2, 2)), "image_20240309-140507.png");
    }

    #[test]
    fn writes_png_and_avoids_collisions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let frame = rgb_frame(4, 3);

        let first = write_snapshot(dir.path(), &frame)?;
        let second = write_snapshot(dir.path(), &frame)?;

        assert_eq!(first.file_name().unwrap(), "image_20240309-140507.png");
        assert_eq!(second.file_name().unwrap(), "image_20240309-140507-1.png");
        let bytes = std::fs::read(&first)?;
        assert_eq!(&bytes[1..4], b"PNG");
        Ok(())
    }

    #[test]
    fn jpeg_frames_are_written_verbatim() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let frame = CapturedFrame::new(1, 1, FramePixels::Jpeg(vec![0xff, 0xd8, 0xff, 0xd9]));

        let path = write_snapshot(dir.path(), &frame)?;

        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(&path)?, vec![0xff, 0xd8, 0xff, 0xd9]);
        Ok(())
    }

    #[test]
    fn short_rgb_buffer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let frame = CapturedFrame::new(10, 10, FramePixels::Rgb8(vec![0u8; 12]));
        assert!(write_snapshot(dir.path(), &frame).is_err());
    }
}
