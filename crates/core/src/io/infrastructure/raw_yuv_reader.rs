use std::path::Path;

use crate::io::domain::image_reader::ImageReader;
use crate::shared::frame::{Frame, PixelFormat};

/// Reads headerless 4:2:0 camera dumps whose size is known out of band.
///
/// Files ending in `.nv21` hold the semi-planar layout; anything else is
/// taken as planar Y, U, V. The buffer length is not checked here: a
/// truncated dump is rejected by the colour conversion.
pub struct RawYuvReader {
    width: u32,
    height: u32,
}

impl RawYuvReader {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn format_for(path: &Path) -> PixelFormat {
        let is_nv21 = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("nv21"));
        if is_nv21 {
            PixelFormat::Nv21
        } else {
            PixelFormat::Yuv420
        }
    }
}

impl ImageReader for RawYuvReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let data = std::fs::read(path)?;
        let format = Self::format_for(path);
        let expected = format.buffer_len(self.width, self.height);
        if data.len() != expected {
            log::warn!(
                "{}: {} bytes, {}x{} {:?} needs {}",
                path.display(),
                data.len(),
                self.width,
                self.height,
                format,
                expected
            );
        }
        Ok(Frame::new(data, self.width, self.height, format)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::planar("frame.yuv", PixelFormat::Yuv420)]
    #[case::raw("frame.raw", PixelFormat::Yuv420)]
    #[case::semi_planar("frame.nv21", PixelFormat::Nv21)]
    #[case::upper_case("FRAME.NV21", PixelFormat::Nv21)]
    fn test_format_from_extension(#[case] name: &str, #[case] expected: PixelFormat) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, vec![16u8; 4 * 2 * 3 / 2]).unwrap();
        let frame = RawYuvReader::new(4, 2).read(&path).unwrap();
        assert_eq!(frame.format(), expected);
        assert_eq!((frame.width(), frame.height()), (4, 2));
        assert!(frame.has_valid_layout());
    }

    #[test]
    fn test_truncated_dump_is_read_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.yuv");
        std::fs::write(&path, vec![0u8; 5]).unwrap();
        let frame = RawYuvReader::new(4, 4).read(&path).unwrap();
        assert!(!frame.has_valid_layout());
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.yuv");
        std::fs::write(&path, b"").unwrap();
        assert!(RawYuvReader::new(0, 4).read(&path).is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(RawYuvReader::new(4, 4)
            .read(Path::new("/nonexistent/frame.yuv"))
            .is_err());
    }
}
