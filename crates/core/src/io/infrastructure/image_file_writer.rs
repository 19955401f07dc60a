use std::path::Path;

use crate::io::domain::image_writer::ImageWriter;
use crate::shared::frame::{Frame, PixelFormat};

/// Encodes RGB frames with the `image` crate; the format follows the file
/// extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.format() != PixelFormat::Rgb {
            return Err(format!("cannot encode a {:?} frame, convert to RGB first", frame.format()).into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = frame
            .to_rgb_image()
            .ok_or("frame buffer does not match its dimensions")?;
        img.save(path)?;
        log::debug!("Wrote {}x{} image to {}", img.width(), img.height(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb.repeat((width * height) as usize);
        Frame::new(data, width, height, PixelFormat::Rgb).unwrap()
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.png");
        ImageFileWriter::new()
            .write(&path, &make_frame(40, 20, [1, 2, 3]))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        ImageFileWriter::new()
            .write(&path, &make_frame(50, 30, [255, 255, 0]))
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (50, 30));
        assert_eq!(img.get_pixel(10, 10).0, [255, 255, 0]);
    }

    #[test]
    fn test_jpeg_output_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotated.jpg");
        ImageFileWriter::new()
            .write(&path, &make_frame(210, 105, [128, 128, 128]))
            .unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (210, 105));
    }

    #[test]
    fn test_non_rgb_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::new(vec![0; 24], 4, 4, PixelFormat::Nv21).unwrap();
        assert!(ImageFileWriter::new()
            .write(&dir.path().join("out.png"), &frame)
            .is_err());
    }

    #[test]
    fn test_unknown_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.notanimage");
        assert!(ImageFileWriter::new()
            .write(&path, &make_frame(4, 4, [0, 0, 0]))
            .is_err());
    }
}
