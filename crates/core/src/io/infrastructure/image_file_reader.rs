use std::path::Path;

use crate::io::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Decodes still images (PNG, JPEG, BMP, TIFF, WebP) into RGB frames.
///
/// Alpha is dropped and 16-bit samples are narrowed by the `image` crate.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        log::debug!(
            "Decoded {} ({}x{})",
            path.display(),
            img.width(),
            img.height()
        );
        Ok(Frame::from_rgb_image(img))
    }
}
