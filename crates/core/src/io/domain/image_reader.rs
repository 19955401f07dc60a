use std::path::Path;

use crate::shared::frame::Frame;

/// Loads a single frame from storage.
pub trait ImageReader: Send {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
