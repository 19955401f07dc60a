use image::GrayImage;

use crate::shared::region::Region;

pub type DetectorError = Box<dyn std::error::Error + Send + Sync>;

/// Domain interface for plate detection on a single-channel intensity image.
///
/// Detectors hold only immutable model state so one instance can serve
/// many frames, from several threads at once.
pub trait PlateDetector: Send + Sync {
    /// Returns detected plates in the coordinate space of `gray`.
    ///
    /// Order is detector-defined and must not be assumed sorted.
    fn detect(&self, gray: &GrayImage) -> Result<Vec<Region>, DetectorError>;
}
