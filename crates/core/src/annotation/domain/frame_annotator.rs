use crate::shared::frame::Frame;
use crate::shared::region::Region;

pub type AnnotatorError = Box<dyn std::error::Error + Send + Sync>;

/// Domain interface for marking detections on a frame.
///
/// Implementations draw in place on `frame`, whose coordinate space the
/// regions are expressed in.
pub trait FrameAnnotator: Send + Sync {
    fn annotate(&self, frame: &mut Frame, regions: &[Region]) -> Result<(), AnnotatorError>;
}
