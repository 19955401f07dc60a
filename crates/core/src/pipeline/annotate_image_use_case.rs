use std::path::Path;

use crate::io::domain::image_reader::ImageReader;
use crate::io::domain::image_writer::ImageWriter;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::plate_pipeline::{DetectionOutcome, PlatePipeline};
use crate::shared::region::Region;

/// Single-image detection: read → detect → write the annotated frame.
///
/// Nothing is written when no plate is found.
pub struct AnnotateImageUseCase<'a> {
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    pipeline: &'a PlatePipeline,
}

impl<'a> AnnotateImageUseCase<'a> {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        pipeline: &'a PlatePipeline,
    ) -> Self {
        Self {
            reader,
            writer,
            pipeline,
        }
    }

    /// Returns the detected regions in the resized frame's coordinates.
    pub fn execute(
        &self,
        input_path: &Path,
        output_path: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        let frame = self.reader.read(input_path)?;

        match self.pipeline.detect_logged(&frame, logger)? {
            DetectionOutcome::Plates { annotated, regions } => {
                self.writer.write(output_path, &annotated)?;
                logger.info(&format!(
                    "{}: {} plate(s) -> {}",
                    input_path.display(),
                    regions.len(),
                    output_path.display()
                ));
                Ok(regions)
            }
            DetectionOutcome::NothingToDisplay => {
                logger.info(&format!("{}: nothing to display", input_path.display()));
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::infrastructure::box_annotator::BoxAnnotator;
    use crate::detection::domain::plate_detector::{DetectorError, PlateDetector};
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::{Frame, PixelFormat};
    use image::GrayImage;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubImageReader {
        frame: Frame,
    }

    impl ImageReader for StubImageReader {
        fn read(&self, _path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            Ok(self.frame.clone())
        }
    }

    struct FailingReader;

    impl ImageReader for FailingReader {
        fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            Err(format!("cannot open {}", path.display()).into())
        }
    }

    type Written = Arc<Mutex<Vec<(PathBuf, Frame)>>>;

    struct StubImageWriter {
        written: Written,
    }

    impl ImageWriter for StubImageWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    struct StubDetector {
        regions: Vec<Region>,
    }

    impl PlateDetector for StubDetector {
        fn detect(&self, _gray: &GrayImage) -> Result<Vec<Region>, DetectorError> {
            Ok(self.regions.clone())
        }
    }

    // --- Helpers ---

    fn make_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![128; (w * h * 3) as usize], w, h, PixelFormat::Rgb).unwrap()
    }

    fn pipeline_with(regions: Vec<Region>) -> PlatePipeline {
        PlatePipeline::with_components(
            Box::new(StubDetector { regions }),
            Box::new(BoxAnnotator::default()),
            1.05,
        )
        .unwrap()
    }

    fn stub_writer() -> (Box<dyn ImageWriter>, Written) {
        let written: Written = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(StubImageWriter {
                written: written.clone(),
            }),
            written,
        )
    }

    // --- Tests ---

    #[test]
    fn test_writes_annotated_frame_when_plates_found() {
        let region = Region::new(30, 30, 60, 20);
        let pipeline = pipeline_with(vec![region]);
        let (writer, written) = stub_writer();
        let uc = AnnotateImageUseCase::new(
            Box::new(StubImageReader {
                frame: make_frame(200, 100),
            }),
            writer,
            &pipeline,
        );

        let regions = uc
            .execute(Path::new("in.jpg"), Path::new("out/in.png"), &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(regions, vec![region]);
        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("out/in.png"));
        assert_eq!((written[0].1.width(), written[0].1.height()), (210, 105));
        assert_ne!(written[0].1.data(), make_frame(210, 105).data());
    }

    #[test]
    fn test_nothing_written_without_plates() {
        let pipeline = pipeline_with(vec![]);
        let (writer, written) = stub_writer();
        let uc = AnnotateImageUseCase::new(
            Box::new(StubImageReader {
                frame: make_frame(50, 50),
            }),
            writer,
            &pipeline,
        );

        let regions = uc
            .execute(Path::new("in.jpg"), Path::new("out.png"), &mut NullPipelineLogger)
            .unwrap();

        assert!(regions.is_empty());
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reader_error_is_propagated() {
        let pipeline = pipeline_with(vec![Region::new(0, 0, 5, 5)]);
        let (writer, written) = stub_writer();
        let uc = AnnotateImageUseCase::new(Box::new(FailingReader), writer, &pipeline);

        let err = uc
            .execute(Path::new("missing.jpg"), Path::new("out.png"), &mut NullPipelineLogger)
            .unwrap_err();
        assert!(err.to_string().contains("missing.jpg"));
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_pipeline_error_is_propagated() {
        let pipeline = pipeline_with(vec![]);
        let (writer, _) = stub_writer();
        let gray = Frame::new(vec![0; 16], 4, 4, PixelFormat::Gray).unwrap();
        let uc = AnnotateImageUseCase::new(Box::new(StubImageReader { frame: gray }), writer, &pipeline);
        assert!(uc
            .execute(Path::new("in.pgm"), Path::new("out.png"), &mut NullPipelineLogger)
            .is_err());
    }
}
