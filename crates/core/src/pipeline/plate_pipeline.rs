//! Frame-in, annotated-frame-out licence plate detection.
//!
//! normalise → resize → grayscale → cascade search → annotate

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::annotation::domain::frame_annotator::{AnnotatorError, FrameAnnotator};
use crate::annotation::infrastructure::box_annotator::BoxAnnotator;
use crate::detection::domain::plate_detector::{DetectorError, PlateDetector};
use crate::detection::infrastructure::cascade::HaarCascade;
use crate::detection::infrastructure::cascade_loader::{self, CascadeLoadError};
use crate::detection::infrastructure::haar_cascade_detector::HaarCascadeDetector;
use crate::imaging::color_conversion::{normalize, to_grayscale};
use crate::imaging::resize::resize_frame;
use crate::pipeline::detection_config::{ConfigError, DetectionConfig};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::error::{ConversionError, ErrorKind};
use crate::shared::frame::{Frame, FrameError};
use crate::shared::region::Region;
use crate::shared::runtime;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("library not initialised, call runtime::init() first")]
    NotInitialized,
    #[error("classifier unavailable: {0}")]
    Classifier(#[from] CascadeLoadError),
    #[error("invalid input frame: {0}")]
    Input(#[from] FrameError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("scale factor must be finite and greater than 1, got {0}")]
    InvalidScaleFactor(f64),
    #[error(transparent)]
    Config(ConfigError),
    #[error("detection failed: {0}")]
    Detection(DetectorError),
    #[error("annotation failed: {0}")]
    Annotation(AnnotatorError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::NotInitialized
            | PipelineError::Classifier(_)
            | PipelineError::Detection(_) => ErrorKind::Resource,
            PipelineError::Input(_) => ErrorKind::Input,
            PipelineError::Conversion(_) | PipelineError::Annotation(_) => ErrorKind::Conversion,
            PipelineError::InvalidScaleFactor(_) | PipelineError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ScaleFactor { value, .. } => PipelineError::InvalidScaleFactor(value),
            other => PipelineError::Config(other),
        }
    }
}

/// Result of one detection call.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectionOutcome {
    /// At least one plate; `annotated` is the resized RGB frame with every
    /// region drawn on it, `regions` are in its coordinates.
    Plates {
        annotated: Frame,
        regions: Vec<Region>,
    },
    /// Nothing found; there is nothing to display.
    NothingToDisplay,
}

impl DetectionOutcome {
    pub fn regions(&self) -> &[Region] {
        match self {
            DetectionOutcome::Plates { regions, .. } => regions,
            DetectionOutcome::NothingToDisplay => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DetectionOutcome::NothingToDisplay)
    }
}

/// Reusable detection pipeline over one loaded classifier.
///
/// Holds only immutable state, so a single instance can serve frames from
/// several threads.
pub struct PlatePipeline {
    detector: Box<dyn PlateDetector>,
    annotator: Box<dyn FrameAnnotator>,
    resize_factor: f64,
}

impl PlatePipeline {
    pub fn new(cascade: Arc<HaarCascade>, config: &DetectionConfig) -> Result<Self, PipelineError> {
        if !runtime::is_initialized() {
            return Err(PipelineError::NotInitialized);
        }
        config.validate()?;
        let detector = HaarCascadeDetector::new(cascade, config.detection_params());
        let annotator = BoxAnnotator::new(
            config.label.clone(),
            config.color,
            config.thickness,
            config.label_offset,
        );
        Self::with_components(Box::new(detector), Box::new(annotator), config.resize_factor)
    }

    /// Pipeline over arbitrary detector and annotator implementations.
    pub fn with_components(
        detector: Box<dyn PlateDetector>,
        annotator: Box<dyn FrameAnnotator>,
        resize_factor: f64,
    ) -> Result<Self, PipelineError> {
        if !resize_factor.is_finite() || resize_factor <= 1.0 {
            return Err(PipelineError::InvalidScaleFactor(resize_factor));
        }
        Ok(Self {
            detector,
            annotator,
            resize_factor,
        })
    }

    pub fn resize_factor(&self) -> f64 {
        self.resize_factor
    }

    pub fn detect(&self, frame: &Frame) -> Result<DetectionOutcome, PipelineError> {
        self.detect_logged(frame, &mut NullPipelineLogger)
    }

    /// [`detect`](Self::detect) reporting per-stage timings and the plate
    /// count to `logger`.
    pub fn detect_logged(
        &self,
        frame: &Frame,
        logger: &mut dyn PipelineLogger,
    ) -> Result<DetectionOutcome, PipelineError> {
        if !frame.format().is_color() {
            return Err(FrameError::UnsupportedFormat {
                found: frame.format(),
                expected: "a colour layout (YUV420, NV21, RGB or BGR)",
            }
            .into());
        }

        let start = Instant::now();
        let rgb = normalize(frame)?;
        logger.timing("normalize", elapsed_ms(start));

        let start = Instant::now();
        let mut resized = resize_frame(&rgb, self.resize_factor)?;
        logger.timing("resize", elapsed_ms(start));

        let start = Instant::now();
        let gray = to_grayscale(&resized)?;
        logger.timing("grayscale", elapsed_ms(start));

        let start = Instant::now();
        let regions = self.detector.detect(&gray).map_err(PipelineError::Detection)?;
        logger.timing("detect", elapsed_ms(start));
        logger.metric("plates", regions.len() as f64);

        if regions.is_empty() {
            log::debug!(
                "No plates in {}x{} frame",
                resized.width(),
                resized.height()
            );
            return Ok(DetectionOutcome::NothingToDisplay);
        }

        let start = Instant::now();
        self.annotator
            .annotate(&mut resized, &regions)
            .map_err(PipelineError::Annotation)?;
        logger.timing("annotate", elapsed_ms(start));

        log::debug!("Detected {} plate(s)", regions.len());
        Ok(DetectionOutcome::Plates {
            annotated: resized,
            regions,
        })
    }
}

/// One-shot detection loading the classifier for this call only.
///
/// `scale_factor` drives both the pre-detection resize and the pyramid
/// step. Initialises the library if needed.
pub fn detect_plates(
    frame: &Frame,
    classifier_path: &Path,
    scale_factor: f64,
) -> Result<DetectionOutcome, PipelineError> {
    if !scale_factor.is_finite() || scale_factor <= 1.0 {
        return Err(PipelineError::InvalidScaleFactor(scale_factor));
    }
    runtime::init();
    let cascade = cascade_loader::load(classifier_path)?;
    let config = DetectionConfig {
        resize_factor: scale_factor,
        search_scale_factor: scale_factor,
        ..DetectionConfig::default()
    };
    PlatePipeline::new(Arc::new(cascade), &config)?.detect(frame)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
