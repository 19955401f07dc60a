use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::infrastructure::haar_cascade_detector::DetectionParams;
use crate::shared::constants::{
    ANNOTATION_COLOR, ANNOTATION_THICKNESS, DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR,
    LABEL_OFFSET, PLATE_LABEL,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be finite and greater than 1, got {value}")]
    ScaleFactor { field: &'static str, value: f64 },
    #[error("thickness must be at least 1")]
    Thickness,
    #[error("min_size {min:?} exceeds max_size {max:?}")]
    SizeBounds { min: (u32, u32), max: (u32, u32) },
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Tunables of the detection pipeline.
///
/// `resize_factor` enlarges the frame before detection; `search_scale_factor`
/// is the step between pyramid levels of the cascade search. Both default to
/// 1.05. Missing JSON fields take their default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub resize_factor: f64,
    pub search_scale_factor: f64,
    pub min_neighbors: u32,
    pub min_size: Option<(u32, u32)>,
    pub max_size: Option<(u32, u32)>,
    pub label: String,
    pub color: [u8; 3],
    pub thickness: u32,
    pub label_offset: (i32, i32),
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            resize_factor: DEFAULT_SCALE_FACTOR,
            search_scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: None,
            max_size: None,
            label: PLATE_LABEL.to_string(),
            color: ANNOTATION_COLOR,
            thickness: ANNOTATION_THICKNESS,
            label_offset: LABEL_OFFSET,
        }
    }
}

impl DetectionConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_scale("resize_factor", self.resize_factor)?;
        check_scale("search_scale_factor", self.search_scale_factor)?;
        if self.thickness == 0 {
            return Err(ConfigError::Thickness);
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min.0 > max.0 || min.1 > max.1 {
                return Err(ConfigError::SizeBounds { min, max });
            }
        }
        Ok(())
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            scale_factor: self.search_scale_factor,
            min_neighbors: self.min_neighbors,
            min_size: self.min_size,
            max_size: self.max_size,
        }
    }
}

fn check_scale(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 1.0 {
        Ok(())
    } else {
        Err(ConfigError::ScaleFactor { field, value })
    }
}
