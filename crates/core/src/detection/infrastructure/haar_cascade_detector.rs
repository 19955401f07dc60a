//! Multi-scale sliding-window search with a [`HaarCascade`].
//!
//! The image is shrunk by successive powers of the scale factor while the
//! cascade window stays at its trained size, so each level finds objects
//! `factor` times larger than the window. Raw hits are mapped back to the
//! input image and clustered by [`group_regions`].

use std::borrow::Cow;
use std::sync::Arc;

use image::GrayImage;

use crate::detection::domain::plate_detector::{DetectorError, PlateDetector};
use crate::detection::domain::region_grouper::group_regions;
use crate::imaging::resize::resize_gray;
use crate::shared::constants::{DEFAULT_MIN_NEIGHBORS, DEFAULT_SCALE_FACTOR, GROUPING_EPS};
use crate::shared::region::Region;

use super::cascade::HaarCascade;
use super::integral_image::IntegralImages;

/// Search parameters for [`HaarCascadeDetector`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    /// Ratio between consecutive pyramid levels, must exceed 1.
    pub scale_factor: f64,
    pub min_neighbors: u32,
    /// Smallest object `(width, height)` to report; `None` means no limit.
    pub min_size: Option<(u32, u32)>,
    /// Largest object `(width, height)`; `None` means the image size.
    pub max_size: Option<(u32, u32)>,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_size: None,
            max_size: None,
        }
    }
}

/// One pyramid level: the image is shrunk to `scaled` and the cascade
/// window covers `window` pixels of the original image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PyramidLevel {
    pub factor: f64,
    pub scaled: (u32, u32),
    pub window: (u32, u32),
}

pub struct HaarCascadeDetector {
    cascade: Arc<HaarCascade>,
    params: DetectionParams,
}

impl HaarCascadeDetector {
    pub fn new(cascade: Arc<HaarCascade>, params: DetectionParams) -> Self {
        Self { cascade, params }
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Every accepted window across all pyramid levels, before grouping.
    pub fn raw_hits(&self, gray: &GrayImage) -> Vec<Region> {
        let window = self.cascade.window_size();
        let levels = pyramid_levels(gray.dimensions(), window, &self.params);
        let mut hits = Vec::new();

        for level in &levels {
            let scaled = if level.scaled == gray.dimensions() {
                Cow::Borrowed(gray)
            } else {
                Cow::Owned(resize_gray(gray, level.scaled.0, level.scaled.1))
            };
            let integral = IntegralImages::new(&scaled);
            let step = if level.factor > 2.0 { 1 } else { 2 };
            let (sw, sh) = level.scaled;

            for y in (0..sh - window.1).step_by(step) {
                for x in (0..sw - window.0).step_by(step) {
                    if self.cascade.evaluate(&integral, x, y) {
                        hits.push(Region::new(
                            (x as f64 * level.factor).round() as i32,
                            (y as f64 * level.factor).round() as i32,
                            level.window.0 as i32,
                            level.window.1 as i32,
                        ));
                    }
                }
            }
        }

        log::debug!(
            "Cascade search: {} levels, {} raw hits",
            levels.len(),
            hits.len()
        );
        hits
    }
}

impl PlateDetector for HaarCascadeDetector {
    fn detect(&self, gray: &GrayImage) -> Result<Vec<Region>, DetectorError> {
        let factor = self.params.scale_factor;
        if !factor.is_finite() || factor <= 1.0 {
            return Err(format!("search scale factor must be greater than 1, got {factor}").into());
        }
        let hits = self.raw_hits(gray);
        Ok(group_regions(&hits, self.params.min_neighbors, GROUPING_EPS))
    }
}

/// Levels at factors `1, s, s^2, ...` until the shrunk image no longer fits
/// the window or the window outgrows `max_size`. Levels whose window is
/// smaller than `min_size` are skipped.
pub(crate) fn pyramid_levels(
    image: (u32, u32),
    window: (u32, u32),
    params: &DetectionParams,
) -> Vec<PyramidLevel> {
    let max_size = params.max_size.unwrap_or(image);
    let min_size = params.min_size.unwrap_or((0, 0));
    let mut levels = Vec::new();
    if !params.scale_factor.is_finite() || params.scale_factor <= 1.0 {
        return levels;
    }

    let mut factor = 1.0f64;
    loop {
        let win = (
            (window.0 as f64 * factor).round() as u32,
            (window.1 as f64 * factor).round() as u32,
        );
        let scaled = (
            (image.0 as f64 / factor).round() as u32,
            (image.1 as f64 / factor).round() as u32,
        );
        // A level needs at least one window position.
        if scaled.0 <= window.0 || scaled.1 <= window.1 {
            break;
        }
        if win.0 > max_size.0 || win.1 > max_size.1 {
            break;
        }
        if win.0 >= min_size.0 && win.1 >= min_size.1 {
            levels.push(PyramidLevel {
                factor,
                scaled,
                window: win,
            });
        }
        factor *= params.scale_factor;
    }
    levels
}
