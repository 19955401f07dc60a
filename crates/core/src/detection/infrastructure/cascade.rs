//! In-memory boosted Haar cascade.
//!
//! A window is accepted only if every stage's summed weak-classifier
//! responses reach the stage threshold; most windows are rejected by the
//! first stage or two.

use thiserror::Error;

use super::integral_image::IntegralImages;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    #[error("cascade has no stages")]
    NoStages,
    #[error("detection window {width}x{height} is too small, need at least 3x3")]
    WindowTooSmall { width: u32, height: u32 },
    #[error("feature {index} has no rectangles")]
    EmptyFeature { index: usize },
    #[error("feature {index} rectangle {rect:?} exceeds the {width}x{height} window")]
    RectOutOfWindow {
        index: usize,
        rect: WeightedRect,
        width: u32,
        height: u32,
    },
    #[error("stage {stage} classifier {classifier} references feature {feature}, only {count} defined")]
    FeatureIndex {
        stage: usize,
        classifier: usize,
        feature: usize,
        count: usize,
    },
    #[error("stage {stage} classifier {classifier} has a malformed decision tree")]
    MalformedTree { stage: usize, classifier: usize },
}

/// One rectangle of a Haar feature, relative to the window origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<WeightedRect>,
}

impl HaarFeature {
    fn value(&self, ii: &IntegralImages, x: u32, y: u32) -> f64 {
        self.rects
            .iter()
            .map(|r| r.weight as f64 * ii.sum(x + r.x, y + r.y, r.width, r.height) as f64)
            .sum()
    }
}

/// Split node of a weak classifier's decision tree.
///
/// A child index above zero points at another node of the same tree; zero or
/// below selects leaf `-child`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeNode {
    pub feature: usize,
    pub threshold: f32,
    pub left: i32,
    pub right: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f32>,
}

impl WeakClassifier {
    /// Stump shorthand: `feature < threshold` yields `left`, otherwise `right`.
    pub fn stump(feature: usize, threshold: f32, left: f32, right: f32) -> Self {
        Self {
            nodes: vec![TreeNode {
                feature,
                threshold,
                left: 0,
                right: -1,
            }],
            leaves: vec![left, right],
        }
    }

    fn predict(&self, feature_value: impl Fn(usize) -> f64) -> f64 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            let next = if feature_value(node.feature) < node.threshold as f64 {
                node.left
            } else {
                node.right
            };
            if next <= 0 {
                return self.leaves[next.unsigned_abs() as usize] as f64;
            }
            idx = next as usize;
        }
    }

    fn is_well_formed(&self) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        // Children must point forward so every walk terminates.
        self.nodes.iter().enumerate().all(|(i, node)| {
            [node.left, node.right].iter().all(|&child| {
                if child > 0 {
                    (child as usize) > i && (child as usize) < self.nodes.len()
                } else {
                    (child.unsigned_abs() as usize) < self.leaves.len()
                }
            })
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub threshold: f32,
    pub classifiers: Vec<WeakClassifier>,
}

/// A validated cascade, immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    pub fn new(
        window: (u32, u32),
        stages: Vec<Stage>,
        features: Vec<HaarFeature>,
    ) -> Result<Self, CascadeError> {
        let (width, height) = window;
        if width < 3 || height < 3 {
            return Err(CascadeError::WindowTooSmall { width, height });
        }
        if stages.is_empty() {
            return Err(CascadeError::NoStages);
        }
        for (index, feature) in features.iter().enumerate() {
            if feature.rects.is_empty() {
                return Err(CascadeError::EmptyFeature { index });
            }
            if let Some(rect) = feature
                .rects
                .iter()
                .find(|r| r.x + r.width > width || r.y + r.height > height)
            {
                return Err(CascadeError::RectOutOfWindow {
                    index,
                    rect: *rect,
                    width,
                    height,
                });
            }
        }
        for (si, stage) in stages.iter().enumerate() {
            for (ci, classifier) in stage.classifiers.iter().enumerate() {
                if !classifier.is_well_formed() {
                    return Err(CascadeError::MalformedTree {
                        stage: si,
                        classifier: ci,
                    });
                }
                if let Some(node) = classifier.nodes.iter().find(|n| n.feature >= features.len()) {
                    return Err(CascadeError::FeatureIndex {
                        stage: si,
                        classifier: ci,
                        feature: node.feature,
                        count: features.len(),
                    });
                }
            }
        }
        Ok(Self {
            window_width: width,
            window_height: height,
            stages,
            features,
        })
    }

    /// Native detection window `(width, height)` the cascade was trained on.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn features(&self) -> &[HaarFeature] {
        &self.features
    }

    /// Runs the cascade on the window whose top-left corner is `(x, y)`.
    ///
    /// Feature responses are divided by the window's contrast
    /// (`sqrt(area * sum_sq - sum^2)` over the window shrunk by one pixel),
    /// which makes thresholds independent of exposure. The caller guarantees
    /// the window lies inside the integral image.
    pub fn evaluate(&self, ii: &IntegralImages, x: u32, y: u32) -> bool {
        let inner_w = self.window_width - 2;
        let inner_h = self.window_height - 2;
        let area = (inner_w * inner_h) as f64;
        let sum = ii.sum(x + 1, y + 1, inner_w, inner_h) as f64;
        let sq_sum = ii.squared_sum(x + 1, y + 1, inner_w, inner_h) as f64;
        let variance = area * sq_sum - sum * sum;
        let norm = if variance > 0.0 { variance.sqrt() } else { 1.0 };

        let feature_value = |idx: usize| self.features[idx].value(ii, x, y) / norm;

        self.stages.iter().all(|stage| {
            let response: f64 = stage
                .classifiers
                .iter()
                .map(|c| c.predict(feature_value))
                .sum();
            response >= stage.threshold as f64
        })
    }
}
