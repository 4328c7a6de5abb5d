//! RANSAC configuration.
//!
//! [`RansacSettings`] is a plain value type with defaults, `with_*` builder
//! setters and a [`validate`](RansacSettings::validate) step run by the driver.
//! It derives `serde` traits so callers can store it next to their data.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EstimationError;
pub use crate::models::TransformType;

/// Rows used by the final least-squares refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementSource {
    /// Inliers of the fitting store only.
    Fitting,
    /// Inliers of the agreement store only.
    Agreement,
    /// Inliers of both stores.
    Union,
}

impl RefinementSource {
    pub fn uses_fitting(self) -> bool {
        matches!(self, RefinementSource::Fitting | RefinementSource::Union)
    }

    pub fn uses_agreement(self) -> bool {
        matches!(self, RefinementSource::Agreement | RefinementSource::Union)
    }
}

/// Main configuration object for a landmark registration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacSettings {
    /// Transform family to estimate.
    pub transform: TransformType,
    /// Correspondences per sample; `None` uses the transform's minimum.
    pub sample_size: Option<usize>,
    /// Inlier tolerance (delta), in input coordinate units.
    pub inlier_threshold: f64,
    /// Iterations always performed, even after the adaptive bound is met.
    pub min_iterations: usize,
    /// Hard cap on iterations.
    pub max_iterations: usize,
    /// Desired probability of drawing at least one outlier-free sample.
    pub confidence: f64,
    /// Minimum ratio between corresponding edge lengths of a sample.
    pub edge_length_ratio: Option<f64>,
    /// Reject samples holding two landmarks closer than the inlier threshold.
    pub check_correspondence_distance: bool,
    /// Rows used by the final least-squares pass.
    pub refinement_source: RefinementSource,
    /// Redraws allowed per iteration when samples are rejected.
    pub max_sample_retries: usize,
    /// Optional wall-clock budget on top of the iteration bound.
    pub time_limit: Option<Duration>,
    /// Seed for the sampler; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for RansacSettings {
    fn default() -> Self {
        Self {
            transform: TransformType::Similarity,
            sample_size: None,
            inlier_threshold: 3.0,
            min_iterations: 0,
            max_iterations: 10_000,
            confidence: 0.99,
            edge_length_ratio: None,
            check_correspondence_distance: false,
            refinement_source: RefinementSource::Fitting,
            max_sample_retries: 100,
            time_limit: None,
            seed: None,
        }
    }
}

impl RansacSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform(mut self, transform: TransformType) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = Some(sample_size);
        self
    }

    pub fn with_inlier_threshold(mut self, delta: f64) -> Self {
        self.inlier_threshold = delta;
        self
    }

    pub fn with_min_iterations(mut self, iterations: usize) -> Self {
        self.min_iterations = iterations;
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_edge_length_ratio(mut self, ratio: f64) -> Self {
        self.edge_length_ratio = Some(ratio);
        self
    }

    pub fn with_correspondence_distance_check(mut self, enabled: bool) -> Self {
        self.check_correspondence_distance = enabled;
        self
    }

    pub fn with_refinement_source(mut self, source: RefinementSource) -> Self {
        self.refinement_source = source;
        self
    }

    pub fn with_max_sample_retries(mut self, retries: usize) -> Self {
        self.max_sample_retries = retries;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check ranges of every option.
    pub fn validate(&self) -> Result<(), EstimationError> {
        let invalid = |msg: String| Err(EstimationError::InvalidSettings(msg));

        if !(self.inlier_threshold.is_finite() && self.inlier_threshold >= 0.0) {
            return invalid(format!(
                "inlier threshold must be finite and non-negative, got {}",
                self.inlier_threshold
            ));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return invalid(format!(
                "confidence must lie in (0, 1), got {}",
                self.confidence
            ));
        }
        if self.max_iterations == 0 {
            return invalid("max iterations must be positive".to_string());
        }
        if self.min_iterations > self.max_iterations {
            return invalid(format!(
                "min iterations ({}) exceed max iterations ({})",
                self.min_iterations, self.max_iterations
            ));
        }
        if let Some(sample_size) = self.sample_size {
            if sample_size == 0 {
                return invalid("sample size must be positive".to_string());
            }
        }
        if let Some(ratio) = self.edge_length_ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return invalid(format!(
                    "edge length ratio must lie in (0, 1], got {ratio}"
                ));
            }
        }
        Ok(())
    }
}
