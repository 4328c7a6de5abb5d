//! Error types shared by the estimators and the RANSAC driver.

use thiserror::Error;

/// Errors produced while fitting or configuring a landmark registration.
///
/// Failing to find a consensus is *not* an error: the driver returns a report
/// without a model instead (see [`RansacReport::is_success`](crate::core::RansacReport::is_success)).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    /// The correspondences cannot determine the transform (too few points,
    /// coincident or collinear configuration, failed decomposition).
    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(String),
    /// The correspondence store holds fewer rows than one minimal sample.
    #[error("need at least {required} correspondences, got {available}")]
    InsufficientData { required: usize, available: usize },
    /// Settings, tolerance or parameter vector are out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    /// Input matrices do not have the expected shape.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}

impl EstimationError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateConfiguration(reason.into())
    }

    /// True for errors the RANSAC loop treats as a wasted iteration.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateConfiguration(_))
    }
}
