//! Estimators for landmark transforms.
//!
//! This module contains estimators for the supported transform families:
//! - Rigid transform (rotation + translation)
//! - Similarity transform (rotation + translation + uniform scale)
//! - Affine transform (general linear map + translation)
//!
//! [`LandmarkEstimator`] selects one of them at runtime from a
//! [`TransformType`].

mod procrustes;

pub mod affine_transform;
pub mod rigid_transform;
pub mod similarity_transform;

pub use affine_transform::AffineTransformEstimator;
pub use rigid_transform::RigidTransformEstimator;
pub use similarity_transform::SimilarityTransformEstimator;

use crate::core::Estimator;
use crate::error::EstimationError;
use crate::models::{LandmarkTransform, TransformType};
use crate::types::{fixed_point, moving_point, DataMatrix};

/// Agreement tolerance `delta`, stored with its square.
///
/// A correspondence agrees with a transform when its squared residual is at
/// most `delta^2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    delta: f64,
    delta_squared: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            delta: 1.0,
            delta_squared: 1.0,
        }
    }
}

impl Tolerance {
    pub fn new(delta: f64) -> Result<Self, EstimationError> {
        let mut tolerance = Self::default();
        tolerance.set(delta)?;
        Ok(tolerance)
    }

    /// Replace `delta`. Negative or non-finite values are rejected and leave
    /// the tolerance unchanged.
    pub fn set(&mut self, delta: f64) -> Result<(), EstimationError> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(EstimationError::InvalidSettings(format!(
                "tolerance must be finite and non-negative, got {delta}"
            )));
        }
        self.delta = delta;
        self.delta_squared = delta * delta;
        Ok(())
    }

    #[inline]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    #[inline]
    pub fn delta_squared(&self) -> f64 {
        self.delta_squared
    }
}

/// Runtime choice among the transform estimators.
#[derive(Debug, Clone)]
pub enum LandmarkEstimator {
    Rigid(RigidTransformEstimator),
    Similarity(SimilarityTransformEstimator),
    Affine(AffineTransformEstimator),
}

impl LandmarkEstimator {
    pub fn new(kind: TransformType, delta: f64) -> Result<Self, EstimationError> {
        Ok(match kind {
            TransformType::Rigid => Self::Rigid(RigidTransformEstimator::with_delta(delta)?),
            TransformType::Similarity => {
                Self::Similarity(SimilarityTransformEstimator::with_delta(delta)?)
            }
            TransformType::Affine => Self::Affine(AffineTransformEstimator::with_delta(delta)?),
        })
    }

    pub fn kind(&self) -> TransformType {
        match self {
            Self::Rigid(_) => TransformType::Rigid,
            Self::Similarity(_) => TransformType::Similarity,
            Self::Affine(_) => TransformType::Affine,
        }
    }
}

impl Estimator for LandmarkEstimator {
    type Model = LandmarkTransform;

    fn sample_size(&self) -> usize {
        match self {
            Self::Rigid(e) => e.sample_size(),
            Self::Similarity(e) => e.sample_size(),
            Self::Affine(e) => e.sample_size(),
        }
    }

    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool {
        match self {
            Self::Rigid(e) => e.is_valid_sample(data, sample),
            Self::Similarity(e) => e.is_valid_sample(data, sample),
            Self::Affine(e) => e.is_valid_sample(data, sample),
        }
    }

    fn estimate_model(
        &self,
        data: &DataMatrix,
        sample: &[usize],
    ) -> Result<Self::Model, EstimationError> {
        Ok(match self {
            Self::Rigid(e) => LandmarkTransform::Rigid(e.estimate_model(data, sample)?),
            Self::Similarity(e) => LandmarkTransform::Similarity(e.estimate_model(data, sample)?),
            Self::Affine(e) => LandmarkTransform::Affine(e.estimate_model(data, sample)?),
        })
    }

    fn squared_residual(&self, model: &Self::Model, data: &DataMatrix, row: usize) -> f64 {
        let moved = model.transform_point(&moving_point(data, row));
        (fixed_point(data, row) - moved).norm_squared()
    }

    fn tolerance(&self) -> &Tolerance {
        match self {
            Self::Rigid(e) => e.tolerance(),
            Self::Similarity(e) => e.tolerance(),
            Self::Affine(e) => e.tolerance(),
        }
    }

    fn tolerance_mut(&mut self) -> &mut Tolerance {
        match self {
            Self::Rigid(e) => e.tolerance_mut(),
            Self::Similarity(e) => e.tolerance_mut(),
            Self::Affine(e) => e.tolerance_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SimilarityTransform;
    use crate::types::pairs_to_matrix;
    use nalgebra::{Point3, Translation3, UnitQuaternion};

    #[test]
    fn tolerance_caches_its_square_and_rejects_bad_values() {
        let mut tol = Tolerance::new(3.0).unwrap();
        assert_eq!(tol.delta_squared(), 9.0);

        assert!(tol.set(-1.0).is_err());
        assert!(tol.set(f64::NAN).is_err());
        assert_eq!(tol.delta(), 3.0);

        tol.set(0.0).unwrap();
        assert_eq!(tol.delta_squared(), 0.0);
    }

    #[test]
    fn landmark_estimator_dispatches_on_kind() {
        for kind in [
            TransformType::Rigid,
            TransformType::Similarity,
            TransformType::Affine,
        ] {
            let estimator = LandmarkEstimator::new(kind, 0.5).unwrap();
            assert_eq!(estimator.kind(), kind);
            assert_eq!(estimator.sample_size(), kind.minimal_sample_size());
            assert_eq!(estimator.delta(), 0.5);
        }
        assert!(LandmarkEstimator::new(TransformType::Rigid, -0.5).is_err());
    }

    #[test]
    fn similarity_through_the_enum_scores_exact_rows() {
        let truth = SimilarityTransform::new(
            UnitQuaternion::from_euler_angles(0.3, 0.0, -1.1),
            Translation3::new(0.5, 0.5, -2.0),
            1.7,
        );
        let pairs: Vec<_> = (0..6)
            .map(|i| {
                let f = i as f64;
                let p = Point3::new(f, (f * 0.5).sin() * 2.0, f * f * 0.2);
                (p, truth.transform_point(&p))
            })
            .collect();
        let data = pairs_to_matrix(&pairs);

        let mut estimator = LandmarkEstimator::new(TransformType::Similarity, 1e-6).unwrap();
        let model = estimator.least_squares_estimate(&data).unwrap();
        assert_eq!(model.kind(), TransformType::Similarity);
        assert!((0..6).all(|row| estimator.agree(&model, &data, row)));

        estimator.set_delta(0.0).unwrap();
        assert_eq!(estimator.delta(), 0.0);
    }
}
