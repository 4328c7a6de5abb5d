//! Similarity transform estimator (Umeyama).

use crate::core::Estimator;
use crate::error::EstimationError;
use crate::models::{orthonormal_rotation, SimilarityTransform};
use crate::types::{fixed_point, moving_point, DataMatrix};

use super::procrustes::{distinct, kabsch, CenteredSample};
use super::Tolerance;

/// Rotation, translation and uniform scale from three or more
/// non-collinear correspondences.
///
/// The scale is recovered jointly with the rotation from the same SVD:
/// `s = trace(S D) / sum |a_i|^2`, `t = c_b - s R c_a`.
#[derive(Debug, Clone)]
pub struct SimilarityTransformEstimator {
    tolerance: Tolerance,
}

impl Default for SimilarityTransformEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityTransformEstimator {
    pub fn new() -> Self {
        Self {
            tolerance: Tolerance::default(),
        }
    }

    pub fn with_delta(delta: f64) -> Result<Self, EstimationError> {
        Ok(Self {
            tolerance: Tolerance::new(delta)?,
        })
    }
}

impl Estimator for SimilarityTransformEstimator {
    type Model = SimilarityTransform;

    fn sample_size(&self) -> usize {
        3
    }

    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool {
        if sample.len() < self.sample_size() || data.ncols() < 6 || !distinct(sample) {
            return false;
        }
        CenteredSample::new(data, sample).is_ok_and(|c| c.spans(2))
    }

    fn estimate_model(
        &self,
        data: &DataMatrix,
        sample: &[usize],
    ) -> Result<Self::Model, EstimationError> {
        if sample.len() < self.sample_size() {
            return Err(EstimationError::degenerate(format!(
                "similarity fit needs {} correspondences, got {}",
                self.sample_size(),
                sample.len()
            )));
        }

        let centered = CenteredSample::new(data, sample)?;
        if !centered.spans(2) {
            return Err(EstimationError::degenerate("collinear points"));
        }

        let (r, trace) = kabsch(&centered.cross)?;

        // Scale in normalised units, mapped back through the two
        // normalisation factors.
        let normalized_scale = trace / centered.norm_sq_a;
        let scale = normalized_scale * centered.scale_a / centered.scale_b;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(EstimationError::degenerate(format!(
                "non-positive scale {scale}"
            )));
        }

        let rotation = orthonormal_rotation(r);
        let translation = centered.centroid_b - rotation * (centered.centroid_a * scale);
        Ok(SimilarityTransform::new(
            rotation,
            translation.into(),
            scale,
        ))
    }

    fn squared_residual(&self, model: &Self::Model, data: &DataMatrix, row: usize) -> f64 {
        let moved = model.transform_point(&moving_point(data, row));
        (fixed_point(data, row) - moved).norm_squared()
    }

    fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    fn tolerance_mut(&mut self) -> &mut Tolerance {
        &mut self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pairs_to_matrix;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Translation3, UnitQuaternion};

    fn ground_truth() -> SimilarityTransform {
        SimilarityTransform::new(
            UnitQuaternion::from_euler_angles(-0.8, 0.25, 0.6),
            Translation3::new(-3.0, 7.0, 1.0),
            2.5,
        )
    }

    fn data_for(points: &[Point3<f64>], t: &SimilarityTransform) -> DataMatrix {
        let pairs: Vec<_> = points.iter().map(|p| (*p, t.transform_point(p))).collect();
        pairs_to_matrix(&pairs)
    }

    #[test]
    fn recovers_scale_rotation_and_translation_from_three_points() {
        let truth = ground_truth();
        let data = data_for(
            &[
                Point3::new(1.0, 2.0, 3.0),
                Point3::new(-2.0, 0.5, 1.0),
                Point3::new(0.0, -1.0, 4.0),
            ],
            &truth,
        );
        let model = SimilarityTransformEstimator::new()
            .estimate_model(&data, &[0, 1, 2])
            .unwrap();

        assert_relative_eq!(model.scale, 2.5, epsilon = 1e-9);
        assert!(model.rotation.angle_to(&truth.rotation) < 1e-9);
        assert_relative_eq!(
            model.translation.vector,
            truth.translation.vector,
            epsilon = 1e-9
        );
    }

    #[test]
    fn unit_scale_data_yields_unit_scale() {
        let truth = SimilarityTransform::new(
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
            Translation3::new(1.0, 1.0, 1.0),
            1.0,
        );
        let points: Vec<_> = (0..10)
            .map(|i| {
                let f = i as f64;
                Point3::new(f, f * f * 0.1, (f * 0.9).sin())
            })
            .collect();
        let data = data_for(&points, &truth);
        let model = SimilarityTransformEstimator::new()
            .least_squares_estimate(&data)
            .unwrap();
        assert_relative_eq!(model.scale, 1.0, epsilon = 1e-9);
        for row in 0..data.nrows() {
            assert!(
                SimilarityTransformEstimator::new().squared_residual(&model, &data, row) < 1e-18
            );
        }
    }

    #[test]
    fn large_coordinates_keep_exactness() {
        let truth = ground_truth();
        let points: Vec<_> = (0..8)
            .map(|i| {
                let f = i as f64;
                Point3::new(1.0e4 + f * 3.0, -2.0e4 + (f * 1.7).cos() * 40.0, 5.0e3 + f * f)
            })
            .collect();
        let data = data_for(&points, &truth);
        let model = SimilarityTransformEstimator::new()
            .least_squares_estimate(&data)
            .unwrap();
        assert_relative_eq!(model.scale, truth.scale, epsilon = 1e-9);
        assert!(model.rotation.angle_to(&truth.rotation) < 1e-9);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let truth = ground_truth();
        let data = data_for(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 2.0, 3.0),
                Point3::new(2.0, 4.0, 6.0),
            ],
            &truth,
        );
        let estimator = SimilarityTransformEstimator::new();
        assert!(!estimator.is_valid_sample(&data, &[0, 1, 2]));
        assert!(estimator
            .estimate_model(&data, &[0, 1, 2])
            .unwrap_err()
            .is_degenerate());
    }
}
