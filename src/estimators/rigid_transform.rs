//! Rigid transform estimator using Procrustes analysis.

use crate::core::Estimator;
use crate::error::EstimationError;
use crate::models::RigidTransform;
use crate::types::{fixed_point, moving_point, DataMatrix};

use super::procrustes::{distinct, kabsch, CenteredSample};
use super::Tolerance;

/// Rigid transform estimator using Procrustes analysis (Kabsch / Horn).
///
/// Needs three non-collinear correspondences. The same closed form serves
/// minimal and over-determined samples.
#[derive(Debug, Clone)]
pub struct RigidTransformEstimator {
    tolerance: Tolerance,
}

impl Default for RigidTransformEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidTransformEstimator {
    /// Estimator with a unit tolerance.
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

impl Estimator for RigidTransformEstimator {
    type Model = RigidTransform;

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
                "rigid fit needs {} correspondences, got {}",
                self.sample_size(),
                sample.len()
            )));
        }

        let centered = CenteredSample::new(data, sample)?;
        if !centered.spans(2) {
            return Err(EstimationError::degenerate("collinear points"));
        }

        let (r, _) = kabsch(&centered.cross)?;

        // Re-orthonormalised through the quaternion; t = c_b - R * c_a.
        let mut model = RigidTransform::from_rt(r, nalgebra::Vector3::zeros());
        model.translation.vector = centered.centroid_b - model.rotation * centered.centroid_a;
        Ok(model)
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

    fn ground_truth() -> RigidTransform {
        RigidTransform::new(
            UnitQuaternion::from_euler_angles(0.5, -0.3, 2.0),
            Translation3::new(10.0, -4.0, 2.5),
        )
    }

    fn exact_data(points: &[Point3<f64>], t: &RigidTransform) -> DataMatrix {
        let pairs: Vec<_> = points.iter().map(|p| (*p, t.transform_point(p))).collect();
        pairs_to_matrix(&pairs)
    }

    fn cloud() -> Vec<Point3<f64>> {
        (0..20)
            .map(|i| {
                let f = i as f64;
                Point3::new(f.sin() * 10.0, (2.0 * f).cos() * 5.0, f * 0.5 - 3.0)
            })
            .collect()
    }

    #[test]
    fn minimal_sample_recovers_exact_transform() {
        let truth = ground_truth();
        let data = exact_data(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &truth,
        );
        let estimator = RigidTransformEstimator::new();
        let sample = [0usize, 1, 2];

        assert!(estimator.is_valid_sample(&data, &sample));
        let model = estimator.estimate_model(&data, &sample).unwrap();

        assert!(model.rotation.angle_to(&truth.rotation) < 1e-9);
        assert_relative_eq!(
            model.translation.vector,
            truth.translation.vector,
            epsilon = 1e-9
        );
        for row in 0..3 {
            assert!(estimator.squared_residual(&model, &data, row) < 1e-18);
        }
    }

    #[test]
    fn least_squares_over_all_rows_is_exact_on_clean_data() {
        let truth = ground_truth();
        let data = exact_data(&cloud(), &truth);
        let model = RigidTransformEstimator::new()
            .least_squares_estimate(&data)
            .unwrap();

        let params = model.parameters();
        for (p, q) in params.iter().zip(truth.parameters()) {
            assert_relative_eq!(*p, q, epsilon = 1e-9);
        }
    }

    #[test]
    fn collinear_and_short_samples_are_degenerate() {
        let truth = ground_truth();
        let data = exact_data(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(5.0, 0.0, 1.0),
            ],
            &truth,
        );
        let estimator = RigidTransformEstimator::new();

        assert!(!estimator.is_valid_sample(&data, &[0, 1, 2]));
        assert!(!estimator.is_valid_sample(&data, &[0, 0, 3]));
        assert!(estimator.is_valid_sample(&data, &[0, 1, 3]));

        let err = estimator.estimate_model(&data, &[0, 1, 2]).unwrap_err();
        assert!(err.is_degenerate());
        let err = estimator.estimate_model(&data, &[0, 3]).unwrap_err();
        assert!(err.is_degenerate());
    }

    #[test]
    fn mirrored_data_still_yields_a_proper_rotation() {
        let points = cloud();
        let pairs: Vec<_> = points
            .iter()
            .map(|p| (*p, Point3::new(-p.x, p.y, p.z)))
            .collect();
        let data = pairs_to_matrix(&pairs);
        let model = RigidTransformEstimator::new()
            .least_squares_estimate(&data)
            .unwrap();
        let det = model.rotation.to_rotation_matrix().matrix().determinant();
        assert_relative_eq!(det, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn agreement_is_monotone_in_delta() {
        let truth = ground_truth();
        let mut data = exact_data(&cloud(), &truth);
        // Push row 0's fixed point 0.5 units away.
        data[(0, 3)] += 0.5;

        let mut estimator = RigidTransformEstimator::with_delta(0.4).unwrap();
        assert!(!estimator.agree(&truth, &data, 0));
        assert!(estimator.agree(&truth, &data, 1));

        let mut previous = false;
        for delta in [0.1, 0.49, 0.5, 0.51, 3.0] {
            estimator.set_delta(delta).unwrap();
            let now = estimator.agree(&truth, &data, 0);
            assert!(!previous || now, "agreement lost when delta grew to {delta}");
            previous = now;
        }
        assert!(previous);
        assert_eq!(estimator.delta(), 3.0);
    }
}
