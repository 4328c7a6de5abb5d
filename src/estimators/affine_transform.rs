//! Affine transform estimator (linear least squares).

use nalgebra::{DMatrix, Matrix3};

use crate::core::Estimator;
use crate::error::EstimationError;
use crate::models::AffineTransform;
use crate::types::{fixed_point, moving_point, DataMatrix};

use super::procrustes::{distinct, halves, scatter_rank, CenteredSample};
use super::Tolerance;

/// General 3D affine map from four or more non-coplanar correspondences.
///
/// Solves `A X = B` for the centred moving (`A`) and fixed (`B`) points via
/// SVD, giving `M = X^T` and `t = c_b - M c_a`.
#[derive(Debug, Clone)]
pub struct AffineTransformEstimator {
    tolerance: Tolerance,
}

impl Default for AffineTransformEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl AffineTransformEstimator {
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

impl Estimator for AffineTransformEstimator {
    type Model = AffineTransform;

    fn sample_size(&self) -> usize {
        4
    }

    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool {
        if sample.len() < self.sample_size() || data.ncols() < 6 || !distinct(sample) {
            return false;
        }
        CenteredSample::new(data, sample).is_ok_and(|c| c.spans(3))
    }

    fn estimate_model(
        &self,
        data: &DataMatrix,
        sample: &[usize],
    ) -> Result<Self::Model, EstimationError> {
        let n = sample.len();
        if n < self.sample_size() {
            return Err(EstimationError::degenerate(format!(
                "affine fit needs {} correspondences, got {n}",
                self.sample_size()
            )));
        }

        let centered = CenteredSample::new(data, sample)?;
        if scatter_rank(&centered.scatter_a) < 3 {
            return Err(EstimationError::degenerate("coplanar moving points"));
        }

        let mut a = DMatrix::<f64>::zeros(n, 3);
        let mut b = DMatrix::<f64>::zeros(n, 3);
        for (row, &idx) in sample.iter().enumerate() {
            let (pa, pb) = halves(data, idx);
            let pa = pa - centered.centroid_a;
            let pb = pb - centered.centroid_b;
            for c in 0..3 {
                a[(row, c)] = pa[c];
                b[(row, c)] = pb[c];
            }
        }

        let svd = a.svd(true, true);
        let eps = svd.singular_values.max() * 1e-12;
        let x = svd
            .solve(&b, eps)
            .map_err(|e| EstimationError::degenerate(format!("affine solve failed: {e}")))?;

        let mut m = Matrix3::<f64>::zeros();
        for r in 0..3 {
            for c in 0..3 {
                m[(r, c)] = x[(c, r)];
            }
        }
        if m.iter().any(|v| !v.is_finite()) {
            return Err(EstimationError::degenerate("non-finite affine matrix"));
        }

        let t = centered.centroid_b - m * centered.centroid_a;
        Ok(AffineTransform::new(m, t))
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
