//! Shared closed-form alignment of centred point sets (absolute orientation).

use nalgebra::{Matrix3, Vector3};

use crate::error::EstimationError;
use crate::types::DataMatrix;

/// Relative eigenvalue below which a scatter direction counts as empty.
const RANK_EPS: f64 = 1e-10;

/// Centroids and second moments of the two halves of a sample.
///
/// Both halves are rescaled so that their mean distance to the centroid is
/// `sqrt(3)`; `scale_a` and `scale_b` hold the applied factors.
pub(crate) struct CenteredSample {
    pub centroid_a: Vector3<f64>,
    pub centroid_b: Vector3<f64>,
    pub scale_a: f64,
    pub scale_b: f64,
    /// `sum a_i b_i^T` over the normalised, centred points.
    pub cross: Matrix3<f64>,
    /// `sum |a_i|^2` over the normalised, centred moving points.
    pub norm_sq_a: f64,
    pub scatter_a: Matrix3<f64>,
    pub scatter_b: Matrix3<f64>,
}

impl CenteredSample {
    pub fn new(data: &DataMatrix, sample: &[usize]) -> Result<Self, EstimationError> {
        let n = sample.len();
        if n == 0 {
            return Err(EstimationError::degenerate("empty sample"));
        }
        if data.ncols() < 6 {
            return Err(EstimationError::degenerate("correspondences need 6 columns"));
        }
        if sample.iter().any(|&idx| idx >= data.nrows()) {
            return Err(EstimationError::degenerate("sample index out of range"));
        }

        let mut c_a = Vector3::<f64>::zeros();
        let mut c_b = Vector3::<f64>::zeros();
        for &idx in sample {
            c_a += halves(data, idx).0;
            c_b += halves(data, idx).1;
        }
        c_a /= n as f64;
        c_b /= n as f64;

        let mut avg_dist_a = 0.0;
        let mut avg_dist_b = 0.0;
        for &idx in sample {
            let (a, b) = halves(data, idx);
            avg_dist_a += (a - c_a).norm();
            avg_dist_b += (b - c_b).norm();
        }
        avg_dist_a /= n as f64;
        avg_dist_b /= n as f64;

        if avg_dist_a < 1e-10 * (1.0 + c_a.norm()) || avg_dist_b < 1e-10 * (1.0 + c_b.norm()) {
            return Err(EstimationError::degenerate("coincident points"));
        }

        // Normalize for numerical stability
        let s_a = 3.0_f64.sqrt() / avg_dist_a;
        let s_b = 3.0_f64.sqrt() / avg_dist_b;

        let mut cross = Matrix3::<f64>::zeros();
        let mut scatter_a = Matrix3::<f64>::zeros();
        let mut scatter_b = Matrix3::<f64>::zeros();
        let mut norm_sq_a = 0.0;
        for &idx in sample {
            let (a, b) = halves(data, idx);
            let a = (a - c_a) * s_a;
            let b = (b - c_b) * s_b;
            cross += a * b.transpose();
            scatter_a += a * a.transpose();
            scatter_b += b * b.transpose();
            norm_sq_a += a.norm_squared();
        }

        if cross.iter().any(|x| !x.is_finite()) {
            return Err(EstimationError::degenerate("non-finite coordinates"));
        }

        Ok(Self {
            centroid_a: c_a,
            centroid_b: c_b,
            scale_a: s_a,
            scale_b: s_b,
            cross,
            norm_sq_a,
            scatter_a,
            scatter_b,
        })
    }

    /// Both halves span at least `rank` dimensions.
    pub fn spans(&self, rank: usize) -> bool {
        scatter_rank(&self.scatter_a) >= rank && scatter_rank(&self.scatter_b) >= rank
    }
}

/// Optimal rotation `R` aligning the moving half onto the fixed half, and
/// `trace(S D)` of the reflection-corrected singular values (used for scale).
pub(crate) fn kabsch(cross: &Matrix3<f64>) -> Result<(Matrix3<f64>, f64), EstimationError> {
    // H = U S V^T, R = V D U^T with D fixing det(R) = +1.
    let svd = cross.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(EstimationError::degenerate("SVD did not converge"));
    };
    let v = v_t.transpose();

    let d = (v * u.transpose()).determinant().signum();
    let weakest = svd.singular_values.imin();
    let mut correction = Vector3::new(1.0, 1.0, 1.0);
    correction[weakest] = d;

    let r = v * Matrix3::from_diagonal(&correction) * u.transpose();
    let trace = svd.singular_values.dot(&correction);

    if r.iter().any(|x| !x.is_finite()) || !trace.is_finite() {
        return Err(EstimationError::degenerate("non-finite rotation"));
    }
    Ok((r, trace))
}

/// Number of scatter directions with non-negligible spread.
pub(crate) fn scatter_rank(scatter: &Matrix3<f64>) -> usize {
    let eig = scatter.symmetric_eigenvalues();
    let largest = eig.max();
    if !(largest.is_finite() && largest > 0.0) {
        return 0;
    }
    eig.iter().filter(|&&l| l > RANK_EPS * largest).count()
}

/// Moving and fixed halves of a row as vectors.
#[inline]
pub(crate) fn halves(data: &DataMatrix, row: usize) -> (Vector3<f64>, Vector3<f64>) {
    (
        Vector3::new(data[(row, 0)], data[(row, 1)], data[(row, 2)]),
        Vector3::new(data[(row, 3)], data[(row, 4)], data[(row, 5)]),
    )
}

/// True if all sample indices are distinct.
pub(crate) fn distinct(sample: &[usize]) -> bool {
    for i in 0..sample.len() {
        for j in (i + 1)..sample.len() {
            if sample[i] == sample[j] {
                return false;
            }
        }
    }
    true
}
