//! Core shared types: the correspondence matrix layout and the store handed to
//! the RANSAC driver.
//!
//! Every correspondence is one row of a [`DataMatrix`] with six columns:
//! `[xa, ya, za, xb, yb, zb]`. The first three columns hold the *moving* point
//! (set A), the last three the *fixed* point (set B). Estimated transforms map
//! moving points onto fixed points.

use nalgebra::{DMatrix, Point3};

use crate::error::EstimationError;

/// Dynamic row-per-correspondence matrix of `f64`.
pub type DataMatrix = DMatrix<f64>;

/// Number of columns of a correspondence row.
pub const CORRESPONDENCE_DIM: usize = 6;

/// Moving (set A) point of row `row`.
#[inline]
pub fn moving_point(data: &DataMatrix, row: usize) -> Point3<f64> {
    Point3::new(data[(row, 0)], data[(row, 1)], data[(row, 2)])
}

/// Fixed (set B) point of row `row`.
#[inline]
pub fn fixed_point(data: &DataMatrix, row: usize) -> Point3<f64> {
    Point3::new(data[(row, 3)], data[(row, 4)], data[(row, 5)])
}

/// Concatenate two N×3 point matrices into an N×6 correspondence matrix.
pub fn concat_point_sets(
    moving: &DMatrix<f64>,
    fixed: &DMatrix<f64>,
) -> Result<DataMatrix, EstimationError> {
    if moving.nrows() != fixed.nrows() {
        return Err(EstimationError::DimensionMismatch(format!(
            "moving has {} points but fixed has {}",
            moving.nrows(),
            fixed.nrows()
        )));
    }
    if moving.ncols() != 3 || fixed.ncols() != 3 {
        return Err(EstimationError::DimensionMismatch(
            "point sets must be Nx3 matrices".to_string(),
        ));
    }

    let n = moving.nrows();
    let mut data = DataMatrix::zeros(n, CORRESPONDENCE_DIM);
    for i in 0..n {
        for c in 0..3 {
            data[(i, c)] = moving[(i, c)];
            data[(i, c + 3)] = fixed[(i, c)];
        }
    }
    Ok(data)
}

/// Build an N×6 correspondence matrix from `(moving, fixed)` pairs.
pub fn pairs_to_matrix(pairs: &[(Point3<f64>, Point3<f64>)]) -> DataMatrix {
    let mut data = DataMatrix::zeros(pairs.len(), CORRESPONDENCE_DIM);
    for (i, (a, b)) in pairs.iter().enumerate() {
        for c in 0..3 {
            data[(i, c)] = a[c];
            data[(i, c + 3)] = b[c];
        }
    }
    data
}

/// Ordered fitting correspondences plus an optional agreement set.
///
/// Agreement rows share the fitting layout but are only ever scored, never
/// used to fit candidate hypotheses.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceStore {
    data: DataMatrix,
    agreement: Option<DataMatrix>,
}

impl CorrespondenceStore {
    /// Wrap an N×6 correspondence matrix.
    pub fn new(data: DataMatrix) -> Result<Self, EstimationError> {
        check_columns(&data, "fitting")?;
        Ok(Self {
            data,
            agreement: None,
        })
    }

    /// Build the store from two N×3 point matrices.
    pub fn from_point_sets(
        moving: &DMatrix<f64>,
        fixed: &DMatrix<f64>,
    ) -> Result<Self, EstimationError> {
        Ok(Self {
            data: concat_point_sets(moving, fixed)?,
            agreement: None,
        })
    }

    /// Build the store from `(moving, fixed)` pairs.
    pub fn from_pairs(pairs: &[(Point3<f64>, Point3<f64>)]) -> Self {
        Self {
            data: pairs_to_matrix(pairs),
            agreement: None,
        }
    }

    /// Attach an N×6 agreement matrix.
    pub fn with_agreement(mut self, agreement: DataMatrix) -> Result<Self, EstimationError> {
        check_columns(&agreement, "agreement")?;
        self.agreement = Some(agreement);
        Ok(self)
    }

    pub fn data(&self) -> &DataMatrix {
        &self.data
    }

    pub fn agreement(&self) -> Option<&DataMatrix> {
        self.agreement.as_ref()
    }

    /// Number of fitting correspondences.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Number of agreement correspondences (zero when absent).
    pub fn agreement_len(&self) -> usize {
        self.agreement.as_ref().map_or(0, |a| a.nrows())
    }

    /// Total number of rows that take part in consensus scoring.
    pub fn scored_len(&self) -> usize {
        self.len() + self.agreement_len()
    }

    /// Fitting rows `rows`, in order.
    pub fn gather(&self, rows: &[usize]) -> DataMatrix {
        gather_rows(&self.data, rows)
    }
}

/// Copy the selected rows of `data` into a new matrix, in order.
pub fn gather_rows(data: &DataMatrix, rows: &[usize]) -> DataMatrix {
    let mut out = DataMatrix::zeros(rows.len(), data.ncols());
    for (dst, &src) in rows.iter().enumerate() {
        out.row_mut(dst).copy_from(&data.row(src));
    }
    out
}

fn check_columns(data: &DataMatrix, what: &str) -> Result<(), EstimationError> {
    if data.ncols() != CORRESPONDENCE_DIM {
        return Err(EstimationError::DimensionMismatch(format!(
            "{what} correspondences must have {CORRESPONDENCE_DIM} columns, got {}",
            data.ncols()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_sets_are_concatenated_row_by_row() {
        let moving = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let fixed = DMatrix::from_row_slice(2, 3, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let store = CorrespondenceStore::from_point_sets(&moving, &fixed).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(moving_point(store.data(), 1), Point3::new(4.0, 5.0, 6.0));
        assert_eq!(fixed_point(store.data(), 0), Point3::new(7.0, 8.0, 9.0));
        assert_eq!(store.agreement_len(), 0);
        assert_eq!(store.scored_len(), 2);
    }

    #[test]
    fn mismatched_point_counts_are_rejected() {
        let moving = DMatrix::<f64>::zeros(3, 3);
        let fixed = DMatrix::<f64>::zeros(2, 3);
        let err = CorrespondenceStore::from_point_sets(&moving, &fixed).unwrap_err();
        assert!(matches!(err, EstimationError::DimensionMismatch(_)));
    }

    #[test]
    fn agreement_rows_need_six_columns() {
        let store = CorrespondenceStore::new(DataMatrix::zeros(4, 6)).unwrap();
        assert!(store.clone().with_agreement(DataMatrix::zeros(2, 5)).is_err());

        let store = store.with_agreement(DataMatrix::zeros(2, 6)).unwrap();
        assert_eq!(store.scored_len(), 6);
    }

    #[test]
    fn gather_keeps_requested_order() {
        let data = DataMatrix::from_fn(4, 6, |r, c| (r * 10 + c) as f64);
        let picked = gather_rows(&data, &[3, 1]);
        assert_eq!(picked.nrows(), 2);
        assert_eq!(picked[(0, 0)], 30.0);
        assert_eq!(picked[(1, 5)], 15.0);

        let store = CorrespondenceStore::new(data)
            .unwrap()
            .with_agreement(DataMatrix::zeros(2, 6))
            .unwrap();
        assert_eq!(store.gather(&[2]), gather_rows(store.data(), &[2]));
    }
}
