//! Cheap correspondence-consistency pre-filter for samples.
//!
//! A rigid motion preserves distances, so for a clean sample the edge between
//! two moving points has the same length as the edge between their fixed
//! partners. Samples where some edge pair differs by more than the configured
//! ratio are dropped before the transform is fitted.
//!
//! [`points_separated`] drops samples in which two landmarks of the same set
//! lie within the inlier tolerance of each other.

use crate::types::{fixed_point, moving_point, DataMatrix};

/// Edges shorter than this are treated as zero length.
const MIN_EDGE: f64 = 1e-12;

/// True if every pair `(i, j)` of the sample satisfies
/// `min(|a_i - a_j|, |b_i - b_j|) / max(..) >= ratio`.
///
/// Two vanishing edges are consistent; one vanishing edge is not.
pub fn edge_lengths_consistent(data: &DataMatrix, sample: &[usize], ratio: f64) -> bool {
    for (k, &i) in sample.iter().enumerate() {
        for &j in &sample[k + 1..] {
            let moving = (moving_point(data, i) - moving_point(data, j)).norm();
            let fixed = (fixed_point(data, i) - fixed_point(data, j)).norm();
            if !edge_pair_consistent(moving, fixed, ratio) {
                return false;
            }
        }
    }
    true
}

/// True if, within the moving set and within the fixed set, every pair of
/// sampled points is at least `min_distance` apart.
pub fn points_separated(data: &DataMatrix, sample: &[usize], min_distance: f64) -> bool {
    let min_sq = min_distance * min_distance;
    for (k, &i) in sample.iter().enumerate() {
        for &j in &sample[k + 1..] {
            if (moving_point(data, i) - moving_point(data, j)).norm_squared() < min_sq
                || (fixed_point(data, i) - fixed_point(data, j)).norm_squared() < min_sq
            {
                return false;
            }
        }
    }
    true
}

fn edge_pair_consistent(a: f64, b: f64, ratio: f64) -> bool {
    let (short, long) = if a < b { (a, b) } else { (b, a) };
    if long < MIN_EDGE {
        return true;
    }
    short / long >= ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(rows: &[[f64; 6]]) -> DataMatrix {
        DataMatrix::from_fn(rows.len(), 6, |r, c| rows[r][c])
    }

    #[test]
    fn translated_triangle_is_consistent() {
        let data = rows(&[
            [0.0, 0.0, 0.0, 5.0, 5.0, 5.0],
            [1.0, 0.0, 0.0, 6.0, 5.0, 5.0],
            [0.0, 2.0, 0.0, 5.0, 7.0, 5.0],
        ]);
        assert!(edge_lengths_consistent(&data, &[0, 1, 2], 0.9));
    }

    #[test]
    fn stretched_edge_is_rejected() {
        let data = rows(&[
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 1.5, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        ]);
        assert!(!edge_lengths_consistent(&data, &[0, 1, 2], 0.9));
        // 1 / 1.5 = 0.667 passes a looser ratio.
        assert!(edge_lengths_consistent(&data, &[0, 1, 2], 0.6));
    }

    #[test]
    fn close_landmarks_fail_the_distance_check() {
        let data = rows(&[
            [0.0, 0.0, 0.0, 10.0, 0.0, 0.0],
            [4.0, 0.0, 0.0, 14.0, 0.0, 0.0],
            [0.0, 0.5, 0.0, 10.0, 6.0, 0.0],
        ]);
        assert!(points_separated(&data, &[0, 1], 3.0));
        // Rows 0 and 2 are 0.5 apart in the moving set only.
        assert!(!points_separated(&data, &[0, 1, 2], 3.0));
        assert!(points_separated(&data, &[0, 1, 2], 0.5));
        assert!(points_separated(&data, &[0, 2], 0.0));
    }

    #[test]
    fn collapsed_edge_only_matches_another_collapsed_edge() {
        assert!(edge_pair_consistent(0.0, 0.0, 0.9));
        assert!(!edge_pair_consistent(0.0, 1.0, 0.9));
    }
}
