//! Consensus scoring.
//!
//! The score of a hypothesis is the number of correspondences that agree with
//! it, counted over the fitting rows and the agreement rows with the same
//! [`Estimator::agree`] test.

use crate::core::{Estimator, Scoring};
use crate::types::CorrespondenceStore;

/// Inlier count of a hypothesis. Ordered by count only, so equal counts
/// compare equal and the driver keeps the earlier hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Score {
    pub inlier_count: usize,
}

impl Score {
    pub fn new(inlier_count: usize) -> Self {
        Self { inlier_count }
    }
}

/// Inlier indices of one hypothesis, split by store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consensus {
    /// Agreeing rows of the fitting store.
    pub fitting: Vec<usize>,
    /// Agreeing rows of the agreement store.
    pub agreement: Vec<usize>,
}

impl Consensus {
    pub fn clear(&mut self) {
        self.fitting.clear();
        self.agreement.clear();
    }

    pub fn total(&self) -> usize {
        self.fitting.len() + self.agreement.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fitting.is_empty() && self.agreement.is_empty()
    }
}

/// Plain RANSAC scoring: every agreeing row counts one.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlierCountScoring;

impl<E: Estimator> Scoring<E> for InlierCountScoring {
    type Score = Score;

    fn score(
        &self,
        estimator: &E,
        store: &CorrespondenceStore,
        model: &E::Model,
        consensus: &mut Consensus,
    ) -> Self::Score {
        consensus.clear();

        let data = store.data();
        consensus
            .fitting
            .extend((0..data.nrows()).filter(|&row| estimator.agree(model, data, row)));

        if let Some(agreement) = store.agreement() {
            consensus.agreement.extend(
                (0..agreement.nrows()).filter(|&row| estimator.agree(model, agreement, row)),
            );
        }

        Score::new(consensus.total())
    }
}
