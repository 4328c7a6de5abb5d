//! Core traits and the RANSAC driver.
//!
//! The driver is generic over four seams:
//! - [`Estimator`]: fits a transform to a set of correspondences and decides
//!   whether a single correspondence agrees with it.
//! - [`Sampler`]: draws minimal samples.
//! - [`Scoring`]: turns per-correspondence agreement into a comparable score.
//! - [`TerminationCriterion`]: shrinks the iteration budget as support grows.

use std::time::Instant;

use log::{debug, trace, warn};

use crate::consistency::{edge_lengths_consistent, points_separated};
use crate::error::EstimationError;
use crate::estimators::Tolerance;
use crate::scoring::{Consensus, Score};
use crate::settings::{RansacSettings, RefinementSource};
use crate::types::{gather_rows, CorrespondenceStore, DataMatrix};

/// Transform fitter and agreement evaluator for one transform family.
pub trait Estimator {
    /// Model type produced by this estimator.
    type Model: Clone;

    /// Minimum number of correspondences that determines the model.
    fn sample_size(&self) -> usize;

    /// Check whether a sample is geometrically able to determine the model.
    fn is_valid_sample(&self, data: &DataMatrix, sample: &[usize]) -> bool;

    /// Least-squares fit over the selected rows.
    ///
    /// The same method serves exact fits (`sample.len() == sample_size()`)
    /// and over-determined fits. Degenerate input yields
    /// [`EstimationError::DegenerateConfiguration`].
    fn estimate_model(
        &self,
        data: &DataMatrix,
        sample: &[usize],
    ) -> Result<Self::Model, EstimationError>;

    /// Squared distance between the transformed moving point and the fixed
    /// point of row `row`.
    fn squared_residual(&self, model: &Self::Model, data: &DataMatrix, row: usize) -> f64;

    fn tolerance(&self) -> &Tolerance;

    fn tolerance_mut(&mut self) -> &mut Tolerance;

    /// Least-squares fit over every row of `data`.
    fn least_squares_estimate(&self, data: &DataMatrix) -> Result<Self::Model, EstimationError> {
        let all: Vec<usize> = (0..data.nrows()).collect();
        self.estimate_model(data, &all)
    }

    /// True iff the squared residual of `row` is within the squared tolerance.
    fn agree(&self, model: &Self::Model, data: &DataMatrix, row: usize) -> bool {
        self.squared_residual(model, data, row) <= self.tolerance().delta_squared()
    }

    fn delta(&self) -> f64 {
        self.tolerance().delta()
    }

    fn set_delta(&mut self, delta: f64) -> Result<(), EstimationError> {
        self.tolerance_mut().set(delta)
    }
}

/// Sampler responsible for drawing minimal samples from the data.
pub trait Sampler {
    /// Draw a sample of `sample_size` distinct rows into `out_indices`.
    ///
    /// Returns `false` if a sample could not be drawn (caller may retry).
    fn sample(&mut self, data: &DataMatrix, sample_size: usize, out_indices: &mut [usize]) -> bool;
}

/// Scoring strategy deciding the support of a model.
pub trait Scoring<E: Estimator> {
    /// Score type; larger is better.
    type Score: Clone + PartialOrd;

    /// Score `model` over every fitting and agreement row, filling `consensus`.
    fn score(
        &self,
        estimator: &E,
        store: &CorrespondenceStore,
        model: &E::Model,
        consensus: &mut Consensus,
    ) -> Self::Score;
}

/// Termination criterion deciding when the RANSAC loop can stop.
pub trait TerminationCriterion<S> {
    /// Called whenever the best hypothesis improves.
    ///
    /// May lower `max_iterations`, never below `iteration`.
    fn check(
        &mut self,
        store: &CorrespondenceStore,
        best_score: &S,
        sample_size: usize,
        iteration: usize,
        max_iterations: &mut usize,
    );
}

/// Standard adaptive bound
/// `N = log(1 - confidence) / log(1 - inlier_ratio^sample_size)`.
///
/// The inlier ratio counts both fitting and agreement rows.
#[derive(Debug, Clone, Copy)]
pub struct RansacTerminationCriterion {
    /// Desired probability of having drawn an outlier-free sample, in (0, 1).
    pub confidence: f64,
}

impl RansacTerminationCriterion {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    /// Iterations needed for the given inlier ratio, at least one.
    pub fn required_iterations(&self, inlier_ratio: f64, sample_size: usize) -> Option<usize> {
        let w = inlier_ratio.clamp(0.0, 1.0);
        if w <= 0.0 {
            return None;
        }

        let p_good_sample = w.powi(sample_size as i32);
        // ln(1 - p) stays accurate when w^m is tiny.
        let log_one_minus_p = (-p_good_sample).ln_1p();
        let log_one_minus_conf = (1.0 - self.confidence).ln();
        if !log_one_minus_conf.is_finite() || log_one_minus_p >= 0.0 {
            return None;
        }

        let required = (log_one_minus_conf / log_one_minus_p).ceil().max(1.0);
        if required >= usize::MAX as f64 {
            return None;
        }
        Some(required as usize)
    }
}

impl TerminationCriterion<Score> for RansacTerminationCriterion {
    fn check(
        &mut self,
        store: &CorrespondenceStore,
        best_score: &Score,
        sample_size: usize,
        iteration: usize,
        max_iterations: &mut usize,
    ) {
        let n = store.scored_len();
        if n == 0 {
            return;
        }

        let inlier_ratio = best_score.inlier_count as f64 / n as f64;
        if let Some(required) = self.required_iterations(inlier_ratio, sample_size) {
            let bounded = required.max(iteration);
            if bounded < *max_iterations {
                *max_iterations = bounded;
            }
        }
    }
}

/// Why the sampling loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The adaptive bound was reached before the hard maximum.
    Converged,
    /// The configured maximum number of iterations was reached.
    MaxIterations,
    /// The wall-clock limit elapsed.
    TimeLimit,
}

/// Outcome of a RANSAC run.
///
/// When no hypothesis gathered any support, `model` is `None`, the inlier
/// sets are empty, `inlier_fraction` is zero and `rmse` is NaN.
#[derive(Debug, Clone)]
pub struct RansacReport<M> {
    /// Final (refined when possible) model.
    pub model: Option<M>,
    /// Inliers of the final model in both stores.
    pub consensus: Consensus,
    /// Fraction of fitting rows that agree with the final model.
    pub inlier_fraction: f64,
    /// Fraction of agreement rows that agree with the final model, if any.
    pub agreement_inlier_fraction: Option<f64>,
    /// Root-mean-square residual over the final inliers of the stores named
    /// by `refinement_source`.
    pub rmse: f64,
    /// Support of the best unrefined hypothesis (fitting + agreement rows).
    pub hypothesis_inlier_count: usize,
    /// Iterations performed.
    pub iterations: usize,
    /// Iteration (1-based) at which the best hypothesis was found.
    pub best_iteration: Option<usize>,
    /// Whether the least-squares refinement replaced the hypothesis.
    pub refined: bool,
    pub refinement_source: RefinementSource,
    pub termination: TerminationReason,
}

impl<M> RansacReport<M> {
    pub fn is_success(&self) -> bool {
        self.model.is_some()
    }

    fn failure(
        iterations: usize,
        refinement_source: RefinementSource,
        termination: TerminationReason,
        agreement_present: bool,
    ) -> Self {
        Self {
            model: None,
            consensus: Consensus::default(),
            inlier_fraction: 0.0,
            agreement_inlier_fraction: agreement_present.then_some(0.0),
            rmse: f64::NAN,
            hypothesis_inlier_count: 0,
            iterations,
            best_iteration: None,
            refined: false,
            refinement_source,
            termination,
        }
    }
}

struct Hypothesis<M, S> {
    model: M,
    score: S,
    consensus: Consensus,
    iteration: usize,
}

/// Generic RANSAC pipeline orchestrating the components above.
///
/// Each call to [`Ransac::run`] owns its counters and best-hypothesis slot, so
/// one pipeline can be run repeatedly. Ties in score keep the earlier
/// hypothesis; with a seeded sampler the outcome is reproducible.
#[derive(Debug)]
pub struct Ransac<E, Sa, Sc, T>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring<E>,
    T: TerminationCriterion<Sc::Score>,
{
    pub settings: RansacSettings,
    pub estimator: E,
    pub sampler: Sa,
    pub scoring: Sc,
    pub termination: T,
}

impl<E, Sa, Sc, T> Ransac<E, Sa, Sc, T>
where
    E: Estimator,
    Sa: Sampler,
    Sc: Scoring<E>,
    T: TerminationCriterion<Sc::Score>,
{
    pub fn new(settings: RansacSettings, estimator: E, sampler: Sa, scoring: Sc, termination: T) -> Self {
        Self {
            settings,
            estimator,
            sampler,
            scoring,
            termination,
        }
    }

    /// Sample size used by this pipeline: the configured one, or the
    /// estimator's minimum.
    pub fn sample_size(&self) -> usize {
        self.settings
            .sample_size
            .unwrap_or_else(|| self.estimator.sample_size())
    }

    /// Run the RANSAC loop on `store`.
    ///
    /// Fails only for invalid settings or a store smaller than one sample; not
    /// finding a consensus is reported through [`RansacReport::is_success`].
    pub fn run(
        &mut self,
        store: &CorrespondenceStore,
    ) -> Result<RansacReport<E::Model>, EstimationError> {
        self.settings.validate()?;

        let sample_size = self.sample_size();
        let minimal = self.estimator.sample_size();
        if sample_size < minimal {
            return Err(EstimationError::InvalidSettings(format!(
                "sample size {sample_size} is below the minimum of {minimal}"
            )));
        }
        if store.len() < sample_size {
            return Err(EstimationError::InsufficientData {
                required: sample_size,
                available: store.len(),
            });
        }

        let data = store.data();
        let hard_max = self.settings.max_iterations;
        let min_iterations = self.settings.min_iterations;
        let retries = self.settings.max_sample_retries.max(1);
        let started = Instant::now();

        debug!(
            "ransac: {} fitting / {} agreement correspondences, sample size {}, max {} iterations",
            store.len(),
            store.agreement_len(),
            sample_size,
            hard_max
        );

        let mut sample = vec![0usize; sample_size];
        let mut consensus = Consensus::default();
        let mut best: Option<Hypothesis<E::Model, Sc::Score>> = None;
        let mut max_iterations = hard_max;
        let mut iteration = 0usize;
        let mut reason = None;

        while iteration < hard_max && (iteration < max_iterations || iteration < min_iterations) {
            if let Some(limit) = self.settings.time_limit {
                if started.elapsed() >= limit {
                    reason = Some(TerminationReason::TimeLimit);
                    break;
                }
            }

            let drawn = self.draw_sample(data, sample_size, retries, &mut sample);
            iteration += 1;
            if !drawn {
                trace!("iteration {iteration}: no valid sample after {retries} draws");
                continue;
            }

            let model = match self.estimator.estimate_model(data, &sample) {
                Ok(model) => model,
                Err(err) => {
                    trace!("iteration {iteration}: {err}");
                    continue;
                }
            };

            let score = self.scoring.score(&self.estimator, store, &model, &mut consensus);
            let better = !consensus.is_empty()
                && match &best {
                    None => true,
                    Some(b) => score > b.score,
                };

            if better {
                trace!(
                    "iteration {iteration}: new best with {} inliers",
                    consensus.total()
                );
                best = Some(Hypothesis {
                    model,
                    score: score.clone(),
                    consensus: consensus.clone(),
                    iteration,
                });

                self.termination.check(
                    store,
                    &score,
                    sample_size,
                    iteration,
                    &mut max_iterations,
                );
            }
        }

        let termination = reason.unwrap_or(if iteration >= hard_max {
            TerminationReason::MaxIterations
        } else {
            TerminationReason::Converged
        });
        let source = self.settings.refinement_source;

        let Some(best) = best else {
            debug!("ransac: no consensus after {iteration} iterations ({termination:?})");
            return Ok(RansacReport::failure(
                iteration,
                source,
                termination,
                store.agreement().is_some(),
            ));
        };

        Ok(self.finish(store, best, iteration, termination))
    }

    fn draw_sample(
        &mut self,
        data: &DataMatrix,
        sample_size: usize,
        retries: usize,
        sample: &mut [usize],
    ) -> bool {
        for _ in 0..retries {
            if !self.sampler.sample(data, sample_size, sample) {
                continue;
            }

            if let Some(ratio) = self.settings.edge_length_ratio {
                if !edge_lengths_consistent(data, sample, ratio) {
                    continue;
                }
            }

            // Sampled landmarks closer than delta cannot be told apart.
            if self.settings.check_correspondence_distance
                && !points_separated(data, sample, self.estimator.delta())
            {
                continue;
            }

            if !self.estimator.is_valid_sample(data, sample) {
                continue;
            }

            return true;
        }
        false
    }

    /// Refine the best hypothesis and compute the quality metrics.
    fn finish(
        &mut self,
        store: &CorrespondenceStore,
        best: Hypothesis<E::Model, Sc::Score>,
        iterations: usize,
        termination: TerminationReason,
    ) -> RansacReport<E::Model> {
        let source = self.settings.refinement_source;
        let hypothesis_inlier_count = best.consensus.total();

        let mut model = best.model;
        let mut consensus = best.consensus;
        let mut refined = false;

        let refine_data = refinement_rows(store, &consensus, source);
        if refine_data.nrows() >= self.estimator.sample_size() {
            match self.estimator.least_squares_estimate(&refine_data) {
                Ok(candidate) => {
                    let mut candidate_consensus = Consensus::default();
                    let score = self.scoring.score(
                        &self.estimator,
                        store,
                        &candidate,
                        &mut candidate_consensus,
                    );
                    // Refinement must not lose support.
                    if score >= best.score {
                        model = candidate;
                        consensus = candidate_consensus;
                        refined = true;
                    } else {
                        debug!(
                            "ransac: refined model supports {} rows, keeping hypothesis with {}",
                            candidate_consensus.total(),
                            hypothesis_inlier_count
                        );
                    }
                }
                Err(err) => warn!("ransac: refinement failed, keeping hypothesis: {err}"),
            }
        } else {
            warn!(
                "ransac: only {} {source:?} inliers, skipping refinement",
                refine_data.nrows()
            );
        }

        let inlier_fraction = consensus.fitting.len() as f64 / store.len() as f64;
        let agreement_inlier_fraction = store.agreement().map(|a| {
            if a.nrows() == 0 {
                0.0
            } else {
                consensus.agreement.len() as f64 / a.nrows() as f64
            }
        });
        let rmse = self.inlier_rmse(store, &model, &consensus, source);

        debug!(
            "ransac: {iterations} iterations ({termination:?}), best at {}, inlier fraction {inlier_fraction:.3}, rmse {rmse:.6}",
            best.iteration
        );

        RansacReport {
            model: Some(model),
            consensus,
            inlier_fraction,
            agreement_inlier_fraction,
            rmse,
            hypothesis_inlier_count,
            iterations,
            best_iteration: Some(best.iteration),
            refined,
            refinement_source: source,
            termination,
        }
    }

    fn inlier_rmse(
        &self,
        store: &CorrespondenceStore,
        model: &E::Model,
        consensus: &Consensus,
        source: RefinementSource,
    ) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;

        if source.uses_fitting() {
            for &row in &consensus.fitting {
                sum += self.estimator.squared_residual(model, store.data(), row);
                count += 1;
            }
        }
        if source.uses_agreement() {
            if let Some(agreement) = store.agreement() {
                for &row in &consensus.agreement {
                    sum += self.estimator.squared_residual(model, agreement, row);
                    count += 1;
                }
            }
        }

        if count == 0 {
            f64::NAN
        } else {
            (sum / count as f64).sqrt()
        }
    }
}

/// Rows of the best consensus that feed the final least-squares pass.
fn refinement_rows(
    store: &CorrespondenceStore,
    consensus: &Consensus,
    source: RefinementSource,
) -> DataMatrix {
    let fitting = source
        .uses_fitting()
        .then(|| store.gather(&consensus.fitting));
    let agreement = if source.uses_agreement() {
        store
            .agreement()
            .map(|a| gather_rows(a, &consensus.agreement))
    } else {
        None
    };

    match (fitting, agreement) {
        (Some(f), Some(a)) => {
            let mut out = DataMatrix::zeros(f.nrows() + a.nrows(), f.ncols());
            out.rows_mut(0, f.nrows()).copy_from(&f);
            out.rows_mut(f.nrows(), a.nrows()).copy_from(&a);
            out
        }
        (Some(f), None) => f,
        (None, Some(a)) => a,
        (None, None) => DataMatrix::zeros(0, store.data().ncols()),
    }
}
