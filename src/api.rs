//! High-level API for landmark registration.
//!
//! These functions wire the default pipeline together: the transform
//! estimator named by [`RansacSettings::transform`], a uniform sampler seeded
//! from [`RansacSettings::seed`], inlier-count scoring and the standard
//! adaptive termination bound.

use nalgebra::DMatrix;

use crate::core::{Estimator, Ransac, RansacTerminationCriterion};
use crate::error::EstimationError;
use crate::estimators::LandmarkEstimator;
use crate::models::{LandmarkTransform, TransformType};
use crate::samplers::UniformRandomSampler;
use crate::scoring::InlierCountScoring;
use crate::settings::{RansacSettings, RefinementSource};
use crate::types::{concat_point_sets, CorrespondenceStore};

/// Support measures of a registration.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationQuality {
    /// Fraction of fitting correspondences that agree with the final transform.
    pub inlier_fraction: f64,
    /// Inlier RMSE under the final transform; NaN without inliers.
    pub rmse: f64,
    /// Number of agreeing fitting correspondences.
    pub inlier_count: usize,
    /// Fraction of agreement correspondences that agree, if any were given.
    pub agreement_inlier_fraction: Option<f64>,
    pub refinement_source: RefinementSource,
    /// Whether the final least-squares pass replaced the best hypothesis.
    pub refined: bool,
}

/// Result of a robust landmark registration.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Estimated transform mapping moving points onto fixed points.
    pub transform: Option<LandmarkTransform>,
    /// Ordered parameters of `transform`; empty when no transform was found.
    pub parameters: Vec<f64>,
    pub quality: RegistrationQuality,
    /// Indices of the fitting correspondences that agree with `transform`.
    pub inliers: Vec<usize>,
    /// Number of iterations performed.
    pub iterations: usize,
}

impl RegistrationResult {
    pub fn is_success(&self) -> bool {
        self.transform.is_some()
    }
}

/// Estimate a landmark transform from corresponding point sets.
///
/// # Arguments
/// * `moving` - Points to be mapped (Nx3 matrix)
/// * `fixed` - Corresponding target points (Nx3 matrix)
/// * `agreement` - Optional extra `(moving, fixed)` pairs that are scored but
///   never sampled
/// * `settings` - Optional RANSAC settings (uses defaults if None)
///
/// # Returns
/// `RegistrationResult` with the transform, its parameters and support
/// measures. A run that never finds a supported hypothesis is still `Ok`, with
/// `transform == None`.
pub fn estimate_landmark_transform(
    moving: &DMatrix<f64>,
    fixed: &DMatrix<f64>,
    agreement: Option<(&DMatrix<f64>, &DMatrix<f64>)>,
    settings: Option<RansacSettings>,
) -> Result<RegistrationResult, EstimationError> {
    let mut store = CorrespondenceStore::from_point_sets(moving, fixed)?;
    if let Some((agree_moving, agree_fixed)) = agreement {
        store = store.with_agreement(concat_point_sets(agree_moving, agree_fixed)?)?;
    }
    estimate_from_store(&store, settings.unwrap_or_default())
}

/// Run the default pipeline on an already-built correspondence store.
pub fn estimate_from_store(
    store: &CorrespondenceStore,
    settings: RansacSettings,
) -> Result<RegistrationResult, EstimationError> {
    settings.validate()?;

    let estimator = LandmarkEstimator::new(settings.transform, settings.inlier_threshold)?;
    let sampler = UniformRandomSampler::with_seed(settings.seed);
    let termination = RansacTerminationCriterion::new(settings.confidence);

    let mut ransac = Ransac::new(settings, estimator, sampler, InlierCountScoring, termination);
    let report = ransac.run(store)?;

    let parameters = report
        .model
        .as_ref()
        .map(LandmarkTransform::parameters)
        .unwrap_or_default();

    Ok(RegistrationResult {
        quality: RegistrationQuality {
            inlier_fraction: report.inlier_fraction,
            rmse: report.rmse,
            inlier_count: report.consensus.fitting.len(),
            agreement_inlier_fraction: report.agreement_inlier_fraction,
            refinement_source: report.refinement_source,
            refined: report.refined,
        },
        transform: report.model,
        parameters,
        inliers: report.consensus.fitting,
        iterations: report.iterations,
    })
}

/// Plain least-squares fit over every correspondence, without outlier
/// rejection.
pub fn least_squares_transform(
    moving: &DMatrix<f64>,
    fixed: &DMatrix<f64>,
    kind: TransformType,
) -> Result<LandmarkTransform, EstimationError> {
    let data = concat_point_sets(moving, fixed)?;
    let estimator = LandmarkEstimator::new(kind, 0.0)?;
    let minimal = estimator.sample_size();
    if data.nrows() < minimal {
        return Err(EstimationError::InsufficientData {
            required: minimal,
            available: data.nrows(),
        });
    }
    estimator.least_squares_estimate(&data)
}
