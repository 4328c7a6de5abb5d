//! # landmark-ransac - Robust Landmark Registration with RANSAC
//!
//! `landmark-ransac` estimates a rigid, similarity or affine 3D transform that
//! maps a set of *moving* landmarks onto their *fixed* correspondents, while
//! ignoring mismatched (outlier) pairs.
//!
//! ## Quick Start
//!
//! The easiest way to use the crate is through the high-level API functions:
//!
//! ```rust
//! use landmark_ransac::{estimate_landmark_transform, RansacSettings, TransformType};
//! use nalgebra::DMatrix;
//!
//! // Four landmarks translated by (1, 2, 3).
//! let moving = DMatrix::from_row_slice(
//!     4,
//!     3,
//!     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
//! );
//! let fixed = moving.map_with_location(|_, c, v| v + (c + 1) as f64);
//!
//! let settings = RansacSettings::default()
//!     .with_transform(TransformType::Rigid)
//!     .with_inlier_threshold(1e-6)
//!     .with_seed(0);
//! let result = estimate_landmark_transform(&moving, &fixed, None, Some(settings)).unwrap();
//! assert!(result.is_success());
//! println!("Found {} inliers", result.inliers.len());
//! ```
//!
//! ## Extending the Library
//!
//! The [`Ransac`](crate::core::Ransac) driver is generic over four traits:
//!
//! - **[`Estimator`](crate::core::Estimator)**: fits a transform and tests agreement
//! - **[`Sampler`](crate::core::Sampler)**: draws samples of row indices
//! - **[`Scoring<E>`](crate::core::Scoring)**: turns agreement into a comparable score
//! - **[`TerminationCriterion<S>`](crate::core::TerminationCriterion)**: adapts the iteration budget
//!
//! ### Example: Custom Estimator
//!
//! ```rust
//! use landmark_ransac::core::Estimator;
//! use landmark_ransac::estimators::Tolerance;
//! use landmark_ransac::types::{fixed_point, moving_point, DataMatrix};
//! use landmark_ransac::EstimationError;
//! use nalgebra::Vector3;
//!
//! /// Pure translation, fitted as the mean offset.
//! struct TranslationEstimator {
//!     tolerance: Tolerance,
//! }
//!
//! impl Estimator for TranslationEstimator {
//!     type Model = Vector3<f64>;
//!
//!     fn sample_size(&self) -> usize {
//!         1
//!     }
//!
//!     fn is_valid_sample(&self, _data: &DataMatrix, sample: &[usize]) -> bool {
//!         !sample.is_empty()
//!     }
//!
//!     fn estimate_model(
//!         &self,
//!         data: &DataMatrix,
//!         sample: &[usize],
//!     ) -> Result<Self::Model, EstimationError> {
//!         let mut sum = Vector3::zeros();
//!         for &row in sample {
//!             sum += fixed_point(data, row) - moving_point(data, row);
//!         }
//!         Ok(sum / sample.len() as f64)
//!     }
//!
//!     fn squared_residual(&self, model: &Self::Model, data: &DataMatrix, row: usize) -> f64 {
//!         (fixed_point(data, row) - (moving_point(data, row) + *model)).norm_squared()
//!     }
//!
//!     fn tolerance(&self) -> &Tolerance {
//!         &self.tolerance
//!     }
//!
//!     fn tolerance_mut(&mut self) -> &mut Tolerance {
//!         &mut self.tolerance
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - **[`api`]**: High-level registration functions
//! - **[`core`](crate::core)**: Core traits and the generic `Ransac` pipeline
//! - **[`estimators`]**: Rigid, similarity and affine estimators
//! - **[`samplers`]**: Built-in sampling strategies
//! - **[`scoring`]**: Inlier-count scoring
//! - **[`models`]**: Transform types and their parameter vectors
//! - **[`settings`]**: Configuration types for RANSAC pipelines
//! - **[`consistency`]**: Edge-length pre-filter for samples

pub mod api;
pub mod consistency;
pub mod core;
pub mod error;
pub mod estimators;
pub mod models;
pub mod samplers;
pub mod scoring;
pub mod settings;
pub mod types;
pub mod utils;

// Re-export high-level API
pub use crate::api::{
    estimate_from_store, estimate_landmark_transform, least_squares_transform,
    RegistrationQuality, RegistrationResult,
};

// Re-export core traits for easy access
pub use crate::core::{
    Estimator, Ransac, RansacReport, RansacTerminationCriterion, Sampler, Scoring,
    TerminationCriterion, TerminationReason,
};

pub use error::EstimationError;
pub use estimators::{
    AffineTransformEstimator, LandmarkEstimator, RigidTransformEstimator,
    SimilarityTransformEstimator, Tolerance,
};
pub use models::{
    AffineTransform, LandmarkTransform, RigidTransform, SimilarityTransform, TransformType,
};
pub use samplers::UniformRandomSampler;
pub use scoring::{Consensus, InlierCountScoring, Score};
pub use settings::{RansacSettings, RefinementSource};
pub use types::{CorrespondenceStore, DataMatrix};
