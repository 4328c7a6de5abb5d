//! Sampling strategies.
//!
//! Samplers implement the shared [`Sampler`](crate::core::Sampler) trait and
//! draw sets of distinct row indices from the fitting store.

pub mod uniform;

pub use uniform::UniformRandomSampler;
