//! Shared primitives: frame indices and ranges, identifiers, errors and deterministic randomness.

/// Frame indices, frame ranges and grid dimensions.
pub mod core;
/// Crate error types.
pub mod error;
/// Job and session identifiers.
pub mod ids;
/// Deterministic pseudo-random numbers.
pub mod rng;
