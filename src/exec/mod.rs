//! Frame execution: the step executor seam, reference kernels and the per-frame engine.

/// Per-frame job sequencing and commit.
pub mod engine;
/// Step executor trait and decorators.
pub mod executor;
/// Deterministic reference erosion kernels.
pub mod kernels;
