//! Heightmap grids and initial-terrain providers.

/// Initial terrain (frame 0) providers.
pub mod generators;
/// Row-major elevation grid.
pub mod heightmap;
