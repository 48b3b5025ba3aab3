//! Job coverage validation.

/// Frame coverage and overlap reporting.
pub mod coverage;
