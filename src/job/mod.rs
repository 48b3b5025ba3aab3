//! Jobs: step configurations, creation-order bookkeeping and mutation rules.

/// Step kinds and their bounded parameter sets.
pub mod config;
/// Job records and the per-session job set.
pub mod model;
