//! Simulation sessions: frame cache, run control and the session registry.

/// Per-session frame store.
pub mod cache;
/// Run state machine, sinks and background runs.
pub mod controller;
/// Session ownership and parallel multi-session runs.
pub mod registry;
/// Session state: timeline, jobs, cache.
pub mod sim_session;
