//! Terrashift runs heightmap erosion jobs over a frame timeline.
//!
//! A session owns a timeline `1..=totalFrames`, a set of jobs (each applying one erosion step to
//! a closed frame range) and a cache of computed frames. Frame 0 is the initial terrain.
//!
//! # Pipeline overview
//!
//! 1. **Validate**: every frame must be covered by at least one enabled job before a run starts
//!    ([`validate`]).
//! 2. **Execute**: frame `N` is derived from cached frame `N-1` by applying every enabled job
//!    targeting `N` in creation order ([`compute_frame`]).
//! 3. **Control**: runs walk frames in ascending order, commit each result, stream it to a
//!    [`RunSink`] and can be stopped at frame boundaries ([`Session::run`]).
//!
//! Steps are pluggable through [`StepExecutor`]; [`ReferenceKernels`] provides deterministic
//! thermal and hydraulic erosion.
#![forbid(unsafe_code)]

pub mod exec;
pub mod foundation;
pub mod job;
pub mod pipeline;
pub mod session;
pub mod terrain;
pub mod validate;

pub use exec::engine::{ComputedFrame, compute_frame};
pub use exec::executor::{BudgetedExecutor, StepExecutor};
pub use exec::kernels::ReferenceKernels;
pub use foundation::core::{Dims, FrameIndex, FrameRange};
pub use foundation::error::{StepError, TerraError, TerraResult};
pub use foundation::ids::{JobId, SessionId};
pub use job::config::{HydraulicConfig, StepConfig, StepKind, ThermalConfig};
pub use job::model::{Job, JobDraft, JobSet};
pub use pipeline::document::{JobDoc, PipelineDoc};
pub use session::cache::FrameCache;
pub use session::controller::{
    FrameResult, InMemoryRunSink, NullSink, RunHandle, RunPlan, RunReport, RunRequest, RunSink,
    RunStatus, StopHandle,
};
pub use session::registry::SessionRegistry;
pub use session::sim_session::{Session, SessionOpts};
pub use terrain::generators::{InitialTerrain, TerrainProvider};
pub use terrain::heightmap::{Fingerprint, HeightStats, Heightmap};
pub use validate::coverage::{Overlap, ValidationResult, validate};
