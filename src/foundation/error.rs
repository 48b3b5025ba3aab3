use std::time::Duration;

use crate::foundation::core::{Dims, FrameIndex, FrameRange};
use crate::foundation::ids::{JobId, SessionId};

/// Convenience result type used throughout the crate.
pub type TerraResult<T> = Result<T, TerraError>;

/// Top-level error for session, job and execution operations.
#[derive(thiserror::Error, Debug)]
pub enum TerraError {
    /// Invalid job fields, bad frame ranges, out-of-bound parameters or session arguments.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// `run` was requested while some frames have no enabled job.
    #[error(
        "coverage gap: {} uncovered frame(s): {}",
        .uncovered_frames.len(),
        format_frame_list(.uncovered_frames)
    )]
    CoverageGap {
        /// Every frame in `1..=totalFrames` without an enabled job.
        uncovered_frames: Vec<FrameIndex>,
    },

    /// A step call failed while computing `frame` for `job_id`.
    #[error("step execution failed for job '{job_id}' at frame {frame}: {source}")]
    StepExecution {
        /// Job whose step failed.
        job_id: JobId,
        /// Frame that was being computed.
        frame: FrameIndex,
        /// Underlying step failure.
        #[source]
        source: StepError,
    },

    /// A second run was requested while one is active.
    #[error("concurrent run rejected: {0} already has a run in progress")]
    ConcurrentRun(SessionId),

    /// A job set, timeline or cache mutation was attempted while a run is active.
    #[error("mutation rejected: {0} has a run in progress")]
    RunInProgress(SessionId),

    /// Unknown or expired session handle.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Unknown job identifier.
    #[error("job not found: '{0}'")]
    JobNotFound(JobId),

    /// A frame that must already be cached is missing.
    #[error("frame {0} is not cached")]
    NotCached(FrameIndex),

    /// Pipeline document could not be decoded.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TerraError {
    /// Build a [`TerraError::Configuration`].
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`TerraError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors raised before any frame work begins.
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::CoverageGap { .. }
                | Self::ConcurrentRun(_)
                | Self::RunInProgress(_)
                | Self::SessionNotFound(_)
                | Self::JobNotFound(_)
                | Self::Serde(_)
        )
    }
}

/// Failure reported by a single step application.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StepError {
    /// The step produced NaN or an infinity.
    #[error("non-finite height {value} at cell {index}")]
    NonFinite {
        /// Flattened row-major cell index.
        index: usize,
        /// Offending value.
        value: f32,
    },

    /// The step returned a grid of different dimensions.
    #[error("grid dimensions changed from {expected} to {actual}")]
    DimensionMismatch {
        /// Input dimensions.
        expected: Dims,
        /// Output dimensions.
        actual: Dims,
    },

    /// The step overran its wall-clock budget.
    #[error("step took {elapsed:?}, budget is {budget:?}")]
    Timeout {
        /// Measured wall time.
        elapsed: Duration,
        /// Configured budget.
        budget: Duration,
    },

    /// Any other kernel-reported failure.
    #[error("kernel failure: {0}")]
    Kernel(String),
}

impl StepError {
    /// Build a [`StepError::Kernel`].
    pub fn kernel(msg: impl Into<String>) -> Self {
        Self::Kernel(msg.into())
    }
}

/// Render a frame list compactly, collapsing consecutive runs (`"2, 6-10"`).
pub fn format_frame_list(frames: &[FrameIndex]) -> String {
    contiguous_ranges(frames)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collapse an ascending frame list into contiguous ranges.
pub fn contiguous_ranges(frames: &[FrameIndex]) -> Vec<FrameRange> {
    let mut out: Vec<FrameRange> = Vec::new();
    for &f in frames {
        match out.last_mut() {
            Some(last) if last.end.0.checked_add(1) == Some(f.0) => last.end = f,
            _ => out.push(FrameRange { start: f, end: f }),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
