use std::sync::Arc;

use crate::exec::executor::{StepExecutor, check_output};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TerraError, TerraResult};
use crate::foundation::ids::JobId;
use crate::job::model::JobSet;
use crate::session::cache::FrameCache;
use crate::terrain::heightmap::Heightmap;

/// A frame produced and committed by [`compute_frame`].
#[derive(Clone, Debug)]
pub struct ComputedFrame {
    /// Committed frame index.
    pub frame: FrameIndex,
    /// Committed snapshot.
    pub heightmap: Arc<Heightmap>,
    /// Jobs applied, in application order.
    pub jobs_applied: Vec<JobId>,
}

/// Derive `frame` from its cached predecessor and commit it.
///
/// Enabled jobs targeting `frame` run in ascending creation order, each on the previous job's
/// output. The cached predecessor is only borrowed. On the first failing step nothing is
/// committed and the error names the job and frame. A frame with no applicable job passes the
/// predecessor through unchanged.
#[tracing::instrument(level = "debug", skip(jobs, cache, executor), fields(frame = frame.0))]
pub fn compute_frame(
    jobs: &JobSet,
    cache: &FrameCache,
    executor: &dyn StepExecutor,
    frame: FrameIndex,
) -> TerraResult<ComputedFrame> {
    let Some(prev) = frame.prev() else {
        return Err(TerraError::configuration(
            "frame 0 is the initial terrain and cannot be computed",
        ));
    };
    let predecessor = cache.get(prev).ok_or(TerraError::NotCached(prev))?;

    let selected = jobs.applicable(frame);
    if selected.is_empty() {
        tracing::warn!(frame = frame.0, "no enabled job covers frame; passing through");
    }

    let mut current: Option<Heightmap> = None;
    let mut jobs_applied = Vec::with_capacity(selected.len());
    for job in &selected {
        let input: &Heightmap = current.as_ref().unwrap_or(predecessor.as_ref());
        tracing::debug!(job = %job.id(), kind = %job.kind(), order = job.order(), "apply step");
        let output = executor
            .apply(input, job.config())
            .and_then(|out| check_output(input, &out).map(|()| out))
            .map_err(|source| TerraError::StepExecution {
                job_id: job.id().clone(),
                frame,
                source,
            })?;
        current = Some(output);
        jobs_applied.push(job.id().clone());
    }

    let heightmap = match current {
        Some(hm) => Arc::new(hm),
        None => predecessor,
    };
    cache.commit(frame, heightmap.clone())?;

    Ok(ComputedFrame {
        frame,
        heightmap,
        jobs_applied,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/exec/engine.rs"]
mod tests;
