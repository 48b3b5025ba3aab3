use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::exec::engine::{self, ComputedFrame};
use crate::exec::executor::{BudgetedExecutor, StepExecutor};
use crate::foundation::core::{Dims, FrameIndex};
use crate::foundation::error::{TerraError, TerraResult};
use crate::foundation::ids::{JobId, SessionId};
use crate::job::model::{Job, JobChange, JobDraft, JobSet};
use crate::session::cache::FrameCache;
use crate::session::controller::{
    self, RunHandle, RunReport, RunRequest, RunSink, RunStatus, StopHandle,
};
use crate::terrain::generators::TerrainProvider;
use crate::terrain::heightmap::Heightmap;
use crate::validate::coverage::{self, ValidationResult};

/// Options controlling session execution.
#[derive(Clone, Debug)]
pub struct SessionOpts {
    /// Wall-clock budget per step call; an overrun fails the frame like any step error.
    pub step_budget: Option<Duration>,
    /// Bounded backlog between a background run and its consumer (see [`Session::spawn_run`]).
    pub channel_capacity: usize,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            step_budget: None,
            channel_capacity: 4,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    total_frames: u32,
    jobs: JobSet,
}

/// Stateful container for one simulation: timeline length, job set and frame cache.
///
/// All methods take `&self`; share a session across threads as `Arc<Session>`. One run at a
/// time may be active. While it runs, job, timeline and cache mutations are rejected with
/// [`TerraError::RunInProgress`], and already-committed frames stay readable.
pub struct Session {
    id: SessionId,
    dims: Dims,
    state: RwLock<SessionState>,
    cache: FrameCache,
    executor: Arc<dyn StepExecutor>,
    status: Mutex<RunStatus>,
    stop: StopHandle,
    opts: SessionOpts,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("dims", &self.dims)
            .field("total_frames", &self.total_frames())
            .field("high_water", &self.high_water())
            .field("status", &self.status())
            .finish()
    }
}

impl Session {
    /// Create a session whose frame 0 comes from `initial`.
    pub fn new(
        id: SessionId,
        total_frames: u32,
        dims: Dims,
        initial: &dyn TerrainProvider,
        executor: Arc<dyn StepExecutor>,
        opts: SessionOpts,
    ) -> TerraResult<Self> {
        if total_frames == 0 {
            return Err(TerraError::configuration("totalFrames must be >= 1"));
        }
        let dims = Dims::new(dims.width, dims.height)?;
        let frame0 = initial.initial_terrain(dims)?;
        if frame0.dims() != dims {
            return Err(TerraError::configuration(format!(
                "initial terrain is {}, session expects {dims}",
                frame0.dims()
            )));
        }
        if let Some((index, value)) = frame0.first_non_finite() {
            return Err(TerraError::configuration(format!(
                "initial terrain has non-finite height {value} at cell {index}"
            )));
        }

        let executor: Arc<dyn StepExecutor> = match opts.step_budget {
            Some(budget) => Arc::new(BudgetedExecutor::new(executor, budget)),
            None => executor,
        };

        tracing::debug!(session = %id, total_frames, %dims, "session created");
        Ok(Self {
            id,
            dims,
            state: RwLock::new(SessionState {
                total_frames,
                jobs: JobSet::new(),
            }),
            cache: FrameCache::new(frame0),
            executor,
            status: Mutex::new(RunStatus::Idle),
            stop: StopHandle::new(),
            opts,
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_status(&self) -> MutexGuard<'_, RunStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session handle.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Grid dimensions shared by every frame.
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Timeline length.
    pub fn total_frames(&self) -> u32 {
        self.read_state().total_frames
    }

    /// Execution options.
    pub fn opts(&self) -> &SessionOpts {
        &self.opts
    }

    /// Current run state.
    pub fn status(&self) -> RunStatus {
        *self.lock_status()
    }

    /// Jobs in creation order.
    pub fn jobs(&self) -> Vec<Job> {
        self.read_state().jobs.iter().cloned().collect()
    }

    /// Look up one job.
    pub fn job(&self, id: &JobId) -> Option<Job> {
        self.read_state().jobs.get(id).cloned()
    }

    /// Create a job.
    pub fn add_job(&self, draft: JobDraft) -> TerraResult<Job> {
        self.mutate("add_job", |st| {
            let job = st.jobs.add(draft, st.total_frames)?.clone();
            // New jobs only affect frames from their start onwards.
            let from = job.range().start;
            Ok((job, Some(from)))
        })
    }

    /// Edit a job's fields; id and order are preserved.
    pub fn update_job(&self, id: &JobId, draft: JobDraft) -> TerraResult<Job> {
        self.mutate("update_job", |st| {
            let change = st.jobs.update(id, draft, st.total_frames)?;
            Ok(split(change))
        })
    }

    /// Delete a job.
    pub fn delete_job(&self, id: &JobId) -> TerraResult<Job> {
        self.mutate("delete_job", |st| Ok(split(st.jobs.remove(id)?)))
    }

    /// Enable or disable a job.
    pub fn set_job_enabled(&self, id: &JobId, enabled: bool) -> TerraResult<Job> {
        self.mutate("set_job_enabled", |st| {
            Ok(split(st.jobs.set_enabled(id, enabled)?))
        })
    }

    /// Flip a job's enabled flag.
    pub fn toggle_job(&self, id: &JobId) -> TerraResult<Job> {
        self.mutate("toggle_job", |st| Ok(split(st.jobs.toggle(id)?)))
    }

    /// Change the timeline length. Cached frames beyond the new bound are dropped.
    pub fn set_total_frames(&self, total_frames: u32) -> TerraResult<()> {
        if total_frames == 0 {
            return Err(TerraError::configuration("totalFrames must be >= 1"));
        }
        self.mutate("set_total_frames", |st| {
            st.jobs.check_within(total_frames)?;
            st.total_frames = total_frames;
            Ok(((), Some(FrameIndex(total_frames).next())))
        })
    }

    /// Drop every computed frame, keeping frame 0.
    pub fn reset(&self) -> TerraResult<usize> {
        let _state = self.write_state();
        self.ensure_idle("reset")?;
        let dropped = self.cache.reset();
        tracing::debug!(session = %self.id, dropped, "cache reset");
        Ok(dropped)
    }

    /// Coverage report for the current job set.
    pub fn validate(&self) -> ValidationResult {
        let st = self.read_state();
        coverage::validate(st.jobs.iter(), st.total_frames)
    }

    /// Committed snapshot of `frame`, or `None` when it is not cached.
    pub fn get_frame(&self, frame: FrameIndex) -> Option<Arc<Heightmap>> {
        self.cache.get(frame)
    }

    /// Highest cached frame.
    pub fn high_water(&self) -> FrameIndex {
        self.cache.high_water()
    }

    /// Compute one frame outside a run. Its predecessor must be cached.
    ///
    /// Rejected with [`TerraError::ConcurrentRun`] while a run is active.
    pub fn compute_frame(&self, frame: FrameIndex) -> TerraResult<ComputedFrame> {
        let claim = self.claim_run()?;
        let (jobs, total_frames) = self.snapshot();
        if frame.0 > total_frames {
            return Err(TerraError::configuration(format!(
                "frame {frame} is beyond totalFrames {total_frames}"
            )));
        }
        let out = engine::compute_frame(&jobs, &self.cache, self.executor.as_ref(), frame);
        drop(claim);
        out
    }

    /// Run frames in ascending order, streaming results into `sink`.
    ///
    /// A stop requested while the session was idle is discarded when the run starts. See
    /// [`controller`](crate::session::controller) for the state machine.
    pub fn run(&self, req: RunRequest, sink: &mut dyn RunSink) -> TerraResult<RunReport> {
        controller::drive(self, req, sink)
    }

    /// Run on a background thread, streaming results over a bounded channel.
    pub fn spawn_run(self: &Arc<Self>, req: RunRequest) -> TerraResult<RunHandle> {
        controller::spawn(Arc::clone(self), req)
    }

    /// Handle that cancels the active run at the next frame boundary.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request cancellation of the active run. No effect while idle.
    ///
    /// A run spawned with [`Session::spawn_run`] is `Running` as soon as that call returns, so a
    /// stop issued right after it always reaches the run.
    pub fn stop(&self) {
        let status = self.lock_status();
        if *status == RunStatus::Running {
            tracing::info!(session = %self.id, "stop requested");
            self.stop.request();
        }
    }

    pub(crate) fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub(crate) fn executor(&self) -> &dyn StepExecutor {
        self.executor.as_ref()
    }

    pub(crate) fn stop_flag(&self) -> &StopHandle {
        &self.stop
    }

    /// Copy of the job set and timeline length for one run.
    pub(crate) fn snapshot(&self) -> (JobSet, u32) {
        let st = self.read_state();
        (st.jobs.clone(), st.total_frames)
    }

    /// Enter `Running`, or fail with [`TerraError::ConcurrentRun`].
    pub(crate) fn claim_run(&self) -> TerraResult<RunClaim<'_>> {
        let prior = self.enter_running()?;
        Ok(RunClaim::resume(self, prior))
    }

    /// Switch to `Running` and return the status it replaced.
    ///
    /// Stale stop requests are cleared under the status lock, so [`Session::stop`] either lands
    /// before the claim (and is dropped, the session being idle) or after it (and is kept). The
    /// caller must hand the returned status to [`RunClaim::resume`].
    pub(crate) fn enter_running(&self) -> TerraResult<RunStatus> {
        let mut status = self.lock_status();
        if *status == RunStatus::Running {
            tracing::warn!(session = %self.id, "concurrent run rejected");
            return Err(TerraError::ConcurrentRun(self.id));
        }
        self.stop.clear();
        Ok(std::mem::replace(&mut *status, RunStatus::Running))
    }

    fn ensure_idle(&self, op: &str) -> TerraResult<()> {
        if self.status() == RunStatus::Running {
            tracing::warn!(session = %self.id, op, "mutation rejected while running");
            return Err(TerraError::RunInProgress(self.id));
        }
        Ok(())
    }

    // The state write lock is taken before the status check, so a run that claims the session
    // afterwards observes the finished mutation when it snapshots the job set.
    fn mutate<T>(
        &self,
        op: &str,
        f: impl FnOnce(&mut SessionState) -> TerraResult<(T, Option<FrameIndex>)>,
    ) -> TerraResult<T> {
        let mut state = self.write_state();
        self.ensure_idle(op)?;
        let (out, invalidate_from) = f(&mut state)?;
        if let Some(from) = invalidate_from {
            let dropped = self.cache.invalidate_from(from);
            tracing::debug!(session = %self.id, op, from = from.0, dropped, "frames invalidated");
        }
        Ok(out)
    }
}

fn split(change: JobChange) -> (Job, Option<FrameIndex>) {
    (change.job, change.invalidate_from)
}

/// Holds a session in `Running`; the final state is written when dropped.
pub(crate) struct RunClaim<'a> {
    session: &'a Session,
    prior: RunStatus,
    outcome: Option<RunStatus>,
}

impl<'a> RunClaim<'a> {
    /// Take ownership of a `Running` state entered through [`Session::enter_running`].
    pub(crate) fn resume(session: &'a Session, prior: RunStatus) -> Self {
        Self {
            session,
            prior,
            outcome: None,
        }
    }

    /// Leave `Running` with `status`.
    pub(crate) fn finish(mut self, status: RunStatus) {
        self.outcome = Some(status);
    }
}

impl Drop for RunClaim<'_> {
    fn drop(&mut self) {
        *self.session.lock_status() = self.outcome.unwrap_or(self.prior);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/sim_session.rs"]
mod tests;
