//! Run orchestration: state machine, cancellation and result streaming.
//!
//! A run walks frames in ascending order. Each frame is computed from its cached predecessor,
//! committed, then pushed to a [`RunSink`]. Cancellation is cooperative and observed only at frame
//! boundaries, so a frame is either fully committed or absent.
//!
//! ```text
//! Idle ──run──> Running ──last frame──> Completed
//!                  │  └──stop──> Stopped
//!                  └──step error──> Failed
//! ```
//!
//! A run that is rejected before its first frame (coverage gap, bad range) leaves the previous
//! state untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::exec::engine::{self, ComputedFrame};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TerraError, TerraResult};
use crate::foundation::ids::{JobId, SessionId};
use crate::session::sim_session::{RunClaim, Session};
use crate::terrain::heightmap::{Fingerprint, HeightStats, Heightmap};
use crate::validate::coverage;

/// Run state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No run has happened yet, or the last one was rejected before starting.
    Idle,
    /// Frames are being computed.
    Running,
    /// Every requested frame was computed.
    Completed,
    /// Cancelled at a frame boundary.
    Stopped,
    /// A step failed; frames before the failing one stay cached.
    Failed,
}

impl RunStatus {
    /// Return `true` for states that end a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        })
    }
}

/// Bounds for one run.
///
/// Frames already cached are never recomputed; the run resumes at `high_water + 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// First frame to consider (default 1).
    pub from: Option<FrameIndex>,
    /// Last frame to compute (default `totalFrames`).
    pub to: Option<FrameIndex>,
    /// Stop after computing this many frames.
    pub max_frames: Option<u32>,
}

impl RunRequest {
    /// Run to the end of the timeline.
    pub fn all() -> Self {
        Self::default()
    }

    /// Run frames `from..=to`.
    pub fn range(from: u32, to: u32) -> Self {
        Self {
            from: Some(FrameIndex(from)),
            to: Some(FrameIndex(to)),
            max_frames: None,
        }
    }

    /// Run up to and including `to`.
    pub fn until(to: u32) -> Self {
        Self {
            to: Some(FrameIndex(to)),
            ..Self::default()
        }
    }

    /// Compute at most `n` frames.
    pub fn limit(mut self, n: u32) -> Self {
        self.max_frames = Some(n);
        self
    }
}

/// Frames a run is about to compute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunPlan {
    /// Session being run.
    pub session: SessionId,
    /// First frame to compute.
    pub first: FrameIndex,
    /// Last frame the run may reach. `first > last` when everything is already cached.
    pub last: FrameIndex,
    /// Timeline length at the start of the run.
    pub total_frames: u32,
}

impl RunPlan {
    /// Number of frames the run will compute if it is not stopped.
    pub fn frame_count(&self) -> u32 {
        if self.first > self.last {
            0
        } else {
            self.last.0 - self.first.0 + 1
        }
    }
}

/// One committed frame, as reported to a [`RunSink`].
#[derive(Clone, Debug)]
pub struct FrameResult {
    /// Frame index.
    pub frame: FrameIndex,
    /// Committed snapshot (shared with the cache).
    pub heightmap: Arc<Heightmap>,
    /// Summary statistics of the snapshot.
    pub stats: HeightStats,
    /// Content fingerprint of the snapshot.
    pub fingerprint: Fingerprint,
    /// Jobs applied, in order. Empty for a pass-through frame.
    pub jobs_applied: Vec<JobId>,
    /// Time spent computing the frame.
    pub elapsed: Duration,
}

impl FrameResult {
    fn new(computed: ComputedFrame, elapsed: Duration) -> Self {
        Self {
            frame: computed.frame,
            stats: computed.heightmap.stats(),
            fingerprint: computed.heightmap.fingerprint(),
            heightmap: computed.heightmap,
            jobs_applied: computed.jobs_applied,
            elapsed,
        }
    }
}

/// Outcome of a run that reached a terminal state without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// `Completed` or `Stopped`.
    pub status: RunStatus,
    /// Frames computed by this run.
    pub frames_computed: u32,
    /// Last frame committed by this run.
    pub last_frame: Option<FrameIndex>,
    /// Session high-water mark when the run ended.
    pub high_water: FrameIndex,
}

/// Consumer of run results.
///
/// Ordering contract: `push_frame` is called in strictly increasing frame order, once per
/// committed frame, between one `begin` and at most one `end`. `end` is skipped when the run fails.
pub trait RunSink: Send {
    /// Called once before the first frame.
    fn begin(&mut self, _plan: &RunPlan) -> TerraResult<()> {
        Ok(())
    }
    /// Receive one committed frame. An error fails the run.
    fn push_frame(&mut self, result: &FrameResult) -> TerraResult<()>;
    /// Called once after a run completes or is stopped.
    fn end(&mut self, _report: &RunReport) -> TerraResult<()> {
        Ok(())
    }
}

/// Sink that discards results.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RunSink for NullSink {
    fn push_frame(&mut self, _result: &FrameResult) -> TerraResult<()> {
        Ok(())
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemoryRunSink {
    plan: Option<RunPlan>,
    frames: Vec<FrameResult>,
    report: Option<RunReport>,
}

impl InMemoryRunSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan captured in `begin`.
    pub fn plan(&self) -> Option<RunPlan> {
        self.plan
    }

    /// Captured frames in delivery order.
    pub fn frames(&self) -> &[FrameResult] {
        &self.frames
    }

    /// Report captured in `end`.
    pub fn report(&self) -> Option<RunReport> {
        self.report
    }

    /// Indices of the captured frames.
    pub fn frame_indices(&self) -> Vec<u32> {
        self.frames.iter().map(|r| r.frame.0).collect()
    }
}

impl RunSink for InMemoryRunSink {
    fn begin(&mut self, plan: &RunPlan) -> TerraResult<()> {
        self.plan = Some(*plan);
        self.frames.clear();
        self.report = None;
        Ok(())
    }

    fn push_frame(&mut self, result: &FrameResult) -> TerraResult<()> {
        self.frames.push(result.clone());
        Ok(())
    }

    fn end(&mut self, report: &RunReport) -> TerraResult<()> {
        self.report = Some(*report);
        Ok(())
    }
}

/// Cooperative cancellation flag shared between a session and its callers.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the active run to stop before its next frame.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Return `true` once a stop was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drive one run of `session` to a terminal state on the calling thread.
pub(crate) fn drive(
    session: &Session,
    req: RunRequest,
    sink: &mut dyn RunSink,
) -> TerraResult<RunReport> {
    let claim = session.claim_run()?;
    drive_claimed(session, claim, req, sink)
}

#[tracing::instrument(skip(session, claim, req, sink), fields(session = %session.id()))]
fn drive_claimed(
    session: &Session,
    claim: RunClaim<'_>,
    req: RunRequest,
    sink: &mut dyn RunSink,
) -> TerraResult<RunReport> {
    let stop = session.stop_flag();

    let (jobs, total_frames) = session.snapshot();
    let validation = coverage::validate(jobs.iter(), total_frames);
    if let Err(err) = validation.require_full_coverage() {
        tracing::warn!(error = %err, "run rejected");
        return Err(err);
    }
    let plan = plan_run(session, req, total_frames)?;

    sink.begin(&plan)?;
    tracing::info!(
        first = plan.first.0,
        last = plan.last.0,
        frames = plan.frame_count(),
        "run started"
    );

    let limit = req.max_frames.unwrap_or(u32::MAX);
    let mut status = RunStatus::Completed;
    let mut frames_computed = 0u32;
    let mut last_frame = None;
    let t_run = Instant::now();

    for idx in plan.first.0..=plan.last.0 {
        if frames_computed >= limit {
            break;
        }
        if stop.is_requested() {
            status = RunStatus::Stopped;
            tracing::info!(frame = idx, "run stopped");
            break;
        }

        let frame = FrameIndex(idx);
        let t0 = Instant::now();
        let computed = match engine::compute_frame(&jobs, session.cache(), session.executor(), frame)
        {
            Ok(c) => c,
            Err(err) => {
                tracing::error!(frame = idx, error = %err, "run failed");
                claim.finish(RunStatus::Failed);
                return Err(err);
            }
        };
        let result = FrameResult::new(computed, t0.elapsed());
        tracing::debug!(
            frame = idx,
            jobs = result.jobs_applied.len(),
            elapsed_ms = result.elapsed.as_secs_f64() * 1000.0,
            "frame committed"
        );
        frames_computed += 1;
        last_frame = Some(frame);

        if let Err(err) = sink.push_frame(&result) {
            tracing::error!(frame = idx, error = %err, "sink rejected frame");
            claim.finish(RunStatus::Failed);
            return Err(err);
        }
    }

    let report = RunReport {
        status,
        frames_computed,
        last_frame,
        high_water: session.high_water(),
    };
    if let Err(err) = sink.end(&report) {
        claim.finish(RunStatus::Failed);
        return Err(err);
    }
    tracing::info!(
        status = %status,
        frames = frames_computed,
        elapsed_ms = t_run.elapsed().as_secs_f64() * 1000.0,
        "run finished"
    );
    claim.finish(status);
    Ok(report)
}

fn plan_run(session: &Session, req: RunRequest, total_frames: u32) -> TerraResult<RunPlan> {
    let from = req.from.unwrap_or(FrameIndex(1));
    let to = req.to.unwrap_or(FrameIndex(total_frames));
    if from.0 == 0 {
        return Err(TerraError::configuration("run must start at frame 1 or later"));
    }
    if to.0 > total_frames {
        return Err(TerraError::configuration(format!(
            "run end {to} is beyond totalFrames {total_frames}"
        )));
    }
    if from > to {
        return Err(TerraError::configuration(format!(
            "run start {from} is after run end {to}"
        )));
    }
    let resume_at = session.high_water().next();
    if from > resume_at {
        return Err(TerraError::configuration(format!(
            "run start {from} is beyond the first uncomputed frame {resume_at}"
        )));
    }
    Ok(RunPlan {
        session: session.id(),
        first: from.max(resume_at),
        last: to,
        total_frames,
    })
}

/// Sink forwarding results to a [`RunHandle`]. A vanished receiver stops the run.
struct ChannelSink {
    tx: mpsc::SyncSender<FrameResult>,
    stop: StopHandle,
}

impl RunSink for ChannelSink {
    fn push_frame(&mut self, result: &FrameResult) -> TerraResult<()> {
        if self.tx.send(result.clone()).is_err() {
            tracing::debug!(frame = result.frame.0, "result receiver dropped; stopping");
            self.stop.request();
        }
        Ok(())
    }
}

/// A run executing on a background thread.
///
/// Results arrive in frame order over a bounded channel, so a slow consumer applies backpressure
/// to the run. Dropping the handle requests a stop.
pub struct RunHandle {
    session: SessionId,
    results: mpsc::Receiver<FrameResult>,
    stop: StopHandle,
    thread: Option<JoinHandle<TerraResult<RunReport>>>,
}

impl RunHandle {
    /// Session being run.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Next committed frame, or `None` once the run has ended.
    pub fn recv(&self) -> Option<FrameResult> {
        self.results.recv().ok()
    }

    /// Blocking iterator over committed frames.
    pub fn iter(&self) -> impl Iterator<Item = FrameResult> + '_ {
        self.results.iter()
    }

    /// Request cancellation at the next frame boundary.
    pub fn stop(&self) {
        self.stop.request();
    }

    /// Wait for the run to end, discarding results not yet received.
    pub fn join(mut self) -> TerraResult<RunReport> {
        for _ in self.results.iter() {}
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| TerraError::Other(anyhow::anyhow!("run thread panicked")))?,
            None => Err(TerraError::Other(anyhow::anyhow!("run already joined"))),
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop.request();
        }
    }
}

pub(crate) fn spawn(session: Arc<Session>, req: RunRequest) -> TerraResult<RunHandle> {
    let id = session.id();
    // Claimed on the caller's thread: the session is `Running` before this returns.
    let prior = session.enter_running()?;
    let stop = session.stop_handle();
    let (tx, rx) = mpsc::sync_channel::<FrameResult>(session.opts().channel_capacity.max(1));
    let mut sink = ChannelSink {
        tx,
        stop: stop.clone(),
    };
    let owner = Arc::clone(&session);
    let thread = std::thread::Builder::new()
        .name(format!("terrashift-{id}"))
        .spawn(move || {
            let claim = RunClaim::resume(&session, prior);
            drive_claimed(&session, claim, req, &mut sink)
        })
        .map_err(|e| {
            drop(RunClaim::resume(&owner, prior));
            TerraError::Other(anyhow::Error::new(e).context("spawn run thread"))
        })?;
    Ok(RunHandle {
        session: id,
        results: rx,
        stop,
        thread: Some(thread),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/session/controller.rs"]
mod tests;
