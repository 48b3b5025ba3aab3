use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;

use crate::exec::executor::StepExecutor;
use crate::foundation::core::{Dims, FrameIndex};
use crate::foundation::error::{TerraError, TerraResult};
use crate::foundation::ids::{JobId, SessionId};
use crate::job::model::{Job, JobDraft};
use crate::session::controller::{NullSink, RunReport, RunRequest, RunSink};
use crate::session::sim_session::{Session, SessionOpts};
use crate::terrain::generators::TerrainProvider;
use crate::terrain::heightmap::Heightmap;
use crate::validate::coverage::ValidationResult;

/// Owns the sessions of one process and hands out their ids.
///
/// Sessions are independent. Each runs frames strictly in sequence, but different sessions may
/// run in parallel ([`SessionRegistry::run_all`]).
pub struct SessionRegistry {
    sessions: RwLock<BTreeMap<SessionId, Arc<Session>>>,
    next_id: AtomicU64,
    executor: Arc<dyn StepExecutor>,
    opts: SessionOpts,
}

impl SessionRegistry {
    /// Registry whose sessions use `executor` and `opts`.
    pub fn new(executor: Arc<dyn StepExecutor>, opts: SessionOpts) -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            executor,
            opts,
        }
    }

    fn allocate_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a session and seed frame 0 from `initial`.
    pub fn create_session(
        &self,
        total_frames: u32,
        width: u32,
        height: u32,
        initial: &dyn TerrainProvider,
    ) -> TerraResult<SessionId> {
        let dims = Dims::new(width, height)?;
        self.create_with(|id, executor, opts| {
            Session::new(id, total_frames, dims, initial, executor, opts)
        })
    }

    /// Register a session built by `build` under a fresh id.
    pub fn create_with<F>(&self, build: F) -> TerraResult<SessionId>
    where
        F: FnOnce(SessionId, Arc<dyn StepExecutor>, SessionOpts) -> TerraResult<Session>,
    {
        let id = self.allocate_id();
        let session = build(id, Arc::clone(&self.executor), self.opts.clone())?;
        if session.id() != id {
            return Err(TerraError::configuration(format!(
                "session built as {} but registered as {id}",
                session.id()
            )));
        }
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(session));
        tracing::info!(session = %id, "session registered");
        Ok(id)
    }

    /// Look up a session.
    pub fn get(&self, id: SessionId) -> TerraResult<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or(TerraError::SessionNotFound(id))
    }

    /// Drop a session. An active run is asked to stop and finishes on its own thread.
    pub fn remove(&self, id: SessionId) -> TerraResult<Arc<Session>> {
        let session = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(TerraError::SessionNotFound(id))?;
        session.stop();
        tracing::info!(session = %id, "session removed");
        Ok(session)
    }

    /// Registered session ids in ascending order.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return `true` when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// [`Session::add_job`] on session `id`.
    pub fn add_job(&self, id: SessionId, draft: JobDraft) -> TerraResult<Job> {
        self.get(id)?.add_job(draft)
    }

    /// [`Session::update_job`] on session `id`.
    pub fn update_job(&self, id: SessionId, job: &JobId, draft: JobDraft) -> TerraResult<Job> {
        self.get(id)?.update_job(job, draft)
    }

    /// [`Session::delete_job`] on session `id`.
    pub fn delete_job(&self, id: SessionId, job: &JobId) -> TerraResult<Job> {
        self.get(id)?.delete_job(job)
    }

    /// [`Session::toggle_job`] on session `id`.
    pub fn toggle_job(&self, id: SessionId, job: &JobId) -> TerraResult<Job> {
        self.get(id)?.toggle_job(job)
    }

    /// Coverage report of session `id`.
    pub fn validate(&self, id: SessionId) -> TerraResult<ValidationResult> {
        Ok(self.get(id)?.validate())
    }

    /// Run session `id` on the calling thread.
    pub fn run(
        &self,
        id: SessionId,
        req: RunRequest,
        sink: &mut dyn RunSink,
    ) -> TerraResult<RunReport> {
        self.get(id)?.run(req, sink)
    }

    /// Request a stop of session `id`'s active run.
    pub fn stop(&self, id: SessionId) -> TerraResult<()> {
        self.get(id)?.stop();
        Ok(())
    }

    /// Cached frame of session `id`.
    pub fn get_frame(
        &self,
        id: SessionId,
        frame: FrameIndex,
    ) -> TerraResult<Option<Arc<Heightmap>>> {
        Ok(self.get(id)?.get_frame(frame))
    }

    /// Run several sessions in parallel, one rayon task per session, discarding frame results.
    ///
    /// Results come back in the order of `ids`.
    pub fn run_all(
        &self,
        ids: &[SessionId],
        req: RunRequest,
    ) -> Vec<(SessionId, TerraResult<RunReport>)> {
        ids.par_iter()
            .map(|&id| {
                let out = self.get(id).and_then(|s| s.run(req, &mut NullSink));
                (id, out)
            })
            .collect()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.ids())
            .field("opts", &self.opts)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/registry.rs"]
mod tests;
