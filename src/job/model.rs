use smallvec::SmallVec;

use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{TerraError, TerraResult};
use crate::foundation::ids::JobId;
use crate::job::config::{StepConfig, StepKind};

/// A configured application of one step kind to a contiguous frame range.
///
/// `id` and `order` are fixed at creation; edits go through [`JobSet::update`].
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    id: JobId,
    name: String,
    range: FrameRange,
    #[serde(flatten)]
    config: StepConfig,
    enabled: bool,
    order: u64,
}

impl Job {
    /// Stable identifier.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Human-readable name, unique within the set.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frames this job applies to.
    pub fn range(&self) -> FrameRange {
        self.range
    }

    /// Step parameters.
    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    /// Step kind, derived from the config variant.
    pub fn kind(&self) -> StepKind {
        self.config.kind()
    }

    /// Disabled jobs are ignored by coverage and execution.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Creation order; the only sequencing key within a frame.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Return `true` when this job is enabled and targets `frame`.
    pub fn applies_to(&self, frame: FrameIndex) -> bool {
        self.enabled && self.range.contains(frame)
    }
}

/// User-supplied job fields for create and update.
#[derive(Clone, Debug, PartialEq)]
pub struct JobDraft {
    /// Explicit identifier; one is generated on create when `None`. Ignored on update.
    pub id: Option<JobId>,
    /// Non-empty, unique name.
    pub name: String,
    /// Target frames.
    pub range: FrameRange,
    /// Step parameters.
    pub config: StepConfig,
    /// Initial enabled flag.
    pub enabled: bool,
}

impl JobDraft {
    /// Enabled draft without an explicit id.
    pub fn new(name: impl Into<String>, range: FrameRange, config: StepConfig) -> Self {
        Self {
            id: None,
            name: name.into(),
            range,
            config,
            enabled: true,
        }
    }

    /// Set an explicit id.
    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Outcome of a job mutation: the affected job and the first cached frame it invalidates.
#[derive(Clone, Debug, PartialEq)]
pub struct JobChange {
    /// Job after the change (or as it was, for removals).
    pub job: Job,
    /// Cached frames at or after this index are stale. `None` when nothing changed.
    pub invalidate_from: Option<FrameIndex>,
}

/// Jobs of one session, kept in ascending `order`.
#[derive(Clone, Debug)]
pub struct JobSet {
    jobs: Vec<Job>,
    next_order: u64,
}

impl Default for JobSet {
    fn default() -> Self {
        Self::new()
    }
}

impl JobSet {
    /// Empty set; the first job created gets order 1.
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_order: 1,
        }
    }

    /// Number of jobs, enabled or not.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Return `true` when the set has no jobs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    /// Enabled jobs in creation order.
    pub fn enabled(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter().filter(|j| j.enabled)
    }

    /// Look up a job by id.
    pub fn get(&self, id: &JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    /// Enabled jobs targeting `frame`, in ascending `order`.
    pub fn applicable(&self, frame: FrameIndex) -> SmallVec<[&Job; 4]> {
        let mut out: SmallVec<[&Job; 4]> =
            self.jobs.iter().filter(|j| j.applies_to(frame)).collect();
        out.sort_by_key(|j| j.order);
        out
    }

    /// Create a job, assigning the next creation order.
    pub fn add(&mut self, draft: JobDraft, total_frames: u32) -> TerraResult<&Job> {
        self.check_draft(&draft, total_frames, None)?;
        let order = self.next_order;
        let id = match draft.id {
            Some(id) => id,
            None => self.generate_id(order),
        };
        self.next_order += 1;
        self.jobs.push(Job {
            id,
            name: draft.name,
            range: draft.range,
            config: draft.config,
            enabled: draft.enabled,
            order,
        });
        Ok(&self.jobs[self.jobs.len() - 1])
    }

    /// Replace a job's editable fields, keeping its id and order.
    ///
    /// Frames from the earlier of the old and new start onwards are invalidated.
    pub fn update(
        &mut self,
        id: &JobId,
        draft: JobDraft,
        total_frames: u32,
    ) -> TerraResult<JobChange> {
        let pos = self.position(id)?;
        self.check_draft(&draft, total_frames, Some(id))?;
        let job = &mut self.jobs[pos];
        let before = job.clone();
        job.name = draft.name;
        job.range = draft.range;
        job.config = draft.config;
        job.enabled = draft.enabled;
        let invalidate_from = (before != *job).then(|| before.range.start.min(job.range.start));
        Ok(JobChange {
            job: job.clone(),
            invalidate_from,
        })
    }

    /// Delete a job.
    pub fn remove(&mut self, id: &JobId) -> TerraResult<JobChange> {
        let pos = self.position(id)?;
        let job = self.jobs.remove(pos);
        let invalidate_from = Some(job.range.start);
        Ok(JobChange {
            job,
            invalidate_from,
        })
    }

    /// Set the enabled flag.
    pub fn set_enabled(&mut self, id: &JobId, enabled: bool) -> TerraResult<JobChange> {
        let pos = self.position(id)?;
        let job = &mut self.jobs[pos];
        let changed = job.enabled != enabled;
        job.enabled = enabled;
        Ok(JobChange {
            job: job.clone(),
            invalidate_from: changed.then_some(job.range.start),
        })
    }

    /// Flip the enabled flag.
    pub fn toggle(&mut self, id: &JobId) -> TerraResult<JobChange> {
        let enabled = self
            .get(id)
            .map(|j| !j.enabled)
            .ok_or_else(|| TerraError::JobNotFound(id.clone()))?;
        self.set_enabled(id, enabled)
    }

    /// Reject a timeline length that would leave any job out of bounds.
    pub fn check_within(&self, total_frames: u32) -> TerraResult<()> {
        let out_of_bounds: Vec<String> = self
            .jobs
            .iter()
            .filter(|j| j.range.end.0 > total_frames)
            .map(|j| format!("'{}' ({})", j.name, j.range))
            .collect();
        if out_of_bounds.is_empty() {
            return Ok(());
        }
        Err(TerraError::configuration(format!(
            "jobs exceed totalFrames {total_frames}: {}",
            out_of_bounds.join(", ")
        )))
    }

    fn position(&self, id: &JobId) -> TerraResult<usize> {
        self.jobs
            .iter()
            .position(|j| &j.id == id)
            .ok_or_else(|| TerraError::JobNotFound(id.clone()))
    }

    fn generate_id(&self, order: u64) -> JobId {
        let base = format!("job-{order}");
        let mut candidate = JobId(base.clone());
        let mut n = 1u32;
        while self.get(&candidate).is_some() {
            candidate = JobId(format!("{base}-{n}"));
            n += 1;
        }
        candidate
    }

    fn check_draft(
        &self,
        draft: &JobDraft,
        total_frames: u32,
        editing: Option<&JobId>,
    ) -> TerraResult<()> {
        let mut errors = Vec::new();
        let others = || self.jobs.iter().filter(|j| Some(&j.id) != editing);

        if draft.name.trim().is_empty() {
            errors.push("name must be non-empty".to_owned());
        } else if others().any(|j| j.name == draft.name) {
            errors.push(format!("name '{}' is already used", draft.name));
        }
        if editing.is_none()
            && let Some(id) = &draft.id
        {
            if id.as_str().trim().is_empty() {
                errors.push("id must be non-empty".to_owned());
            } else if self.get(id).is_some() {
                errors.push(format!("id '{id}' is already used"));
            }
        }
        if let Err(TerraError::Configuration(msg)) = draft.range.check_within(total_frames) {
            errors.push(msg);
        }
        if let Err(TerraError::Configuration(msg)) = draft.config.validate() {
            errors.push(msg);
        }

        if errors.is_empty() {
            return Ok(());
        }
        let label = if draft.name.is_empty() {
            "<unnamed>"
        } else {
            draft.name.as_str()
        };
        Err(TerraError::configuration(format!(
            "job '{label}': {}",
            errors.join("; ")
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/model.rs"]
mod tests;
