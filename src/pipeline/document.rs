use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::exec::executor::StepExecutor;
use crate::foundation::core::{Dims, FrameIndex, FrameRange};
use crate::foundation::error::{TerraError, TerraResult};
use crate::foundation::ids::{JobId, SessionId};
use crate::job::config::{StepConfig, StepKind};
use crate::job::model::JobDraft;
use crate::session::registry::SessionRegistry;
use crate::session::sim_session::{Session, SessionOpts};
use crate::terrain::generators::InitialTerrain;

/// Serializable description of a whole simulation: timeline, initial terrain and jobs.
///
/// ```json
/// {
///   "totalFrames": 20, "width": 64, "height": 64,
///   "step0": { "method": "cone", "radius": 30, "height": 50 },
///   "jobs": [
///     { "name": "rain", "startFrame": 1, "endFrame": 20, "type": "hydraulic",
///       "config": { "numParticles": 2000, "seed": 7 } }
///   ]
/// }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PipelineDoc {
    /// Timeline length (frames `1..=totalFrames` are computed).
    pub total_frames: u32,
    /// Grid width in cells.
    #[serde(default = "default_extent")]
    pub width: u32,
    /// Grid height in cells.
    #[serde(default = "default_extent")]
    pub height: u32,
    /// Frame 0 generator.
    #[serde(default)]
    pub step0: InitialTerrain,
    /// Jobs in creation order.
    #[serde(default)]
    pub jobs: Vec<JobDoc>,
}

/// One job entry of a [`PipelineDoc`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobDoc {
    /// Explicit id; generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<JobId>,
    /// Display name, unique within the document.
    pub name: String,
    /// First targeted frame (>= 1).
    pub start_frame: u32,
    /// Last targeted frame (inclusive).
    pub end_frame: u32,
    /// Step kind.
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Step parameters; omitted fields take the defaults of `kind`.
    #[serde(default)]
    pub config: serde_json::Value,
    /// Disabled jobs are kept but never applied.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_extent() -> u32 {
    128
}

fn default_enabled() -> bool {
    true
}

impl JobDoc {
    /// Decode into a job draft. Field bounds are checked when the draft is added to a session.
    pub fn to_draft(&self) -> TerraResult<JobDraft> {
        let range = FrameRange::new(FrameIndex(self.start_frame), FrameIndex(self.end_frame))
            .map_err(|e| match e {
                TerraError::Configuration(msg) => {
                    TerraError::configuration(format!("job '{}': {msg}", self.name))
                }
                other => other,
            })?;
        let config = StepConfig::from_json(self.kind, self.config.clone())?;
        let mut draft = JobDraft::new(self.name.clone(), range, config).with_enabled(self.enabled);
        if let Some(id) = &self.id {
            draft = draft.with_id(id.clone());
        }
        Ok(draft)
    }
}

impl PipelineDoc {
    /// Parse a document from JSON text.
    pub fn from_json_str(s: &str) -> TerraResult<Self> {
        serde_json::from_str(s).map_err(|e| TerraError::serde(e.to_string()))
    }

    /// Parse a document from a reader.
    pub fn from_reader(r: impl Read) -> TerraResult<Self> {
        serde_json::from_reader(r).map_err(|e| TerraError::serde(e.to_string()))
    }

    /// Read and parse a document file.
    pub fn from_path(path: impl AsRef<Path>) -> TerraResult<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path).map_err(|e| {
            TerraError::Other(anyhow::Error::new(e).context(format!("open {}", path.display())))
        })?;
        Self::from_reader(std::io::BufReader::new(f))
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> TerraResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| TerraError::serde(e.to_string()))
    }

    /// Grid dimensions.
    pub fn dims(&self) -> TerraResult<Dims> {
        Dims::new(self.width, self.height)
    }

    /// Build a session from the document. Jobs are added in document order, which fixes their
    /// creation order.
    #[tracing::instrument(skip(self, executor, opts), fields(jobs = self.jobs.len()))]
    pub fn build_session(
        &self,
        id: SessionId,
        executor: Arc<dyn StepExecutor>,
        opts: SessionOpts,
    ) -> TerraResult<Session> {
        let session = Session::new(id, self.total_frames, self.dims()?, &self.step0, executor, opts)?;
        for job in &self.jobs {
            session.add_job(job.to_draft()?)?;
        }
        tracing::debug!(total_frames = self.total_frames, "pipeline loaded");
        Ok(session)
    }

    /// Build the document's session inside `registry`.
    pub fn register(&self, registry: &SessionRegistry) -> TerraResult<SessionId> {
        registry.create_with(|id, executor, opts| self.build_session(id, executor, opts))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/document.rs"]
mod tests;
