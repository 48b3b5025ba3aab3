use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{TerraError, TerraResult, contiguous_ranges};
use crate::foundation::ids::JobId;
use crate::job::model::Job;

/// Coverage report for a job set over `1..=totalFrames`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// `true` iff every frame has at least one enabled job.
    pub is_valid: bool,
    /// Frames without an enabled job, ascending.
    pub uncovered_frames: Vec<FrameIndex>,
    /// Pairs of enabled jobs sharing frames. Informational only; overlap is legal.
    pub overlaps: Vec<Overlap>,
}

/// Two enabled jobs that both apply to `frames`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Overlap {
    /// Earlier-created job.
    pub first: JobId,
    /// Later-created job; applied after `first` on shared frames.
    pub second: JobId,
    /// Shared frames.
    pub frames: FrameRange,
}

impl ValidationResult {
    /// Uncovered frames collapsed into contiguous ranges.
    pub fn gap_ranges(&self) -> Vec<FrameRange> {
        contiguous_ranges(&self.uncovered_frames)
    }

    /// Convert gaps into [`TerraError::CoverageGap`].
    pub fn require_full_coverage(&self) -> TerraResult<()> {
        if self.is_valid {
            return Ok(());
        }
        Err(TerraError::CoverageGap {
            uncovered_frames: self.uncovered_frames.clone(),
        })
    }
}

/// Validate coverage of `1..=total_frames` by the enabled jobs.
///
/// Pure and read-only. Runs in `O(total_frames + jobs)` for the gap scan via a difference array;
/// the overlap report is pairwise over enabled jobs.
pub fn validate<'a, I>(jobs: I, total_frames: u32) -> ValidationResult
where
    I: IntoIterator<Item = &'a Job>,
{
    let enabled: Vec<&Job> = jobs.into_iter().filter(|j| j.enabled()).collect();
    let uncovered_frames = uncovered_frames(&enabled, total_frames);
    ValidationResult {
        is_valid: uncovered_frames.is_empty(),
        uncovered_frames,
        overlaps: find_overlaps(&enabled),
    }
}

fn uncovered_frames(enabled: &[&Job], total_frames: u32) -> Vec<FrameIndex> {
    let total = total_frames as usize;
    // delta[f] marks where coverage starts (+1) and stops (-1).
    let mut delta = vec![0i32; total + 2];
    for job in enabled {
        let r = job.range();
        let start = (r.start.0 as usize).max(1);
        let end = (r.end.0 as usize).min(total);
        if start > end {
            continue;
        }
        delta[start] += 1;
        delta[end + 1] -= 1;
    }

    let mut out = Vec::new();
    let mut depth = 0i32;
    for (f, d) in delta.iter().enumerate().take(total + 1).skip(1) {
        depth += d;
        if depth == 0 {
            out.push(FrameIndex(f as u32));
        }
    }
    out
}

fn find_overlaps(enabled: &[&Job]) -> Vec<Overlap> {
    let mut sorted = enabled.to_vec();
    sorted.sort_by_key(|j| j.order());
    let mut out = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            if let Some(frames) = a.range().overlap(b.range()) {
                out.push(Overlap {
                    first: a.id().clone(),
                    second: b.id().clone(),
                    frames,
                });
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/validate/coverage.rs"]
mod tests;
