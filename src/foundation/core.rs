use std::fmt;

use crate::foundation::error::{TerraError, TerraResult};

/// Absolute frame index in timeline space. Frame 0 is the initial terrain.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct FrameIndex(pub u32);

impl FrameIndex {
    /// The fixed initial-terrain frame.
    pub const INITIAL: FrameIndex = FrameIndex(0);

    /// Index of the preceding frame, or `None` for frame 0.
    pub fn prev(self) -> Option<FrameIndex> {
        self.0.checked_sub(1).map(FrameIndex)
    }

    /// Index of the following frame (saturating).
    pub fn next(self) -> FrameIndex {
        FrameIndex(self.0.saturating_add(1))
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed frame range `[start, end]` targeted by a job.
///
/// Job ranges never include frame 0, so `start >= 1` is enforced at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Inclusive range end.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Create a validated range with `1 <= start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> TerraResult<Self> {
        if start.0 < 1 {
            return Err(TerraError::configuration(format!(
                "frame range start {start} must be >= 1 (frame 0 is the initial terrain)"
            )));
        }
        if start > end {
            return Err(TerraError::configuration(format!(
                "frame range start {start} must be <= end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Shorthand for `FrameRange::new(FrameIndex(start), FrameIndex(end))`.
    pub fn frames(start: u32, end: u32) -> TerraResult<Self> {
        Self::new(FrameIndex(start), FrameIndex(end))
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u32 {
        self.end.0.saturating_sub(self.start.0).saturating_add(1)
    }

    /// Return `true` when `f` is inside `[start, end]`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start <= f && f <= self.end
    }

    /// Reject ranges that reach past the timeline.
    pub fn check_within(self, total_frames: u32) -> TerraResult<()> {
        if self.start.0 < 1 || self.start > self.end {
            return Err(TerraError::configuration(format!(
                "frame range {self} is malformed"
            )));
        }
        if self.end.0 > total_frames {
            return Err(TerraError::configuration(format!(
                "frame range {self} exceeds totalFrames {total_frames}"
            )));
        }
        Ok(())
    }

    /// Frames shared by both ranges, if any.
    pub fn overlap(self, other: FrameRange) -> Option<FrameRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(FrameRange { start, end })
    }

    /// Iterate over every frame in the range in ascending order.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..=self.end.0).map(FrameIndex)
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Grid dimensions in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Dims {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
}

impl Dims {
    /// Create validated dimensions (both sides > 0).
    pub fn new(width: u32, height: u32) -> TerraResult<Self> {
        if width == 0 || height == 0 {
            return Err(TerraError::configuration(format!(
                "grid dimensions must be > 0 (got {width}x{height})"
            )));
        }
        Ok(Self { width, height })
    }

    /// Total number of cells.
    pub fn cells(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
