use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TerraError, TerraResult};
use crate::terrain::heightmap::Heightmap;

/// Per-session store of computed frames.
///
/// Frames are committed in increasing index order, so the cache always holds a contiguous prefix
/// `0..=high_water`. Frame 0 is seeded at construction and survives every reset. Snapshots are
/// handed out as `Arc`s and are immutable once committed, so readers may hold them while a run
/// commits later frames.
#[derive(Debug)]
pub struct FrameCache {
    frames: RwLock<Vec<Arc<Heightmap>>>,
}

impl FrameCache {
    /// Cache seeded with the initial terrain as frame 0.
    pub fn new(initial: Heightmap) -> Self {
        Self {
            frames: RwLock::new(vec![Arc::new(initial)]),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Heightmap>>> {
        self.frames.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<Heightmap>>> {
        self.frames.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached snapshot of `frame`, if present.
    pub fn get(&self, frame: FrameIndex) -> Option<Arc<Heightmap>> {
        self.read().get(frame.0 as usize).cloned()
    }

    /// Return `true` when `frame` is cached.
    pub fn contains(&self, frame: FrameIndex) -> bool {
        (frame.0 as usize) < self.read().len()
    }

    /// Highest cached frame (0 when only the initial terrain is present).
    pub fn high_water(&self) -> FrameIndex {
        FrameIndex(self.read().len().saturating_sub(1) as u32)
    }

    /// Number of cached frames, frame 0 included.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Always `false`: frame 0 is never evicted.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Commit `frame`. Its predecessor must already be cached; an already-cached frame is
    /// overwritten in place.
    pub(crate) fn commit(&self, frame: FrameIndex, heightmap: Arc<Heightmap>) -> TerraResult<()> {
        if frame.0 == 0 {
            return Err(TerraError::configuration(
                "frame 0 is the initial terrain and cannot be recomputed",
            ));
        }
        let mut frames = self.write();
        let idx = frame.0 as usize;
        if idx > frames.len() {
            return Err(TerraError::NotCached(FrameIndex(frame.0 - 1)));
        }
        if idx == frames.len() {
            frames.push(heightmap);
        } else {
            frames[idx] = heightmap;
        }
        Ok(())
    }

    /// Drop every cached frame `>= from` (frame 0 is kept). Returns how many were dropped.
    pub(crate) fn invalidate_from(&self, from: FrameIndex) -> usize {
        let keep = (from.0 as usize).max(1);
        let mut frames = self.write();
        let dropped = frames.len().saturating_sub(keep);
        frames.truncate(keep);
        dropped
    }

    /// Drop frames `1..`, keeping the initial terrain.
    pub(crate) fn reset(&self) -> usize {
        self.invalidate_from(FrameIndex(1))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/cache.rs"]
mod tests;
