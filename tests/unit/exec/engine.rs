use super::*;
use crate::foundation::core::{Dims, FrameRange};
use crate::foundation::error::StepError;
use crate::job::config::{HydraulicConfig, StepConfig, ThermalConfig};
use crate::job::model::JobDraft;

/// Hydraulic adds `erosion_rate`, thermal multiplies by `1 + transfer_rate`.
struct Arith;

impl StepExecutor for Arith {
    fn apply(&self, input: &Heightmap, config: &StepConfig) -> Result<Heightmap, StepError> {
        let mut out = input.clone();
        for v in out.data_mut() {
            *v = match config {
                StepConfig::Hydraulic(c) => *v + c.erosion_rate as f32,
                StepConfig::Thermal(c) => *v * (1.0 + c.transfer_rate as f32),
            };
        }
        Ok(out)
    }
}

fn add(v: f64) -> StepConfig {
    StepConfig::Hydraulic(HydraulicConfig {
        erosion_rate: v,
        ..HydraulicConfig::default()
    })
}

fn mul(v: f64) -> StepConfig {
    StepConfig::Thermal(ThermalConfig {
        transfer_rate: v,
        ..ThermalConfig::default()
    })
}

fn cache_of(value: f32) -> FrameCache {
    FrameCache::new(Heightmap::filled(Dims::new(2, 2).unwrap(), value))
}

fn job(set: &mut JobSet, name: &str, a: u32, b: u32, config: StepConfig) -> JobId {
    set.add(
        JobDraft::new(name, FrameRange::frames(a, b).unwrap(), config),
        10,
    )
    .unwrap()
    .id()
    .clone()
}

#[test]
fn jobs_apply_in_creation_order() {
    let mut set = JobSet::new();
    let a = job(&mut set, "add", 1, 3, add(0.5));
    let m = job(&mut set, "mul", 1, 3, mul(1.0));
    let cache = cache_of(1.0);

    let out = compute_frame(&set, &cache, &Arith, FrameIndex(1)).unwrap();
    // (1 + 0.5) * 2
    assert_eq!(out.heightmap.at(0, 0), 3.0);
    assert_eq!(out.jobs_applied, vec![a, m]);
    assert_eq!(cache.high_water(), FrameIndex(1));
}

#[test]
fn reversed_creation_order_changes_result() {
    let mut set = JobSet::new();
    job(&mut set, "mul", 1, 3, mul(1.0));
    job(&mut set, "add", 1, 3, add(0.5));
    let cache = cache_of(1.0);
    let out = compute_frame(&set, &cache, &Arith, FrameIndex(1)).unwrap();
    // 1 * 2 + 0.5
    assert_eq!(out.heightmap.at(0, 0), 2.5);
}

#[test]
fn frame_without_jobs_passes_predecessor_through() {
    let mut set = JobSet::new();
    job(&mut set, "late", 2, 2, add(1.0));
    let cache = cache_of(4.0);
    let out = compute_frame(&set, &cache, &Arith, FrameIndex(1)).unwrap();
    assert!(out.jobs_applied.is_empty());
    let prev = cache.get(FrameIndex(0)).unwrap();
    assert!(Arc::ptr_eq(&out.heightmap, &prev));
}

#[test]
fn missing_predecessor_is_not_cached() {
    let set = JobSet::new();
    let cache = cache_of(0.0);
    let err = compute_frame(&set, &cache, &Arith, FrameIndex(3)).unwrap_err();
    assert!(matches!(err, TerraError::NotCached(FrameIndex(2))));
    assert!(compute_frame(&set, &cache, &Arith, FrameIndex(0)).is_err());
}

struct Poison;

impl StepExecutor for Poison {
    fn apply(&self, input: &Heightmap, _config: &StepConfig) -> Result<Heightmap, StepError> {
        let mut out = input.clone();
        out.set(0, 0, f32::NAN);
        Ok(out)
    }
}

#[test]
fn non_finite_output_fails_without_commit() {
    let mut set = JobSet::new();
    let id = job(&mut set, "bad", 1, 1, add(1.0));
    let cache = cache_of(0.0);
    let err = compute_frame(&set, &cache, &Poison, FrameIndex(1)).unwrap_err();
    match err {
        TerraError::StepExecution {
            job_id,
            frame,
            source,
        } => {
            assert_eq!(job_id, id);
            assert_eq!(frame, FrameIndex(1));
            assert!(matches!(source, StepError::NonFinite { index: 0, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(cache.high_water(), FrameIndex(0));
    assert!(cache.get(FrameIndex(0)).unwrap().first_non_finite().is_none());
}

#[test]
fn recompute_overwrites_cached_frame() {
    let mut set = JobSet::new();
    job(&mut set, "add", 1, 1, add(1.0));
    let cache = cache_of(0.0);
    compute_frame(&set, &cache, &Arith, FrameIndex(1)).unwrap();
    let again = compute_frame(&set, &cache, &Arith, FrameIndex(1)).unwrap();
    assert_eq!(again.heightmap.at(1, 1), 1.0);
    assert_eq!(cache.len(), 2);
}
