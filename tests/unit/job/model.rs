use super::*;
use crate::job::config::ThermalConfig;

fn range(a: u32, b: u32) -> FrameRange {
    FrameRange::frames(a, b).unwrap()
}

fn thermal(name: &str, a: u32, b: u32) -> JobDraft {
    JobDraft::new(name, range(a, b), StepConfig::default_for(StepKind::Thermal))
}

#[test]
fn add_assigns_increasing_order_and_ids() {
    let mut set = JobSet::new();
    let a = set.add(thermal("a", 1, 5), 10).unwrap().clone();
    let b = set.add(thermal("b", 3, 8), 10).unwrap().clone();
    assert_eq!(a.order(), 1);
    assert_eq!(b.order(), 2);
    assert_eq!(a.id().as_str(), "job-1");
    assert_eq!(b.id().as_str(), "job-2");
    assert_eq!(set.len(), 2);
}

#[test]
fn generated_ids_skip_explicit_ones() {
    let mut set = JobSet::new();
    set.add(thermal("a", 1, 1).with_id("job-2"), 10).unwrap();
    let b = set.add(thermal("b", 1, 1), 10).unwrap();
    assert_eq!(b.id().as_str(), "job-2-1");
}

#[test]
fn add_rejects_invalid_drafts_with_all_reasons() {
    let mut set = JobSet::new();
    set.add(thermal("a", 1, 5), 10).unwrap();

    let mut bad = thermal("a", 4, 12);
    bad.config = StepConfig::Thermal(ThermalConfig {
        iterations: 0,
        ..ThermalConfig::default()
    });
    let msg = set.add(bad, 10).unwrap_err().to_string();
    assert!(msg.contains("job 'a'"), "{msg}");
    assert!(msg.contains("already used"));
    assert!(msg.contains("exceeds totalFrames 10"));
    assert!(msg.contains("iterations must be >= 1"));
    assert_eq!(set.len(), 1);

    assert!(set.add(thermal("", 1, 2), 10).is_err());
    assert!(set.add(thermal("c", 1, 2).with_id("job-1"), 10).is_err());
}

#[test]
fn applicable_filters_and_sorts_by_order() {
    let mut set = JobSet::new();
    set.add(thermal("a", 1, 10), 10).unwrap();
    set.add(thermal("b", 4, 6), 10).unwrap();
    set.add(thermal("c", 5, 5).with_enabled(false), 10).unwrap();
    let names: Vec<&str> = set
        .applicable(FrameIndex(5))
        .iter()
        .map(|j| j.name())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(set.applicable(FrameIndex(11)).is_empty());
}

#[test]
fn update_keeps_identity_and_invalidates_from_earliest_start() {
    let mut set = JobSet::new();
    let id = set.add(thermal("a", 5, 8), 10).unwrap().id().clone();
    set.add(thermal("b", 1, 10), 10).unwrap();

    let change = set.update(&id, thermal("a2", 3, 9), 10).unwrap();
    assert_eq!(change.job.id(), &id);
    assert_eq!(change.job.order(), 1);
    assert_eq!(change.job.name(), "a2");
    assert_eq!(change.invalidate_from, Some(FrameIndex(3)));

    let change = set.update(&id, thermal("a2", 6, 9), 10).unwrap();
    assert_eq!(change.invalidate_from, Some(FrameIndex(3)));

    let change = set.update(&id, thermal("a2", 6, 9), 10).unwrap();
    assert_eq!(change.invalidate_from, None);
}

#[test]
fn update_allows_keeping_own_name() {
    let mut set = JobSet::new();
    let id = set.add(thermal("a", 1, 2), 10).unwrap().id().clone();
    set.add(thermal("b", 1, 2), 10).unwrap();
    assert!(set.update(&id, thermal("a", 1, 3), 10).is_ok());
    assert!(set.update(&id, thermal("b", 1, 3), 10).is_err());
}

#[test]
fn remove_and_toggle() {
    let mut set = JobSet::new();
    let id = set.add(thermal("a", 2, 4), 10).unwrap().id().clone();

    let change = set.toggle(&id).unwrap();
    assert!(!change.job.enabled());
    assert_eq!(change.invalidate_from, Some(FrameIndex(2)));
    assert_eq!(set.set_enabled(&id, false).unwrap().invalidate_from, None);

    let change = set.remove(&id).unwrap();
    assert_eq!(change.invalidate_from, Some(FrameIndex(2)));
    assert!(set.is_empty());
    assert!(matches!(set.remove(&id), Err(TerraError::JobNotFound(_))));
    assert!(matches!(set.toggle(&id), Err(TerraError::JobNotFound(_))));
}

#[test]
fn order_is_never_reused_after_delete() {
    let mut set = JobSet::new();
    let id = set.add(thermal("a", 1, 1), 10).unwrap().id().clone();
    set.remove(&id).unwrap();
    let b = set.add(thermal("b", 1, 1), 10).unwrap();
    assert_eq!(b.order(), 2);
}

#[test]
fn check_within_names_offending_jobs() {
    let mut set = JobSet::new();
    set.add(thermal("long", 1, 10), 10).unwrap();
    set.add(thermal("short", 1, 4), 10).unwrap();
    assert!(set.check_within(10).is_ok());
    let msg = set.check_within(5).unwrap_err().to_string();
    assert!(msg.contains("'long' (1-10)"), "{msg}");
    assert!(!msg.contains("short"));
}

#[test]
fn job_serializes_with_flattened_config() {
    let mut set = JobSet::new();
    let job = set.add(thermal("a", 1, 2), 10).unwrap();
    let v = serde_json::to_value(job).unwrap();
    assert_eq!(v["type"], "thermal");
    assert_eq!(v["config"]["talusAngle"], 40.0);
    assert_eq!(v["order"], 1);
}
