use super::*;
use crate::foundation::core::Dims;

fn hm(v: f32) -> Arc<Heightmap> {
    Arc::new(Heightmap::filled(Dims::new(2, 2).unwrap(), v))
}

fn cache() -> FrameCache {
    FrameCache::new(Heightmap::filled(Dims::new(2, 2).unwrap(), 0.0))
}

#[test]
fn starts_with_frame_zero_only() {
    let c = cache();
    assert_eq!(c.high_water(), FrameIndex(0));
    assert_eq!(c.len(), 1);
    assert!(!c.is_empty());
    assert!(c.contains(FrameIndex(0)));
    assert!(c.get(FrameIndex(1)).is_none());
}

#[test]
fn commit_requires_predecessor() {
    let c = cache();
    assert!(matches!(
        c.commit(FrameIndex(2), hm(1.0)),
        Err(TerraError::NotCached(FrameIndex(1)))
    ));
    assert!(c.commit(FrameIndex(0), hm(1.0)).is_err());
    c.commit(FrameIndex(1), hm(1.0)).unwrap();
    c.commit(FrameIndex(2), hm(2.0)).unwrap();
    assert_eq!(c.high_water(), FrameIndex(2));
    c.commit(FrameIndex(1), hm(5.0)).unwrap();
    assert_eq!(c.get(FrameIndex(1)).unwrap().at(0, 0), 5.0);
}

#[test]
fn invalidate_keeps_prefix_and_frame_zero() {
    let c = cache();
    for f in 1..=5 {
        c.commit(FrameIndex(f), hm(f as f32)).unwrap();
    }
    assert_eq!(c.invalidate_from(FrameIndex(4)), 2);
    assert_eq!(c.high_water(), FrameIndex(3));
    assert_eq!(c.invalidate_from(FrameIndex(9)), 0);
    assert_eq!(c.invalidate_from(FrameIndex(0)), 3);
    assert_eq!(c.high_water(), FrameIndex(0));
    assert!(c.get(FrameIndex(0)).is_some());
}

#[test]
fn reset_drops_all_computed_frames() {
    let c = cache();
    c.commit(FrameIndex(1), hm(1.0)).unwrap();
    let held = c.get(FrameIndex(1)).unwrap();
    assert_eq!(c.reset(), 1);
    assert_eq!(c.len(), 1);
    // Snapshots handed out before the reset stay valid.
    assert_eq!(held.at(0, 0), 1.0);
}
