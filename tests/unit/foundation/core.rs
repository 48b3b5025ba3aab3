use super::*;

#[test]
fn frame_index_prev_and_next() {
    assert_eq!(FrameIndex(0).prev(), None);
    assert_eq!(FrameIndex(5).prev(), Some(FrameIndex(4)));
    assert_eq!(FrameIndex(5).next(), FrameIndex(6));
    assert_eq!(FrameIndex(u32::MAX).next(), FrameIndex(u32::MAX));
}

#[test]
fn frame_range_rejects_frame_zero_and_inverted_bounds() {
    assert!(FrameRange::frames(0, 3).is_err());
    assert!(FrameRange::frames(5, 4).is_err());
    let r = FrameRange::frames(3, 3).unwrap();
    assert_eq!(r.len_frames(), 1);
}

#[test]
fn frame_range_contains_is_inclusive() {
    let r = FrameRange::frames(2, 4).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
    assert_eq!(r.len_frames(), 3);
    assert_eq!(
        r.iter().map(|f| f.0).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
}

#[test]
fn frame_range_check_within_timeline() {
    let r = FrameRange::frames(1, 10).unwrap();
    assert!(r.check_within(10).is_ok());
    let err = r.check_within(9).unwrap_err();
    assert!(err.to_string().contains("exceeds totalFrames 9"));
}

#[test]
fn frame_range_overlap() {
    let a = FrameRange::frames(1, 5).unwrap();
    let b = FrameRange::frames(4, 8).unwrap();
    let c = FrameRange::frames(6, 8).unwrap();
    assert_eq!(a.overlap(b), Some(FrameRange::frames(4, 5).unwrap()));
    assert_eq!(a.overlap(c), None);
    assert_eq!(b.overlap(c), Some(c));
}

#[test]
fn frame_range_display() {
    assert_eq!(FrameRange::frames(6, 10).unwrap().to_string(), "6-10");
    assert_eq!(FrameRange::frames(7, 7).unwrap().to_string(), "7");
}

#[test]
fn dims_must_be_positive() {
    assert!(Dims::new(0, 4).is_err());
    assert!(Dims::new(4, 0).is_err());
    let d = Dims::new(3, 4).unwrap();
    assert_eq!(d.cells(), 12);
    assert_eq!(d.to_string(), "3x4");
}
