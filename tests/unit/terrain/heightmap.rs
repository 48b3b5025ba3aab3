use super::*;

fn dims(w: u32, h: u32) -> Dims {
    Dims::new(w, h).unwrap()
}

#[test]
fn from_vec_checks_length() {
    assert!(Heightmap::from_vec(dims(2, 2), vec![0.0; 3]).is_err());
    let hm = Heightmap::from_vec(dims(2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(hm.at(1, 0), 2.0);
    assert_eq!(hm.at(0, 1), 3.0);
}

#[test]
fn stats_reports_min_max_mean() {
    let hm = Heightmap::from_vec(dims(2, 2), vec![1.0, 2.0, 3.0, 6.0]).unwrap();
    let s = hm.stats();
    assert_eq!(s.min, 1.0);
    assert_eq!(s.max, 6.0);
    assert_eq!(s.mean, 3.0);
}

#[test]
fn first_non_finite_finds_nan_and_inf() {
    let mut hm = Heightmap::filled(dims(3, 1), 1.0);
    assert_eq!(hm.first_non_finite(), None);
    hm.set(2, 0, f32::INFINITY);
    assert_eq!(hm.first_non_finite(), Some((2, f32::INFINITY)));
    hm.set(1, 0, f32::NAN);
    assert_eq!(hm.first_non_finite().map(|(i, _)| i), Some(1));
}

#[test]
fn fingerprint_tracks_content_and_shape() {
    let a = Heightmap::filled(dims(4, 2), 1.5);
    let b = Heightmap::filled(dims(4, 2), 1.5);
    let c = Heightmap::filled(dims(2, 4), 1.5);
    let mut d = b.clone();
    d.set(3, 1, 1.75);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
    assert_ne!(a.fingerprint(), d.fingerprint());
    assert_eq!(a.fingerprint().to_string().len(), 32);
}

#[test]
fn to_le_bytes_is_row_major() {
    let hm = Heightmap::from_vec(dims(2, 1), vec![1.0, -2.0]).unwrap();
    let bytes = hm.to_le_bytes();
    assert_eq!(bytes.len(), 8);
    assert_eq!(&bytes[4..], &(-2.0f32).to_le_bytes());
}

#[test]
fn interpolation_and_gradient_on_a_ramp() {
    // z = x
    let mut hm = Heightmap::new(dims(4, 4));
    for y in 0..4 {
        for x in 0..4 {
            hm.set(x, y, x as f32);
        }
    }
    assert!((hm.height_interpolated(1.5, 2.25) - 1.5).abs() < 1e-6);
    let (gx, gy) = hm.gradient(1.5, 1.5).unwrap();
    assert!((gx - 1.0).abs() < 1e-6);
    assert!(gy.abs() < 1e-6);
    assert_eq!(hm.height_interpolated(-1.0, 0.0), 0.0);
    assert_eq!(hm.gradient(3.5, 0.0), None);
}
