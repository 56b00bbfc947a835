use super::*;

#[test]
fn fnv_hash_is_incremental() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"gpsoverlay");
    let mut b = Fnv1a64::new_default();
    b.write_bytes(b"gps");
    b.write_bytes(b"overlay");
    assert_eq!(a.finish(), b.finish());
}

#[test]
fn mul_div255_variants_align() {
    for x in [0u16, 1, 127, 255] {
        for y in [0u16, 1, 127, 255] {
            assert_eq!(u16::from(mul_div255_u8(x, y)), mul_div255_u16(x, y));
        }
    }
}

#[test]
fn linear_fn_hits_both_anchors() {
    let f = LinearFn::through((0.0, 3.0), (250.0, 1280.0));
    assert_eq!(f.at(0.0), 250.0);
    assert!((f.at(3.0) - 1280.0).abs() < 1e-9);
    assert!((f.at(1.5) - 765.0).abs() < 1e-9);
}

#[test]
fn linear_fn_with_shifted_window() {
    let f = LinearFn::through((17.0, 20.0), (0.0, 30.0));
    assert!((f.at(17.0)).abs() < 1e-9);
    assert!((f.at(18.0) - 10.0).abs() < 1e-9);
}

#[test]
fn linear_fn_degenerate_interval_is_constant() {
    let f = LinearFn::through((2.0, 2.0), (5.0, 9.0));
    assert_eq!(f.at(-100.0), 9.0);
    assert_eq!(f.at(2.0), 9.0);
}

#[test]
fn round_to_five_places() {
    assert_eq!(round_to(46.005_004_9, 5), 46.005);
    assert_eq!(round_to(15.123_456, 5), 15.12346);
    assert_eq!(lerp(100.0, 110.0, 0.5), 105.0);
}
