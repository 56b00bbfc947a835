use super::*;

#[test]
fn zero_interval_passes_times_through() {
    let t = vec![10.0, 12.0, 15.0];
    assert_eq!(estimate_sub_second_times(&t, 0.0).unwrap(), t);
}

#[test]
fn burst_is_placed_mid_window() {
    // Shots every 0.5 s starting at some instant in [100, 100.5].
    let exif = vec![100.0, 100.0, 101.0, 101.0];
    let out = estimate_sub_second_times(&exif, 0.5).unwrap();
    // windows: [100,101], [99.5,100.5], [100,101], [99.5,100.5] -> [100, 100.5] -> s = 100.25
    assert_eq!(out, vec![100.25, 100.75, 101.25, 101.75]);
}

#[test]
fn estimated_times_round_down_to_exif() {
    let exif = vec![0.0, 3.0, 6.0, 9.0, 13.0];
    let out = estimate_sub_second_times(&exif, 3.2).unwrap();
    for (m, t) in exif.iter().zip(&out) {
        assert_eq!(t.floor(), *m);
    }
}

#[test]
fn incompatible_interval_is_rejected() {
    let exif = vec![0.0, 10.0];
    assert!(estimate_sub_second_times(&exif, 1.0).is_err());
}
