use super::*;
use crate::track::point::TrackPoint;

fn linear_track() -> Track {
    // One point every 10 s moving north by 1e-4 degrees per second.
    let pts = (0..=10)
        .map(|i| {
            let time = f64::from(i) * 10.0;
            TrackPoint {
                time,
                lat: 46.0 + time * 1e-4,
                lon: 15.0,
                elevation: 100.0,
                bearing: 0.0,
                speed: 11.0,
                heart: None,
            }
        })
        .collect();
    Track::new(pts).unwrap()
}

#[test]
fn candidates_start_at_prior_and_alternate() {
    let first: Vec<f64> = OffsetCandidates::new(5.0, 50).take(5).collect();
    assert_eq!(first, vec![5.0, 6.0, 4.0, 7.0, 3.0]);
}

#[test]
fn candidates_stop_at_max_diff() {
    let all: Vec<f64> = OffsetCandidates::new(0.0, 2).collect();
    assert_eq!(all, vec![0.0, 1.0, -1.0, 2.0, -2.0]);
    assert_eq!(OffsetCandidates::new(0.0, 2).len(), 5);
    assert_eq!(OffsetCandidates::new(0.0, 0).collect::<Vec<_>>(), vec![0.0]);
}

#[test]
fn size_hint_tracks_progress() {
    let mut it = OffsetCandidates::new(0.0, 3);
    assert_eq!(it.size_hint(), (7, Some(7)));
    it.next();
    it.next();
    assert_eq!(it.size_hint(), (5, Some(5)));
    it.next();
    assert_eq!(it.size_hint(), (4, Some(4)));
}

#[test]
fn exact_match_at_prior() {
    let t = linear_track();
    // Track at 30 s is 46.003.
    let off = resolve_offset(&t, 30.0, 46.003, 15.0, 0.0, 50).unwrap();
    assert_eq!(off, 0.0);
}

#[test]
fn finds_positive_and_negative_offsets() {
    let t = linear_track();
    // Camera clock runs 7 s ahead: image stamped 57 was taken at track time 50.
    assert_eq!(resolve_offset(&t, 57.0, 46.005, 15.0, 0.0, 50).unwrap(), 7.0);
    // Camera clock runs 4 s behind.
    assert_eq!(resolve_offset(&t, 46.0, 46.005, 15.0, 0.0, 50).unwrap(), -4.0);
}

#[test]
fn search_is_seeded_from_prior() {
    let t = linear_track();
    assert_eq!(resolve_offset(&t, 57.0, 46.005, 15.0, 6.0, 1).unwrap(), 7.0);
}

#[test]
fn exhausted_search_reports_offset_not_found() {
    let t = linear_track();
    let err = resolve_offset(&t, 30.0, 47.0, 15.0, 0.0, 5).unwrap_err();
    assert!(matches!(err, OverlayError::OffsetNotFound(_)));
    assert!(err.is_recoverable());
}

#[test]
fn candidates_outside_the_track_never_match() {
    let t = linear_track();
    // Clamping would match the first point at offset 0; only t=0 itself is a real match.
    let off = resolve_offset(&t, -3.0, 46.0, 15.0, 0.0, 5).unwrap();
    assert_eq!(off, -3.0);
}
