use super::*;
use crate::track::point::TrackPoint;

fn point(time: f64, lat: f64, lon: f64, elevation: f64) -> TrackPoint {
    TrackPoint {
        time,
        lat,
        lon,
        elevation,
        bearing: 45.0,
        speed: 20.0,
        heart: None,
    }
}

fn minute_track() -> Arc<Track> {
    Arc::new(
        Track::new(vec![
            point(0.0, 46.0, 15.0, 100.0),
            point(60.0, 46.01, 15.01, 120.0),
        ])
        .unwrap(),
    )
}

#[test]
fn end_to_end_offset_and_elevation() {
    let images = vec![ImageRecord::new("a.jpg", 30.0).with_gps(46.005, 15.005)];
    let store =
        TrackDataStore::synchronized(minute_track(), &images, SyncParams::default()).unwrap();

    let rec = &store.records()[0];
    assert_eq!(rec.offset, 0.0);
    assert!(rec.matched);
    assert_eq!(rec.elevation, 110.0);

    let (snap, index) = store.snapshot(Some(0), 0.0);
    assert_eq!(snap.elevation, 110.0);
    assert_eq!(snap.field(TrackField::Elevation), Some(110.0));
    assert_eq!(snap.image_id.as_deref(), Some("a.jpg"));
    assert_eq!(index, 0);
}

#[test]
fn offset_is_applied_once() {
    // Camera clock 5 s ahead of the track.
    let images = vec![ImageRecord::new("a.jpg", 35.0).with_gps(46.005, 15.005)];
    let store =
        TrackDataStore::synchronized(minute_track(), &images, SyncParams::default()).unwrap();
    assert_eq!(store.records()[0].offset, 5.0);

    let (snap, _) = store.snapshot(Some(0), 0.0);
    assert_eq!(snap.time, 30.0);
    assert_eq!(snap.offset, 5.0);
    assert_eq!(snap.elevation, 110.0);
}

#[test]
fn unmatched_and_gps_less_images_inherit_offsets() {
    let images = vec![
        ImageRecord::new("far.jpg", 10.0).with_gps(10.0, 10.0),
        ImageRecord::new("plain.jpg", 20.0),
    ];
    let params = SyncParams {
        time_offset: 3.0,
        max_diff: 4,
        ..SyncParams::default()
    };
    let store = TrackDataStore::synchronized(minute_track(), &images, params).unwrap();
    assert_eq!(store.records()[0].offset, 3.0);
    assert!(!store.records()[0].matched);
    assert_eq!(store.records()[1].offset, 3.0);
    assert!(!store.records()[1].matched);
}

#[test]
fn slope_starts_at_zero_and_follows_climb() {
    let images = vec![ImageRecord::new("a", 0.0), ImageRecord::new("b", 60.0)];
    let store =
        TrackDataStore::synchronized(minute_track(), &images, SyncParams::default()).unwrap();
    assert_eq!(store.records()[0].slope, 0.0);
    assert!(store.records()[1].slope > 0.0);
    assert_eq!(store.image_seconds(1), Some(60.0));
}

#[test]
fn sub_second_times_are_estimated() {
    let images = vec![ImageRecord::new("a", 30.0), ImageRecord::new("b", 30.0)];
    let params = SyncParams {
        interval: 0.5,
        ..SyncParams::default()
    };
    let store = TrackDataStore::synchronized(minute_track(), &images, params).unwrap();
    assert_eq!(store.records()[0].capture_time, 30.25);
    assert_eq!(store.records()[1].capture_time, 30.75);
    assert_eq!(store.origin(), 30.25);
}

#[test]
fn synchronized_mode_needs_images() {
    assert!(TrackDataStore::synchronized(minute_track(), &[], SyncParams::default()).is_err());
}

#[test]
fn track_only_uses_global_offset_and_clamps() {
    let store = TrackDataStore::track_only(minute_track(), None, 2.0);
    assert_eq!(store.origin(), 2.0);

    let (snap, index) = store.snapshot(None, 30.0);
    assert_eq!(snap.time, 30.0);
    assert_eq!(snap.elevation, 110.0);
    assert_eq!(snap.slope, None);
    assert_eq!(index, 0);

    let (late, index) = store.snapshot(None, 1000.0);
    assert_eq!(late.elevation, 120.0);
    assert_eq!(index, 1);

    let (early, index) = store.snapshot(None, -50.0);
    assert_eq!(early.elevation, 100.0);
    assert_eq!(index, 0);
}

#[test]
fn break_condition_is_strict() {
    // 2 * 3 + 2 = 8 seconds
    assert!(!break_condition(8.0, 11.0, 3.0, 1.0));
    assert!(break_condition(8.0 + 1e-9, 10.0001, 3.0, 1.0));
    assert!(!break_condition(20.0, 10.0, 3.0, 1.0));
    // Speedup compresses the gap.
    assert!(!break_condition(16.0, 11.0, 3.0, 2.0));
    assert!(break_condition(16.5, 11.0, 3.0, 2.0));
}

#[test]
fn stationary_gaps_are_not_breaks() {
    let moving = TrackDataStore::track_only(minute_track(), Some(0.0), 0.0);
    assert!(moving.is_break(None, 0.0, 60.0, 3.0, 1.0));
    assert!(!moving.is_break(None, 0.0, 8.0, 3.0, 1.0));

    let still = Arc::new(
        Track::new(vec![
            point(0.0, 46.0, 15.0, 100.0),
            point(60.0, 46.0, 15.0, 100.0),
        ])
        .unwrap(),
    );
    let still = TrackDataStore::track_only(still, Some(0.0), 0.0);
    assert!(!still.is_break(None, 0.0, 60.0, 3.0, 1.0));
}

#[test]
fn series_reads_track_points() {
    let store = TrackDataStore::track_only(minute_track(), None, 0.0);
    assert_eq!(store.series(TrackField::Elevation), vec![100.0, 120.0]);
}
