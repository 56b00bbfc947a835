use std::sync::Arc;

use super::*;
use crate::track::point::{Track, TrackPoint};

fn assert_near(p: Point, x: f64, y: f64) {
    assert!((p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9, "{p:?} != ({x}, {y})");
}

#[test]
fn phase_partition_of_an_episode() {
    assert_eq!(classify_phase(0.0, 20.0, 1.0, 3.0), BreakPhase::Start);
    assert_eq!(classify_phase(0.0, 20.0, 10.0, 3.0), BreakPhase::Middle);
    assert_eq!(classify_phase(0.0, 20.0, 18.0, 3.0), BreakPhase::End);
    assert_eq!(classify_phase(0.0, 20.0, 25.0, 3.0), BreakPhase::None);
}

#[test]
fn phase_edges_are_inclusive() {
    assert_eq!(classify_phase(0.0, 20.0, 3.0, 3.0), BreakPhase::Start);
    assert_eq!(classify_phase(0.0, 20.0, 3.5, 3.0), BreakPhase::Middle);
    assert_eq!(classify_phase(0.0, 20.0, 17.0, 3.0), BreakPhase::End);
    assert_eq!(classify_phase(0.0, 20.0, 20.0, 3.0), BreakPhase::None);
    assert_eq!(classify_phase(5.0, 20.0, 4.9, 3.0), BreakPhase::None);
}

#[test]
fn start_zooms_and_slides_to_origin() {
    let tr = BreakState {
        phase: BreakPhase::Start,
        elapsed: 0.0,
        duration: 20.0,
    }
    .transition(3.0);
    assert_eq!(tr.size((250, 250), (1000, 500), 0.0), (250, 250));
    assert_eq!(tr.size((250, 250), (1000, 500), 1.5), (625, 375));
    assert_eq!(tr.size((250, 250), (1000, 500), 3.0), (1000, 500));

    let normal = Point::new(700.0, 150.0);
    assert_near(tr.position(normal, 0.0), 700.0, 150.0);
    assert_near(tr.position(normal, 3.0), 0.0, 0.0);
}

#[test]
fn end_reverses_over_the_last_effect_window() {
    let tr = BreakState {
        phase: BreakPhase::End,
        elapsed: 0.0,
        duration: 20.0,
    }
    .transition(3.0);
    assert_eq!(tr.size((250, 250), (1000, 500), 17.0), (1000, 500));
    assert_eq!(tr.size((250, 250), (1000, 500), 20.0), (250, 250));
    let normal = Point::new(700.0, 150.0);
    assert_near(tr.position(normal, 17.0), 0.0, 0.0);
    assert_near(tr.position(normal, 20.0), 700.0, 150.0);
}

#[test]
fn middle_pins_full_size_at_origin() {
    let tr = BreakState {
        phase: BreakPhase::Middle,
        elapsed: 10.0,
        duration: 20.0,
    }
    .transition(3.0);
    assert_eq!(tr.size((250, 250), (1000, 500), 10.0), (1000, 500));
    assert_eq!(tr.position(Point::new(5.0, 5.0), 10.0), Point::new(0.0, 0.0));
}

#[test]
fn detects_breaks_only_for_long_moving_gaps() {
    let track = Arc::new(
        Track::new(vec![
            TrackPoint {
                time: 0.0,
                lat: 46.0,
                lon: 15.0,
                elevation: 100.0,
                bearing: 0.0,
                speed: 1.0,
                heart: None,
            },
            TrackPoint {
                time: 100.0,
                lat: 46.01,
                lon: 15.0,
                elevation: 100.0,
                bearing: 0.0,
                speed: 1.0,
                heart: None,
            },
        ])
        .unwrap(),
    );
    let store = TrackDataStore::track_only(track, Some(0.0), 0.0);
    // Gaps of 2 s and 60 s at speedup 1.
    let timeline = ImageTimeline::new(&[0.0, 2.0, 62.0], 1.0, None).unwrap();

    assert_eq!(detect_break(&timeline, &store, 0, 1.0, 3.0), BreakState::none());

    let s = detect_break(&timeline, &store, 1, 3.0, 3.0);
    assert_eq!(s.phase, BreakPhase::Start);
    assert_eq!(s.elapsed, 1.0);
    assert_eq!(s.duration, 60.0);
    assert_eq!(detect_break(&timeline, &store, 1, 30.0, 3.0).phase, BreakPhase::Middle);
    assert_eq!(detect_break(&timeline, &store, 1, 60.0, 3.0).phase, BreakPhase::End);

    // Last image never starts a break.
    assert!(!detect_break(&timeline, &store, 2, 63.0, 3.0).is_active());
}
