use super::*;

fn fix(time: f64, lat: f64, lon: f64) -> RawFix {
    RawFix {
        time,
        lat,
        lon,
        elevation: 100.0,
        speed: None,
        heart: None,
    }
}

#[test]
fn empty_track_is_rejected() {
    assert!(Track::new(vec![]).is_err());
}

#[test]
fn sort_is_stable_for_equal_timestamps() {
    let p = |time: f64, lat: f64| TrackPoint {
        time,
        lat,
        lon: 15.0,
        elevation: 0.0,
        bearing: 0.0,
        speed: 0.0,
        heart: None,
    };
    let t = Track::new(vec![p(5.0, 1.0), p(1.0, 2.0), p(5.0, 3.0)]).unwrap();
    let lats: Vec<f64> = t.points().iter().map(|p| p.lat).collect();
    assert_eq!(lats, vec![2.0, 1.0, 3.0]);
}

#[test]
fn derived_bearing_and_speed() {
    let t = Track::from_fixes(vec![fix(0.0, 46.0, 15.0), fix(10.0, 46.001, 15.0)]).unwrap();
    let pts = t.points();
    assert!(pts[0].bearing.abs() < 1e-6);
    assert!(pts[1].bearing.abs() < 1e-6);
    assert_eq!(pts[0].speed, 0.0);
    assert!((pts[1].speed - 11.119).abs() < 0.01);
}

#[test]
fn recorded_speed_is_kept() {
    let mut b = fix(10.0, 46.001, 15.0);
    b.speed = Some(3.5);
    let t = Track::from_fixes(vec![fix(0.0, 46.0, 15.0), b]).unwrap();
    assert_eq!(t.points()[1].speed, 3.5);
}

#[test]
fn series_reads_missing_heart_as_zero() {
    let mut a = fix(0.0, 46.0, 15.0);
    a.heart = Some(120.0);
    let t = Track::from_fixes(vec![a, fix(1.0, 46.0, 15.0)]).unwrap();
    assert_eq!(t.series(TrackField::Heart), vec![120.0, 0.0]);
    assert_eq!(t.series(TrackField::Elevation), vec![100.0, 100.0]);
}

#[test]
fn field_names_parse_back() {
    for f in [
        TrackField::Lat,
        TrackField::Lon,
        TrackField::Bearing,
        TrackField::Elevation,
        TrackField::Speed,
        TrackField::Heart,
    ] {
        assert_eq!(TrackField::parse(f.name()), Some(f));
    }
    assert_eq!(TrackField::parse("altitude"), None);
}
