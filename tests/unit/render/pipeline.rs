use super::*;
use std::sync::Arc;

use crate::encode::sink::InMemorySink;
use crate::foundation::core::Canvas;
use crate::images::manifest::ImageRecord;
use crate::images::timeline::ImageTimeline;
use crate::overlay::args::{ArgValue, SizeDim, SizeSpec};
use crate::overlay::registry::{OverlayRegistry, RendererFactory};
use crate::render::driver::{DriverParams, driver_context};
use crate::render::source::SolidColorSource;
use crate::sync::store::{SyncParams, TrackDataStore};
use crate::track::point::{Track, TrackPoint};

fn point(time: f64, lat: f64) -> TrackPoint {
    TrackPoint {
        time,
        lat,
        lon: 15.0,
        elevation: 100.0,
        bearing: 0.0,
        speed: 5.0,
        heart: None,
    }
}

/// Two images 100 s apart on a track moving north; long enough for a break.
fn driver() -> FrameDriver {
    let track = Arc::new(Track::new(vec![point(0.0, 46.0), point(200.0, 46.01)]).unwrap());
    let images = vec![ImageRecord::new("a", 10.0), ImageRecord::new("b", 110.0)];
    let store = TrackDataStore::synchronized(track, &images, SyncParams::default()).unwrap();
    let timeline = ImageTimeline::new(&[10.0, 110.0], 1.0, None).unwrap();
    let canvas = Canvas::new(40, 20).unwrap();
    let ready = OverlayRegistry::new(RendererFactory::new())
        .build(&driver_context(canvas, &store))
        .unwrap();
    FrameDriver::new(
        store,
        Some(timeline),
        ready,
        Box::new(SolidColorSource {
            rgba: [0, 0, 0, 255],
        }),
        DriverParams {
            canvas,
            effect_length: 3.0,
            speedup_factor: 1.0,
        },
    )
    .unwrap()
}

#[test]
fn renders_every_frame_of_the_range() {
    let mut driver = driver();
    let fps = Fps::new(2, 1).unwrap();
    let mut sink = InMemorySink::new();
    let range = FrameRange::new(FrameIndex(3), FrameIndex(7)).unwrap();

    let stats = render_range(&mut driver, range, fps, &mut sink).unwrap();
    assert_eq!(stats.frames_rendered, 4);
    assert_eq!(stats.display_seconds, 2.0);
    assert!(sink.finished);
    let indices: Vec<u64> = sink.frames.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![3, 4, 5, 6]);
    assert_eq!((sink.frames[0].1.width, sink.frames[0].1.height), (40, 20));
}

#[test]
fn empty_range_is_rejected() {
    let mut driver = driver();
    let fps = Fps::new(25, 1).unwrap();
    let mut sink = InMemorySink::new();
    let range = FrameRange::new(FrameIndex(2), FrameIndex(2)).unwrap();
    assert!(render_range(&mut driver, range, fps, &mut sink).is_err());
    assert!(sink.frames.is_empty());
}

#[test]
fn full_range_covers_the_timeline() {
    let driver = driver();
    let range = full_range(&driver, Fps::new(25, 1).unwrap());
    assert_eq!(range.start, FrameIndex(0));
    assert_eq!(range.end, FrameIndex(200 * 25));
    assert_eq!(frame_time(Fps::new(25, 1).unwrap(), FrameIndex(50)), 2.0);
}

#[test]
fn map_plan_follows_position_and_break_size() {
    let driver = driver();
    let fps = Fps::new(1, 1).unwrap();
    let map = MapOverlay {
        size: SizeSpec::px(10, 10),
        ..MapOverlay::default()
    };
    let range = FrameRange::new(FrameIndex(0), FrameIndex(100)).unwrap();
    let plan = plan_map_tiles(&driver, range, fps, &map).unwrap();
    assert_eq!(plan.len(), 100);

    // Frame 0 opens the break at the normal size; frame 50 is mid-break, full canvas.
    assert_eq!((plan[0].width, plan[0].height), (10, 10));
    assert_eq!((plan[50].width, plan[50].height), (40, 20));
    assert!(plan[50].lat > plan[0].lat);
    assert_eq!(plan[0].bearing, Some(0.0));
    assert_eq!(plan[0].angle_offset, map.angle_offset);

    let fixed = MapOverlay {
        break_aware: false,
        ..map
    };
    let plan = plan_map_tiles(&driver, range, fps, &fixed).unwrap();
    assert!(plan.iter().all(|r| (r.width, r.height) == (10, 10)));

    let strip = MapOverlay {
        size: SizeSpec([SizeDim::Name("W".into()), SizeDim::Px(5)]),
        ..fixed
    };
    let plan = plan_map_tiles(&driver, range, fps, &strip).unwrap();
    assert!(plan.iter().all(|r| (r.width, r.height) == (40, 5)));
}

#[test]
fn driver_context_is_usable_for_chart_setup() {
    let driver = driver();
    let ctx = driver_context(driver.canvas(), driver.store());
    assert!(matches!(ctx.lookup("track.lat"), Some(ArgValue::Series(s)) if s.len() == 2));
}
