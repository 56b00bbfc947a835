use super::*;
use crate::track::point::TrackPoint;
use std::sync::atomic::{AtomicUsize, Ordering};

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "gpsoverlay_map_{name}_{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn north_track() -> Arc<Track> {
    let pt = |time: f64, lat: f64| TrackPoint {
        time,
        lat,
        lon: 15.0,
        elevation: 0.0,
        bearing: 0.0,
        speed: 1.0,
        heart: None,
    };
    Arc::new(Track::new(vec![pt(0.0, 45.999), pt(10.0, 46.0), pt(20.0, 46.001)]).unwrap())
}

fn req(lat: f64) -> TileRequest {
    TileRequest {
        lat,
        lon: 15.0,
        bearing: Some(0.0),
        angle_offset: 0.0,
        zoom: 16.0,
        width: 64,
        height: 64,
    }
}

/// Solid tiles; counts how many were rendered.
struct Counting(Arc<AtomicUsize>);

impl MapTileSource for Counting {
    fn render_tile(&mut self, req: &TileRequest) -> OverlayResult<FrameRGBA> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(FrameRGBA::solid(req.width, req.height, [10, 20, 30, 255]))
    }

    fn params(&self) -> serde_json::Value {
        serde_json::json!({"source": "counting"})
    }
}

#[test]
fn tile_names_round_to_five_decimals() {
    assert_eq!(MapCache::tile_name(46.123456, 15.654321, None), "4612346_1565432");
    assert_eq!(
        MapCache::tile_name(46.123456, 15.654321, Some((250, 200))),
        "4612346_1565432_250_200"
    );
}

#[test]
fn track_plot_draws_through_the_center() {
    let mut src = TrackPlotSource::new(north_track());
    let tile = src.render_tile(&req(46.0)).unwrap();
    assert_eq!((tile.width, tile.height), (64, 64));
    // A north-south line through the center, heading up.
    assert!(tile.pixel(32, 10).unwrap()[3] > 0);
    assert!(tile.pixel(32, 54).unwrap()[3] > 0);
    assert_eq!(tile.pixel(2, 2).unwrap(), [0, 0, 0, 0]);
}

#[test]
fn bearing_rotates_the_plot() {
    let mut src = TrackPlotSource::new(north_track());
    let mut r = req(46.0);
    r.bearing = Some(90.0);
    let tile = src.render_tile(&r).unwrap();
    // Heading east up: the northward track now runs left-right.
    assert!(tile.pixel(10, 32).unwrap()[3] > 0);
    assert_eq!(tile.pixel(32, 10).unwrap()[3], 0);
}

#[test]
fn marker_is_green_at_the_center() {
    let tile = FrameRGBA::transparent(40, 40);
    let out = with_location_marker()(&OverlayData::Image(tile))
        .unwrap()
        .unwrap();
    assert_eq!(out.pixel(20, 20).unwrap(), [0, 255, 0, 255]);
    assert_eq!(out.pixel(0, 0).unwrap(), [0, 0, 0, 0]);
    assert!(
        with_location_marker()(&OverlayData::Value(1.0))
            .unwrap()
            .is_none()
    );
}

#[test]
fn cache_rejects_different_parameters() {
    let dir = temp_dir("mismatch");
    let a = serde_json::json!({"map_zoom": 16.0});
    let b = serde_json::json!({"map_zoom": 17.0});
    MapCache::open(&dir, &a).unwrap();
    MapCache::open(&dir, &a).unwrap();
    let err = MapCache::open(&dir, &b).unwrap_err();
    assert!(matches!(err, OverlayError::CacheConsistency(_)));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn renderer_reuses_cached_tiles() {
    let dir = temp_dir("reuse");
    let count = Arc::new(AtomicUsize::new(0));
    let mut map = MapRenderer::new(
        Box::new(Counting(count.clone())),
        (64, 64),
        16.0,
        Some(dir.clone()),
        false,
    )
    .unwrap();
    assert_eq!(map.size(), (64, 64));

    let args = Args::new()
        .with("lat", crate::overlay::args::ArgValue::Number(46.0))
        .with("lon", crate::overlay::args::ArgValue::Number(15.0));
    let first = map.render(&args).unwrap().unwrap();
    let second = map.render(&args).unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(dir.join("4600000_1500000_64_64.png").is_file());
    assert!(dir.join(MapCache::METADATA_FILE).is_file());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn break_sizes_override_the_tile_size() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut map = MapRenderer::new(Box::new(Counting(count)), (64, 64), 16.0, None, false).unwrap();
    let args = Args::new()
        .with("lat", crate::overlay::args::ArgValue::Number(46.0))
        .with("lon", crate::overlay::args::ArgValue::Number(15.0))
        .with("width", crate::overlay::args::ArgValue::Number(120.4))
        .with("height", crate::overlay::args::ArgValue::Number(80.0));
    let tile = map.render(&args).unwrap().unwrap();
    assert_eq!((tile.width, tile.height), (120, 80));
}

#[test]
fn precompute_renders_each_tile_once() {
    let dir = temp_dir("precompute");
    let cache = MapCache::open(&dir, &serde_json::json!({})).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    // Two requests round to the same tile.
    let requests = [req(46.0), req(46.000001), req(46.001)];

    let stats = precompute_map_tiles(&requests, &cache, Some(2), || {
        Box::new(Counting(count.clone())) as Box<dyn MapTileSource>
    })
    .unwrap();
    assert_eq!(stats.requested, 3);
    assert_eq!(stats.unique, 2);
    assert_eq!(stats.rendered, 2);
    assert_eq!(count.load(Ordering::SeqCst), 2);

    let again = precompute_map_tiles(&requests, &cache, Some(1), || {
        Box::new(Counting(count.clone())) as Box<dyn MapTileSource>
    })
    .unwrap();
    assert_eq!(again.already_cached, 2);
    assert_eq!(count.load(Ordering::SeqCst), 2);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn zero_threads_is_rejected() {
    let dir = temp_dir("threads");
    let cache = MapCache::open(&dir, &serde_json::json!({})).unwrap();
    let err = precompute_map_tiles(&[], &cache, Some(0), || {
        Box::new(TrackPlotSource::new(north_track())) as Box<dyn MapTileSource>
    })
    .unwrap_err();
    assert!(matches!(err, OverlayError::Validation(_)));
    let _ = std::fs::remove_dir_all(&dir);
}
