use super::*;
use crate::foundation::core::Point;
use crate::overlay::args::{ArgSource, ArgValue, SizeToken};
use crate::overlay::registry::DataSource;
use crate::render::frame::FrameRGBA;

/// One pixel per character.
struct BlockText;

impl TextRasterizer for BlockText {
    fn rasterize(
        &self,
        text: &str,
        _style: &crate::overlay::text::TextStyle,
    ) -> OverlayResult<Option<FrameRGBA>> {
        Ok(Some(FrameRGBA::solid(
            text.chars().count() as u32,
            10,
            [255, 255, 255, 255],
        )))
    }
}

#[test]
fn minimal_project_uses_defaults() {
    let cfg = ProjectConfig::from_json_str(r#"{"track": "ride.gpx"}"#).unwrap();
    assert_eq!(cfg.canvas, Canvas::new(1920, 1080).unwrap());
    assert_eq!(cfg.fps, Fps::new(30, 1).unwrap());
    assert_eq!(cfg.timing, Timing::default());
    assert_eq!(cfg.timing.effect_length, 3.0);
    assert_eq!(cfg.timing.max_diff, 50);
    assert!(cfg.overlays.is_none());
    assert_eq!(cfg.map_overlay(), Some(MapOverlay::default()));
    cfg.validate().unwrap();
}

#[test]
fn overlay_kinds_parse() {
    let cfg = ProjectConfig::from_json_str(
        r#"{
            "track": "ride.gpx",
            "timing": {"speedup_factor": 4, "max_image_delay": 30},
            "style": {"padding": [10, 20]},
            "overlays": [
                {"kind": "text", "field": "speed",
                 "format": {"fixed": {"decimals": 1, "unit": "m/s"}}},
                {"kind": "map", "zoom": 15, "size": [300, 200], "cache_dir": "tiles"},
                {"kind": "chart", "field": "elevation", "position": {"anchor": "top_left"}},
                {"kind": "gauge", "field": "speed", "min_value": 0, "max_value": 60,
                 "position": {"anchor": "fixed", "x": 5, "y": 6}}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.timing.speedup_factor, 4.0);
    assert_eq!(cfg.timing.max_image_delay, Some(30.0));
    assert_eq!(cfg.style.padding.left, 20.0);

    let overlays = cfg.overlays.as_ref().unwrap();
    assert!(matches!(
        &overlays[0],
        OverlayConfig::Text { field, format: Some(ValueFormat::Fixed { decimals: 1, .. }), .. }
            if field == "speed"
    ));
    let map = cfg.map_overlay().unwrap();
    assert_eq!(map.zoom, 15.0);
    assert_eq!(map.size, SizeSpec::px(300, 200));
    assert!(map.break_aware);
    assert!(matches!(
        &overlays[2],
        OverlayConfig::Chart { size, position: Some(Anchor::TopLeft), .. }
            if *size == DEFAULT_CHART_SIZE
    ));
    assert!(matches!(
        &overlays[3],
        OverlayConfig::Gauge { gauge, position: Some(Anchor::Fixed { x, y }), .. }
            if gauge.max_value == 60.0 && *x == 5.0 && *y == 6.0
    ));
}

#[test]
fn relative_paths_resolve_against_the_project_dir() {
    let mut cfg = ProjectConfig::from_json_str(
        r#"{"track": "ride.gpx", "images": "/abs/images.json",
            "overlays": [{"kind": "map", "cache_dir": "tiles"}]}"#,
    )
    .unwrap();
    cfg.resolve_paths(Path::new("/projects/trip"));
    assert_eq!(cfg.track, PathBuf::from("/projects/trip/ride.gpx"));
    assert_eq!(cfg.images, Some(PathBuf::from("/abs/images.json")));
    assert_eq!(
        cfg.map_overlay().unwrap().cache_dir,
        Some(PathBuf::from("/projects/trip/tiles"))
    );
}

#[test]
fn validation_rejects_bad_timing_and_inputs() {
    let base = || ProjectConfig::from_json_str(r#"{"track": "ride.gpx"}"#).unwrap();

    let mut cfg = base();
    cfg.timing.speedup_factor = 0.0;
    assert!(matches!(cfg.validate(), Err(OverlayError::Validation(_))));

    let mut cfg = base();
    cfg.timing.effect_length = -1.0;
    assert!(cfg.validate().is_err());

    let mut cfg = base();
    cfg.fps = Fps { num: 0, den: 1 };
    assert!(cfg.validate().is_err());

    let mut cfg = base();
    cfg.images = Some("a.json".into());
    cfg.image_dir = Some("photos".into());
    assert!(matches!(cfg.validate(), Err(OverlayError::Configuration(_))));

    let mut cfg = base();
    cfg.start_time = Some("yesterday".into());
    assert!(cfg.validate().is_err());

    let mut cfg = base();
    cfg.overlays = Some(vec![OverlayConfig::Text {
        field: "cadence".into(),
        format: None,
        color: None,
        large: None,
        position: None,
    }]);
    assert!(matches!(cfg.validate(), Err(OverlayError::Configuration(_))));
}

#[test]
fn declared_overlays_keep_the_map_first() {
    let cfg = ProjectConfig::from_json_str(
        r#"{"track": "ride.gpx", "overlays": [
            {"kind": "text", "field": "speed"},
            {"kind": "map"},
            {"kind": "text", "field": "heart", "position": {"anchor": "fixed", "x": 1, "y": 2}}
        ]}"#,
    )
    .unwrap();
    let reg = cfg
        .overlay_registry(Arc::new(BlockText), RendererFactory::new())
        .unwrap();
    assert_eq!(reg.keys(), vec!["map", "speed", "heart"]);

    let heart = reg.iter().last().unwrap();
    let frame = FrameRGBA::transparent(3, 3);
    assert_eq!(
        (heart.position)(&frame, Canvas::new(100, 100).unwrap()),
        Point::new(1.0, 2.0)
    );
}

#[test]
fn missing_overlays_give_the_stock_set() {
    let cfg = ProjectConfig::from_json_str(r#"{"track": "ride.gpx"}"#).unwrap();
    let reg = cfg
        .overlay_registry(Arc::new(BlockText), RendererFactory::new())
        .unwrap();
    assert_eq!(
        reg.keys(),
        vec!["map", "datetime", "elevation", "heart", "bearing", "speed"]
    );
}

#[test]
fn sync_params_follow_timing() {
    let mut cfg = ProjectConfig::from_json_str(r#"{"track": "ride.gpx"}"#).unwrap();
    cfg.timing.time_offset = 7.0;
    cfg.timing.interval = 0.5;
    cfg.timing.utc_offset_hours = 2.0;
    let p = cfg.sync_params();
    assert_eq!((p.time_offset, p.interval, p.max_diff), (7.0, 0.5, 50));
    assert_eq!(cfg.gpx_options().utc_offset_hours, 2.0);
    assert!(cfg.load_images().unwrap().is_none());
}

#[test]
fn overlay_sizes_may_follow_the_output() {
    let cfg = ProjectConfig::from_json_str(
        r#"{"track": "ride.gpx", "canvas": {"width": 640, "height": 360}, "overlays": [
            {"kind": "chart", "field": "elevation", "size": ["W", 100]},
            {"kind": "map", "size": ["h", "H"]}
        ]}"#,
    )
    .unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.map_overlay().unwrap().size.resolve(cfg.canvas).unwrap(), (360, 360));

    let reg = cfg
        .overlay_registry(Arc::new(BlockText), RendererFactory::new())
        .unwrap();
    let chart = reg.iter().find(|e| e.key == "elevation").unwrap();
    match &chart.data {
        DataSource::Renderer(spec) => assert_eq!(
            spec.constructor.get("size"),
            Some(&ArgSource::literal(ArgValue::Size([
                SizeToken::W,
                SizeToken::Px(100)
            ])))
        ),
        other => panic!("unexpected data {other:?}"),
    }
}

#[test]
fn unknown_size_tokens_are_configuration_errors() {
    let cfg = ProjectConfig::from_json_str(
        r#"{"track": "ride.gpx", "overlays": [
            {"kind": "chart", "field": "elevation", "size": ["x", 100]}
        ]}"#,
    )
    .unwrap();
    assert!(matches!(cfg.validate(), Err(OverlayError::Configuration(_))));
    let err = cfg
        .overlay_registry(Arc::new(BlockText), RendererFactory::new())
        .err()
        .unwrap();
    assert!(matches!(err, OverlayError::Configuration(_)), "{err}");
}
