use super::*;
use serde_json::json;

fn canvas() -> Canvas {
    Canvas::new(1920, 1080).unwrap()
}

#[test]
fn size_tokens() {
    assert_eq!(SizeToken::parse("W").unwrap(), SizeToken::W);
    assert_eq!(SizeToken::parse("h").unwrap(), SizeToken::H);
    assert_eq!(SizeToken::parse("250").unwrap(), SizeToken::Px(250));
    let err = SizeToken::parse("x").unwrap_err();
    assert!(matches!(err, OverlayError::Configuration(_)));
    assert_eq!(SizeToken::W.resolve(canvas()), 1920);
}

#[test]
fn json_sources() {
    assert_eq!(
        ArgSource::from_json(&json!({"driver": "track.elevation"})).unwrap(),
        ArgSource::DriverState("track.elevation".into())
    );
    assert_eq!(
        ArgSource::from_json(&json!({"telemetry": "speed"})).unwrap(),
        ArgSource::Telemetry(TrackField::Speed)
    );
    assert_eq!(
        ArgSource::from_json(&json!({"index": "bracket"})).unwrap(),
        ArgSource::BracketIndex
    );
    assert_eq!(
        ArgSource::from_json(&json!({"break": "height"})).unwrap(),
        ArgSource::BreakInterpolated(Axis::Height)
    );
    assert_eq!(
        ArgSource::from_json(&json!(["W", 100])).unwrap(),
        ArgSource::Literal(ArgValue::Size([SizeToken::W, SizeToken::Px(100)]))
    );
    assert_eq!(
        ArgSource::from_json(&json!(16)).unwrap(),
        ArgSource::number(16.0)
    );
}

#[test]
fn bad_json_sources_are_configuration_errors() {
    for v in [
        json!(["x", 100]),
        json!({"telemetry": "altitude_gain"}),
        json!({"break": "depth"}),
        json!(null),
    ] {
        assert!(
            matches!(ArgSource::from_json(&v), Err(OverlayError::Configuration(_))),
            "{v}"
        );
    }
}

#[test]
fn driver_context_nested_lookup() {
    let mut ctx = DriverContext::new(canvas());
    let mut track = BTreeMap::new();
    track.insert("elevation".to_owned(), ArgValue::Series(vec![1.0, 2.0]));
    ctx.insert("track", ArgValue::Map(track));

    assert_eq!(
        ctx.lookup("track.elevation"),
        Some(&ArgValue::Series(vec![1.0, 2.0]))
    );
    assert_eq!(ctx.lookup("track.speed"), None);
    assert_eq!(ctx.lookup("width.x"), None);
    assert_eq!(ctx.lookup("width"), Some(&ArgValue::Number(1920.0)));
}

#[test]
fn setup_resolution_substitutes_state_and_sizes() {
    let ctx = DriverContext::new(canvas());
    let v = resolve_setup(
        "size",
        &ArgSource::Literal(ArgValue::Size([SizeToken::W, SizeToken::Px(100)])),
        &ctx,
    )
    .unwrap();
    assert_eq!(v, ArgValue::Size([SizeToken::Px(1920), SizeToken::Px(100)]));

    let err = resolve_setup("gpx", &ArgSource::driver("track_file"), &ctx).unwrap_err();
    assert!(matches!(err, OverlayError::Configuration(_)));

    let err = resolve_setup("i", &ArgSource::BracketIndex, &ctx).unwrap_err();
    assert!(matches!(err, OverlayError::Configuration(_)));
}

#[test]
fn typed_accessors() {
    let args = Args::new()
        .with("zoom", ArgValue::Number(16.0))
        .with("name", ArgValue::Text("x".into()))
        .with("size", ArgValue::Series(vec![250.0, 200.0]));
    assert_eq!(args.number("zoom").unwrap(), 16.0);
    assert_eq!(args.opt_number("missing").unwrap(), None);
    assert_eq!(args.size("size").unwrap(), (250, 200));
    assert!(matches!(
        args.number("name"),
        Err(OverlayError::Configuration(_))
    ));
    assert!(matches!(
        args.number("missing"),
        Err(OverlayError::Configuration(_))
    ));
    assert!(args.bool_or("flag", true).unwrap());
}
