use super::*;

#[test]
fn value_formats() {
    assert_eq!(format_speed(0.2), "STOPPED");
    assert_eq!(format_speed(15.6), "56.16 km/h");
    assert_eq!(format_elevation(42.24), "42.24 m");
    assert_eq!(format_heart(133.7), "133 BPM");
    assert_eq!(format_bearing(260.0), "260.0 °");
    assert_eq!(format_slope(-4.3), "-4 %");
}

#[test]
fn datetime_uses_track_clock() {
    // 2021-06-01 12:30:05
    assert_eq!(format_datetime(1_622_550_605.4), "01.06.2021 12:30:05");
}

#[test]
fn markup_escapes_text_and_sets_stroke() {
    let mut style = TextStyle::new("Sans", 30.0, "white");
    style.stroke_color = Some("black".into());
    let s = SvgTextRasterizer::markup("a<b", &style, 10, 42);
    assert!(s.contains("a&lt;b"));
    assert!(s.contains(r#"stroke="black""#));
    assert!(s.contains(r#"font-weight="bold""#));
    assert!(s.contains(r#"height="42""#));
}

#[test]
fn blank_text_renders_nothing() {
    let r = SvgTextRasterizer::new(SvgContext::empty());
    let style = TextStyle::new("Sans", 30.0, "white");
    assert_eq!(r.rasterize("  ", &style).unwrap(), None);
    assert!(r.rasterize("12 km/h", &style).is_ok());
}
