use super::*;
use crate::overlay::args::ArgValue;

fn chart() -> ChartRenderer {
    ChartRenderer::new(
        vec![100.0, 110.0, 130.0, 120.0, 100.0],
        (100, 50),
        parse_hex_color(DEFAULT_AREA_COLOR).unwrap(),
        parse_hex_color(DEFAULT_LINE_COLOR).unwrap(),
    )
    .unwrap()
}

#[test]
fn hex_colors() {
    assert_eq!(parse_hex_color("#163c6277").unwrap(), [0x16, 0x3c, 0x62, 0x77]);
    assert_eq!(parse_hex_color("#ff0000").unwrap(), [255, 0, 0, 255]);
    assert_eq!(parse_hex_color("#0f0").unwrap(), [0, 255, 0, 255]);
    for bad in ["red", "#12", "#gg0000", "#1234567"] {
        assert!(
            matches!(parse_hex_color(bad), Err(OverlayError::Configuration(_))),
            "{bad}"
        );
    }
}

#[test]
fn cursor_follows_the_index() {
    let mut c = chart();
    let at = |c: &mut ChartRenderer, i: f64| {
        c.render(&Args::new().with("index", ArgValue::Number(i)))
            .unwrap()
            .unwrap()
    };
    let first = at(&mut c, 0.0);
    let peak = at(&mut c, 2.0);
    assert_eq!((first.width, first.height), (100, 50));
    assert_ne!(first, peak);

    // Peak is at the top center.
    let (x, y) = c.point(2, 100, 50);
    assert_eq!((x, y), (50.0, 6.0));
    assert_eq!(peak.pixel(50, 7).unwrap()[3], 255);
}

#[test]
fn index_is_clamped_to_the_series() {
    let mut c = chart();
    let last = c
        .render(&Args::new().with("index", ArgValue::Number(4.0)))
        .unwrap();
    let past = c
        .render(&Args::new().with("index", ArgValue::Number(99.0)))
        .unwrap();
    assert_eq!(last, past);
}

#[test]
fn break_sizes_redraw_the_background() {
    let mut c = chart();
    let big = c
        .render(
            &Args::new()
                .with("index", ArgValue::Number(1.0))
                .with("width", ArgValue::Number(300.0))
                .with("height", ArgValue::Number(120.0)),
        )
        .unwrap()
        .unwrap();
    assert_eq!((big.width, big.height), (300, 120));
}

#[test]
fn ctor_validates_arguments() {
    let ctor = chart_ctor();
    let ok = Args::new()
        .with("series", ArgValue::Series(vec![1.0, 2.0]))
        .with("size", ArgValue::Series(vec![80.0, 40.0]));
    assert_eq!(ctor(&ok).unwrap().size(), (80, 40));

    let empty = Args::new()
        .with("series", ArgValue::Series(vec![]))
        .with("size", ArgValue::Series(vec![80.0, 40.0]));
    assert!(matches!(ctor(&empty), Err(OverlayError::Configuration(_))));

    let no_size = Args::new().with("series", ArgValue::Series(vec![1.0]));
    assert!(matches!(ctor(&no_size), Err(OverlayError::Configuration(_))));
}

#[test]
fn series_range_is_fixed_at_construction() {
    let c = chart();
    assert_eq!(c.range, (100.0, 130.0));
    // Lowest value sits on the bottom inset, highest on the top inset.
    assert_eq!(c.point(0, 100, 50).1, 50.0 - INSET);
    assert_eq!(c.point(2, 100, 50), (50.0, INSET));

    let flat = ChartRenderer::new(vec![7.0, 7.0], (20, 20), [0; 4], [0; 4]).unwrap();
    assert_eq!(flat.point(1, 20, 20).1, 10.0);
}
