use std::sync::Arc;

use resvg::tiny_skia;

use crate::assets::svg::{frame_to_pixmap, pixmap_to_frame};
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::overlay::args::Args;
use crate::overlay::registry::{RendererCtor, SubRenderer};
use crate::render::frame::FrameRGBA;

/// Fill under the series line.
pub const DEFAULT_AREA_COLOR: &str = "#163c6277";
/// Series line and cursor color.
pub const DEFAULT_LINE_COLOR: &str = "#3ca5c5AA";
const MARKER_RADIUS: f32 = 5.0;
const INSET: f32 = 6.0;

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into straight RGBA.
pub fn parse_hex_color(s: &str) -> OverlayResult<[u8; 4]> {
    let bad = || OverlayError::configuration(format!("invalid color '{s}'"));
    let hex = s.strip_prefix('#').ok_or_else(bad)?;
    let byte = |i: usize| {
        u8::from_str_radix(hex.get(i..i + 2).ok_or_else(bad)?, 16).map_err(|_| bad())
    };
    match hex.len() {
        3 => {
            let mut out = [255u8; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16).ok_or_else(bad)? as u8;
                out[i] = v * 17;
            }
            Ok(out)
        }
        6 => Ok([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Ok([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => Err(bad()),
    }
}

/// Area chart of one telemetry series with a cursor at the current bracket index.
///
/// The filled area and line are drawn once per output size; only the cursor is drawn per call.
pub struct ChartRenderer {
    series: Vec<f64>,
    /// Series minimum and maximum.
    range: (f64, f64),
    width: u32,
    height: u32,
    area: [u8; 4],
    line: [u8; 4],
    background: Option<FrameRGBA>,
}

impl ChartRenderer {
    /// Renderer for `series` at `size` pixels. Fails on an empty series or zero size.
    pub fn new(
        series: Vec<f64>,
        size: (u32, u32),
        area: [u8; 4],
        line: [u8; 4],
    ) -> OverlayResult<Self> {
        if series.is_empty() {
            return Err(OverlayError::configuration("chart series is empty"));
        }
        if size.0 == 0 || size.1 == 0 {
            return Err(OverlayError::configuration("chart size must be > 0"));
        }
        let range = series
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        Ok(Self {
            series,
            range,
            width: size.0,
            height: size.1,
            area,
            line,
            background: None,
        })
    }

    fn point(&self, i: usize, w: u32, h: u32) -> (f32, f32) {
        let (lo, hi) = self.range;
        let span_x = (w as f32 - 2.0 * INSET).max(1.0);
        let span_y = (h as f32 - 2.0 * INSET).max(1.0);
        let x = if self.series.len() == 1 {
            w as f32 / 2.0
        } else {
            INSET + span_x * (i as f32) / ((self.series.len() - 1) as f32)
        };
        let frac = if hi > lo {
            ((self.series[i] - lo) / (hi - lo)) as f32
        } else {
            0.5
        };
        (x, INSET + span_y * (1.0 - frac))
    }

    fn draw_background(&self, w: u32, h: u32) -> OverlayResult<FrameRGBA> {
        let mut pixmap = tiny_skia::Pixmap::new(w, h)
            .ok_or_else(|| OverlayError::render(format!("cannot allocate {w}x{h} chart")))?;

        let mut line = tiny_skia::PathBuilder::new();
        let mut area = tiny_skia::PathBuilder::new();
        let bottom = h as f32 - INSET;
        for i in 0..self.series.len() {
            let (x, y) = self.point(i, w, h);
            if i == 0 {
                line.move_to(x, y);
                area.move_to(x, bottom);
            }
            line.line_to(x, y);
            area.line_to(x, y);
        }
        let (last_x, _) = self.point(self.series.len() - 1, w, h);
        area.line_to(last_x, bottom);
        area.close();

        let id = tiny_skia::Transform::identity();
        if let Some(path) = area.finish() {
            pixmap.fill_path(&path, &paint(self.area), tiny_skia::FillRule::Winding, id, None);
        }
        if let Some(path) = line.finish() {
            let stroke = tiny_skia::Stroke {
                width: 2.0,
                line_join: tiny_skia::LineJoin::Round,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &paint(self.line), &stroke, id, None);
        }
        Ok(pixmap_to_frame(pixmap))
    }
}

fn paint(rgba: [u8; 4]) -> tiny_skia::Paint<'static> {
    let mut p = tiny_skia::Paint::default();
    p.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    p.anti_alias = true;
    p
}

impl SubRenderer for ChartRenderer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Call arguments: `index` (bracket index into the series), optional `width`, `height`.
    fn render(&mut self, args: &Args) -> OverlayResult<Option<FrameRGBA>> {
        let w = args.opt_number("width")?.map_or(self.width, |v| v.round().max(1.0) as u32);
        let h = args.opt_number("height")?.map_or(self.height, |v| v.round().max(1.0) as u32);
        let index = (args.number("index")?.max(0.0) as usize).min(self.series.len() - 1);

        let bg = match &self.background {
            Some(bg) if bg.width == w && bg.height == h => bg.clone(),
            _ => {
                let bg = self.draw_background(w, h)?;
                self.background = Some(bg.clone());
                bg
            }
        };

        let mut pixmap = frame_to_pixmap(&bg)?;
        let (x, y) = self.point(index, w, h);
        if let Some(dot) = tiny_skia::PathBuilder::from_circle(x, y, MARKER_RADIUS) {
            let [r, g, b, _] = self.line;
            pixmap.fill_path(
                &dot,
                &paint([r, g, b, 255]),
                tiny_skia::FillRule::Winding,
                tiny_skia::Transform::identity(),
                None,
            );
        }
        Ok(Some(pixmap_to_frame(pixmap)))
    }
}

/// Built-in `chart` constructor. Arguments: `series`, `size`, optional `area_color`,
/// `line_color`.
pub fn chart_ctor() -> RendererCtor {
    Arc::new(|args: &Args| {
        let area = parse_hex_color(args.opt_text("area_color")?.unwrap_or(DEFAULT_AREA_COLOR))?;
        let line = parse_hex_color(args.opt_text("line_color")?.unwrap_or(DEFAULT_LINE_COLOR))?;
        let series = args.series("series")?.to_vec();
        let renderer = ChartRenderer::new(series, args.size("size")?, area, line)?;
        Ok(Box::new(renderer) as Box<dyn SubRenderer>)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/chart.rs"]
mod tests;
