use std::fmt::Write as _;

use chrono::DateTime;

use crate::assets::svg::{SvgContext, escape_xml, rasterize_tree};
use crate::foundation::error::OverlayResult;
use crate::render::frame::FrameRGBA;

/// Font, size and colors of one text overlay.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextStyle {
    /// Font family name looked up in the font database.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Any SVG paint (`white`, `#ff0000`, ...).
    pub color: String,
    /// Outline paint, none by default.
    #[serde(default)]
    pub stroke_color: Option<String>,
    /// Bold weight; on by default.
    #[serde(default = "default_bold")]
    pub bold: bool,
}

fn default_bold() -> bool {
    true
}

impl TextStyle {
    /// Bold style without an outline.
    pub fn new(font_family: impl Into<String>, font_size: f64, color: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            font_size,
            color: color.into(),
            stroke_color: None,
            bold: true,
        }
    }
}

/// Turns a string into a tightly sized overlay image.
pub trait TextRasterizer: Send + Sync {
    /// `None` when nothing visible was produced (empty text, no usable font).
    fn rasterize(&self, text: &str, style: &TextStyle) -> OverlayResult<Option<FrameRGBA>>;
}

/// SVG `<text>` rendered through usvg/resvg with the shared font database.
#[derive(Clone, Debug)]
pub struct SvgTextRasterizer {
    svg: SvgContext,
}

impl SvgTextRasterizer {
    /// Rasterizer using the fonts loaded into `svg`.
    pub fn new(svg: SvgContext) -> Self {
        Self { svg }
    }

    fn markup(text: &str, style: &TextStyle, width: u32, height: u32) -> String {
        let mut s = String::new();
        let _ = write!(
            s,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">"#
        );
        let _ = write!(
            s,
            r#"<text x="0" y="{}" font-family="{}" font-size="{}" font-weight="{}" fill="{}""#,
            style.font_size,
            escape_xml(&style.font_family),
            style.font_size,
            if style.bold { "bold" } else { "normal" },
            escape_xml(&style.color),
        );
        if let Some(stroke) = &style.stroke_color {
            let _ = write!(s, r#" stroke="{}" stroke-width="1""#, escape_xml(stroke));
        }
        let _ = write!(s, ">{}</text></svg>", escape_xml(text));
        s
    }
}

impl TextRasterizer for SvgTextRasterizer {
    fn rasterize(&self, text: &str, style: &TextStyle) -> OverlayResult<Option<FrameRGBA>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        // Lay out on a generous canvas first, then crop to the ink.
        let height = (style.font_size * 1.4).ceil().max(1.0) as u32;
        let guess = ((text.chars().count() as f64) * style.font_size).ceil().max(1.0) as u32;
        let measured = self.svg.parse(&Self::markup(text, style, guess, height))?;
        if !measured.root().has_children() {
            return Ok(None);
        }
        let bbox = measured.root().abs_stroke_bounding_box();
        let width = (f64::from(bbox.right()).ceil() + 1.0).max(1.0) as u32;

        let tree = self.svg.parse(&Self::markup(text, style, width, height))?;
        Ok(Some(rasterize_tree(&tree, width, height)?))
    }
}

/// `dd.mm.YYYY HH:MM:SS` of track-clock seconds.
pub fn format_datetime(seconds: f64) -> String {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    match DateTime::from_timestamp(whole as i64, nanos) {
        Some(dt) => dt.naive_utc().format("%d.%m.%Y %H:%M:%S").to_string(),
        None => String::new(),
    }
}

/// Meters per second shown as km/h; below 1 km/h reads `STOPPED`.
pub fn format_speed(speed_mps: f64) -> String {
    let kmh = speed_mps * 3.6;
    if kmh < 1.0 {
        "STOPPED".to_owned()
    } else {
        format!("{kmh:.2} km/h")
    }
}

/// Meters with two decimals.
pub fn format_elevation(m: f64) -> String {
    format!("{m:.2} m")
}

/// Whole beats per minute.
pub fn format_heart(bpm: f64) -> String {
    format!("{} BPM", bpm.trunc() as i64)
}

/// Degrees with one decimal.
pub fn format_bearing(deg: f64) -> String {
    format!("{deg:.1} °")
}

/// Whole percent grade.
pub fn format_slope(percent: f64) -> String {
    format!("{} %", percent.trunc() as i64)
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/text.rs"]
mod tests;
