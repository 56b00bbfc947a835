use std::sync::Arc;

use anyhow::Context as _;
use quick_xml::{Reader, events::Event};

use crate::assets::svg::{SvgContext, escape_xml, rasterize_tree};
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::overlay::args::Args;
use crate::overlay::registry::{RendererCtor, SubRenderer};
use crate::render::frame::FrameRGBA;

/// `id` of the element that rotates when no other is configured.
pub const DEFAULT_CURSOR_ID: &str = "cursor";

/// Dial with a needle pointing east at angle 0, rotating around `(100, 100)`.
pub const DEFAULT_GAUGE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg"
  width="200" height="200" viewBox="0 0 200 200">
  <circle cx="100" cy="100" r="92" fill="#00000066" stroke="#ffffff" stroke-width="4"/>
  <rect id="cursor" x="100" y="100" width="78" height="4" fill="#ff3b30"/>
  <circle cx="100" cy="100" r="8" fill="#ffffff"/>
</svg>
"##;

/// Linear map of `x` from `[in_min, in_max]` onto `[out_min, out_max]`, unclamped.
pub fn map_range(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Value range and the cursor angles (degrees, clockwise) it maps onto.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaugeScale {
    /// Value drawn at `min_angle`.
    pub min_value: f64,
    /// Value drawn at `max_angle`.
    pub max_value: f64,
    /// Cursor angle for `min_value`, degrees.
    pub min_angle: f64,
    /// Cursor angle for `max_value`, degrees.
    pub max_angle: f64,
}

impl GaugeScale {
    /// Cursor angle for `value`; values outside the range extrapolate.
    pub fn angle(&self, value: f64) -> f64 {
        map_range(
            value,
            self.min_value,
            self.max_value,
            self.min_angle,
            self.max_angle,
        )
    }
}

/// The cursor element, kept apart from the rest of the document so its transform can be
/// replaced on every call.
#[derive(Clone, Debug, PartialEq)]
struct CursorTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    x: f64,
    y: f64,
}

impl CursorTag {
    fn rotated(&self, angle: f64) -> String {
        let mut s = format!("<{}", self.name);
        for (k, v) in &self.attrs {
            s.push_str(&format!(" {k}=\"{}\"", escape_xml(v)));
        }
        s.push_str(&format!(
            " transform=\"rotate({angle} {} {})\"",
            self.x, self.y
        ));
        s.push_str(if self.self_closing { "/>" } else { ">" });
        s
    }
}

/// SVG gauge whose cursor element turns with the value.
///
/// The cursor rotates around its own `x`/`y`; any transform it had is replaced.
pub struct GaugeRenderer {
    svg: SvgContext,
    prefix: String,
    cursor: CursorTag,
    suffix: String,
    scale: GaugeScale,
    width: u32,
    height: u32,
}

impl GaugeRenderer {
    /// Split `document` around the element with id `cursor_id`.
    ///
    /// Without `size` the document's own size is used.
    pub fn new(
        svg: SvgContext,
        document: &str,
        cursor_id: &str,
        scale: GaugeScale,
        size: Option<(u32, u32)>,
    ) -> OverlayResult<Self> {
        if scale.max_value == scale.min_value {
            return Err(OverlayError::configuration(
                "gauge min_value and max_value must differ",
            ));
        }
        let (start, end, cursor) = find_cursor(document, cursor_id)?;
        let (width, height) = match size {
            Some(s) => s,
            None => {
                let tree = svg.parse(document)?;
                let s = tree.size();
                (s.width().round() as u32, s.height().round() as u32)
            }
        };
        if width == 0 || height == 0 {
            return Err(OverlayError::configuration("gauge size must be > 0"));
        }
        Ok(Self {
            svg,
            prefix: document[..start].to_owned(),
            cursor,
            suffix: document[end..].to_owned(),
            scale,
            width,
            height,
        })
    }

    /// Document with the cursor rotated for `value`.
    pub fn markup(&self, value: f64) -> String {
        let mut s = String::with_capacity(self.prefix.len() + self.suffix.len() + 128);
        s.push_str(&self.prefix);
        s.push_str(&self.cursor.rotated(self.scale.angle(value)));
        s.push_str(&self.suffix);
        s
    }
}

impl SubRenderer for GaugeRenderer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Call arguments: `value`, optional `width`, `height`.
    fn render(&mut self, args: &Args) -> OverlayResult<Option<FrameRGBA>> {
        let value = args.number("value")?;
        let w = args.opt_number("width")?.map_or(self.width, |v| v.round().max(1.0) as u32);
        let h = args.opt_number("height")?.map_or(self.height, |v| v.round().max(1.0) as u32);
        let tree = self.svg.parse(&self.markup(value))?;
        Ok(Some(rasterize_tree(&tree, w, h)?))
    }
}

/// Byte span of the cursor's start tag and its parsed attributes.
fn find_cursor(document: &str, cursor_id: &str) -> OverlayResult<(usize, usize, CursorTag)> {
    let mut reader = Reader::from_str(document);
    loop {
        let (e, self_closing) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(e) => {
                return Err(OverlayError::configuration(format!(
                    "gauge svg is not valid xml: {e}"
                )));
            }
        };
        let end = reader.buffer_position() as usize;
        // Attribute values cannot contain a raw '<', so the last one opens this tag.
        let start = document
            .get(..end)
            .and_then(|head| head.rfind('<'))
            .ok_or_else(|| OverlayError::configuration("gauge svg tag without '<'"))?;

        let mut attrs = Vec::new();
        let mut id = None;
        for attr in e.attributes() {
            let attr = attr.context("gauge svg attribute")?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .context("gauge svg attribute value")?
                .into_owned();
            if key == "id" {
                id = Some(value.clone());
            }
            if key != "transform" {
                attrs.push((key, value));
            }
        }
        if id.as_deref() != Some(cursor_id) {
            continue;
        }

        let coord = |name: &str| -> OverlayResult<f64> {
            attrs
                .iter()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.trim_end_matches("px").parse().ok())
                .ok_or_else(|| {
                    OverlayError::configuration(format!(
                        "gauge cursor '{cursor_id}' needs a numeric '{name}' attribute"
                    ))
                })
        };
        let (x, y) = (coord("x")?, coord("y")?);
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        return Ok((
            start,
            end,
            CursorTag {
                name,
                attrs,
                self_closing,
                x,
                y,
            },
        ));
    }
    Err(OverlayError::configuration(format!(
        "gauge svg has no element with id '{cursor_id}'"
    )))
}

/// Built-in `gauge` constructor. Arguments: `min_value`, `max_value`, `min_angle`,
/// `max_angle`, optional `svg` (file path), `cursor_id`, `size`.
pub fn gauge_ctor(svg: SvgContext) -> RendererCtor {
    Arc::new(move |args: &Args| {
        let document = match args.opt_path("svg")? {
            Some(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("read gauge svg {}", path.display()))?,
            None => DEFAULT_GAUGE_SVG.to_owned(),
        };
        let scale = GaugeScale {
            min_value: args.number("min_value")?,
            max_value: args.number("max_value")?,
            min_angle: args.opt_number("min_angle")?.unwrap_or(135.0),
            max_angle: args.opt_number("max_angle")?.unwrap_or(405.0),
        };
        let size = if args.contains("size") {
            Some(args.size("size")?)
        } else {
            None
        };
        let renderer = GaugeRenderer::new(
            svg.clone(),
            &document,
            args.opt_text("cursor_id")?.unwrap_or(DEFAULT_CURSOR_ID),
            scale,
            size,
        )?;
        Ok(Box::new(renderer) as Box<dyn SubRenderer>)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/gauge.rs"]
mod tests;
