use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::error::{OverlayError, OverlayResult};
use crate::render::frame::FrameRGBA;

/// Shared font database and parse options for every SVG the overlays build (text, gauges).
#[derive(Clone)]
pub struct SvgContext {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for SvgContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgContext")
            .field("faces", &self.fontdb.len())
            .finish()
    }
}

impl SvgContext {
    /// System fonts plus any `.ttf`/`.otf`/`.ttc` files in `font_dirs`.
    pub fn with_system_fonts(font_dirs: &[&Path]) -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        for dir in font_dirs {
            load_fonts_from_dir(&mut db, dir);
        }
        tracing::debug!(faces = db.len(), "font database ready");
        Self {
            fontdb: Arc::new(db),
        }
    }

    /// No fonts at all; text renders as nothing. Useful for deterministic tests.
    pub fn empty() -> Self {
        Self {
            fontdb: Arc::new(usvg::fontdb::Database::new()),
        }
    }

    /// Parse an SVG document with this context's font database.
    pub fn parse(&self, svg: &str) -> OverlayResult<usvg::Tree> {
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            font_resolver: make_font_resolver(),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(svg, &opts).with_context(|| "parse svg tree")?;
        Ok(tree)
    }
}

/// Rasterize `tree` scaled to `width x height` into a premultiplied frame.
pub fn rasterize_tree(tree: &usvg::Tree, width: u32, height: u32) -> OverlayResult<FrameRGBA> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| OverlayError::render(format!("cannot allocate {width}x{height} pixmap")))?;

    let sx = (width as f32) / tree.size().width();
    let sy = (height as f32) / tree.size().height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

    resvg::render(tree, xform, &mut pixmap.as_mut());
    Ok(pixmap_to_frame(pixmap))
}

/// tiny-skia pixmaps are premultiplied RGBA8 already.
pub fn pixmap_to_frame(pixmap: resvg::tiny_skia::Pixmap) -> FrameRGBA {
    FrameRGBA {
        width: pixmap.width(),
        height: pixmap.height(),
        data: pixmap.take(),
        premultiplied: true,
    }
}

/// Copy a premultiplied frame into a new pixmap.
pub fn frame_to_pixmap(frame: &FrameRGBA) -> OverlayResult<resvg::tiny_skia::Pixmap> {
    let size = resvg::tiny_skia::IntSize::from_wh(frame.width, frame.height)
        .ok_or_else(|| OverlayError::render("frame has zero size"))?;
    resvg::tiny_skia::Pixmap::from_vec(frame.data.clone(), size)
        .ok_or_else(|| OverlayError::render("frame buffer does not match its dimensions"))
}

/// Escape text for use inside SVG markup.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn load_fonts_from_dir(db: &mut usvg::fontdb::Database, dir: &Path) {
    let Ok(rd) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "skipping font");
        }
    }
}

fn make_font_resolver() -> usvg::FontResolver<'static> {
    use usvg::FontResolver;

    FontResolver {
        select_font: Box::new(|font, fontdb| {
            let mut families = Vec::<usvg::fontdb::Family<'_>>::new();
            for family in font.families() {
                families.push(match family {
                    usvg::FontFamily::Serif => usvg::fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => usvg::fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => usvg::fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => usvg::fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => usvg::fontdb::Family::Monospace,
                    usvg::FontFamily::Named(s) => usvg::fontdb::Family::Name(s),
                });
            }
            families.push(usvg::fontdb::Family::SansSerif);
            families.push(usvg::fontdb::Family::Monospace);

            let style = match font.style() {
                usvg::FontStyle::Normal => usvg::fontdb::Style::Normal,
                usvg::FontStyle::Italic => usvg::fontdb::Style::Italic,
                usvg::FontStyle::Oblique => usvg::fontdb::Style::Oblique,
            };

            let query = usvg::fontdb::Query {
                families: &families,
                weight: usvg::fontdb::Weight(font.weight()),
                stretch: usvg::fontdb::Stretch::Normal,
                style,
            };

            fontdb
                .query(&query)
                .or_else(|| fontdb.faces().next().map(|f| f.id))
        }),
        select_fallback: FontResolver::default_fallback_selector(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/svg.rs"]
mod tests;
