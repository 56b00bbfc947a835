/// Font-aware SVG parsing and rasterization to premultiplied frames.
pub mod svg;
