//! Overlay declarations and the renderers behind them.
//!
//! An [`registry::OverlayRegistry`] holds declared entries; [`registry::OverlayRegistry::build`]
//! turns it into a [`registry::ReadyRegistry`] whose sub-renderers exist exactly once.

use std::sync::Arc;

use crate::assets::svg::SvgContext;
use crate::track::point::Track;

/// Argument values, sources and size tokens.
pub mod args;
/// Line chart of a telemetry series with a progress cursor.
pub mod chart;
/// Default overlay set and project-level overlay declarations.
pub mod defaults;
/// SVG gauges for scalar telemetry values.
pub mod gauge;
/// Track map rendered from precomputed tiles.
pub mod map;
/// Overlay placement helpers and anchors.
pub mod position;
/// Overlay declarations, renderer factory and the built registry.
pub mod registry;
/// Text styling, rasterization and value formatting.
pub mod text;

/// Factory with the `map`, `chart` and `gauge` constructors.
pub fn builtin_factory(svg: SvgContext, track: Arc<Track>) -> registry::RendererFactory {
    registry::RendererFactory::new()
        .with("map", map::map_ctor(track))
        .with("chart", chart::chart_ctor())
        .with("gauge", gauge::gauge_ctor(svg))
}
