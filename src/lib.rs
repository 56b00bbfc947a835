//! gpsoverlay composites time-synchronized GPS telemetry onto photo sequences.
//!
//! The pipeline:
//!
//! - Load a [`Track`] from GPX and an image sequence from a manifest or directory
//! - Resolve per-image clock offsets into a [`TrackDataStore`]
//! - Declare overlays in an [`OverlayRegistry`] and build it once into a [`ReadyRegistry`]
//! - Render display instants with a [`FrameDriver`], or stream a range into a [`FrameSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Shared SVG parsing and rasterization.
pub mod assets;
/// Project file schema.
pub mod config;
/// Break detection and alpha compositing.
pub mod effects;
/// Frame sinks.
pub mod encode;
/// Core types, errors and small math helpers.
pub mod foundation;
/// Image metadata and the display timeline.
pub mod images;
/// Overlay declarations and renderers.
pub mod overlay;
/// Frame composition and range rendering.
pub mod render;
/// Clock-offset resolution and the telemetry store.
pub mod sync;
/// GPX loading, geo math and interpolation.
pub mod track;

pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Point};
pub use crate::foundation::error::{OverlayError, OverlayResult};

pub use crate::config::project::{OverlayConfig, ProjectConfig, Timing};
pub use crate::effects::breaks::{BreakPhase, BreakState, detect_break};
pub use crate::encode::sink::{FrameSink, InMemorySink, PngSequenceSink, SinkConfig};
pub use crate::images::manifest::ImageRecord;
pub use crate::images::timeline::ImageTimeline;
pub use crate::overlay::args::{ArgSource, ArgValue, Args, DriverContext, SizeToken};
pub use crate::overlay::registry::{
    OverlayEntry, OverlayRegistry, ReadyRegistry, RendererFactory, SubRenderer,
};
pub use crate::render::driver::{DriverParams, FrameDriver, driver_context};
pub use crate::render::frame::FrameRGBA;
pub use crate::render::pipeline::{RenderStats, render_range};
pub use crate::sync::store::{GpsSnapshot, SyncParams, TrackDataStore};
pub use crate::track::point::{Track, TrackField, TrackPoint};
