use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::assets::svg::SvgContext;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::images::manifest::{ImageRecord, parse_exif_time, read_manifest, scan_image_dir};
use crate::images::timeline::ImageTimeline;
use crate::overlay::args::SizeSpec;
use crate::overlay::builtin_factory;
use crate::overlay::defaults::{
    GaugeOverlay, MapOverlay, OverlayBuilder, ReadoutOverrides, Style, ValueFormat,
};
use crate::overlay::position::{Anchor, bottom_left, fixed, map_corner, top_left};
use crate::overlay::registry::{FieldKey, OverlayRegistry, PositionFn, RendererFactory};
use crate::overlay::text::{SvgTextRasterizer, TextRasterizer};
use crate::render::driver::{DriverParams, FrameDriver, driver_context};
use crate::render::source::{FrameSource, ImageSequenceSource, SolidColorSource};
use crate::sync::offset::DEFAULT_MAX_DIFF;
use crate::sync::store::{SyncParams, TrackDataStore};
use crate::track::gpx::{GpxOptions, TrackCache};
use crate::track::point::TrackField;

/// Break fade length when `timing.effect_length` is absent, display seconds.
pub const DEFAULT_EFFECT_LENGTH: f64 = 3.0;
/// Chart size when a chart declaration omits `size`.
pub const DEFAULT_CHART_SIZE: SizeSpec = SizeSpec::px(400, 150);
/// Track-only base color when `background` is absent.
pub const DEFAULT_BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Clock and pacing parameters.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Initial guess of camera clock minus track clock, seconds.
    pub time_offset: f64,
    /// Seconds between burst shots; `0` keeps whole-second capture times.
    pub interval: f64,
    /// Length of a break zoom in/out, display seconds.
    pub effect_length: f64,
    /// Camera seconds per display second.
    pub speedup_factor: f64,
    /// Offset search radius, seconds.
    pub max_diff: u32,
    /// Cap on the capture gap an image is shown for, camera seconds.
    pub max_image_delay: Option<f64>,
    /// Hours added to GPX UTC times to reach the camera's local clock.
    pub utc_offset_hours: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            time_offset: 0.0,
            interval: 0.0,
            effect_length: DEFAULT_EFFECT_LENGTH,
            speedup_factor: 1.0,
            max_diff: DEFAULT_MAX_DIFF,
            max_image_delay: None,
            utc_offset_hours: 0.0,
        }
    }
}

/// One overlay declaration of a project file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OverlayConfig {
    /// Text readout of a snapshot field (`speed`, `heart`, `slope`, `datetime`, ...).
    Text {
        /// Snapshot field name, see [`FieldKey::parse`].
        field: String,
        /// Number formatting override.
        #[serde(default)]
        format: Option<ValueFormat>,
        /// Text color override.
        #[serde(default)]
        color: Option<String>,
        /// Use the large font size.
        #[serde(default)]
        large: Option<bool>,
        /// Placement override; the stock slot otherwise.
        #[serde(default)]
        position: Option<Anchor>,
    },
    /// Track map.
    Map {
        /// Map appearance and tile cache settings.
        #[serde(flatten)]
        map: MapOverlay,
        /// Placement override; the bottom-right corner otherwise.
        #[serde(default)]
        position: Option<Anchor>,
    },
    /// Line chart of one track field over the whole track.
    Chart {
        /// Charted field.
        field: TrackField,
        /// Pixels, or `"W"`/`"H"` for the output width or height.
        #[serde(default = "default_chart_size")]
        size: SizeSpec,
        /// Placement override; the bottom-left corner otherwise.
        #[serde(default)]
        position: Option<Anchor>,
    },
    /// SVG gauge of one track field.
    Gauge {
        /// Displayed field.
        field: TrackField,
        /// Gauge asset and range.
        #[serde(flatten)]
        gauge: GaugeOverlay,
        /// Placement override; the top-left corner otherwise.
        #[serde(default)]
        position: Option<Anchor>,
    },
}

fn default_chart_size() -> SizeSpec {
    DEFAULT_CHART_SIZE
}

fn default_canvas() -> Canvas {
    Canvas {
        width: 1920,
        height: 1080,
    }
}

fn default_fps() -> Fps {
    Fps { num: 30, den: 1 }
}

/// A project file: inputs, output geometry, timing and overlays.
///
/// Without `images` (a JSON manifest) or `image_dir` the project runs in track-only mode over a
/// solid `background`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectConfig {
    /// GPX track file.
    pub track: PathBuf,
    /// JSON image manifest.
    #[serde(default)]
    pub images: Option<PathBuf>,
    /// Directory scanned for images.
    #[serde(default)]
    pub image_dir: Option<PathBuf>,
    /// Output frame size.
    #[serde(default = "default_canvas")]
    pub canvas: Canvas,
    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: Fps,
    /// Clock and pacing parameters.
    #[serde(default)]
    pub timing: Timing,
    /// Fonts and colors shared by text overlays.
    #[serde(default)]
    pub style: Style,
    /// The stock set (datetime, elevation, heart, bearing, speed, map) when absent.
    #[serde(default)]
    pub overlays: Option<Vec<OverlayConfig>>,
    /// Base color in track-only mode, straight RGBA.
    #[serde(default)]
    pub background: Option<[u8; 4]>,
    /// Track-only start instant on the camera clock, `YYYY:MM:DD HH:MM:SS`.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Extra font directories on top of the system fonts.
    #[serde(default)]
    pub font_dirs: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Parse a project file from JSON text; paths are left as written.
    pub fn from_json_str(s: &str) -> OverlayResult<Self> {
        serde_json::from_str(s).map_err(|e| OverlayError::serde(format!("project file: {e}")))
    }

    /// Read a project file; relative paths resolve against its directory.
    pub fn read(path: &Path) -> OverlayResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read project file '{}'", path.display()))?;
        let mut cfg = Self::from_json_str(&s)?;
        cfg.resolve_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(cfg)
    }

    /// Make every relative path absolute against `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        fix(&mut self.track);
        let optional = [&mut self.images, &mut self.image_dir];
        for p in optional.into_iter().flatten() {
            fix(p);
        }
        self.font_dirs.iter_mut().for_each(fix);
        for o in self.overlays.iter_mut().flatten() {
            let p = match o {
                OverlayConfig::Map { map, .. } => map.cache_dir.as_mut(),
                OverlayConfig::Gauge { gauge, .. } => gauge.svg.as_mut(),
                _ => None,
            };
            if let Some(p) = p {
                fix(p);
            }
        }
    }

    /// Check values that serde cannot, including overlay fields and size tokens.
    pub fn validate(&self) -> OverlayResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        Canvas::new(self.canvas.width, self.canvas.height)?;
        let t = &self.timing;
        if !(t.speedup_factor > 0.0) {
            return Err(OverlayError::validation("timing.speedup_factor must be > 0"));
        }
        if !(t.effect_length > 0.0) {
            return Err(OverlayError::validation("timing.effect_length must be > 0"));
        }
        if t.interval < 0.0 {
            return Err(OverlayError::validation("timing.interval must be >= 0"));
        }
        if let Some(d) = t.max_image_delay
            && !(d > 0.0)
        {
            return Err(OverlayError::validation("timing.max_image_delay must be > 0"));
        }
        if self.images.is_some() && self.image_dir.is_some() {
            return Err(OverlayError::configuration(
                "set either 'images' or 'image_dir', not both",
            ));
        }
        if let Some(s) = &self.start_time {
            parse_exif_time(s)?;
        }
        for o in self.overlays.iter().flatten() {
            match o {
                OverlayConfig::Text { field, .. } if FieldKey::parse(field).is_none() => {
                    return Err(OverlayError::configuration(format!(
                        "unknown text overlay field '{field}'"
                    )));
                }
                OverlayConfig::Text { .. } => {}
                OverlayConfig::Map { map, .. } => {
                    map.size.tokens()?;
                }
                OverlayConfig::Chart { size, .. } => {
                    size.tokens()?;
                }
                OverlayConfig::Gauge { gauge, .. } => {
                    gauge.size.as_ref().map(SizeSpec::tokens).transpose()?;
                }
            }
        }
        Ok(())
    }

    /// Track loading options.
    pub fn gpx_options(&self) -> GpxOptions {
        GpxOptions {
            utc_offset_hours: self.timing.utc_offset_hours,
        }
    }

    /// Clock-offset search parameters.
    pub fn sync_params(&self) -> SyncParams {
        SyncParams {
            time_offset: self.timing.time_offset,
            interval: self.timing.interval,
            max_diff: self.timing.max_diff,
        }
    }

    /// The image sequence, or `None` in track-only mode.
    pub fn load_images(&self) -> OverlayResult<Option<Vec<ImageRecord>>> {
        let images = match (&self.images, &self.image_dir) {
            (Some(manifest), _) => read_manifest(manifest)?,
            (None, Some(dir)) => scan_image_dir(dir)?,
            (None, None) => return Ok(None),
        };
        if images.is_empty() {
            return Err(OverlayError::validation("no usable images found"));
        }
        tracing::info!(images = images.len(), "images loaded");
        Ok(Some(images))
    }

    /// The first map declaration (the stock one when overlays are not listed).
    pub fn map_overlay(&self) -> Option<MapOverlay> {
        match &self.overlays {
            None => Some(MapOverlay::default()),
            Some(list) => list.iter().find_map(|o| match o {
                OverlayConfig::Map { map, .. } => Some(map.clone()),
                _ => None,
            }),
        }
    }

    /// Declared overlays, in file order (the map is still composited first).
    pub fn overlay_registry(
        &self,
        text: Arc<dyn TextRasterizer>,
        factory: RendererFactory,
    ) -> OverlayResult<OverlayRegistry> {
        let mut b = OverlayBuilder::new(self.style.clone(), text, factory);
        let Some(list) = &self.overlays else {
            return Ok(b.with_defaults()?.finish());
        };

        for o in list {
            match o {
                OverlayConfig::Text {
                    field,
                    format,
                    color,
                    large,
                    position,
                } => {
                    let key = FieldKey::parse(field).ok_or_else(|| {
                        OverlayError::configuration(format!("unknown text overlay field '{field}'"))
                    })?;
                    let position = position.map(|a| anchor_position(a, &b));
                    b.readout(
                        key,
                        ReadoutOverrides {
                            format: format.clone(),
                            color: color.clone(),
                            large: *large,
                        },
                        position,
                    );
                }
                OverlayConfig::Map { map, position } => {
                    let position = position.map(|a| anchor_position(a, &b));
                    b.map(map, position)?;
                }
                OverlayConfig::Chart {
                    field,
                    size,
                    position,
                } => {
                    let position = position.map(|a| anchor_position(a, &b));
                    b.chart(*field, size, position)?;
                }
                OverlayConfig::Gauge {
                    field,
                    gauge,
                    position,
                } => {
                    let position = position.map(|a| anchor_position(a, &b));
                    b.gauge(*field, gauge, position)?;
                }
            }
        }
        tracing::debug!(overlays = list.len(), "overlays declared");
        Ok(b.finish())
    }

    /// Load the inputs and wire a ready [`FrameDriver`].
    #[tracing::instrument(skip_all, fields(track = %self.track.display()))]
    pub fn build_driver(
        &self,
        tracks: &mut TrackCache,
        svg: SvgContext,
    ) -> OverlayResult<FrameDriver> {
        self.validate()?;
        let track = tracks.load(&self.track, self.gpx_options())?;

        let (store, timeline, source): (_, _, Box<dyn FrameSource>) = match self.load_images()? {
            Some(images) => {
                let store =
                    TrackDataStore::synchronized(track.clone(), &images, self.sync_params())?;
                let captures: Vec<f64> = store.records().iter().map(|r| r.capture_time).collect();
                let timeline = ImageTimeline::new(
                    &captures,
                    self.timing.speedup_factor,
                    self.timing.max_image_delay,
                )?;
                let paths: Option<Vec<PathBuf>> = images.iter().map(|r| r.path.clone()).collect();
                let source: Box<dyn FrameSource> = match paths {
                    Some(paths) => Box::new(ImageSequenceSource::new(paths)?),
                    None => Box::new(self.background_source()),
                };
                (store, Some(timeline), source)
            }
            None => {
                let start = self.start_time.as_deref().map(parse_exif_time).transpose()?;
                let store =
                    TrackDataStore::track_only(track.clone(), start, self.timing.time_offset);
                (store, None, Box::new(self.background_source()))
            }
        };

        let factory = builtin_factory(svg.clone(), track);
        let text: Arc<dyn TextRasterizer> = Arc::new(SvgTextRasterizer::new(svg));
        let registry = self.overlay_registry(text, factory)?;
        let ready = registry.build(&driver_context(self.canvas, &store))?;

        FrameDriver::new(
            store,
            timeline,
            ready,
            source,
            DriverParams {
                canvas: self.canvas,
                effect_length: self.timing.effect_length,
                speedup_factor: self.timing.speedup_factor,
            },
        )
    }

    fn background_source(&self) -> SolidColorSource {
        SolidColorSource {
            rgba: self.background.unwrap_or(DEFAULT_BACKGROUND),
        }
    }
}

fn anchor_position(anchor: Anchor, b: &OverlayBuilder) -> PositionFn {
    let padding = b.style().padding;
    match anchor {
        Anchor::Stacked => b.next_slot(),
        Anchor::MapCorner => map_corner(padding),
        Anchor::BottomLeft => bottom_left(padding),
        Anchor::TopLeft => top_left(padding),
        Anchor::Fixed { x, y } => fixed(x, y),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/project.rs"]
mod tests;
