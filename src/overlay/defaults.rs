use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::error::OverlayResult;
use crate::overlay::args::{ArgSource, ArgValue, SizeSpec};
use crate::overlay::map::{
    DEFAULT_ANGLE_OFFSET, DEFAULT_MAP_SIZE, DEFAULT_MAP_ZOOM, with_location_marker,
};
use crate::overlay::position::{Padding, bottom_left, map_corner, stacked, top_left};
use crate::overlay::registry::{
    FieldKey, MAP_KEY, OverlayData, OverlayEntry, OverlayRegistry, PositionFn, RenderFn,
    RendererFactory, RendererSpec, Sample,
};
use crate::overlay::text::{self, TextRasterizer, TextStyle};
use crate::track::point::TrackField;

/// Fill color of the map placeholder in previews.
pub const MAP_SAMPLE_RGBA: [u8; 4] = [125, 35, 0, 255];

/// Shared look of the text overlays.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Style {
    /// Font family of every text overlay.
    pub font_family: String,
    /// Font size of regular readouts, pixels.
    pub normal_font_size: f64,
    /// Used by the speed readout.
    pub large_font_size: f64,
    /// Distance from the output border.
    pub padding: Padding,
    /// Vertical gap between stacked overlays.
    pub margin: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font_family: "DejaVu Sans Mono".to_owned(),
            normal_font_size: 30.0,
            large_font_size: 40.0,
            padding: Padding::default(),
            margin: 10.0,
        }
    }
}

/// How a numeric value becomes text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueFormat {
    /// Local date and time.
    Datetime,
    /// Meters.
    Elevation,
    /// Beats per minute.
    Heart,
    /// Degrees.
    Bearing,
    /// km/h, or `STOPPED`.
    Speed,
    /// Percent grade.
    Slope,
    /// Number with a fixed number of decimals and a unit suffix.
    Fixed {
        /// Digits after the decimal point.
        decimals: usize,
        /// Suffix after a space.
        unit: String,
    },
}

impl ValueFormat {
    /// Text for `v`.
    pub fn format(&self, v: f64) -> String {
        match self {
            Self::Datetime => text::format_datetime(v),
            Self::Elevation => text::format_elevation(v),
            Self::Heart => text::format_heart(v),
            Self::Bearing => text::format_bearing(v),
            Self::Speed => text::format_speed(v),
            Self::Slope => text::format_slope(v),
            Self::Fixed { decimals, unit } => format!("{v:.decimals$} {unit}"),
        }
    }
}

/// Stock look of a text readout.
#[derive(Clone, Debug, PartialEq)]
pub struct Readout {
    /// Number formatting.
    pub format: ValueFormat,
    /// Text color.
    pub color: &'static str,
    /// Use the large font size.
    pub large: bool,
    /// Preview value.
    pub sample: f64,
}

impl Readout {
    /// Stock look of `field`.
    pub fn stock(field: FieldKey) -> Self {
        let (format, color, large, sample) = match field {
            FieldKey::Time => (
                ValueFormat::Datetime,
                "white",
                false,
                chrono::Local::now().naive_local().and_utc().timestamp() as f64,
            ),
            FieldKey::Slope => (ValueFormat::Slope, "white", false, -4.3),
            FieldKey::Telemetry(f) => match f {
                TrackField::Elevation => (ValueFormat::Elevation, "white", false, 42.24),
                TrackField::Heart => (ValueFormat::Heart, "red", false, 133.0),
                TrackField::Bearing => (ValueFormat::Bearing, "white", false, 260.0),
                TrackField::Speed => (ValueFormat::Speed, "white", true, 15.6),
                TrackField::Lat | TrackField::Lon => (
                    ValueFormat::Fixed {
                        decimals: 5,
                        unit: "°".to_owned(),
                    },
                    "white",
                    false,
                    46.05,
                ),
            },
        };
        Self {
            format,
            color,
            large,
            sample,
        }
    }
}

/// Per-readout changes to the stock look; `None` keeps the stock value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadoutOverrides {
    /// Replaces the number formatting.
    pub format: Option<ValueFormat>,
    /// Replaces the text color.
    pub color: Option<String>,
    /// Switches between the large and regular font size.
    pub large: Option<bool>,
}

/// Declaration of the map overlay.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MapOverlay {
    /// Pixels, or `"W"`/`"H"` for the output width or height.
    pub size: SizeSpec,
    /// Web-mercator zoom level.
    pub zoom: f64,
    /// Added to the heading before rotating the map, degrees.
    pub angle_offset: f64,
    /// Tile cache directory; tiles are rendered per frame without one.
    pub cache_dir: Option<PathBuf>,
    /// Render tiles again even when cached.
    pub overwrite: bool,
    /// Zoom to full frame across breaks.
    pub break_aware: bool,
}

impl Default for MapOverlay {
    fn default() -> Self {
        Self {
            size: SizeSpec::px(DEFAULT_MAP_SIZE.0, DEFAULT_MAP_SIZE.1),
            zoom: DEFAULT_MAP_ZOOM,
            angle_offset: DEFAULT_ANGLE_OFFSET,
            cache_dir: None,
            overwrite: false,
            break_aware: true,
        }
    }
}

/// Declaration of a gauge overlay.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GaugeOverlay {
    /// Value at the start of the scale.
    pub min_value: f64,
    /// Value at the end of the scale.
    pub max_value: f64,
    /// Cursor angle at `min_value`, degrees.
    #[serde(default)]
    pub min_angle: Option<f64>,
    /// Cursor angle at `max_value`, degrees.
    #[serde(default)]
    pub max_angle: Option<f64>,
    /// SVG file; the built-in dial when absent.
    #[serde(default)]
    pub svg: Option<PathBuf>,
    /// `id` of the rotating element.
    #[serde(default)]
    pub cursor_id: Option<String>,
    /// Pixels or `"W"`/`"H"`; the document size when absent.
    #[serde(default)]
    pub size: Option<SizeSpec>,
}

/// Builds an [`OverlayRegistry`] the way the stock overlays are laid out: text readouts in a
/// right-aligned column, the map in the bottom-right corner.
pub struct OverlayBuilder {
    style: Style,
    text: Arc<dyn TextRasterizer>,
    registry: OverlayRegistry,
}

impl OverlayBuilder {
    /// Empty builder registering renderers from `factory`.
    pub fn new(style: Style, text: Arc<dyn TextRasterizer>, factory: RendererFactory) -> Self {
        Self {
            style,
            text,
            registry: OverlayRegistry::new(factory),
        }
    }

    /// Shared text look.
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Position of the next overlay in the text column.
    pub fn next_slot(&self) -> PositionFn {
        stacked(
            self.registry.key_count(),
            self.style.padding,
            self.style.normal_font_size,
            self.style.margin,
        )
    }

    /// Render function formatting a field value with `format` and rasterizing it in `style`.
    pub fn text_render(&self, format: ValueFormat, style: TextStyle) -> RenderFn {
        let text = self.text.clone();
        Arc::new(move |data: &OverlayData| match data {
            OverlayData::Value(v) => text.rasterize(&format.format(*v), &style),
            OverlayData::Image(_) => Ok(None),
        })
    }

    fn text_style(&self, color: &str, large: bool) -> TextStyle {
        let size = if large {
            self.style.large_font_size
        } else {
            self.style.normal_font_size
        };
        TextStyle::new(self.style.font_family.clone(), size, color)
    }

    /// Text readout of one snapshot field.
    pub fn text_field(
        &mut self,
        key: &str,
        field: FieldKey,
        format: ValueFormat,
        style: TextStyle,
        position: Option<PositionFn>,
        sample: f64,
    ) -> &mut Self {
        let position = position.unwrap_or_else(|| self.next_slot());
        let render = self.text_render(format, style);
        self.registry.register(
            OverlayEntry::field(key, field, render, position).with_sample(Sample::Value(sample)),
        );
        self
    }

    /// Stock readout of `field`; `format`, `color` and `large` override the stock look.
    pub fn readout(
        &mut self,
        field: FieldKey,
        overrides: ReadoutOverrides,
        position: Option<PositionFn>,
    ) -> &mut Self {
        let stock = Readout::stock(field);
        let style = self.text_style(
            overrides.color.as_deref().unwrap_or(stock.color),
            overrides.large.unwrap_or(stock.large),
        );
        let format = overrides.format.unwrap_or(stock.format);
        self.text_field(field.name(), field, format, style, position, stock.sample)
    }

    /// Local capture date and time.
    pub fn datetime(&mut self, position: Option<PositionFn>) -> &mut Self {
        self.readout(FieldKey::Time, ReadoutOverrides::default(), position)
    }

    /// Elevation readout.
    pub fn elevation(&mut self, position: Option<PositionFn>) -> &mut Self {
        self.readout(
            FieldKey::Telemetry(TrackField::Elevation),
            ReadoutOverrides::default(),
            position,
        )
    }

    /// Heart-rate readout.
    pub fn heart(&mut self, position: Option<PositionFn>) -> &mut Self {
        self.readout(
            FieldKey::Telemetry(TrackField::Heart),
            ReadoutOverrides::default(),
            position,
        )
    }

    /// Bearing readout.
    pub fn bearing(&mut self, position: Option<PositionFn>) -> &mut Self {
        self.readout(
            FieldKey::Telemetry(TrackField::Bearing),
            ReadoutOverrides::default(),
            position,
        )
    }

    /// Speed readout in the large font.
    pub fn speed(&mut self, position: Option<PositionFn>) -> &mut Self {
        self.readout(
            FieldKey::Telemetry(TrackField::Speed),
            ReadoutOverrides::default(),
            position,
        )
    }

    /// Slope readout.
    pub fn slope(&mut self, position: Option<PositionFn>) -> &mut Self {
        self.readout(FieldKey::Slope, ReadoutOverrides::default(), position)
    }

    /// Track map, with a solid preview sample.
    pub fn map(
        &mut self,
        map: &MapOverlay,
        position: Option<PositionFn>,
    ) -> OverlayResult<&mut Self> {
        let size = map.size.tokens()?;
        let mut spec = RendererSpec::new("map")
            .ctor_arg("size", ArgSource::literal(ArgValue::Size(size)))
            .ctor_arg("zoom", ArgSource::number(map.zoom))
            .ctor_arg("overwrite", ArgSource::literal(ArgValue::Bool(map.overwrite)))
            .call_arg("lat", ArgSource::Telemetry(TrackField::Lat))
            .call_arg("lon", ArgSource::Telemetry(TrackField::Lon))
            .call_arg("bearing", ArgSource::Telemetry(TrackField::Bearing))
            .call_arg("angle_offset", ArgSource::number(map.angle_offset));
        if let Some(dir) = &map.cache_dir {
            spec = spec.ctor_arg("cache_dir", ArgSource::literal(ArgValue::Path(dir.clone())));
        }

        let position = position.unwrap_or_else(|| map_corner(self.style.padding));
        self.registry.register(
            OverlayEntry::renderer(MAP_KEY, spec, position)
                .with_render(with_location_marker())
                .with_break_support(map.break_aware)
                .with_sample(Sample::Solid {
                    size,
                    rgba: MAP_SAMPLE_RGBA,
                }),
        );
        Ok(self)
    }

    /// Area chart of a track series, fed from the driver state `track.<field>`.
    pub fn chart(
        &mut self,
        field: TrackField,
        size: &SizeSpec,
        position: Option<PositionFn>,
    ) -> OverlayResult<&mut Self> {
        let spec = RendererSpec::new("chart")
            .ctor_arg("series", ArgSource::driver(format!("track.{}", field.name())))
            .ctor_arg("size", ArgSource::literal(ArgValue::Size(size.tokens()?)))
            .call_arg("index", ArgSource::BracketIndex);
        let position = position.unwrap_or_else(|| bottom_left(self.style.padding));
        self.registry
            .register(OverlayEntry::renderer(field.name(), spec, position));
        Ok(self)
    }

    /// SVG gauge of one track field, top-left by default.
    pub fn gauge(
        &mut self,
        field: TrackField,
        gauge: &GaugeOverlay,
        position: Option<PositionFn>,
    ) -> OverlayResult<&mut Self> {
        let mut spec = RendererSpec::new("gauge")
            .ctor_arg("min_value", ArgSource::number(gauge.min_value))
            .ctor_arg("max_value", ArgSource::number(gauge.max_value))
            .call_arg("value", ArgSource::Telemetry(field));
        if let Some(a) = gauge.min_angle {
            spec = spec.ctor_arg("min_angle", ArgSource::number(a));
        }
        if let Some(a) = gauge.max_angle {
            spec = spec.ctor_arg("max_angle", ArgSource::number(a));
        }
        if let Some(p) = &gauge.svg {
            spec = spec.ctor_arg("svg", ArgSource::literal(ArgValue::Path(p.clone())));
        }
        if let Some(id) = &gauge.cursor_id {
            spec = spec.ctor_arg("cursor_id", ArgSource::literal(ArgValue::Text(id.clone())));
        }
        if let Some(size) = &gauge.size {
            spec = spec.ctor_arg("size", ArgSource::literal(ArgValue::Size(size.tokens()?)));
        }
        let position = position.unwrap_or_else(|| top_left(self.style.padding));
        self.registry
            .register(OverlayEntry::renderer(field.name(), spec, position));
        Ok(self)
    }

    /// Datetime, elevation, heart rate, bearing, speed and the map.
    pub fn with_defaults(mut self) -> OverlayResult<Self> {
        self.datetime(None)
            .elevation(None)
            .heart(None)
            .bearing(None)
            .speed(None)
            .map(&MapOverlay::default(), None)?;
        Ok(self)
    }

    /// Register a prepared entry.
    pub fn register(&mut self, entry: OverlayEntry) -> &mut Self {
        self.registry.register(entry);
        self
    }

    /// Registry with everything registered so far.
    pub fn finish(self) -> OverlayRegistry {
        self.registry
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/defaults.rs"]
mod tests;
