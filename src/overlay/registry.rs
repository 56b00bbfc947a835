use std::collections::BTreeMap;
use std::sync::Arc;

use crate::effects::breaks::BreakState;
use crate::foundation::core::{Canvas, Point};
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::overlay::args::{
    ArgSource, ArgValue, Args, BreakSizing, CallState, DriverContext, Resolved, SizeToken,
    resolve_call, resolve_setup,
};
use crate::render::frame::FrameRGBA;
use crate::sync::store::GpsSnapshot;
use crate::track::point::TrackField;

/// Key under which the map overlay is registered; map entries are always composited first.
pub const MAP_KEY: &str = "map";

/// Snapshot value an overlay reads directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// A track field of the snapshot.
    Telemetry(TrackField),
    /// Grade in percent from the active image record.
    Slope,
    /// Track-clock seconds of the snapshot.
    Time,
}

impl FieldKey {
    /// Parse a field name as used in project files.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slope" => Some(Self::Slope),
            "time" | "datetime" => Some(Self::Time),
            other => TrackField::parse(other).map(Self::Telemetry),
        }
    }

    /// Overlay key used for this field's readout.
    pub fn name(self) -> &'static str {
        match self {
            Self::Telemetry(f) => f.name(),
            Self::Slope => "slope",
            Self::Time => "datetime",
        }
    }

    /// Value of this field in `snap`, if present.
    pub fn read(self, snap: &GpsSnapshot) -> Option<f64> {
        match self {
            Self::Telemetry(f) => snap.field(f),
            Self::Slope => snap.slope,
            Self::Time => Some(snap.time),
        }
    }
}

/// Input handed to an entry's render function.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayData {
    /// A field value.
    Value(f64),
    /// Image produced by a sub-renderer.
    Image(FrameRGBA),
}

/// Value used by the dry-run preview instead of telemetry.
#[derive(Clone, Debug, PartialEq)]
pub enum Sample {
    /// Stand-in for a field value.
    Value(f64),
    /// A flat image of the given size, resolved against the output canvas.
    Solid {
        /// Width and height tokens.
        size: [SizeToken; 2],
        /// Fill color, straight alpha.
        rgba: [u8; 4],
    },
}

/// Turns overlay data into an image; `None` skips the overlay.
pub type RenderFn = Arc<dyn Fn(&OverlayData) -> OverlayResult<Option<FrameRGBA>> + Send + Sync>;
/// Top-left corner of a clip given its image and the output size.
pub type PositionFn = Arc<dyn Fn(&FrameRGBA, Canvas) -> Point + Send + Sync>;

/// Render function that passes sub-renderer images through unchanged.
pub fn passthrough() -> RenderFn {
    Arc::new(|data: &OverlayData| {
        Ok(match data {
            OverlayData::Image(img) => Some(img.clone()),
            OverlayData::Value(_) => None,
        })
    })
}

/// A stateful renderer constructed once per registry build.
pub trait SubRenderer: Send {
    /// Size of the produced image outside breaks.
    fn size(&self) -> (u32, u32);
    /// Render with per-frame arguments; `None` skips the overlay for this frame.
    fn render(&mut self, args: &Args) -> OverlayResult<Option<FrameRGBA>>;
}

/// Builds a sub-renderer from resolved constructor arguments.
pub type RendererCtor =
    Arc<dyn Fn(&Args) -> OverlayResult<Box<dyn SubRenderer>> + Send + Sync>;

/// Named sub-renderer constructors.
#[derive(Clone, Default)]
pub struct RendererFactory {
    ctors: BTreeMap<String, RendererCtor>,
}

impl std::fmt::Debug for RendererFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.ctors.keys()).finish()
    }
}

impl RendererFactory {
    /// Empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the constructor called `name`.
    pub fn register(&mut self, name: impl Into<String>, ctor: RendererCtor) {
        self.ctors.insert(name.into(), ctor);
    }

    /// Builder form of [`RendererFactory::register`].
    pub fn with(mut self, name: impl Into<String>, ctor: RendererCtor) -> Self {
        self.register(name, ctor);
        self
    }

    /// Call the constructor `name`; unknown names are a configuration error.
    pub fn construct(&self, name: &str, args: &Args) -> OverlayResult<Box<dyn SubRenderer>> {
        let ctor = self.ctors.get(name).ok_or_else(|| {
            OverlayError::configuration(format!("unknown sub-renderer '{name}'"))
        })?;
        ctor(args)
    }
}

/// Declaration of a sub-renderer: which constructor to call with what, and what to pass per
/// frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererSpec {
    /// Constructor name in the [`RendererFactory`].
    pub factory: String,
    /// Arguments resolved once at build time.
    pub constructor: BTreeMap<String, ArgSource>,
    /// Arguments resolved for every frame.
    pub call: BTreeMap<String, ArgSource>,
}

impl RendererSpec {
    /// Spec without arguments.
    pub fn new(factory: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            constructor: BTreeMap::new(),
            call: BTreeMap::new(),
        }
    }

    /// Add a constructor argument.
    pub fn ctor_arg(mut self, name: impl Into<String>, source: ArgSource) -> Self {
        self.constructor.insert(name.into(), source);
        self
    }

    /// Add a per-frame argument.
    pub fn call_arg(mut self, name: impl Into<String>, source: ArgSource) -> Self {
        self.call.insert(name.into(), source);
        self
    }
}

/// Where an entry's data comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum DataSource {
    /// Read a snapshot field.
    Field(FieldKey),
    /// Call a sub-renderer.
    Renderer(RendererSpec),
}

/// One overlay: where its data comes from, how it becomes an image, where the image goes.
#[derive(Clone)]
pub struct OverlayEntry {
    /// Unique name; also orders the composition (see [`MAP_KEY`]).
    pub key: String,
    /// Data source.
    pub data: DataSource,
    /// Data to image.
    pub render: RenderFn,
    /// Placement.
    pub position: PositionFn,
    /// Zoom/pan with break transitions.
    pub break_aware: bool,
    /// Preview stand-in for the data.
    pub sample: Option<Sample>,
}

impl std::fmt::Debug for OverlayEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayEntry")
            .field("key", &self.key)
            .field("data", &self.data)
            .field("break_aware", &self.break_aware)
            .finish_non_exhaustive()
    }
}

impl OverlayEntry {
    /// Overlay reading `field` from the snapshot.
    pub fn field(
        key: impl Into<String>,
        field: FieldKey,
        render: RenderFn,
        position: PositionFn,
    ) -> Self {
        Self {
            key: key.into(),
            data: DataSource::Field(field),
            render,
            position,
            break_aware: false,
            sample: None,
        }
    }

    /// Overlay backed by a sub-renderer, passing its images through.
    pub fn renderer(key: impl Into<String>, spec: RendererSpec, position: PositionFn) -> Self {
        Self {
            key: key.into(),
            data: DataSource::Renderer(spec),
            render: passthrough(),
            position,
            break_aware: false,
            sample: None,
        }
    }

    /// Replace the render function.
    pub fn with_render(mut self, render: RenderFn) -> Self {
        self.render = render;
        self
    }

    /// Enable break transitions.
    pub fn with_break_support(mut self, on: bool) -> Self {
        self.break_aware = on;
        self
    }

    /// Set the preview stand-in.
    pub fn with_sample(mut self, sample: Sample) -> Self {
        self.sample = Some(sample);
        self
    }
}

/// Declared overlays, before any sub-renderer exists.
#[derive(Clone, Debug, Default)]
pub struct OverlayRegistry {
    entries: Vec<OverlayEntry>,
    factory: RendererFactory,
}

impl OverlayRegistry {
    /// Empty registry constructing sub-renderers from `factory`.
    pub fn new(factory: RendererFactory) -> Self {
        Self {
            entries: Vec::new(),
            factory,
        }
    }

    /// Add an entry; entries with the same key are all kept.
    pub fn register(&mut self, entry: OverlayEntry) {
        self.entries.push(entry);
    }

    /// Constructors available to [`Self::build`].
    pub fn factory(&self) -> &RendererFactory {
        &self.factory
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct keys registered so far.
    pub fn key_count(&self) -> usize {
        let mut keys: Vec<&str> = self.entries.iter().map(|e| e.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        keys.len()
    }

    /// True iff the entry declares a sub-renderer that must be constructed by [`Self::build`].
    pub fn needs_init(entry: &OverlayEntry) -> bool {
        matches!(entry.data, DataSource::Renderer(_))
    }

    /// Entries in composition order: every `map` entry first, then the rest in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &OverlayEntry> {
        let maps = self.entries.iter().filter(|e| e.key == MAP_KEY);
        let rest = self.entries.iter().filter(|e| e.key != MAP_KEY);
        maps.chain(rest)
    }

    /// Keys in composition order.
    pub fn keys(&self) -> Vec<&str> {
        self.iter().map(|e| e.key.as_str()).collect()
    }

    /// Construct every sub-renderer exactly once, resolving constructor arguments and driver
    /// state references. Fails on the first unresolvable argument or unknown constructor.
    #[tracing::instrument(skip_all, fields(entries = self.entries.len()))]
    pub fn build(&self, ctx: &DriverContext) -> OverlayResult<ReadyRegistry> {
        let mut ready = Vec::with_capacity(self.entries.len());
        for entry in self.iter() {
            let data = match &entry.data {
                DataSource::Field(k) => ReadyData::Field(*k),
                DataSource::Renderer(spec) => {
                    let mut args = Args::new();
                    for (name, source) in &spec.constructor {
                        args.set(name.clone(), resolve_setup(name, source, ctx)?);
                    }
                    let renderer = self.factory.construct(&spec.factory, &args).map_err(|e| {
                        match e {
                            OverlayError::Configuration(msg) => OverlayError::configuration(
                                format!("overlay '{}': {msg}", entry.key),
                            ),
                            other => other,
                        }
                    })?;

                    let mut call = BTreeMap::new();
                    for (name, source) in &spec.call {
                        let source = match source {
                            ArgSource::DriverState(_) | ArgSource::Literal(ArgValue::Size(_)) => {
                                ArgSource::Literal(resolve_setup(name, source, ctx)?)
                            }
                            other => other.clone(),
                        };
                        call.insert(name.clone(), source);
                    }
                    tracing::debug!(
                        key = %entry.key,
                        factory = %spec.factory,
                        "sub-renderer ready"
                    );
                    ReadyData::Renderer { renderer, call }
                }
            };
            ready.push(ReadyEntry {
                key: entry.key.clone(),
                data,
                render: entry.render.clone(),
                position: entry.position.clone(),
                break_aware: entry.break_aware,
                sample: entry.sample.clone(),
            });
        }
        Ok(ReadyRegistry { entries: ready })
    }
}

enum ReadyData {
    Field(FieldKey),
    Renderer {
        renderer: Box<dyn SubRenderer>,
        call: BTreeMap<String, ArgSource>,
    },
}

/// Per-frame inputs for [`ReadyEntry::get_clip`].
#[derive(Clone, Copy, Debug)]
pub struct ClipContext<'a> {
    /// Telemetry at this frame.
    pub snapshot: &'a GpsSnapshot,
    /// Lower bracket index into the track.
    pub bracket_index: usize,
    /// Output frame size.
    pub canvas: Canvas,
    /// Break status at this frame.
    pub brk: BreakState,
    /// Break fade length, display seconds.
    pub effect_length: f64,
}

/// A positioned overlay image.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    /// Key of the entry that produced it.
    pub key: String,
    /// Overlay image.
    pub frame: FrameRGBA,
    /// Top-left corner on the output frame.
    pub position: Point,
}

/// An overlay whose sub-renderer (if any) is constructed.
pub struct ReadyEntry {
    key: String,
    data: ReadyData,
    render: RenderFn,
    position: PositionFn,
    break_aware: bool,
    sample: Option<Sample>,
}

impl ReadyEntry {
    /// Key of the entry.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// `true` if the entry follows break transitions.
    pub fn is_break_aware(&self) -> bool {
        self.break_aware
    }

    /// Data, render, position. Returns `None` when data or image is missing.
    pub fn get_clip(&mut self, ctx: &ClipContext<'_>) -> OverlayResult<Option<Clip>> {
        let breaking = self.break_aware && ctx.brk.is_active();
        let transition = ctx.brk.transition(ctx.effect_length);

        let data = match &mut self.data {
            ReadyData::Field(k) => match k.read(ctx.snapshot) {
                Some(v) => OverlayData::Value(v),
                None => return Ok(None),
            },
            ReadyData::Renderer { renderer, call } => {
                let break_sizing = breaking.then(|| BreakSizing {
                    transition,
                    normal: renderer.size(),
                    full: (ctx.canvas.width, ctx.canvas.height),
                    elapsed: ctx.brk.elapsed,
                });
                let state = CallState {
                    snapshot: ctx.snapshot,
                    bracket_index: ctx.bracket_index,
                    break_sizing,
                };

                let mut args = Args::new();
                for (name, source) in call.iter() {
                    match resolve_call(source, &state) {
                        Resolved::Value(v) => args.set(name.clone(), v),
                        Resolved::Absent if matches!(source, ArgSource::Telemetry(_)) => {
                            return Ok(None);
                        }
                        Resolved::Absent => {}
                    }
                }
                if let Some(sizing) = break_sizing {
                    let (w, h) = sizing.size();
                    if !args.contains("width") {
                        args.set("width", ArgValue::Number(f64::from(w)));
                    }
                    if !args.contains("height") {
                        args.set("height", ArgValue::Number(f64::from(h)));
                    }
                }

                match renderer.render(&args)? {
                    Some(img) => OverlayData::Image(img),
                    None => return Ok(None),
                }
            }
        };

        let Some(frame) = (self.render)(&data)? else {
            return Ok(None);
        };
        let normal = (self.position)(&frame, ctx.canvas);
        let position = if breaking {
            transition.position(normal, ctx.brk.elapsed)
        } else {
            normal
        };
        Ok(Some(Clip {
            key: self.key.clone(),
            frame,
            position,
        }))
    }

    /// Clip built from the entry's sample value, without telemetry.
    pub fn sample_clip(&self, canvas: Canvas) -> OverlayResult<Option<Clip>> {
        let data = match &self.sample {
            Some(Sample::Value(v)) => OverlayData::Value(*v),
            Some(Sample::Solid { size, rgba }) => OverlayData::Image(FrameRGBA::solid(
                size[0].resolve(canvas),
                size[1].resolve(canvas),
                *rgba,
            )),
            None => return Ok(None),
        };
        let Some(frame) = (self.render)(&data)? else {
            return Ok(None);
        };
        let position = (self.position)(&frame, canvas);
        Ok(Some(Clip {
            key: self.key.clone(),
            frame,
            position,
        }))
    }
}

/// Entries ready to render, already in composition order.
pub struct ReadyRegistry {
    entries: Vec<ReadyEntry>,
}

impl ReadyRegistry {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in composition order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.key.as_str()).collect()
    }

    /// Entries in composition order.
    pub fn entries(&self) -> &[ReadyEntry] {
        &self.entries
    }

    /// Clips for one frame in composition order; entries without data are left out.
    pub fn clips(&mut self, ctx: &ClipContext<'_>) -> OverlayResult<Vec<Clip>> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            if let Some(clip) = entry.get_clip(ctx)? {
                out.push(clip);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/registry.rs"]
mod tests;
