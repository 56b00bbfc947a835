use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::effects::breaks::BreakTransition;
use crate::foundation::core::Canvas;
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::sync::store::GpsSnapshot;
use crate::track::point::TrackField;

/// One axis of an output-relative size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeToken {
    /// Fixed pixel count.
    Px(u32),
    /// Output width.
    W,
    /// Output height.
    H,
}

impl SizeToken {
    /// Parse `"W"`, `"H"` (any case) or a pixel count. Anything else is a configuration error.
    pub fn parse(s: &str) -> OverlayResult<Self> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("w") {
            return Ok(Self::W);
        }
        if t.eq_ignore_ascii_case("h") {
            return Ok(Self::H);
        }
        t.parse::<u32>().map(Self::Px).map_err(|_| {
            OverlayError::configuration(format!(
                "unsupported size token '{s}': expected an integer, 'W' or 'H'"
            ))
        })
    }

    /// Pixel length on `canvas`.
    pub fn resolve(self, canvas: Canvas) -> u32 {
        match self {
            Self::Px(v) => v,
            Self::W => canvas.width,
            Self::H => canvas.height,
        }
    }
}

/// One axis of a size as written in a project file.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum SizeDim {
    /// Pixel count.
    Px(u32),
    /// `"W"` or `"H"`; checked by [`SizeSpec::tokens`].
    Name(String),
}

/// `[width, height]` as written in a project file, e.g. `[300, 200]` or `["W", 150]`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SizeSpec(pub [SizeDim; 2]);

impl SizeSpec {
    /// Fixed pixel size.
    pub const fn px(width: u32, height: u32) -> Self {
        Self([SizeDim::Px(width), SizeDim::Px(height)])
    }

    /// Unknown names are a configuration error.
    pub fn tokens(&self) -> OverlayResult<[SizeToken; 2]> {
        let tok = |d: &SizeDim| match d {
            SizeDim::Px(v) => Ok(SizeToken::Px(*v)),
            SizeDim::Name(s) => SizeToken::parse(s),
        };
        Ok([tok(&self.0[0])?, tok(&self.0[1])?])
    }

    /// Pixel size on `canvas`.
    pub fn resolve(&self, canvas: Canvas) -> OverlayResult<(u32, u32)> {
        let [w, h] = self.tokens()?;
        Ok((w.resolve(canvas), h.resolve(canvas)))
    }
}

/// A resolved argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    /// Flag.
    Bool(bool),
    /// Any number; integers included.
    Number(f64),
    /// String.
    Text(String),
    /// File system path.
    Path(PathBuf),
    /// Width and height, possibly output-relative.
    Size([SizeToken; 2]),
    /// Numeric series, e.g. a whole track field.
    Series(Vec<f64>),
    /// Nested values, addressed with dotted paths.
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Convert plain JSON into a value. Two-element arrays containing a `"W"`/`"H"` string become
    /// sizes; numeric arrays become series.
    pub fn from_json(v: &serde_json::Value) -> OverlayResult<Self> {
        use serde_json::Value;
        Ok(match v {
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.as_f64().ok_or_else(|| {
                OverlayError::configuration(format!("number {n} out of range"))
            })?),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) if items.iter().all(Value::is_number) => Self::Series(
                items.iter().filter_map(Value::as_f64).collect(),
            ),
            Value::Array(items) if items.len() == 2 => {
                let tok = |v: &Value| match v {
                    Value::String(s) => SizeToken::parse(s),
                    Value::Number(n) => n
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .map(SizeToken::Px)
                        .ok_or_else(|| {
                            OverlayError::configuration(format!("unsupported size token {n}"))
                        }),
                    other => Err(OverlayError::configuration(format!(
                        "unsupported size token {other}"
                    ))),
                };
                Self::Size([tok(&items[0])?, tok(&items[1])?])
            }
            Value::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), Self::from_json(v)?)))
                    .collect::<OverlayResult<_>>()?,
            ),
            other => {
                return Err(OverlayError::configuration(format!(
                    "unsupported argument value {other}"
                )));
            }
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Path(_) => "path",
            Self::Size(_) => "size",
            Self::Series(_) => "series",
            Self::Map(_) => "map",
        }
    }
}

/// Output axis of a break-interpolated size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Output width.
    Width,
    /// Output height.
    Height,
}

/// Where an argument's value comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgSource {
    /// Fixed value; sizes are resolved against the canvas at build time.
    Literal(ArgValue),
    /// Named pipeline state, optionally with a nested key (`track.elevation`).
    DriverState(String),
    /// Snapshot field at the frame being rendered.
    Telemetry(TrackField),
    /// Lower bracket index of the current snapshot.
    BracketIndex,
    /// Size along one axis while a break transition is active.
    BreakInterpolated(Axis),
}

impl ArgSource {
    /// Shorthand for [`ArgSource::Literal`].
    pub fn literal(v: ArgValue) -> Self {
        Self::Literal(v)
    }

    /// Numeric literal.
    pub fn number(v: f64) -> Self {
        Self::Literal(ArgValue::Number(v))
    }

    /// Driver state at `path`.
    pub fn driver(path: impl Into<String>) -> Self {
        Self::DriverState(path.into())
    }

    /// Parse a configuration value.
    ///
    /// Objects with a single `driver`, `telemetry`, `index` or `break` key select a non-literal
    /// source; everything else is a literal (see [`ArgValue::from_json`]).
    pub fn from_json(v: &serde_json::Value) -> OverlayResult<Self> {
        if let Some(obj) = v.as_object()
            && obj.len() == 1
            && let Some((k, inner)) = obj.iter().next()
        {
            let name = inner.as_str();
            match (k.as_str(), name) {
                ("driver", Some(path)) => return Ok(Self::DriverState(path.to_owned())),
                ("telemetry", Some(field)) => {
                    let f = TrackField::parse(field).ok_or_else(|| {
                        OverlayError::configuration(format!("unknown telemetry field '{field}'"))
                    })?;
                    return Ok(Self::Telemetry(f));
                }
                ("index", Some("bracket")) => return Ok(Self::BracketIndex),
                ("break", Some("width")) => return Ok(Self::BreakInterpolated(Axis::Width)),
                ("break", Some("height")) => return Ok(Self::BreakInterpolated(Axis::Height)),
                ("driver" | "telemetry" | "index" | "break", _) => {
                    return Err(OverlayError::configuration(format!(
                        "invalid argument source {v}"
                    )));
                }
                _ => {}
            }
        }
        Ok(Self::Literal(ArgValue::from_json(v)?))
    }
}

/// Named pipeline state visible to overlay setup.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DriverContext {
    values: BTreeMap<String, ArgValue>,
    canvas: Option<Canvas>,
}

impl DriverContext {
    /// Context with `width`, `height` and `size` for `canvas`.
    pub fn new(canvas: Canvas) -> Self {
        let mut ctx = Self {
            values: BTreeMap::new(),
            canvas: Some(canvas),
        };
        ctx.insert("width", ArgValue::Number(f64::from(canvas.width)));
        ctx.insert("height", ArgValue::Number(f64::from(canvas.height)));
        ctx.insert("size", ArgValue::Size([SizeToken::W, SizeToken::H]));
        ctx
    }

    /// Add or replace a named value.
    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    /// Output size, when known.
    pub fn canvas(&self) -> Option<Canvas> {
        self.canvas
    }

    /// Look up `name` or `name.key[.key...]` in nested maps.
    pub fn lookup(&self, path: &str) -> Option<&ArgValue> {
        let mut parts = path.split('.');
        let mut cur = self.values.get(parts.next()?)?;
        for part in parts {
            match cur {
                ArgValue::Map(m) => cur = m.get(part)?,
                _ => return None,
            }
        }
        Some(cur)
    }

    /// Resolve a size literal against the canvas.
    pub fn resolve_size(&self, size: [SizeToken; 2]) -> OverlayResult<(u32, u32)> {
        let canvas = self.canvas.ok_or_else(|| {
            OverlayError::configuration("output-relative sizes need a canvas")
        })?;
        Ok((size[0].resolve(canvas), size[1].resolve(canvas)))
    }
}

/// Keyword arguments handed to a sub-renderer, with typed accessors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args {
    values: BTreeMap<String, ArgValue>,
}

impl Args {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace `name`.
    pub fn set(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of [`Args::set`].
    pub fn with(mut self, name: impl Into<String>, value: ArgValue) -> Self {
        self.set(name, value);
        self
    }

    /// `true` if `name` was passed.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Raw value of `name`.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    fn required(&self, name: &str) -> OverlayResult<&ArgValue> {
        self.values
            .get(name)
            .ok_or_else(|| OverlayError::configuration(format!("missing argument '{name}'")))
    }

    fn mismatch(name: &str, want: &str, got: &ArgValue) -> OverlayError {
        OverlayError::configuration(format!(
            "argument '{name}' must be a {want}, got {}",
            got.kind()
        ))
    }

    /// Required number.
    pub fn number(&self, name: &str) -> OverlayResult<f64> {
        match self.required(name)? {
            ArgValue::Number(v) => Ok(*v),
            other => Err(Self::mismatch(name, "number", other)),
        }
    }

    /// Number if present; a value of another kind is an error.
    pub fn opt_number(&self, name: &str) -> OverlayResult<Option<f64>> {
        if self.contains(name) {
            self.number(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Required string.
    pub fn text(&self, name: &str) -> OverlayResult<&str> {
        match self.required(name)? {
            ArgValue::Text(s) => Ok(s),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    /// String if present.
    pub fn opt_text(&self, name: &str) -> OverlayResult<Option<&str>> {
        if self.contains(name) {
            self.text(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Required path; strings are accepted.
    pub fn path(&self, name: &str) -> OverlayResult<PathBuf> {
        match self.required(name)? {
            ArgValue::Path(p) => Ok(p.clone()),
            ArgValue::Text(s) => Ok(PathBuf::from(s)),
            other => Err(Self::mismatch(name, "path", other)),
        }
    }

    /// Path if present.
    pub fn opt_path(&self, name: &str) -> OverlayResult<Option<PathBuf>> {
        if self.contains(name) {
            self.path(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Flag, `default` when absent.
    pub fn bool_or(&self, name: &str, default: bool) -> OverlayResult<bool> {
        match self.values.get(name) {
            None => Ok(default),
            Some(ArgValue::Bool(b)) => Ok(*b),
            Some(other) => Err(Self::mismatch(name, "bool", other)),
        }
    }

    /// Pixel size; sizes must be resolved to `Px` before reaching a renderer.
    pub fn size(&self, name: &str) -> OverlayResult<(u32, u32)> {
        match self.required(name)? {
            ArgValue::Size([SizeToken::Px(w), SizeToken::Px(h)]) => Ok((*w, *h)),
            ArgValue::Series(s) if s.len() == 2 && s.iter().all(|v| *v >= 0.0) => {
                Ok((s[0].round() as u32, s[1].round() as u32))
            }
            ArgValue::Size(_) => Err(OverlayError::configuration(format!(
                "argument '{name}' still has unresolved W/H tokens"
            ))),
            other => Err(Self::mismatch(name, "size", other)),
        }
    }

    /// Required numeric series.
    pub fn series(&self, name: &str) -> OverlayResult<&[f64]> {
        match self.required(name)? {
            ArgValue::Series(s) => Ok(s),
            other => Err(Self::mismatch(name, "series", other)),
        }
    }
}

/// Break-driven size of the entry being rendered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BreakSizing {
    /// Fade parameters of the active break.
    pub transition: BreakTransition,
    /// Size outside breaks.
    pub normal: (u32, u32),
    /// Output size.
    pub full: (u32, u32),
    /// Display seconds since the image started.
    pub elapsed: f64,
}

impl BreakSizing {
    /// Size at `elapsed`.
    pub fn size(&self) -> (u32, u32) {
        self.transition.size(self.normal, self.full, self.elapsed)
    }
}

/// Per-frame inputs for call-time argument sources.
#[derive(Clone, Copy, Debug)]
pub struct CallState<'a> {
    /// Telemetry at this frame.
    pub snapshot: &'a GpsSnapshot,
    /// Lower bracket index into the track.
    pub bracket_index: usize,
    /// Present while break support is active for the entry.
    pub break_sizing: Option<BreakSizing>,
}

/// Result of resolving one call-time source.
pub(crate) enum Resolved {
    Value(ArgValue),
    /// The source has no value right now (missing telemetry, no active break).
    Absent,
}

/// Resolve a constructor argument at build time. Only literals and driver state are available.
pub(crate) fn resolve_setup(
    name: &str,
    source: &ArgSource,
    ctx: &DriverContext,
) -> OverlayResult<ArgValue> {
    match source {
        ArgSource::Literal(ArgValue::Size(s)) => {
            let (w, h) = ctx.resolve_size(*s)?;
            Ok(ArgValue::Size([SizeToken::Px(w), SizeToken::Px(h)]))
        }
        ArgSource::Literal(v) => Ok(v.clone()),
        ArgSource::DriverState(path) => match ctx.lookup(path) {
            Some(ArgValue::Size(s)) => {
                let (w, h) = ctx.resolve_size(*s)?;
                Ok(ArgValue::Size([SizeToken::Px(w), SizeToken::Px(h)]))
            }
            Some(v) => Ok(v.clone()),
            None => Err(OverlayError::configuration(format!(
                "argument '{name}': driver state '{path}' is not available"
            ))),
        },
        other => Err(OverlayError::configuration(format!(
            "argument '{name}': {other:?} is only available when rendering"
        ))),
    }
}

/// Resolve a call-time argument for one frame.
pub(crate) fn resolve_call(source: &ArgSource, state: &CallState<'_>) -> Resolved {
    match source {
        ArgSource::Literal(v) => Resolved::Value(v.clone()),
        // Driver state was substituted at build time.
        ArgSource::DriverState(_) => Resolved::Absent,
        ArgSource::Telemetry(f) => match state.snapshot.field(*f) {
            Some(v) => Resolved::Value(ArgValue::Number(v)),
            None => Resolved::Absent,
        },
        ArgSource::BracketIndex => Resolved::Value(ArgValue::Number(state.bracket_index as f64)),
        ArgSource::BreakInterpolated(axis) => match state.break_sizing {
            Some(sizing) => {
                let (w, h) = sizing.size();
                Resolved::Value(ArgValue::Number(f64::from(match axis {
                    Axis::Width => w,
                    Axis::Height => h,
                })))
            }
            None => Resolved::Absent,
        },
    }
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/args.rs"]
mod tests;
