use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use anyhow::Context as _;
use chrono::DateTime;
use quick_xml::{Reader, events::Event};

use crate::foundation::error::{OverlayError, OverlayResult};
use crate::track::point::{RawFix, Track};

/// Options for reading GPX files.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GpxOptions {
    /// Hours added to the GPX UTC timestamps so the track clock matches the camera's local clock.
    pub utc_offset_hours: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Ele,
    Time,
    Heart,
    Speed,
}

#[derive(Default)]
struct PendingFix {
    lat: Option<String>,
    lon: Option<String>,
    ele: Option<String>,
    time: Option<String>,
    heart: Option<String>,
    speed: Option<String>,
}

/// Parse GPX text into a [`Track`].
///
/// Track points (`trkpt`) and waypoints (`wpt`) are both read. A point with a bad or missing
/// `lat`/`lon`/`time` is skipped with a warning; a missing `<ele>` reads as 0. Heart rate comes
/// from any `*:hr` extension element.
pub fn parse_gpx_str(s: &str, opts: GpxOptions) -> OverlayResult<Track> {
    let mut reader = Reader::from_str(s);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut pending: Option<PendingFix> = None;
    let mut field: Option<Field> = None;
    let mut fixes = Vec::new();
    let mut skipped = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                if name == b"trkpt" || name == b"wpt" {
                    let mut p = PendingFix::default();
                    for a in e.attributes().flatten() {
                        let value = String::from_utf8_lossy(&a.value).into_owned();
                        match a.key.local_name().as_ref() {
                            b"lat" => p.lat = Some(value),
                            b"lon" => p.lon = Some(value),
                            _ => {}
                        }
                    }
                    pending = Some(p);
                } else if pending.is_some() {
                    field = match name {
                        b"ele" => Some(Field::Ele),
                        b"time" => Some(Field::Time),
                        b"hr" | b"heartrate" => Some(Field::Heart),
                        b"speed" => Some(Field::Speed),
                        _ => None,
                    };
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(p), Some(f)) = (pending.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_default();
                    match f {
                        Field::Ele => p.ele = Some(text),
                        Field::Time => p.time = Some(text),
                        Field::Heart => p.heart = Some(text),
                        Field::Speed => p.speed = Some(text),
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                if name == b"trkpt" || name == b"wpt" {
                    if let Some(p) = pending.take() {
                        match finish_fix(&p, opts) {
                            Ok(fix) => fixes.push(fix),
                            Err(err) => {
                                skipped += 1;
                                tracing::warn!(error = %err, "skipping GPX point");
                            }
                        }
                    }
                }
                field = None;
            }
            Ok(_) => {}
            Err(e) => {
                return Err(OverlayError::malformed(format!(
                    "GPX parse error at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
        buf.clear();
    }

    if skipped > 0 {
        tracing::warn!(skipped, kept = fixes.len(), "GPX points skipped");
    }
    if fixes.is_empty() {
        return Err(OverlayError::validation("GPX contains no usable points"));
    }
    Track::from_fixes(fixes)
}

fn finish_fix(p: &PendingFix, opts: GpxOptions) -> OverlayResult<RawFix> {
    fn number(v: &Option<String>, what: &str) -> OverlayResult<f64> {
        let s = v
            .as_deref()
            .ok_or_else(|| OverlayError::malformed(format!("missing {what}")))?;
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| OverlayError::malformed(format!("bad {what} '{s}'")))
    }

    let lat = number(&p.lat, "lat")?;
    let lon = number(&p.lon, "lon")?;
    let time_txt = p
        .time
        .as_deref()
        .ok_or_else(|| OverlayError::malformed("missing time"))?;
    let dt = DateTime::parse_from_rfc3339(time_txt.trim())
        .map_err(|e| OverlayError::malformed(format!("bad time '{time_txt}': {e}")))?;
    let utc_secs = dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_micros()) / 1e6;

    let elevation = if p.ele.is_some() {
        number(&p.ele, "ele")?
    } else {
        0.0
    };
    let heart = p.heart.as_ref().and_then(|s| s.trim().parse::<f64>().ok());
    let speed = p.speed.as_ref().and_then(|s| s.trim().parse::<f64>().ok());

    Ok(RawFix {
        time: utc_secs + opts.utc_offset_hours * 3600.0,
        lat,
        lon,
        elevation,
        speed,
        heart,
    })
}

/// Read and parse a GPX file.
pub fn read_gpx_file(path: &Path, opts: GpxOptions) -> OverlayResult<Track> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read GPX '{}'", path.display()))?;
    parse_gpx_str(&s, opts)
}

/// Parsed-track cache keyed by file path and modification time.
///
/// Passed explicitly into loaders; an entry is reused only while the file's mtime and the
/// requested [`GpxOptions`] are unchanged.
#[derive(Debug, Default)]
pub struct TrackCache {
    entries: HashMap<PathBuf, CachedTrack>,
    loads: usize,
}

#[derive(Debug)]
struct CachedTrack {
    modified: SystemTime,
    opts: GpxOptions,
    track: Arc<Track>,
}

impl TrackCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached track for `path`, parsing it when missing or stale.
    pub fn load(&mut self, path: &Path, opts: GpxOptions) -> OverlayResult<Arc<Track>> {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .with_context(|| format!("stat GPX '{}'", path.display()))?;

        if let Some(c) = self.entries.get(path)
            && c.modified == modified
            && c.opts == opts
        {
            tracing::debug!(path = %path.display(), "track cache hit");
            return Ok(Arc::clone(&c.track));
        }

        let track = Arc::new(read_gpx_file(path, opts)?);
        self.loads += 1;
        self.entries.insert(
            path.to_path_buf(),
            CachedTrack {
                modified,
                opts,
                track: Arc::clone(&track),
            },
        );
        Ok(track)
    }

    /// Number of times a file was actually parsed.
    pub fn load_count(&self) -> usize {
        self.loads
    }
}

#[cfg(test)]
#[path = "../../tests/unit/track/gpx.rs"]
mod tests;
