use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveDateTime;

use crate::foundation::error::{OverlayError, OverlayResult};

/// EXIF `DateTimeOriginal` layout.
pub const EXIF_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// File-name layout used by cameras that name shots after their capture time.
pub const FILENAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Position embedded in an image's metadata.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmbeddedGps {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Meters above sea level, when recorded.
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Camera heading in degrees, when recorded.
    #[serde(default)]
    pub bearing: Option<f64>,
}

/// One input image with its capture instant on the camera clock.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRecord {
    /// Stable identifier, usually the file stem.
    pub id: String,
    /// Image file, absent for records built in memory.
    pub path: Option<PathBuf>,
    /// Seconds on the camera clock (local time read as if it were UTC).
    pub capture_time: f64,
    /// Position from the image metadata, if any.
    pub gps: Option<EmbeddedGps>,
}

impl ImageRecord {
    /// Record without a path or embedded position.
    pub fn new(id: impl Into<String>, capture_time: f64) -> Self {
        Self {
            id: id.into(),
            path: None,
            capture_time,
            gps: None,
        }
    }

    /// Attach an embedded position.
    pub fn with_gps(mut self, lat: f64, lon: f64) -> Self {
        self.gps = Some(EmbeddedGps {
            lat,
            lon,
            elevation: None,
            bearing: None,
        });
        self
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
struct ManifestEntry {
    path: String,
    capture_time: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    elevation: Option<f64>,
    #[serde(default)]
    bearing: Option<f64>,
}

/// Parse a camera-local timestamp (`YYYY:MM:DD HH:MM:SS[.fff]`) into camera-clock seconds.
pub fn parse_exif_time(s: &str) -> OverlayResult<f64> {
    let s = s.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (s, None),
    };
    let dt = NaiveDateTime::parse_from_str(whole, EXIF_TIME_FORMAT)
        .map_err(|e| OverlayError::malformed(format!("bad capture time '{s}': {e}")))?;
    let mut secs = dt.and_utc().timestamp() as f64;
    if let Some(f) = frac {
        let sub: f64 = format!("0.{f}")
            .parse()
            .map_err(|_| OverlayError::malformed(format!("bad sub-second part in '{s}'")))?;
        secs += sub;
    }
    Ok(secs)
}

/// Parse an image metadata manifest.
///
/// The manifest is a JSON array of `{path, capture_time, lat?, lon?, elevation?, bearing?}`
/// entries, standing in for EXIF extraction. Relative paths resolve against `root`. Entries with
/// an unparseable capture time or only half a position are skipped with a warning. The result is
/// ordered by capture time.
pub fn parse_manifest_str(s: &str, root: &Path) -> OverlayResult<Vec<ImageRecord>> {
    let entries: Vec<ManifestEntry> =
        serde_json::from_str(s).map_err(|e| OverlayError::serde(format!("image manifest: {e}")))?;

    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
        match entry_to_record(&e, root) {
            Ok(r) => out.push(r),
            Err(err) => tracing::warn!(path = %e.path, error = %err, "skipping image"),
        }
    }
    out.sort_by(|a, b| a.capture_time.total_cmp(&b.capture_time));
    Ok(out)
}

fn entry_to_record(e: &ManifestEntry, root: &Path) -> OverlayResult<ImageRecord> {
    let capture_time = parse_exif_time(&e.capture_time)?;
    let gps = match (e.lat, e.lon) {
        (Some(lat), Some(lon)) => Some(EmbeddedGps {
            lat,
            lon,
            elevation: e.elevation,
            bearing: e.bearing,
        }),
        (None, None) => None,
        _ => return Err(OverlayError::malformed("image has lat without lon (or vice versa)")),
    };
    let path = root.join(&e.path);
    let id = Path::new(&e.path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| e.path.clone());
    Ok(ImageRecord {
        id,
        path: Some(path),
        capture_time,
        gps,
    })
}

/// Read a manifest file; relative image paths resolve against the manifest's directory.
pub fn read_manifest(path: &Path) -> OverlayResult<Vec<ImageRecord>> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read image manifest '{}'", path.display()))?;
    let root = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest_str(&s, root)
}

/// Collect images from a directory whose file stems are capture times
/// ([`FILENAME_TIME_FORMAT`], e.g. `20171016_080000.JPG`). Other files are skipped.
pub fn scan_image_dir(dir: &Path) -> OverlayResult<Vec<ImageRecord>> {
    let rd = std::fs::read_dir(dir).with_context(|| format!("list '{}'", dir.display()))?;
    let mut out = Vec::new();
    for entry in rd.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match NaiveDateTime::parse_from_str(stem, FILENAME_TIME_FORMAT) {
            Ok(dt) => out.push(ImageRecord {
                id: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                capture_time: dt.and_utc().timestamp() as f64,
                path: Some(path),
                gps: None,
            }),
            Err(_) => tracing::debug!(path = %path.display(), "not a timestamped image"),
        }
    }
    out.sort_by(|a, b| a.capture_time.total_cmp(&b.capture_time));
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/images/manifest.rs"]
mod tests;
