use std::sync::Arc;

use crate::foundation::error::{OverlayError, OverlayResult};
use crate::images::manifest::ImageRecord;
use crate::sync::capture::estimate_sub_second_times;
use crate::sync::offset::{DEFAULT_MAX_DIFF, resolve_offset};
use crate::track::geo::distance_3d_m;
use crate::track::point::{Track, TrackField};

/// Minimum distance between the two ends of a gap for it to count as a break, in meters.
pub const BREAK_MIN_DISTANCE_M: f64 = 10.0;

/// Break predicate on a raw gap (seconds before speedup) and the distance covered across it.
pub fn break_condition(
    gap_seconds: f64,
    distance_m: f64,
    effect_length: f64,
    speedup_factor: f64,
) -> bool {
    gap_seconds / speedup_factor > 2.0 * effect_length + 2.0 && distance_m > BREAK_MIN_DISTANCE_M
}

/// Knobs for image-synchronized construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncParams {
    /// Initial clock offset guess (camera clock minus track clock), seconds.
    pub time_offset: f64,
    /// Seconds between shots for sub-second capture estimation; `0` keeps EXIF times.
    pub interval: f64,
    /// Largest offset correction in seconds tried around `time_offset`.
    pub max_diff: u32,
}

impl Default for SyncParams {
    fn default() -> Self {
        Self {
            time_offset: 0.0,
            interval: 0.0,
            max_diff: DEFAULT_MAX_DIFF,
        }
    }
}

/// Telemetry at one image's capture instant.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncedRecord {
    /// Identifier of the source image.
    pub image_id: String,
    /// Camera clock seconds (after sub-second estimation).
    pub capture_time: f64,
    /// Camera clock minus track clock, seconds.
    pub offset: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Heading in degrees.
    pub bearing: f64,
    /// Meters above sea level.
    pub elevation: f64,
    /// Meters per second.
    pub speed: f64,
    /// Beats per minute, when the track has heart rate.
    pub heart: Option<f64>,
    /// Grade in percent from the previous record.
    pub slope: f64,
    /// `false` when the offset was inherited instead of matched against embedded GPS.
    pub matched: bool,
}

/// Interpolated telemetry at one query instant.
#[derive(Clone, Debug, PartialEq)]
pub struct GpsSnapshot {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Heading in degrees.
    pub bearing: f64,
    /// Meters above sea level.
    pub elevation: f64,
    /// Meters per second.
    pub speed: f64,
    /// Beats per minute, when the track has heart rate.
    pub heart: Option<f64>,
    /// Track clock seconds the snapshot was taken at.
    pub time: f64,
    /// Active image, if any.
    pub image_id: Option<String>,
    /// Grade in percent, from the active image record.
    pub slope: Option<f64>,
    /// Clock offset in effect, seconds.
    pub offset: f64,
}

impl GpsSnapshot {
    /// Value of `field`; `None` for a missing heart rate.
    pub fn field(&self, field: TrackField) -> Option<f64> {
        match field {
            TrackField::Lat => Some(self.lat),
            TrackField::Lon => Some(self.lon),
            TrackField::Bearing => Some(self.bearing),
            TrackField::Elevation => Some(self.elevation),
            TrackField::Speed => Some(self.speed),
            TrackField::Heart => self.heart,
        }
    }
}

/// Owns the track and the per-image synchronized records.
///
/// Snapshot queries take seconds measured from the store's origin: the first image's capture
/// instant in synchronized mode, or the configured start time in track-only mode. Both are on the
/// camera clock, so the matching offset is subtracted exactly once to reach the track clock.
#[derive(Clone, Debug)]
pub struct TrackDataStore {
    track: Arc<Track>,
    records: Vec<SyncedRecord>,
    origin: f64,
    time_offset: f64,
}

impl TrackDataStore {
    /// Build one [`SyncedRecord`] per image, resolving clock offsets sequentially.
    ///
    /// Each search is seeded with the previous record's offset. Images without embedded GPS, and
    /// images whose search is exhausted, inherit that offset (the first image inherits
    /// `params.time_offset`).
    #[tracing::instrument(skip_all, fields(images = images.len()))]
    pub fn synchronized(
        track: Arc<Track>,
        images: &[ImageRecord],
        params: SyncParams,
    ) -> OverlayResult<Self> {
        if images.is_empty() {
            return Err(OverlayError::validation(
                "synchronized mode needs at least one image",
            ));
        }
        let exif_times: Vec<f64> = images.iter().map(|r| r.capture_time).collect();
        let capture_times = estimate_sub_second_times(&exif_times, params.interval)?;

        let mut records: Vec<SyncedRecord> = Vec::with_capacity(images.len());
        for (img, &capture_time) in images.iter().zip(&capture_times) {
            let prior = records.last().map_or(params.time_offset, |r| r.offset);
            let (offset, matched) = match img.gps {
                Some(gps) => match resolve_offset(
                    &track,
                    capture_time,
                    gps.lat,
                    gps.lon,
                    prior,
                    params.max_diff,
                ) {
                    Ok(o) => (o, true),
                    Err(err) if err.is_recoverable() => {
                        tracing::warn!(
                            image = %img.id,
                            prior,
                            error = %err,
                            "reusing previous offset"
                        );
                        (prior, false)
                    }
                    Err(err) => return Err(err),
                },
                None => (prior, false),
            };

            let at = track.sample_clamped(capture_time - offset);
            let slope = match records.last() {
                Some(prev) => {
                    let dist = distance_3d_m(
                        prev.lat,
                        prev.lon,
                        prev.elevation,
                        at.lat,
                        at.lon,
                        at.elevation,
                    );
                    if dist > 0.0 {
                        ((at.elevation - prev.elevation) / dist * 100.0).round()
                    } else {
                        0.0
                    }
                }
                None => 0.0,
            };

            tracing::debug!(image = %img.id, offset, matched, "synchronized image");
            records.push(SyncedRecord {
                image_id: img.id.clone(),
                capture_time,
                offset,
                lat: at.lat,
                lon: at.lon,
                bearing: at.bearing,
                elevation: at.elevation,
                speed: at.speed,
                heart: at.heart,
                slope,
                matched,
            });
        }

        let origin = records[0].capture_time;
        Ok(Self {
            track,
            records,
            origin,
            time_offset: params.time_offset,
        })
    }

    /// Store without images. The origin is `start_time` (camera clock) or, when absent, the
    /// camera-clock instant of the first track point.
    pub fn track_only(track: Arc<Track>, start_time: Option<f64>, time_offset: f64) -> Self {
        let origin = start_time.unwrap_or(track.start_time() + time_offset);
        Self {
            track,
            records: Vec::new(),
            origin,
            time_offset,
        }
    }

    /// Underlying track.
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// One record per image, in capture order.
    pub fn records(&self) -> &[SyncedRecord] {
        &self.records
    }

    /// Camera clock seconds that query time zero maps to.
    pub fn origin(&self) -> f64 {
        self.origin
    }

    /// Initial clock offset guess in seconds.
    pub fn time_offset(&self) -> f64 {
        self.time_offset
    }

    /// Seconds from the origin at which image `index` was captured.
    pub fn image_seconds(&self, index: usize) -> Option<f64> {
        self.records.get(index).map(|r| r.capture_time - self.origin)
    }

    /// Telemetry `seconds` after the origin, using image `index`'s offset (or the global offset
    /// when `index` is `None` or past the last record). Out-of-range instants clamp to the track
    /// endpoints. Returns the snapshot and the lower bracket index.
    pub fn snapshot(&self, index: Option<usize>, seconds: f64) -> (GpsSnapshot, usize) {
        let record = index.and_then(|i| self.records.get(i));
        let offset = record.map_or(self.time_offset, |r| r.offset);
        let time = self.origin + seconds - offset;
        let at = self.track.sample_clamped(time);
        (
            GpsSnapshot {
                lat: at.lat,
                lon: at.lon,
                bearing: at.bearing,
                elevation: at.elevation,
                speed: at.speed,
                heart: at.heart,
                time,
                image_id: record.map(|r| r.image_id.clone()),
                slope: record.map(|r| r.slope),
                offset,
            },
            at.index,
        )
    }

    /// Whether the gap `[seconds_a, seconds_b]` after image `index` is a recording break.
    ///
    /// Both the compressed gap must exceed `2 * effect_length + 2` and the traveled distance
    /// (with elevation) must exceed [`BREAK_MIN_DISTANCE_M`]; both comparisons are strict.
    pub fn is_break(
        &self,
        index: Option<usize>,
        seconds_a: f64,
        seconds_b: f64,
        effect_length: f64,
        speedup_factor: f64,
    ) -> bool {
        let gap = seconds_b - seconds_a;
        if !break_condition(gap, f64::INFINITY, effect_length, speedup_factor) {
            return false;
        }
        let (a, _) = self.snapshot(index, seconds_a);
        let (b, _) = self.snapshot(index, seconds_b);
        let dist = distance_3d_m(a.lat, a.lon, a.elevation, b.lat, b.lon, b.elevation);
        break_condition(gap, dist, effect_length, speedup_factor)
    }

    /// Per-track-point values of `field`.
    pub fn series(&self, field: TrackField) -> Vec<f64> {
        self.track.series(field)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sync/store.rs"]
mod tests;
