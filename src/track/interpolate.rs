use crate::foundation::error::{OverlayError, OverlayResult};
use crate::foundation::math::lerp;
use crate::track::geo::lerp_angle_deg;
use crate::track::point::Track;

/// Telemetry interpolated at one instant, plus the lower bracket index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interpolated {
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
    /// Beats per minute, if recorded.
    pub heart: Option<f64>,
    /// Index `i` of the bracket `(p[i], p[i+1])`; the last index when `t` is the final point.
    pub index: usize,
}

/// Interpolate the track at `t`.
///
/// Fails with [`OverlayError::DataGap`] when `t` lies before the first or after the last point.
/// Bearing follows the shorter arc between the bracket points.
pub fn interpolate(track: &Track, t: f64) -> OverlayResult<Interpolated> {
    let pts = track.points();
    let first = pts[0].time;
    let last = pts[pts.len() - 1].time;
    if !t.is_finite() || t < first || t > last {
        return Err(OverlayError::data_gap(format!(
            "time {t} outside track range [{first}, {last}]"
        )));
    }

    // First index whose time is > t; the bracket starts right before it.
    let upper = pts.partition_point(|p| p.time <= t);
    let i = upper.saturating_sub(1);
    if i + 1 >= pts.len() {
        return Ok(at_point(track, pts.len() - 1));
    }

    let a = &pts[i];
    let b = &pts[i + 1];
    let span = b.time - a.time;
    let f = if span > 0.0 { (t - a.time) / span } else { 0.0 };

    Ok(Interpolated {
        lat: lerp(a.lat, b.lat, f),
        lon: lerp(a.lon, b.lon, f),
        bearing: lerp_angle_deg(a.bearing, b.bearing, f),
        elevation: lerp(a.elevation, b.elevation, f),
        speed: lerp(a.speed, b.speed, f),
        heart: match (a.heart, b.heart) {
            (Some(ha), Some(hb)) => Some(lerp(ha, hb, f)),
            _ => None,
        },
        index: i,
    })
}

fn at_point(track: &Track, index: usize) -> Interpolated {
    let p = &track.points()[index];
    Interpolated {
        lat: p.lat,
        lon: p.lon,
        bearing: p.bearing,
        elevation: p.elevation,
        speed: p.speed,
        heart: p.heart,
        index,
    }
}

impl Track {
    /// Interpolate at `t`, clamping out-of-range queries to the nearest endpoint.
    ///
    /// This is the boundary policy used by the track store: a frame shown before the track
    /// starts (or after it ends) shows the first (or last) recorded fix.
    pub fn sample_clamped(&self, t: f64) -> Interpolated {
        match interpolate(self, t) {
            Ok(v) => v,
            Err(_) => {
                let index = if t.is_nan() || t < self.start_time() {
                    0
                } else {
                    self.len() - 1
                };
                tracing::debug!(t, index, "track query clamped to endpoint");
                at_point(self, index)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/track/interpolate.rs"]
mod tests;
