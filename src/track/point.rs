use crate::foundation::error::{OverlayError, OverlayResult};
use crate::track::geo::{haversine_distance_m, initial_bearing_deg};

/// One geographic fix on the track clock.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackPoint {
    /// Seconds on the track clock (GPX UTC shifted to the camera's local time).
    pub time: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Meters above sea level.
    pub elevation: f64,
    /// Compass bearing in degrees, `[0, 360)`.
    pub bearing: f64,
    /// Meters per second.
    pub speed: f64,
    /// Beats per minute, when a heart-rate sensor was recording.
    pub heart: Option<f64>,
}

/// Raw fix as read from a track source, before derived fields are filled in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawFix {
    /// Seconds on the track clock.
    pub time: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Meters above sea level.
    pub elevation: f64,
    /// Meters per second, when the source records it.
    pub speed: Option<f64>,
    /// Beats per minute, when the source records it.
    pub heart: Option<f64>,
}

/// Telemetry channels that can be charted or read off a snapshot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackField {
    /// Latitude.
    Lat,
    /// Longitude.
    Lon,
    /// Compass bearing.
    Bearing,
    /// Elevation.
    Elevation,
    /// Speed.
    Speed,
    /// Heart rate.
    Heart,
}

impl TrackField {
    /// Every field, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Lat,
        Self::Lon,
        Self::Bearing,
        Self::Elevation,
        Self::Speed,
        Self::Heart,
    ];

    /// Lowercase name used in project files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Lat => "lat",
            Self::Lon => "lon",
            Self::Bearing => "bearing",
            Self::Elevation => "elevation",
            Self::Speed => "speed",
            Self::Heart => "heart",
        }
    }

    /// Parse a field name; accepts a few common aliases.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "lat" | "latitude" => Self::Lat,
            "lon" | "longitude" => Self::Lon,
            "bearing" => Self::Bearing,
            "elevation" | "ele" => Self::Elevation,
            "speed" => Self::Speed,
            "heart" | "hr" => Self::Heart,
            _ => return None,
        })
    }

    /// Value of this field at `p`; `None` for a missing heart rate.
    pub fn value_of(self, p: &TrackPoint) -> Option<f64> {
        match self {
            Self::Lat => Some(p.lat),
            Self::Lon => Some(p.lon),
            Self::Bearing => Some(p.bearing),
            Self::Elevation => Some(p.elevation),
            Self::Speed => Some(p.speed),
            Self::Heart => p.heart,
        }
    }
}

/// Time-ordered, non-empty sequence of track points.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    points: Vec<TrackPoint>,
}

impl Track {
    /// Sort (stable, so equal timestamps keep their input order) and wrap `points`.
    pub fn new(mut points: Vec<TrackPoint>) -> OverlayResult<Self> {
        if points.is_empty() {
            return Err(OverlayError::validation("track must contain at least one point"));
        }
        if points.iter().any(|p| !p.time.is_finite()) {
            return Err(OverlayError::validation("track point times must be finite"));
        }
        points.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { points })
    }

    /// Build points from raw fixes, deriving bearing towards the next fix and speed from the
    /// previous one when the source did not record it.
    pub fn from_fixes(mut fixes: Vec<RawFix>) -> OverlayResult<Self> {
        fixes.sort_by(|a, b| a.time.total_cmp(&b.time));
        let n = fixes.len();
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let f = fixes[i];
            let bearing = if n < 2 {
                0.0
            } else if i + 1 < n {
                let g = fixes[i + 1];
                initial_bearing_deg(f.lat, f.lon, g.lat, g.lon)
            } else {
                let g = fixes[i - 1];
                initial_bearing_deg(g.lat, g.lon, f.lat, f.lon)
            };
            let speed = f.speed.unwrap_or_else(|| {
                if i == 0 {
                    return 0.0;
                }
                let g = fixes[i - 1];
                let dt = f.time - g.time;
                if dt <= 0.0 {
                    0.0
                } else {
                    haversine_distance_m(g.lat, g.lon, f.lat, f.lon) / dt
                }
            });
            points.push(TrackPoint {
                time: f.time,
                lat: f.lat,
                lon: f.lon,
                elevation: f.elevation,
                bearing,
                speed,
                heart: f.heart,
            });
        }
        Self::new(points)
    }

    /// All points, sorted by time.
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// `true` for a track with no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Time of the first point.
    pub fn start_time(&self) -> f64 {
        self.points[0].time
    }

    /// Time of the last point.
    pub fn end_time(&self) -> f64 {
        self.points[self.points.len() - 1].time
    }

    /// Values of `field` for every point; missing heart rate reads as 0.
    pub fn series(&self, field: TrackField) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| field.value_of(p).unwrap_or(0.0))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/track/point.rs"]
mod tests;
