/// Distance and bearing on the sphere.
pub mod geo;
/// GPX parsing.
pub mod gpx;
/// Time interpolation along a track.
pub mod interpolate;
/// Track points, fields and the track container.
pub mod point;
