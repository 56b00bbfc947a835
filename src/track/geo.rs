const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Great-circle distance combined with the elevation difference (meters).
pub fn distance_3d_m(lat1: f64, lon1: f64, ele1: f64, lat2: f64, lon2: f64, ele2: f64) -> f64 {
    let flat = haversine_distance_m(lat1, lon1, lat2, lon2);
    let dh = ele2 - ele1;
    (flat * flat + dh * dh).sqrt()
}

/// Initial compass bearing (north = 0, clockwise) from point 1 towards point 2, in `[0, 360)`.
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let y = dlon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();
    normalize_deg(y.atan2(x).to_degrees())
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_deg(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    // rem_euclid can return exactly 360.0 for tiny negative inputs.
    if r >= 360.0 { 0.0 } else { r }
}

/// Interpolate between two compass angles along the shorter arc.
pub fn lerp_angle_deg(a: f64, b: f64, t: f64) -> f64 {
    let mut delta = (b - a).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    normalize_deg(a + delta * t)
}

/// Local metric offset of `(lat, lon)` from `(lat0, lon0)` as `(east, north)` meters.
///
/// Equirectangular approximation; adequate for the few kilometers a map overlay spans.
pub fn local_enu_m(lat: f64, lon: f64, lat0: f64, lon0: f64) -> (f64, f64) {
    let east = (lon - lon0).to_radians() * EARTH_RADIUS_M * lat0.to_radians().cos();
    let north = (lat - lat0).to_radians() * EARTH_RADIUS_M;
    (east, north)
}

/// Ground resolution of a web-mercator zoom level at `lat`, in meters per pixel.
pub fn meters_per_pixel(lat: f64, zoom: f64) -> f64 {
    // 2 * pi * 6378137 / 256
    const EQUATOR_M_PER_PX_Z0: f64 = 156_543.033_92;
    EQUATOR_M_PER_PX_Z0 * lat.to_radians().cos() / 2f64.powf(zoom)
}

#[cfg(test)]
#[path = "../../tests/unit/track/geo.rs"]
mod tests;
