use crate::foundation::error::{OverlayError, OverlayResult};

/// Estimate sub-second capture times for a burst shot at a fixed `interval`.
///
/// EXIF times only have whole-second precision. Shot `i` was taken somewhere in
/// `[m_i, m_i + 1)`; with a known interval every shot constrains the start instant `s` to
/// `[m_i - i*T, m_i - i*T + 1)`. The midpoint of the intersection of all those windows is used,
/// and shot `i` is placed at `s + i*T`.
///
/// With `interval <= 0` the whole-second times are returned unchanged. Times that no single
/// start instant can explain fail with a validation error.
pub fn estimate_sub_second_times(exif_times: &[f64], interval: f64) -> OverlayResult<Vec<f64>> {
    if interval <= 0.0 || exif_times.is_empty() {
        return Ok(exif_times.to_vec());
    }

    let mut smin = f64::NEG_INFINITY;
    let mut smax = f64::INFINITY;
    for (i, &m) in exif_times.iter().enumerate() {
        let m0 = m - interval * i as f64;
        smin = smin.max(m0);
        smax = smax.min(m0 + 1.0);
    }

    if smin > smax {
        return Err(OverlayError::validation(format!(
            "interval {interval}s is not compatible with the EXIF capture times"
        )));
    }

    let s = smin + (smax - smin) / 2.0;
    Ok((0..exif_times.len())
        .map(|i| s + interval * i as f64)
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/sync/capture.rs"]
mod tests;
