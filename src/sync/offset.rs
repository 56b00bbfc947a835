use crate::foundation::error::{OverlayError, OverlayResult};
use crate::foundation::math::round_to;
use crate::track::interpolate::interpolate;
use crate::track::point::Track;

/// Default bound for the outward offset search, in seconds.
pub const DEFAULT_MAX_DIFF: u32 = 50;

/// Decimal places compared when matching a track position against an image's embedded GPS
/// (5 places is roughly 1.1 m).
pub const MATCH_DECIMALS: i32 = 5;

/// Candidate clock offsets in outward order: `prior, prior+1, prior-1, prior+2, prior-2, ...`
/// up to `prior ± max_diff`.
#[derive(Clone, Debug)]
pub struct OffsetCandidates {
    prior: f64,
    max_diff: u32,
    step: u32,
    negative_next: bool,
}

impl OffsetCandidates {
    /// Candidates around `prior`, stepping out to `max_diff` seconds on each side.
    pub fn new(prior: f64, max_diff: u32) -> Self {
        Self {
            prior,
            max_diff,
            step: 0,
            negative_next: false,
        }
    }
}

impl Iterator for OffsetCandidates {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.step == 0 {
            self.step = 1;
            return Some(self.prior);
        }
        if self.step > self.max_diff {
            return None;
        }
        let d = f64::from(self.step);
        if self.negative_next {
            self.negative_next = false;
            self.step += 1;
            Some(self.prior - d)
        } else {
            self.negative_next = true;
            Some(self.prior + d)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = 2 * self.max_diff as usize + 1;
        let produced = match self.step {
            0 => 0,
            s => 2 * (s as usize - 1) + 1 + usize::from(self.negative_next),
        };
        let left = total.saturating_sub(produced);
        (left, Some(left))
    }
}

impl ExactSizeIterator for OffsetCandidates {}

/// Find the clock offset (camera clock minus track clock, seconds) that places the track at the
/// image's embedded GPS position.
///
/// Candidates come from [`OffsetCandidates`] seeded with `prior`. A candidate matches when the
/// track interpolated at `image_time - offset` rounds to the same latitude and longitude (to
/// [`MATCH_DECIMALS`] places) as the image. Candidates that fall outside the track never match.
pub fn resolve_offset(
    track: &Track,
    image_time: f64,
    image_lat: f64,
    image_lon: f64,
    prior: f64,
    max_diff: u32,
) -> OverlayResult<f64> {
    let want_lat = round_to(image_lat, MATCH_DECIMALS);
    let want_lon = round_to(image_lon, MATCH_DECIMALS);

    for offset in OffsetCandidates::new(prior, max_diff) {
        let Ok(at) = interpolate(track, image_time - offset) else {
            continue;
        };
        if round_to(at.lat, MATCH_DECIMALS) == want_lat
            && round_to(at.lon, MATCH_DECIMALS) == want_lon
        {
            return Ok(offset);
        }
    }

    Err(OverlayError::offset_not_found(format!(
        "no offset within {prior}±{max_diff}s matches position ({want_lat}, {want_lon})"
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/sync/offset.rs"]
mod tests;
