use crate::foundation::error::{OverlayError, OverlayResult};

/// Display seconds given to the only image of a one-image sequence.
pub const SINGLE_IMAGE_SECONDS: f64 = 1.0;

/// When each image is on screen.
///
/// Image `i` is shown for `min(gap_i, max_image_delay) / speedup_factor` display seconds, where
/// `gap_i` is the capture-time gap to the next image. The last image repeats the previous
/// duration.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTimeline {
    starts: Vec<f64>,
    durations: Vec<f64>,
    /// Capture instants relative to the first image, camera seconds.
    capture_seconds: Vec<f64>,
    speedup_factor: f64,
}

impl ImageTimeline {
    /// Build the timeline from camera capture times.
    ///
    /// Each image is shown for the gap to the next capture, capped at `max_image_delay` and divided
    /// by `speedup_factor`. The last image reuses the previous duration.
    pub fn new(
        capture_times: &[f64],
        speedup_factor: f64,
        max_image_delay: Option<f64>,
    ) -> OverlayResult<Self> {
        if capture_times.is_empty() {
            return Err(OverlayError::validation("image timeline needs at least one image"));
        }
        if !(speedup_factor > 0.0) {
            return Err(OverlayError::validation("speedup_factor must be > 0"));
        }
        if capture_times.windows(2).any(|w| w[1] < w[0]) {
            return Err(OverlayError::validation(
                "image capture times must be non-decreasing",
            ));
        }

        let mut durations: Vec<f64> = capture_times
            .windows(2)
            .map(|w| {
                let gap = w[1] - w[0];
                max_image_delay.map_or(gap, |m| gap.min(m)) / speedup_factor
            })
            .collect();
        durations.push(durations.last().copied().unwrap_or(SINGLE_IMAGE_SECONDS));

        let mut starts = Vec::with_capacity(durations.len());
        let mut acc = 0.0;
        for d in &durations {
            starts.push(acc);
            acc += d;
        }

        let first = capture_times[0];
        Ok(Self {
            starts,
            durations,
            capture_seconds: capture_times.iter().map(|t| t - first).collect(),
            speedup_factor,
        })
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// `true` for an empty timeline.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Display start of each image.
    pub fn starts(&self) -> &[f64] {
        &self.starts
    }

    /// Display duration of each image.
    pub fn durations(&self) -> &[f64] {
        &self.durations
    }

    /// Camera seconds per display second.
    pub fn speedup_factor(&self) -> f64 {
        self.speedup_factor
    }

    /// Display start of image `index`.
    pub fn start(&self, index: usize) -> f64 {
        self.starts[index]
    }

    /// Display duration of image `index`.
    pub fn duration(&self, index: usize) -> f64 {
        self.durations[index]
    }

    /// Display start of the image after `index`.
    pub fn next_start(&self, index: usize) -> Option<f64> {
        self.starts.get(index + 1).copied()
    }

    /// End of the last image on the display clock.
    pub fn total_duration(&self) -> f64 {
        let last = self.len() - 1;
        self.starts[last] + self.durations[last]
    }

    /// Camera seconds from the first capture at which image `index` was shot.
    pub fn capture_seconds(&self, index: usize) -> f64 {
        self.capture_seconds[index]
    }

    /// Active image at display time `t`: the largest `i` with `start(i) <= t`, clamped to the
    /// first image for negative times.
    pub fn find_index(&self, t: f64) -> usize {
        self.starts.partition_point(|&s| s <= t).saturating_sub(1)
    }

    /// Camera seconds (from the first capture) shown at display time `t` while image `index` is
    /// active. Without a delay cap this is `t * speedup_factor`.
    pub fn camera_seconds(&self, index: usize, t: f64) -> f64 {
        self.capture_seconds[index] + (t - self.starts[index]) * self.speedup_factor
    }

    /// Whether any image stays long enough to host a break transition.
    pub fn have_any_breaks(&self, effect_length: f64) -> bool {
        self.durations.iter().any(|&d| d > 2.0 * effect_length + 2.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/images/timeline.rs"]
mod tests;
