use crate::foundation::core::Point;
use crate::foundation::math::LinearFn;
use crate::images::timeline::ImageTimeline;
use crate::sync::store::TrackDataStore;

/// Where a display instant falls inside a recording break.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BreakPhase {
    /// Not in a break.
    #[default]
    None,
    /// Fading out of the last image before the gap.
    Start,
    /// Between the two fades.
    Middle,
    /// Fading into the next image.
    End,
}

impl BreakPhase {
    /// `true` for every phase except [`BreakPhase::None`].
    pub fn is_active(self) -> bool {
        self != Self::None
    }
}

/// Phase of display time `t` for a break episode spanning `[image_start, next_image_start)`.
///
/// The first `effect_length` seconds are `Start` (inclusive), the last `effect_length` seconds
/// are `End` (inclusive), the rest is `Middle`. Instants outside the episode are `None`.
pub fn classify_phase(
    image_start: f64,
    next_image_start: f64,
    t: f64,
    effect_length: f64,
) -> BreakPhase {
    if t < image_start || t >= next_image_start {
        return BreakPhase::None;
    }
    if t - image_start <= effect_length {
        BreakPhase::Start
    } else if next_image_start - t <= effect_length {
        BreakPhase::End
    } else {
        BreakPhase::Middle
    }
}

/// Break status of one display instant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BreakState {
    /// Phase at this instant.
    pub phase: BreakPhase,
    /// Display seconds since the active image started.
    pub elapsed: f64,
    /// Display duration of the active image (the episode's end anchor).
    pub duration: f64,
}

impl BreakState {
    /// State outside any break.
    pub fn none() -> Self {
        Self::default()
    }

    /// Shorthand for `self.phase.is_active()`.
    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    /// Transition parameters for this state's episode.
    pub fn transition(&self, effect_length: f64) -> BreakTransition {
        BreakTransition {
            phase: self.phase,
            effect_length,
            duration: self.duration,
        }
    }
}

/// Break state of image `index` at display time `t`.
///
/// A break needs a following image, and the gap between the two captures has to pass
/// [`TrackDataStore::is_break`].
pub fn detect_break(
    timeline: &ImageTimeline,
    store: &TrackDataStore,
    index: usize,
    t: f64,
    effect_length: f64,
) -> BreakState {
    let Some(next_start) = timeline.next_start(index) else {
        return BreakState::none();
    };
    let seconds_a = timeline.capture_seconds(index);
    let seconds_b = timeline.capture_seconds(index + 1);
    if !store.is_break(
        Some(index),
        seconds_a,
        seconds_b,
        effect_length,
        timeline.speedup_factor(),
    ) {
        return BreakState::none();
    }
    let start = timeline.start(index);
    BreakState {
        phase: classify_phase(start, next_start, t, effect_length),
        elapsed: t - start,
        duration: timeline.duration(index),
    }
}

/// Zoom and pan of a break-aware overlay across one episode.
///
/// `Start` grows from the normal size to the full canvas and slides to the origin over
/// `(0, effect)`; `End` reverses that over `(duration - effect, duration)`; `Middle` pins the
/// overlay full-size at the origin. Functions are built fresh on every call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BreakTransition {
    phase: BreakPhase,
    effect_length: f64,
    duration: f64,
}

impl BreakTransition {
    fn window(&self) -> (f64, f64) {
        match self.phase {
            BreakPhase::End => (self.duration - self.effect_length, self.duration),
            _ => (0.0, self.effect_length),
        }
    }

    fn morph(&self, normal: f64, full: f64, elapsed: f64) -> f64 {
        match self.phase {
            BreakPhase::None => normal,
            BreakPhase::Middle => full,
            BreakPhase::Start => LinearFn::through(self.window(), (normal, full)).at(elapsed),
            BreakPhase::End => LinearFn::through(self.window(), (full, normal)).at(elapsed),
        }
    }

    /// Overlay size at `elapsed`, between `normal` and `full` (both `(w, h)`).
    pub fn size(&self, normal: (u32, u32), full: (u32, u32), elapsed: f64) -> (u32, u32) {
        let w = self.morph(f64::from(normal.0), f64::from(full.0), elapsed);
        let h = self.morph(f64::from(normal.1), f64::from(full.1), elapsed);
        (w.round().max(1.0) as u32, h.round().max(1.0) as u32)
    }

    /// Overlay top-left corner at `elapsed`, between `normal` and the origin.
    pub fn position(&self, normal: Point, elapsed: f64) -> Point {
        Point::new(
            self.morph(normal.x, 0.0, elapsed),
            self.morph(normal.y, 0.0, elapsed),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/breaks.rs"]
mod tests;
