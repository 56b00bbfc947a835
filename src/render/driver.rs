use std::collections::BTreeMap;

use crate::effects::breaks::{BreakPhase, BreakState, detect_break};
use crate::effects::composite::blit_over;
use crate::foundation::core::Canvas;
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::images::timeline::ImageTimeline;
use crate::overlay::args::{ArgValue, DriverContext};
use crate::overlay::registry::{ClipContext, ReadyRegistry};
use crate::render::frame::FrameRGBA;
use crate::render::source::FrameSource;
use crate::sync::store::TrackDataStore;
use crate::track::point::TrackField;

/// Background of [`FrameDriver::render_preview`].
pub const PREVIEW_RGBA: [u8; 4] = [56, 14, 252, 255];

/// Setup state for [`crate::overlay::registry::OverlayRegistry::build`].
///
/// Besides the canvas entries, `track.<field>` holds the per-point series of every telemetry
/// channel (`track.heart` only when the track has heart-rate data), and `origin` /
/// `time_offset` mirror the store.
pub fn driver_context(canvas: Canvas, store: &TrackDataStore) -> DriverContext {
    let mut ctx = DriverContext::new(canvas);
    let has_heart = store.track().points().iter().any(|p| p.heart.is_some());
    let series: BTreeMap<String, ArgValue> = TrackField::ALL
        .into_iter()
        .filter(|&f| f != TrackField::Heart || has_heart)
        .map(|f| (f.name().to_owned(), ArgValue::Series(store.series(f))))
        .collect();
    ctx.insert("track", ArgValue::Map(series));
    ctx.insert("origin", ArgValue::Number(store.origin()));
    ctx.insert("time_offset", ArgValue::Number(store.time_offset()));
    ctx
}

/// Timing knobs of a [`FrameDriver`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriverParams {
    /// Output frame size.
    pub canvas: Canvas,
    /// Length of each break fade in display seconds.
    pub effect_length: f64,
    /// Camera seconds per display second in track-only mode; with images the timeline's factor
    /// is used.
    pub speedup_factor: f64,
}

/// Where display time `t` lands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameState {
    /// Active image, `None` in track-only mode.
    pub index: Option<usize>,
    /// Break status at this instant.
    pub brk: BreakState,
    /// Camera seconds after the store origin.
    pub seconds: f64,
}

impl FrameState {
    /// Image under the overlays; the next one while a break ends.
    pub fn base_index(&self) -> Option<usize> {
        match (self.index, self.brk.phase) {
            (Some(i), BreakPhase::End) => Some(i + 1),
            (i, _) => i,
        }
    }
}

/// Renders output frames from display times.
///
/// Holds no per-frame state: rendering the same instant twice gives the same pixels as long as
/// the sub-renderers are deterministic.
pub struct FrameDriver {
    store: TrackDataStore,
    timeline: Option<ImageTimeline>,
    registry: ReadyRegistry,
    source: Box<dyn FrameSource>,
    params: DriverParams,
    breaks_possible: bool,
}

impl FrameDriver {
    /// Validate `params` and check that `timeline` and `store` describe the same images.
    pub fn new(
        store: TrackDataStore,
        timeline: Option<ImageTimeline>,
        registry: ReadyRegistry,
        source: Box<dyn FrameSource>,
        params: DriverParams,
    ) -> OverlayResult<Self> {
        if !(params.effect_length > 0.0) {
            return Err(OverlayError::validation("effect_length must be > 0"));
        }
        if !(params.speedup_factor > 0.0) {
            return Err(OverlayError::validation("speedup_factor must be > 0"));
        }
        if let Some(tl) = &timeline
            && tl.len() != store.records().len()
        {
            return Err(OverlayError::validation(format!(
                "timeline has {} images but the store has {} records",
                tl.len(),
                store.records().len()
            )));
        }

        let breaks_possible = timeline
            .as_ref()
            .is_some_and(|tl| tl.have_any_breaks(params.effect_length));
        tracing::debug!(
            images = timeline.as_ref().map_or(0, ImageTimeline::len),
            overlays = registry.len(),
            breaks_possible,
            "frame driver ready"
        );
        Ok(Self {
            store,
            timeline,
            registry,
            source,
            params,
            breaks_possible,
        })
    }

    /// Synchronized telemetry.
    pub fn store(&self) -> &TrackDataStore {
        &self.store
    }

    /// Image timeline, if rendering over images.
    pub fn timeline(&self) -> Option<&ImageTimeline> {
        self.timeline.as_ref()
    }

    /// Output frame size.
    pub fn canvas(&self) -> Canvas {
        self.params.canvas
    }

    /// Break fade length in display seconds.
    pub fn effect_length(&self) -> f64 {
        self.params.effect_length
    }

    /// Display length in seconds: the image timeline, or the rest of the track after the
    /// origin in track-only mode.
    pub fn duration(&self) -> f64 {
        match &self.timeline {
            Some(tl) => tl.total_duration(),
            None => {
                let track_end = self.store.track().end_time() + self.store.time_offset();
                ((track_end - self.store.origin()) / self.params.speedup_factor).max(0.0)
            }
        }
    }

    /// Active image, break state and camera instant at display time `t`.
    pub fn frame_state(&self, t: f64) -> FrameState {
        match &self.timeline {
            Some(tl) => {
                let index = tl.find_index(t);
                let brk = if self.breaks_possible {
                    detect_break(tl, &self.store, index, t, self.params.effect_length)
                } else {
                    BreakState::none()
                };
                FrameState {
                    index: Some(index),
                    brk,
                    seconds: tl.camera_seconds(index, t),
                }
            }
            None => FrameState {
                index: None,
                brk: BreakState::none(),
                seconds: t * self.params.speedup_factor,
            },
        }
    }

    /// Base frame with every overlay that has data at `t`, map first.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn render_frame(&mut self, t: f64) -> OverlayResult<FrameRGBA> {
        let state = self.frame_state(t);
        let canvas = self.params.canvas;
        let mut frame = self.source.frame(state.base_index(), canvas)?;
        let (snapshot, bracket_index) = self.store.snapshot(state.index, state.seconds);

        let ctx = ClipContext {
            snapshot: &snapshot,
            bracket_index,
            canvas,
            brk: state.brk,
            effect_length: self.params.effect_length,
        };
        for clip in self.registry.clips(&ctx)? {
            blit_over(&mut frame, &clip.frame, clip.position.x, clip.position.y)?;
        }
        if state.brk.is_active() {
            tracing::debug!(t, phase = ?state.brk.phase, "break frame");
        }
        Ok(frame)
    }

    /// Every overlay's sample value on a flat background; no telemetry is read.
    pub fn render_preview(&self, canvas: Canvas) -> OverlayResult<FrameRGBA> {
        render_preview(&self.registry, canvas)
    }
}

/// Composite the sample clip of every entry onto a [`PREVIEW_RGBA`] frame.
pub fn render_preview(registry: &ReadyRegistry, canvas: Canvas) -> OverlayResult<FrameRGBA> {
    let mut frame = FrameRGBA::solid(canvas.width, canvas.height, PREVIEW_RGBA);
    for entry in registry.entries() {
        if let Some(clip) = entry.sample_clip(canvas)? {
            blit_over(&mut frame, &clip.frame, clip.position.x, clip.position.y)?;
        }
    }
    Ok(frame)
}

#[cfg(test)]
#[path = "../../tests/unit/render/driver.rs"]
mod tests;
