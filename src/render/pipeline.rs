use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex, FrameRange};
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::overlay::defaults::MapOverlay;
use crate::overlay::map::TileRequest;
use crate::render::driver::FrameDriver;

/// Frames between two progress log lines.
const PROGRESS_EVERY: u64 = 100;

/// Summary of a [`render_range`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Frames pushed to the sink.
    pub frames_rendered: u64,
    /// Display seconds covered by the rendered frames.
    pub display_seconds: f64,
}

/// Display time of output frame `frame`.
pub fn frame_time(fps: Fps, frame: FrameIndex) -> f64 {
    fps.frames_to_secs(frame.0)
}

/// Every output frame of the driver's display duration.
pub fn full_range(driver: &FrameDriver, fps: Fps) -> FrameRange {
    FrameRange {
        start: FrameIndex(0),
        end: FrameIndex(fps.secs_to_frames_ceil(driver.duration()).max(1)),
    }
}

/// Render frames `range` (start inclusive, end exclusive) into `sink`.
///
/// A failing frame aborts the run with its error; `sink.end` is only called on success.
#[tracing::instrument(skip(driver, sink), fields(start = range.start.0, end = range.end.0))]
pub fn render_range(
    driver: &mut FrameDriver,
    range: FrameRange,
    fps: Fps,
    sink: &mut dyn FrameSink,
) -> OverlayResult<RenderStats> {
    if range.is_empty() {
        return Err(OverlayError::validation("render range must be non-empty"));
    }
    let canvas = driver.canvas();
    sink.begin(SinkConfig {
        width: canvas.width,
        height: canvas.height,
        fps,
    })?;

    let total = range.len_frames();
    let mut stats = RenderStats::default();
    for f in range.start.0..range.end.0 {
        let frame = driver.render_frame(frame_time(fps, FrameIndex(f)))?;
        sink.push_frame(f, &frame)?;
        stats.frames_rendered += 1;
        if stats.frames_rendered % PROGRESS_EVERY == 0 {
            tracing::info!(done = stats.frames_rendered, total, "rendering");
        }
    }
    sink.end()?;

    stats.display_seconds = fps.frames_to_secs(total);
    tracing::info!(
        frames = stats.frames_rendered,
        seconds = stats.display_seconds,
        "render finished"
    );
    Ok(stats)
}

/// Map tiles the driver will ask for over `range`, in frame order and with duplicates.
///
/// Break-aware maps request the interpolated break size while a break is on screen.
pub fn plan_map_tiles(
    driver: &FrameDriver,
    range: FrameRange,
    fps: Fps,
    map: &MapOverlay,
) -> OverlayResult<Vec<TileRequest>> {
    let canvas = driver.canvas();
    let normal = map.size.resolve(canvas)?;
    let requests: Vec<TileRequest> = (range.start.0..range.end.0)
        .map(|f| {
            let state = driver.frame_state(frame_time(fps, FrameIndex(f)));
            let (snap, _) = driver.store().snapshot(state.index, state.seconds);
            let (width, height) = if map.break_aware && state.brk.is_active() {
                state.brk.transition(driver.effect_length()).size(
                    normal,
                    (canvas.width, canvas.height),
                    state.brk.elapsed,
                )
            } else {
                normal
            };
            TileRequest {
                lat: snap.lat,
                lon: snap.lon,
                bearing: Some(snap.bearing),
                angle_offset: map.angle_offset,
                zoom: map.zoom,
                width,
                height,
            }
        })
        .collect();
    Ok(requests)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
