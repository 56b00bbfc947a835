use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::Fps;
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::frame::FrameRGBA;

/// Size and rate every frame pushed to a sink must match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
}

impl SinkConfig {
    /// Reject zero-sized output.
    pub fn validate(&self) -> OverlayResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(OverlayError::validation("sink width/height must be non-zero"));
        }
        Ok(())
    }

    fn check(&self, frame: &FrameRGBA) -> OverlayResult<()> {
        if frame.width != self.width || frame.height != self.height {
            return Err(OverlayError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Consumer of rendered frames, e.g. a video encoder.
pub trait FrameSink {
    /// Start a run; clears any previous state.
    fn begin(&mut self, cfg: SinkConfig) -> OverlayResult<()>;
    /// Accept frame `index`; its size must match the config passed to `begin`.
    fn push_frame(&mut self, index: u64, frame: &FrameRGBA) -> OverlayResult<()>;
    /// Finish the run.
    fn end(&mut self) -> OverlayResult<()>;
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    /// Frames received since the last `begin`.
    pub frames: Vec<(u64, FrameRGBA)>,
    /// Set by `end`.
    pub finished: bool,
}

impl InMemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> OverlayResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &FrameRGBA) -> OverlayResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| OverlayError::validation("push_frame before begin"))?;
        cfg.check(frame)?;
        self.frames.push((index, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> OverlayResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes `frame_000000.png`, `frame_000001.png`, ... into a directory.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    cfg: Option<SinkConfig>,
    /// Flatten onto this color instead of keeping alpha.
    background: Option<[u8; 4]>,
    overwrite: bool,
    written: u64,
}

impl PngSequenceSink {
    /// Sink writing into `dir`, created on `begin` if missing.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cfg: None,
            background: None,
            overwrite: true,
            written: 0,
        }
    }

    /// Flatten frames onto `rgba` before writing.
    pub fn with_background(mut self, rgba: [u8; 4]) -> Self {
        self.background = Some(rgba);
        self
    }

    /// Whether existing frame files may be replaced.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Path of frame `index` inside `dir`.
    pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("frame_{index:06}.png"))
    }

    /// Frames written since the last `begin`.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> OverlayResult<()> {
        cfg.validate()?;
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create output directory '{}'", self.dir.display())
        })?;
        self.cfg = Some(cfg);
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, index: u64, frame: &FrameRGBA) -> OverlayResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| OverlayError::validation("push_frame before begin"))?;
        cfg.check(frame)?;

        let path = Self::frame_path(&self.dir, index);
        if !self.overwrite && path.exists() {
            return Err(OverlayError::validation(format!(
                "output file '{}' already exists",
                path.display()
            )));
        }

        let img = match self.background {
            Some(bg) => {
                let mut data = vec![0u8; frame.data.len()];
                flatten_to_opaque_rgba8(&mut data, &frame.data, frame.premultiplied, bg)?;
                image::RgbaImage::from_raw(frame.width, frame.height, data)
                    .ok_or_else(|| OverlayError::validation("frame buffer size mismatch"))?
            }
            None => frame.to_image()?,
        };
        img.save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("write {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn end(&mut self) -> OverlayResult<()> {
        tracing::info!(dir = %self.dir.display(), frames = self.written, "png sequence written");
        Ok(())
    }
}

/// Composite RGBA8 pixels over an opaque background color.
pub fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> OverlayResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(OverlayError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [bg_rgba[0], bg_rgba[1], bg_rgba[2]].map(u16::from);
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let fg = if src_is_premul {
                u16::from(s[c])
            } else {
                mul_div255_u16(u16::from(s[c]), a)
            };
            d[c] = (fg + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
