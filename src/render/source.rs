use std::path::PathBuf;

use anyhow::Context as _;

use crate::foundation::core::Canvas;
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::render::frame::FrameRGBA;

/// Provides the base picture under the overlays.
pub trait FrameSource {
    /// Base frame for image `index` (`None` in track-only mode), at the canvas size.
    fn frame(&mut self, index: Option<usize>, canvas: Canvas) -> OverlayResult<FrameRGBA>;
}

/// Photos decoded from disk and resized to the canvas.
///
/// The two most recent decodes are kept; consecutive output frames mostly show the same photo,
/// and break end phases alternate with the next one.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    recent: Vec<(usize, Canvas, FrameRGBA)>,
}

impl ImageSequenceSource {
    /// Source over `paths`, one per image index. Fails on an empty list.
    pub fn new(paths: Vec<PathBuf>) -> OverlayResult<Self> {
        if paths.is_empty() {
            return Err(OverlayError::validation("image sequence is empty"));
        }
        Ok(Self {
            paths,
            recent: Vec::with_capacity(2),
        })
    }

    /// Number of images.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// `true` when there are no images.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn decode(&self, index: usize, canvas: Canvas) -> OverlayResult<FrameRGBA> {
        let path = &self.paths[index];
        let img = image::open(path)
            .with_context(|| format!("decode image {}", path.display()))?
            .to_rgba8();
        let img = if img.dimensions() == (canvas.width, canvas.height) {
            img
        } else {
            image::imageops::resize(
                &img,
                canvas.width,
                canvas.height,
                image::imageops::FilterType::Triangle,
            )
        };
        Ok(FrameRGBA::from_image(img))
    }
}

impl FrameSource for ImageSequenceSource {
    fn frame(&mut self, index: Option<usize>, canvas: Canvas) -> OverlayResult<FrameRGBA> {
        let index = index.unwrap_or(0).min(self.paths.len() - 1);
        if let Some((_, _, f)) = self
            .recent
            .iter()
            .find(|(i, c, _)| *i == index && *c == canvas)
        {
            return Ok(f.clone());
        }

        let frame = self.decode(index, canvas)?;
        if self.recent.len() == 2 {
            self.recent.remove(0);
        }
        self.recent.push((index, canvas, frame.clone()));
        Ok(frame)
    }
}

/// One flat color, e.g. for track-only renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolidColorSource {
    /// Fill color, straight alpha.
    pub rgba: [u8; 4],
}

impl FrameSource for SolidColorSource {
    fn frame(&mut self, _index: Option<usize>, canvas: Canvas) -> OverlayResult<FrameRGBA> {
        Ok(FrameRGBA::solid(canvas.width, canvas.height, self.rgba))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/source.rs"]
mod tests;
