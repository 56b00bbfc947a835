use std::sync::Arc;

use crate::foundation::core::{Canvas, Point};
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::overlay::registry::PositionFn;
use crate::render::frame::FrameRGBA;

/// Distance from the output border to the overlays, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Padding {
    /// Top edge.
    pub top: f64,
    /// Right edge.
    pub right: f64,
    /// Bottom edge.
    pub bottom: f64,
    /// Left edge.
    pub left: f64,
}

impl Padding {
    /// CSS shorthand: `[all]`, `[vertical, horizontal]`, `[top, horizontal, bottom]` or
    /// `[top, right, bottom, left]`.
    pub fn from_css(values: &[f64]) -> OverlayResult<Self> {
        let [top, right, bottom, left] = match *values {
            [a] => [a, a, a, a],
            [v, h] => [v, h, v, h],
            [t, h, b] => [t, h, b, h],
            [t, r, b, l] => [t, r, b, l],
            _ => {
                return Err(OverlayError::configuration(format!(
                    "padding takes 1 to 4 values, got {}",
                    values.len()
                )));
            }
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: 40.0,
            right: 30.0,
            bottom: 0.0,
            left: 30.0,
        }
    }
}

impl TryFrom<Vec<f64>> for Padding {
    type Error = OverlayError;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_css(&v)
    }
}

impl From<Padding> for Vec<f64> {
    fn from(p: Padding) -> Self {
        vec![p.top, p.right, p.bottom, p.left]
    }
}

/// Right-aligned column: slot `n` sits `n * (font_size + margin)` below `padding.top`.
pub fn stacked(slot: usize, padding: Padding, font_size: f64, margin: f64) -> PositionFn {
    let y = padding.top + (slot as f64) * (font_size + margin);
    Arc::new(move |clip: &FrameRGBA, canvas: Canvas| {
        Point::new(
            f64::from(canvas.width) - f64::from(clip.width) - padding.right,
            y,
        )
    })
}

/// Bottom-right corner, lifted 100 px off the bottom edge.
pub fn map_corner(padding: Padding) -> PositionFn {
    Arc::new(move |clip: &FrameRGBA, canvas: Canvas| {
        Point::new(
            f64::from(canvas.width) - f64::from(clip.width) - padding.right,
            f64::from(canvas.height) - f64::from(clip.height) - 100.0,
        )
    })
}

/// Bottom-left corner inside the padding.
pub fn bottom_left(padding: Padding) -> PositionFn {
    Arc::new(move |clip: &FrameRGBA, canvas: Canvas| {
        Point::new(
            padding.left,
            f64::from(canvas.height) - f64::from(clip.height) - padding.bottom,
        )
    })
}

/// Top-left corner inside the padding.
pub fn top_left(padding: Padding) -> PositionFn {
    Arc::new(move |_: &FrameRGBA, _: Canvas| Point::new(padding.left, padding.top))
}

/// Fixed top-left corner.
pub fn fixed(x: f64, y: f64) -> PositionFn {
    Arc::new(move |_: &FrameRGBA, _: Canvas| Point::new(x, y))
}

/// Named anchor used by project files.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "anchor")]
pub enum Anchor {
    /// Next free slot of the right-aligned text column.
    Stacked,
    /// See [`map_corner`].
    MapCorner,
    /// See [`bottom_left`].
    BottomLeft,
    /// See [`top_left`].
    TopLeft,
    /// Fixed pixel position, see [`fixed`].
    Fixed {
        /// Left edge in pixels.
        x: f64,
        /// Top edge in pixels.
        y: f64,
    },
}

#[cfg(test)]
#[path = "../../tests/unit/overlay/position.rs"]
mod tests;
