use crate::foundation::error::{OverlayError, OverlayResult};
use crate::foundation::math::{Fnv1a64, mul_div255_u8};

/// A rendered frame or overlay in CPU memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Frame filled with one straight-alpha color, stored premultiplied.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let px = premultiply(rgba);
        let n = (width as usize) * (height as usize);
        let mut data = Vec::with_capacity(n * 4);
        for _ in 0..n {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }

    /// Fully transparent frame.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::solid(width, height, [0, 0, 0, 0])
    }

    /// Wrap straight-alpha RGBA bytes, premultiplying them.
    pub fn from_straight(width: u32, height: u32, mut data: Vec<u8>) -> OverlayResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(OverlayError::render(format!(
                "rgba buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        for px in data.chunks_exact_mut(4) {
            let p = premultiply([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&p);
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    /// Convert a decoded straight-alpha image.
    pub fn from_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let mut data = img.into_raw();
        for px in data.chunks_exact_mut(4) {
            let p = premultiply([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&p);
        }
        Self {
            width,
            height,
            data,
            premultiplied: true,
        }
    }

    /// Straight-alpha copy suitable for PNG encoding.
    pub fn to_image(&self) -> OverlayResult<image::RgbaImage> {
        let mut data = self.data.clone();
        if self.premultiplied {
            for px in data.chunks_exact_mut(4) {
                let p = unpremultiply([px[0], px[1], px[2], px[3]]);
                px.copy_from_slice(&p);
            }
        }
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| OverlayError::render("frame buffer does not match its dimensions"))
    }

    /// Pixel at `(x, y)`, `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Stable content hash; equal frames hash equal.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u64(u64::from(self.width));
        h.write_u64(u64::from(self.height));
        h.write_bytes(&self.data);
        h.finish()
    }
}

pub(crate) fn premultiply(px: [u8; 4]) -> [u8; 4] {
    let a = u16::from(px[3]);
    [
        mul_div255_u8(u16::from(px[0]), a),
        mul_div255_u8(u16::from(px[1]), a),
        mul_div255_u8(u16::from(px[2]), a),
        px[3],
    ]
}

pub(crate) fn unpremultiply(px: [u8; 4]) -> [u8; 4] {
    let a = u32::from(px[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let f = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [f(px[0]), f(px[1]), f(px[2]), px[3]]
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
