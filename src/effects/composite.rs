use crate::foundation::error::{OverlayError, OverlayResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::frame::FrameRGBA;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over for premultiplied pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = src[i].saturating_add(dc);
    }
    out
}

/// Apply [`over`] pixel by pixel; both buffers must hold the same number of RGBA8 pixels.
pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> OverlayResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(OverlayError::render(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Alpha-over `src` onto `dst` with its top-left corner at `(x, y)`.
///
/// Positions are rounded to whole pixels; parts of `src` outside `dst` are clipped. Both frames
/// must be premultiplied.
pub fn blit_over(dst: &mut FrameRGBA, src: &FrameRGBA, x: f64, y: f64) -> OverlayResult<()> {
    if !dst.premultiplied || !src.premultiplied {
        return Err(OverlayError::render("blit_over expects premultiplied frames"));
    }
    if !x.is_finite() || !y.is_finite() {
        return Err(OverlayError::render("overlay position must be finite"));
    }
    let ox = x.round() as i64;
    let oy = y.round() as i64;

    let x0 = ox.max(0);
    let y0 = oy.max(0);
    let x1 = (ox + i64::from(src.width)).min(i64::from(dst.width));
    let y1 = (oy + i64::from(src.height)).min(i64::from(dst.height));
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    let dw = dst.width as usize;
    let sw = src.width as usize;
    let run = ((x1 - x0) as usize) * 4;
    for dy in y0..y1 {
        let sy = (dy - oy) as usize;
        let sx = (x0 - ox) as usize;
        let d_start = ((dy as usize) * dw + x0 as usize) * 4;
        let s_start = (sy * sw + sx) * 4;
        over_in_place(
            &mut dst.data[d_start..d_start + run],
            &src.data[s_start..s_start + run],
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
