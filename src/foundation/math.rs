#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub(crate) fn new_default() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub(crate) fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::PRIME);
        }
        self.0 = h;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Straight line through `(x0, y0)` and `(x1, y1)`, evaluated outside the interval as well.
///
/// Transition effects build a fresh one per break episode and sample it with the time elapsed
/// since the episode's image start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFn {
    k: f64,
    n: f64,
}

impl LinearFn {
    /// Build the function mapping `xs.0 -> ys.0` and `xs.1 -> ys.1`.
    ///
    /// A degenerate interval (`xs.0 == xs.1`) yields the constant `ys.1`.
    pub fn through(xs: (f64, f64), ys: (f64, f64)) -> Self {
        let (x0, x1) = xs;
        let (y0, y1) = ys;
        let dx = x1 - x0;
        if dx.abs() < f64::EPSILON {
            return Self { k: 0.0, n: y1 };
        }
        let k = (y1 - y0) / dx;
        Self { k, n: y1 - k * x1 }
    }

    /// Evaluate at `x`.
    pub fn at(self, x: f64) -> f64 {
        self.k * x + self.n
    }
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Round to `decimals` places, half away from zero.
pub(crate) fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
