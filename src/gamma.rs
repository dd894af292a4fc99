// sRGB <-> linear conversion tables, so blends happen in linear light
// without a powf per channel.

use crate::types::{channels, rgb};

const LINEAR_STEPS: usize = 4096;

pub struct GammaLut {
    to_linear: [f32; 256],
    to_srgb: [u8; LINEAR_STEPS],
}

impl Default for GammaLut {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaLut {
    pub fn new() -> Self {
        let mut to_linear = [0.0f32; 256];
        for (v, slot) in to_linear.iter_mut().enumerate() {
            let c = v as f32 / 255.0;
            *slot = if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
        }

        let mut to_srgb = [0u8; LINEAR_STEPS];
        let last = (LINEAR_STEPS - 1) as f32;
        for (i, slot) in to_srgb.iter_mut().enumerate() {
            let l = i as f32 / last;
            let s = if l <= 0.003_130_8 { 12.92 * l } else { 1.055 * l.powf(1.0 / 2.4) - 0.055 };
            *slot = (s * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self { to_linear, to_srgb }
    }

    #[inline]
    pub fn to_linear(&self, v: u8) -> f32 {
        self.to_linear[v as usize]
    }

    #[inline]
    pub fn to_srgb(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * (LINEAR_STEPS - 1) as f32).round() as usize;
        self.to_srgb[idx]
    }

    /// `alpha * over + (1 - alpha) * under`, per channel in linear light.
    #[inline]
    pub fn mix(&self, under: u32, over: u32, alpha: f32) -> u32 {
        let a = alpha.clamp(0.0, 1.0);
        let (ur, ug, ub) = channels(under);
        let (or, og, ob) = channels(over);
        let m = |u: u8, o: u8| self.to_srgb(a * self.to_linear(o) + (1.0 - a) * self.to_linear(u));
        rgb(m(ur, or), m(ug, og), m(ub, ob))
    }
}
