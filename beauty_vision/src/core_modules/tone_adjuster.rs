// THEORY:
// Tone adjustment runs on the blended colour (the input mixed toward the
// smoother output) and is strictly per pixel. Two optional passes, always in
// this order:
//
// - Whitening: a flat brightness gain (`1 + k*0.2`) followed by a luminance-
//   weighted lift, blended in by `k*0.6`. Bright areas lift a little more than
//   dark ones, which reads as a clearer complexion rather than a washed-out one.
// - Rosy: re-classifies the *whitened* colour (whitening can move a pixel in or
//   out of the skin band) and, scaled by that weight, shifts it toward warm red
//   with a tint of (1.08, 0.95, 0.95) plus a second 6% red push.
//
// Neither pass clamps. Overshoot is left for the sharpener's final clamp so the
// high-pass detail it adds is computed on unclipped values. Intermediate values
// are saturated at `±f32::MAX` instead: an absurd whitening strength must end
// up white after the clamp, not NaN (and so black).

use std::borrow::Cow;

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::grid::Grid;
use crate::core_modules::parameters::MappedParameters;
use crate::core_modules::pixel::pixel::{Pixel, lerp};
use crate::core_modules::skin_classifier::skin_weight;

const WHITEN_GAIN: f32 = 0.2;
const WHITEN_LIFT: f32 = 0.1;
const WHITEN_MIX: f32 = 0.6;

const ROSY_SCALE: f32 = 0.35;
const ROSY_TINT: [f32; 3] = [1.08, 0.95, 0.95];
const ROSY_RED_BOOST: f32 = 1.06;

/// Brightens `pixel` with whitening strength `k` (`whiten / 50`).
pub fn whiten_pixel(pixel: Pixel, k: f32) -> Pixel {
    let brightened = (pixel * (1.0 + k * WHITEN_GAIN)).saturated();
    let lifted = (brightened * (1.0 + brightened.luminance() * WHITEN_LIFT)).saturated();
    brightened.lerp(lifted, k * WHITEN_MIX).saturated()
}

/// Warms `pixel` with rosy strength `k` (`rosy / 50`), gated by the skin classifier.
pub fn rosy_pixel(pixel: Pixel, k: f32) -> Pixel {
    let factor = k * ROSY_SCALE * skin_weight(&pixel);
    let tinted = pixel.lerp(pixel.tint(ROSY_TINT).saturated(), factor).saturated();
    let boosted = (tinted.red * ROSY_RED_BOOST).clamp(-f32::MAX, f32::MAX);
    Pixel {
        red: lerp(tinted.red, boosted, factor),
        ..tinted
    }
    .saturated()
}

/// Runs whichever tone passes are active on a single blended pixel.
pub fn adjust_pixel(pixel: Pixel, mapped: &MappedParameters) -> Pixel {
    let mut out = pixel;
    if let Some(k) = mapped.whiten_strength {
        out = whiten_pixel(out, k);
    }
    if let Some(k) = mapped.rosy_strength {
        out = rosy_pixel(out, k);
    }
    out
}

/// Stage 4: whitening then rosy tint over a whole frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneAdjuster;

impl ToneAdjuster {
    /// Borrows the input unchanged when neither pass is active.
    pub fn apply<'a>(&self, blended: &'a Frame, mapped: &MappedParameters, grid: &Grid) -> Cow<'a, Frame> {
        if mapped.whiten_strength.is_none() && mapped.rosy_strength.is_none() {
            return Cow::Borrowed(blended);
        }
        let pixels = grid.map(|x, y| adjust_pixel(blended.pixel(x, y), mapped));
        Cow::Owned(Frame::from_grid(blended.width(), blended.height(), pixels))
    }
}
