// THEORY:
// The parameter layer turns four UI-facing intensities (conventionally 0..100)
// into the normalized coefficients the filters actually consume. It is the only
// place in the engine that knows the shape of those curves.
//
// Two mappings exist:
// - Generic strength (whiten, rosy, sharpen): linear, `intensity / 50`, so 50 is
//   "1.0x" and 100 is "2.0x". Not clamped.
// - Smoothing strength: `sqrt(intensity / 100) * 0.7 + 0.2`. Concave, so most of
//   the visible effect arrives early; it has a 0.2 floor and reaches 0.9 at 100.
//
// Everything derived from `smooth` (kernel spreads, edge threshold, both blends)
// is computed here once per frame into `MappedParameters`, so every stage of one
// frame reads the same snapshot.

use crate::core_modules::pixel::pixel::lerp;
use serde::{Deserialize, Serialize};

/// Half-width of the bilateral window; 5 gives an 11x11 = 121 tap kernel.
pub const KERNEL_RADIUS: i32 = 5;

const GENERIC_STRENGTH_DIVISOR: f32 = 50.0;
const SMOOTH_NORMALIZER: f32 = 100.0;
const SMOOTH_CURVE_SCALE: f32 = 0.7;
const SMOOTH_FLOOR: f32 = 0.2;

const SIGMA_SPACE_BASE: f32 = 3.0;
const SIGMA_COLOR_BASE: f32 = 0.18;
const SIGMA_GROWTH: f32 = 0.6;

const EDGE_THRESHOLD_LOW: f32 = 0.12;
const EDGE_THRESHOLD_HIGH: f32 = 0.2;

const SMOOTH_MIX_SCALE: f32 = 0.75;
/// Above this smoothing strength the blend tapers off and auto-sharpening kicks in.
pub const DETAIL_TAPER_START: f32 = 0.7;
const DETAIL_TAPER_RATE: f32 = 2.0;
const AUTO_SHARPEN_SCALE: f32 = 0.3;

/// The four user-facing beauty intensities.
///
/// Values are conventionally in `0..=100` but nothing is rejected: negative and
/// oversized values flow through the mappings, and non-finite values are treated
/// as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeautyParameters {
    /// Skin smoothing (bilateral blur) intensity.
    pub smooth: f32,
    /// Whitening (brightening) intensity.
    pub whiten: f32,
    /// Rosy tint intensity on skin-coloured pixels.
    pub rosy: f32,
    /// Explicit sharpening intensity.
    pub sharpen: f32,
}

impl Default for BeautyParameters {
    fn default() -> Self {
        Self {
            smooth: 50.0,
            whiten: 50.0,
            rosy: 50.0,
            sharpen: 50.0,
        }
    }
}

impl BeautyParameters {
    /// All effects off. The pipeline is an exact identity for this value.
    pub const NEUTRAL: BeautyParameters = BeautyParameters {
        smooth: 0.0,
        whiten: 0.0,
        rosy: 0.0,
        sharpen: 0.0,
    };

    pub const fn new(smooth: f32, whiten: f32, rosy: f32, sharpen: f32) -> Self {
        Self {
            smooth,
            whiten,
            rosy,
            sharpen,
        }
    }

    /// Replaces NaN and infinite intensities with zero.
    pub fn sanitized(self) -> Self {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            smooth: finite(self.smooth),
            whiten: finite(self.whiten),
            rosy: finite(self.rosy),
            sharpen: finite(self.sharpen),
        }
    }

    /// True when no stage would fire.
    pub fn is_neutral(&self) -> bool {
        let p = self.sanitized();
        p.smooth <= 0.0 && p.whiten <= 0.0 && p.rosy <= 0.0 && p.sharpen <= 0.0
    }

    /// Merges a partial update; fields left as `None` keep their current value.
    pub fn apply(&mut self, update: &ParameterUpdate) {
        if let Some(smooth) = update.smooth {
            self.smooth = smooth;
        }
        if let Some(whiten) = update.whiten {
            self.whiten = whiten;
        }
        if let Some(rosy) = update.rosy {
            self.rosy = rosy;
        }
        if let Some(sharpen) = update.sharpen {
            self.sharpen = sharpen;
        }
    }
}

/// A partial parameter change, as sent by a control surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterUpdate {
    pub smooth: Option<f32>,
    pub whiten: Option<f32>,
    pub rosy: Option<f32>,
    pub sharpen: Option<f32>,
}

/// Generic strength for whiten, rosy and sharpen: `intensity / 50`.
pub fn strength(intensity: f32) -> f32 {
    intensity / GENERIC_STRENGTH_DIVISOR
}

/// Smoothing strength: `sqrt(intensity / 100) * 0.7 + 0.2`.
/// Negative intensities sit on the 0.2 floor instead of producing NaN.
pub fn smooth_strength(intensity: f32) -> f32 {
    let normalized = (intensity / SMOOTH_NORMALIZER).max(0.0);
    normalized.sqrt() * SMOOTH_CURVE_SCALE + SMOOTH_FLOOR
}

/// Bilateral kernel shape for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelConfig {
    /// Window half-width in pixels.
    pub radius: i32,
    /// Spread of the spatial Gaussian, in pixels.
    pub sigma_space: f32,
    /// Spread of the range Gaussian, in normalized RGB distance.
    pub sigma_color: f32,
}

impl KernelConfig {
    pub fn for_strength(smooth_strength: f32) -> Self {
        let growth = 1.0 + smooth_strength * SIGMA_GROWTH;
        Self {
            radius: KERNEL_RADIUS,
            sigma_space: SIGMA_SPACE_BASE * growth,
            sigma_color: SIGMA_COLOR_BASE * growth,
        }
    }

    /// Side length of the square window.
    pub fn diameter(&self) -> usize {
        (2 * self.radius + 1) as usize
    }

    pub fn taps(&self) -> usize {
        self.diameter() * self.diameter()
    }
}

/// Every coefficient one frame needs, derived from a single parameter snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedParameters {
    /// The sanitized snapshot these coefficients came from.
    pub source: BeautyParameters,
    /// False when `smooth <= 0`; the smoother is then an exact identity.
    pub smooth_active: bool,
    pub smooth_strength: f32,
    /// Upper edge of the smoothstep that turns edge intensity into protection.
    pub edge_threshold: f32,
    /// Smoother's own `lerp(center, smoothed, mix_strength)` amount, taper included.
    /// Goes negative (extrapolates away from the blur) once `s` passes 1.2.
    pub mix_strength: f32,
    /// Second `lerp(original, smoothed, blend_strength)` that feeds the tone stage.
    pub blend_strength: f32,
    pub kernel: KernelConfig,
    /// `None` when the stage is inactive.
    pub whiten_strength: Option<f32>,
    pub rosy_strength: Option<f32>,
    pub sharpen_strength: Option<f32>,
    /// High-pass gain injected when smoothing is strong and sharpening is off.
    pub auto_sharpen: Option<f32>,
}

impl MappedParameters {
    pub fn from_parameters(parameters: &BeautyParameters) -> Self {
        let source = parameters.sanitized();
        let s = smooth_strength(source.smooth);

        let blend_strength = s * SMOOTH_MIX_SCALE;
        let mut mix_strength = blend_strength;
        if s > DETAIL_TAPER_START {
            mix_strength *= 1.0 - (s - DETAIL_TAPER_START) * DETAIL_TAPER_RATE;
        }

        let active = |intensity: f32| (intensity > 0.0).then(|| strength(intensity));
        let auto_sharpen = (s > DETAIL_TAPER_START && source.sharpen <= 0.0)
            .then(|| (s - DETAIL_TAPER_START) * AUTO_SHARPEN_SCALE);

        Self {
            source,
            smooth_active: source.smooth > 0.0,
            smooth_strength: s,
            edge_threshold: lerp(EDGE_THRESHOLD_LOW, EDGE_THRESHOLD_HIGH, s),
            mix_strength,
            blend_strength,
            kernel: KernelConfig::for_strength(s),
            whiten_strength: active(source.whiten),
            rosy_strength: active(source.rosy),
            sharpen_strength: active(source.sharpen),
            auto_sharpen,
        }
    }
}

impl From<&BeautyParameters> for MappedParameters {
    fn from(parameters: &BeautyParameters) -> Self {
        MappedParameters::from_parameters(parameters)
    }
}
