// THEORY:
// The adaptive bilateral smoother is where the beauty effect actually happens.
// It is an edge-preserving blur: every output pixel is a weighted average of its
// 11x11 neighbourhood, where a neighbour's weight falls off both with distance
// (spatial Gaussian) and with colour difference from the centre (range Gaussian).
// Sensor noise and fine skin texture average away; structural edges, whose two
// sides differ strongly in colour, do not.
//
// On top of the classic filter, two per-pixel factors adapt the kernel:
// 1.  **Edge protection**: `1 - smoothstep(0, threshold, edge)` from the edge
//     map. Near 1 in flat regions, falling toward 0 on strong gradients. The
//     threshold widens slightly with smoothing strength. A 5% floor keeps every
//     pixel's kernel alive, even on the strongest edge.
// 2.  **Skin weight**: `lerp(0.3, 1.0, classifier)`, putting the classifier
//     verdict on the same numeric footing as the Gaussian weights.
//
// The smoothed colour is then mixed back with the original by a strength-
// dependent amount that tapers off in the top band, so strong settings keep
// some detail. The taper is linear and unbounded: past s = 1.2 (only reachable
// above the 0..100 slider range) the mix turns negative and extrapolates away
// from the blur.
//
// The pipeline mixes the smoother's output into the input a second time
// (`blend_with_original`, `s * 0.75`, no taper) before tone adjustment, so the
// effective smoothing is the product of both mixes.
//
// Numerical safety: the weight sum is checked before normalizing. If every tap
// underflowed to zero (or the sum is not finite) the centre pixel is returned
// untouched rather than dividing by zero.

use std::borrow::Cow;
use std::f32::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_modules::edge_estimator::{EdgeIntensity, EdgeMap};
use crate::core_modules::frame::frame::Frame;
use crate::core_modules::grid::Grid;
use crate::core_modules::parameters::{KernelConfig, MappedParameters};
use crate::core_modules::pixel::pixel::{Pixel, lerp, smoothstep};
use crate::core_modules::skin_classifier::{BACKGROUND_WEIGHT, SKIN_WEIGHT, SkinMap, SkinWeight};

/// Share of a tap's weight that edge protection can never remove.
const EDGE_FLOOR: f32 = 0.05;

/// Which Gaussian the kernel is built from. One form is used for every weight
/// of a pipeline; the two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaussianForm {
    /// Normalized density `(1 / sqrt(2 pi sigma^2)) * exp(-x^2 / 2 sigma^2)`.
    #[default]
    Normalized,
    /// Bare falloff `exp(-x^2 / 2 sigma^2)`. Cheaper; the weight-sum
    /// normalization makes the result equivalent up to relative weighting.
    Unnormalized,
}

impl GaussianForm {
    /// Weight at distance `x` for spread `sigma`.
    ///
    /// Returns 0 for a non-positive or non-finite sigma, and for a sigma so small
    /// that `2 sigma^2` underflows, so degenerate kernels fall through to the
    /// zero-weight-sum path instead of producing NaN.
    pub fn weight(self, x: f32, sigma: f32) -> f32 {
        if !(sigma > 0.0) || !sigma.is_finite() {
            return 0.0;
        }
        let two_sigma_sq = 2.0 * sigma * sigma;
        if !(two_sigma_sq > 0.0) || !two_sigma_sq.is_finite() {
            return 0.0;
        }
        let falloff = (-(x * x) / two_sigma_sq).exp();
        match self {
            GaussianForm::Normalized => falloff / (PI * two_sigma_sq).sqrt(),
            GaussianForm::Unnormalized => falloff,
        }
    }
}

impl FromStr for GaussianForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normalized" => Ok(GaussianForm::Normalized),
            "unnormalized" => Ok(GaussianForm::Unnormalized),
            other => Err(format!("unknown gaussian form '{other}'; expected 'normalized' or 'unnormalized'")),
        }
    }
}

/// Spatial weights for every offset of the window, tabulated once per frame.
#[derive(Debug, Clone)]
pub struct SpatialKernel {
    radius: i32,
    diameter: usize,
    weights: Vec<f32>,
}

impl SpatialKernel {
    pub fn new(kernel: &KernelConfig, form: GaussianForm) -> Self {
        let radius = kernel.radius;
        let diameter = kernel.diameter();
        let mut weights = Vec::with_capacity(kernel.taps());
        for j in -radius..=radius {
            for i in -radius..=radius {
                let distance = ((i * i + j * j) as f32).sqrt();
                weights.push(form.weight(distance, kernel.sigma_space));
            }
        }
        Self {
            radius,
            diameter,
            weights,
        }
    }

    /// Weight at offset `(i, j)`, both in `-radius..=radius`.
    #[inline]
    pub fn weight(&self, i: i32, j: i32) -> f32 {
        let row = (j + self.radius) as usize;
        let col = (i + self.radius) as usize;
        self.weights[row * self.diameter + col]
    }
}

/// The per-frame coefficients the smoother needs, split out of
/// `MappedParameters` so the kernel can be exercised directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingCoefficients {
    pub kernel: KernelConfig,
    pub edge_threshold: f32,
    pub mix_strength: f32,
    pub form: GaussianForm,
}

impl SmoothingCoefficients {
    pub fn from_mapped(mapped: &MappedParameters, form: GaussianForm) -> Self {
        Self {
            kernel: mapped.kernel,
            edge_threshold: mapped.edge_threshold,
            mix_strength: mapped.mix_strength,
            form,
        }
    }
}

/// Edge protection factor in [0, 1]: 1 on flat regions, 0 on strong edges.
pub fn edge_weight(edge: EdgeIntensity, threshold: f32) -> f32 {
    1.0 - smoothstep(0.0, threshold, edge)
}

/// Smooths the pixel at `(x, y)`.
///
/// `edge` and `classifier_weight` are this pixel's entries from the edge and
/// skin maps. Alpha is carried through from the centre pixel.
pub fn smooth_pixel(
    frame: &Frame,
    x: u32,
    y: u32,
    edge: EdgeIntensity,
    classifier_weight: SkinWeight,
    coefficients: &SmoothingCoefficients,
    spatial: &SpatialKernel,
) -> Pixel {
    let center = frame.pixel(x, y);
    let protection = edge_weight(edge, coefficients.edge_threshold) * (1.0 - EDGE_FLOOR) + EDGE_FLOOR;
    let skin = lerp(BACKGROUND_WEIGHT, SKIN_WEIGHT, classifier_weight);
    let tap_scale = skin * protection;

    let radius = coefficients.kernel.radius;
    let sigma_color = coefficients.kernel.sigma_color;
    let (cx, cy) = (x as i64, y as i64);

    let (mut red, mut green, mut blue) = (0.0f32, 0.0f32, 0.0f32);
    let mut weight_sum = 0.0f32;
    for j in -radius..=radius {
        for i in -radius..=radius {
            let sample = frame.sample_clamped(cx + i as i64, cy + j as i64);
            let range = coefficients.form.weight(center.distance(&sample), sigma_color);
            let weight = spatial.weight(i, j) * range * tap_scale;
            red += sample.red * weight;
            green += sample.green * weight;
            blue += sample.blue * weight;
            weight_sum += weight;
        }
    }

    if !(weight_sum > 0.0) || !weight_sum.is_finite() {
        return center;
    }
    let smoothed = center.with_rgb(red / weight_sum, green / weight_sum, blue / weight_sum);
    if !smoothed.is_finite() {
        return center;
    }
    center.lerp(smoothed, coefficients.mix_strength).saturated()
}

/// Mixes the input pixel toward the smoother's output by `blend_strength`.
/// Alpha comes from `original`.
pub fn blend_with_original(original: Pixel, smoothed: Pixel, mapped: &MappedParameters) -> Pixel {
    original.lerp(smoothed, mapped.blend_strength).saturated()
}

/// Stage 3: edge- and skin-aware bilateral smoothing over a whole frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilateralSmoother {
    form: GaussianForm,
}

impl BilateralSmoother {
    pub fn new(form: GaussianForm) -> Self {
        Self { form }
    }

    pub fn form(&self) -> GaussianForm {
        self.form
    }

    /// Smooths `frame`. Borrows the input unchanged when smoothing is off.
    pub fn apply<'a>(
        &self,
        frame: &'a Frame,
        edges: &EdgeMap,
        skin: &SkinMap,
        mapped: &MappedParameters,
        grid: &Grid,
    ) -> Cow<'a, Frame> {
        if !mapped.smooth_active {
            return Cow::Borrowed(frame);
        }
        let coefficients = SmoothingCoefficients::from_mapped(mapped, self.form);
        let spatial = SpatialKernel::new(&coefficients.kernel, self.form);
        let pixels = grid.map(|x, y| {
            smooth_pixel(frame, x, y, edges.get(x, y), skin.get(x, y), &coefficients, &spatial)
        });
        Cow::Owned(Frame::from_grid(frame.width(), frame.height(), pixels))
    }
}
