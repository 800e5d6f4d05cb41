// THEORY:
// The skin classifier is a single-pixel (1D) heuristic: given one colour, decide
// whether it looks like skin. No neighbours, no history, no learned model. A
// fixed set of RGB thresholds that accepts the warm, red-dominant band skin
// occupies under ordinary lighting:
//
//     r > 0.35, g > 0.2, b > 0.15       (not too dark)
//     r > g > b                          (warm ordering)
//     r - g > 0.07, r - b > 0.1          (enough red dominance)
//
// The verdict maps to a weight rather than a mask: 1.0 for skin, 0.3 otherwise.
// The non-zero background weight is intentional, so smoothing still touches
// non-skin regions a little instead of leaving a hard cut-out.
//
// The classifier runs twice per pixel: once on the input (to weight the
// bilateral kernel) and once on the whitened colour (to gate the rosy tint).

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::grid::Grid;
use crate::core_modules::pixel::pixel::Pixel;

pub type SkinWeight = f32;

/// Weight for pixels that pass the skin test.
pub const SKIN_WEIGHT: SkinWeight = 1.0;
/// Weight for everything else.
pub const BACKGROUND_WEIGHT: SkinWeight = 0.3;

const MIN_RED: f32 = 0.35;
const MIN_GREEN: f32 = 0.2;
const MIN_BLUE: f32 = 0.15;
const MIN_RED_OVER_GREEN: f32 = 0.07;
const MIN_RED_OVER_BLUE: f32 = 0.1;

/// Threshold skin test on a single pixel's RGB.
pub fn is_skin(pixel: &Pixel) -> bool {
    let (r, g, b) = (pixel.red, pixel.green, pixel.blue);
    r > MIN_RED
        && g > MIN_GREEN
        && b > MIN_BLUE
        && r > g
        && g > b
        && (r - g) > MIN_RED_OVER_GREEN
        && (r - b) > MIN_RED_OVER_BLUE
}

/// `1.0` for skin, `0.3` otherwise.
pub fn skin_weight(pixel: &Pixel) -> SkinWeight {
    if is_skin(pixel) { SKIN_WEIGHT } else { BACKGROUND_WEIGHT }
}

/// Per-pixel classifier weights for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinMap {
    width: u32,
    weights: Vec<SkinWeight>,
}

impl SkinMap {
    pub fn compute(frame: &Frame, grid: &Grid) -> Self {
        Self {
            width: frame.width(),
            weights: grid.map(|x, y| skin_weight(&frame.pixel(x, y))),
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> SkinWeight {
        self.weights[y as usize * self.width as usize + x as usize]
    }

    /// Fraction of pixels classified as skin.
    pub fn coverage(&self) -> f32 {
        if self.weights.is_empty() {
            return 0.0;
        }
        let skin = self.weights.iter().filter(|&&w| w == SKIN_WEIGHT).count();
        skin as f32 / self.weights.len() as f32
    }
}
