// THEORY:
// Sharpening works on the detail the smoother removed: `original - smoothed`,
// a high-pass signal. Re-injecting part of it restores crispness. There are two
// mutually exclusive modes, and they run at different points of the pipeline:
// 1.  **Auto-sharpen**: when smoothing is strong (strength above 0.7) and the
//     user asked for no sharpening, a small `(s - 0.7) * 0.3` share of the
//     removed detail is added to the blended colour *before* tone adjustment,
//     so heavy smoothing does not look plastic and the restored detail is
//     whitened and warmed like everything else.
// 2.  **Explicit**: the last stage, after tone. `k = sharpen / 50`; 80% of `k`
//     of the high-pass is added to the toned colour, plus a uniform lift
//     proportional to the high-pass magnitude on every colour channel.
//
// Whatever happened before, the output is clamped to [0, 1] at the end. NaN
// collapses to 0 on the way, so a bad pixel never reaches the sink.

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::grid::Grid;
use crate::core_modules::parameters::MappedParameters;
use crate::core_modules::pixel::pixel::Pixel;

const EXPLICIT_GAIN: f32 = 0.8;
const DETAIL_GAIN: f32 = 0.2;

/// Adds the auto-sharpen share of the high-pass to a blended pixel. A no-op
/// unless `mapped.auto_sharpen` is set.
pub fn auto_sharpen_pixel(blended: Pixel, original: Pixel, smoothed: Pixel, mapped: &MappedParameters) -> Pixel {
    match mapped.auto_sharpen {
        Some(amount) => {
            let high_pass = (original - smoothed).saturated();
            (blended + (high_pass * amount).saturated()).saturated()
        }
        None => blended,
    }
}

/// Applies explicit sharpening to a toned pixel, then clamps.
pub fn sharpen_pixel(original: Pixel, toned: Pixel, smoothed: Pixel, mapped: &MappedParameters) -> Pixel {
    let mut out = toned;
    if let Some(k) = mapped.sharpen_strength {
        let high_pass = (original - smoothed).saturated();
        out = (out + (high_pass * (k * EXPLICIT_GAIN)).saturated()).saturated();
        out = out.offset(high_pass.rgb_norm() * k * DETAIL_GAIN);
    }
    out.clamped()
}

/// Stage 5: explicit detail re-injection and the final clamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sharpener;

impl Sharpener {
    pub fn apply(
        &self,
        original: &Frame,
        toned: &Frame,
        smoothed: &Frame,
        mapped: &MappedParameters,
        grid: &Grid,
    ) -> Frame {
        let pixels = grid.map(|x, y| {
            sharpen_pixel(original.pixel(x, y), toned.pixel(x, y), smoothed.pixel(x, y), mapped)
        });
        Frame::from_grid(original.width(), original.height(), pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::parameters::BeautyParameters;

    fn mapped(smooth: f32, sharpen: f32) -> MappedParameters {
        MappedParameters::from_parameters(&BeautyParameters::new(smooth, 0.0, 0.0, sharpen))
    }

    #[test]
    fn auto_sharpen_adds_scaled_high_pass() {
        let m = mapped(100.0, 0.0);
        let original = Pixel::rgb(0.6, 0.5, 0.4);
        let smoothed = Pixel::rgb(0.5, 0.5, 0.5);
        let out = auto_sharpen_pixel(smoothed, original, smoothed, &m);
        // high-pass (0.1, 0, -0.1) * 0.06, no detail lift
        assert!((out.red - 0.506).abs() < 1e-6);
        assert!((out.green - 0.5).abs() < 1e-6);
        assert!((out.blue - 0.494).abs() < 1e-6);
    }

    #[test]
    fn auto_sharpen_is_off_with_explicit_sharpen_or_weak_smoothing() {
        let original = Pixel::rgb(0.6, 0.5, 0.4);
        let smoothed = Pixel::rgb(0.5, 0.5, 0.5);
        for m in [mapped(100.0, 10.0), mapped(40.0, 0.0)] {
            assert_eq!(auto_sharpen_pixel(smoothed, original, smoothed, &m), smoothed);
        }
    }

    #[test]
    fn auto_sharpened_detail_goes_through_whitening() {
        let m = MappedParameters::from_parameters(&BeautyParameters::new(100.0, 100.0, 0.0, 0.0));
        let original = Pixel::rgb(0.6, 0.5, 0.4);
        let smoothed = Pixel::rgb(0.5, 0.5, 0.5);
        let restored = auto_sharpen_pixel(smoothed, original, smoothed, &m);
        let toned = crate::core_modules::tone_adjuster::adjust_pixel(restored, &m);
        let out = sharpen_pixel(original, toned, smoothed, &m);
        // The explicit stage adds nothing on top once tone has run.
        assert_eq!(out, toned.clamped());
        assert!((out.red - 0.76804).abs() < 1e-4);
        assert!((out.green - 0.75893).abs() < 1e-4);
        assert!((out.blue - 0.74982).abs() < 1e-4);
    }

    #[test]
    fn explicit_stage_ignores_auto_sharpen() {
        let m = mapped(100.0, 0.0);
        let toned = Pixel::rgb(0.5, 0.5, 0.5);
        let out = sharpen_pixel(Pixel::rgb(0.6, 0.5, 0.4), toned, toned, &m);
        assert_eq!(out, toned);
    }

    #[test]
    fn explicit_sharpen_adds_high_pass_and_lift() {
        let m = mapped(0.0, 50.0);
        let original = Pixel::rgb(0.6, 0.5, 0.5);
        let smoothed = Pixel::rgb(0.5, 0.5, 0.5);
        let out = sharpen_pixel(original, smoothed, smoothed, &m);
        // 0.5 + 0.1 * 0.8 + |0.1| * 0.2
        assert!((out.red - 0.6).abs() < 1e-6);
        assert!((out.green - 0.52).abs() < 1e-6);
        assert!((out.blue - 0.52).abs() < 1e-6);
    }

    #[test]
    fn nothing_active_only_clamps() {
        let m = mapped(0.0, 0.0);
        let toned = Pixel::new(1.3, -0.2, f32::NAN, 1.0);
        let out = sharpen_pixel(Pixel::rgb(0.5, 0.5, 0.5), toned, Pixel::rgb(0.1, 0.1, 0.1), &m);
        assert_eq!(out, Pixel::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn output_is_always_in_unit_range() {
        let m = mapped(100.0, 100.0);
        let out = sharpen_pixel(Pixel::rgb(1.0, 0.0, 1.0), Pixel::rgb(0.9, 0.1, 0.9), Pixel::rgb(0.0, 1.0, 0.0), &m);
        for c in [out.red, out.green, out.blue, out.alpha] {
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn alpha_follows_toned_pixel() {
        let m = mapped(0.0, 50.0);
        let toned = Pixel::new(0.5, 0.5, 0.5, 0.4);
        let out = sharpen_pixel(Pixel::new(0.7, 0.5, 0.5, 0.9), toned, Pixel::rgb(0.5, 0.5, 0.5), &m);
        assert_eq!(out.alpha, 0.4);
    }
}
