// THEORY:
// The `Pixel` module is the most fundamental unit of the beauty engine. It is a
// "dumb" data container for a single RGBA sample held as normalized floats, plus
// the small set of colour arithmetic every later stage is written in terms of.
//
// Key principles:
// 1) Floating point, normalized: channels are `f32` in [0, 1]. Intermediate
//    stages are allowed to leave that range (a whitening boost or a high-pass
//    term is routinely above 1.0 or below 0.0); only the final stage clamps.
// 2) Colour math is RGB-only: difference, scaling, mixing and distance act on
//    R, G and B. Alpha rides along from the left-hand operand untouched.
// 3) Single-pixel scope: nothing here reads a neighbour. Anything that needs
//    another pixel of the frame (gradients, kernels) lives in a higher module.
//
// Conversions to and from 8-bit RGBA bytes are the bridge to the capture and
// display side, which speaks packed `u8` buffers.

pub mod pixel {
    use std::ops::{Add, Mul, Sub};

    pub type Byte = u8;
    pub type Channel = f32;
    pub type Luminance = f32;
    pub type ColorDistance = f32;

    pub const CHANNELS: usize = 4;

    /// Rec. 601 luma weights, applied to normalized channels.
    const LUMA_WEIGHTS: [Channel; 3] = [0.299, 0.587, 0.114];

    /// A single RGBA sample with normalized floating point channels.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Pixel {
        /// The red channel value (nominally 0.0-1.0).
        pub red: Channel,
        /// The green channel value (nominally 0.0-1.0).
        pub green: Channel,
        /// The blue channel value (nominally 0.0-1.0).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0.0-1.0). Never touched by colour math.
        pub alpha: Channel,
    }

    impl Pixel {
        pub const fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Opaque pixel from three colour channels.
        pub const fn rgb(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, 1.0)
        }

        /// Same alpha, new colour.
        #[inline]
        pub fn with_rgb(self, red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, self.alpha)
        }

        /// Applies `f` to each colour channel; alpha is kept.
        #[inline]
        pub fn map_rgb(self, f: impl Fn(Channel) -> Channel) -> Self {
            self.with_rgb(f(self.red), f(self.green), f(self.blue))
        }

        /// Per-channel multiply by a tint vector (R, G, B).
        #[inline]
        pub fn tint(self, tint: [Channel; 3]) -> Self {
            self.with_rgb(self.red * tint[0], self.green * tint[1], self.blue * tint[2])
        }

        /// Adds the same offset to R, G and B.
        #[inline]
        pub fn offset(self, amount: Channel) -> Self {
            self.map_rgb(|c| c + amount)
        }

        /// Linear interpolation of the colour channels towards `target`.
        /// `t = 0` returns `self`, `t = 1` returns `target`'s colour with `self`'s alpha.
        #[inline]
        pub fn lerp(self, target: Pixel, t: f32) -> Self {
            self.with_rgb(
                lerp(self.red, target.red, t),
                lerp(self.green, target.green, t),
                lerp(self.blue, target.blue, t),
            )
        }

        /// Clamps every channel, alpha included, to [0, 1]. NaN collapses to 0.
        #[inline]
        pub fn clamped(self) -> Self {
            Self::new(
                clamp_unit(self.red),
                clamp_unit(self.green),
                clamp_unit(self.blue),
                clamp_unit(self.alpha),
            )
        }

        /// Pins infinite colour channels to `±f32::MAX` so a later `inf - inf`
        /// cannot turn an overflowed value into NaN. NaN itself is left as is.
        #[inline]
        pub fn saturated(self) -> Self {
            self.map_rgb(|c| c.clamp(-Channel::MAX, Channel::MAX))
        }

        pub fn is_finite(&self) -> bool {
            self.red.is_finite()
                && self.green.is_finite()
                && self.blue.is_finite()
                && self.alpha.is_finite()
        }

        /// =================================Heuristics==================================

        /// Luminance estimate (Rec. 601 luma) on normalized channels.
        pub fn luminance(&self) -> Luminance {
            LUMA_WEIGHTS[0] * self.red + LUMA_WEIGHTS[1] * self.green + LUMA_WEIGHTS[2] * self.blue
        }

        /// Euclidean length of the colour vector (R, G, B).
        pub fn rgb_norm(&self) -> ColorDistance {
            (self.red * self.red + self.green * self.green + self.blue * self.blue).sqrt()
        }

        /// Euclidean distance between two colours in RGB space.
        pub fn distance(&self, other: &Pixel) -> ColorDistance {
            (*self - *other).rgb_norm()
        }

        /// =================================Conversions==================================

        pub fn from_bytes(bytes: [Byte; CHANNELS]) -> Self {
            Self::new(
                bytes[0] as Channel / 255.0,
                bytes[1] as Channel / 255.0,
                bytes[2] as Channel / 255.0,
                bytes[3] as Channel / 255.0,
            )
        }

        /// Quantizes to 8-bit RGBA, clamping first.
        pub fn to_bytes(&self) -> [Byte; CHANNELS] {
            let clamped = self.clamped();
            [
                quantize(clamped.red),
                quantize(clamped.green),
                quantize(clamped.blue),
                quantize(clamped.alpha),
            ]
        }
    }

    impl Add for Pixel {
        type Output = Pixel;

        /// Colour channels add; alpha comes from `self`.
        fn add(self, rhs: Pixel) -> Pixel {
            self.with_rgb(self.red + rhs.red, self.green + rhs.green, self.blue + rhs.blue)
        }
    }

    impl Sub for Pixel {
        type Output = Pixel;

        /// Colour channels subtract; alpha comes from `self`.
        fn sub(self, rhs: Pixel) -> Pixel {
            self.with_rgb(self.red - rhs.red, self.green - rhs.green, self.blue - rhs.blue)
        }
    }

    impl Mul<f32> for Pixel {
        type Output = Pixel;

        fn mul(self, rhs: f32) -> Pixel {
            self.map_rgb(|c| c * rhs)
        }
    }

    impl From<[Byte; CHANNELS]> for Pixel {
        fn from(bytes: [Byte; CHANNELS]) -> Self {
            Pixel::from_bytes(bytes)
        }
    }

    impl From<Pixel> for [Byte; CHANNELS] {
        fn from(pixel: Pixel) -> Self {
            pixel.to_bytes()
        }
    }

    /// Scalar linear interpolation, `a + (b - a) * t`.
    #[inline]
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Hermite step between two edges, 0 below `edge0`, 1 above `edge1`.
    /// Degenerate edges behave as a hard step at `edge0`.
    #[inline]
    pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
        let width = edge1 - edge0;
        if width.abs() <= f32::EPSILON {
            return if x < edge0 { 0.0 } else { 1.0 };
        }
        let t = ((x - edge0) / width).clamp(0.0, 1.0);
        t * t * (3.0 - 2.0 * t)
    }

    /// Clamp to [0, 1], mapping NaN to 0.
    #[inline]
    pub fn clamp_unit(value: f32) -> f32 {
        if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        }
    }

    #[inline]
    fn quantize(value: Channel) -> Byte {
        (value * 255.0).round() as Byte
    }
}


// -----------------------------------------------------------------------------
// Glossary: Single-Pixel Colour Terms
//
// - Normalized channel: 8-bit value divided by 255. Still gamma-encoded; all
//   filter math in this crate runs on these values directly.
//
// - Luminance: Rec. 601 weighted sum of R, G, B. Drives the brightness-dependent
//   second pass of whitening.
//
// - Colour distance: Euclidean norm of the RGB difference. Used by the edge
//   estimator (neighbour gradients) and by the bilateral range weight.
//
// - Lerp / mix: `a + (b - a) * t`. Every blend in the pipeline is expressed
//   with it, including the extrapolating ones where t falls outside [0, 1].
