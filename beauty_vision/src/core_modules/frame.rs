// THEORY:
// The `Frame` module is the spatial container the whole pipeline flows through:
// a fixed-size, row-major grid of `Pixel`s. Like `Pixel`, it is a "dumb" data
// object. It knows its own shape and how to hand out samples, nothing more.
//
// Key architectural principles:
// 1.  **Immutable by convention**: every stage reads one `Frame` and builds a new
//     one. Nothing in the engine mutates a frame after construction, which is what
//     lets every per-pixel computation run in any order or in parallel.
// 2.  **Edge-clamped addressing**: kernels and gradients ask for samples at
//     arbitrary signed offsets. `sample_clamped` pins those requests to the nearest
//     border pixel instead of wrapping or reading past the allocation.
// 3.  **Validated shape**: a frame always has non-zero area and exactly
//     `width * height` pixels. Malformed buffers are rejected once, at the boundary,
//     so the hot path never has to check.

pub mod frame {
    use crate::core_modules::pixel::pixel::{Byte, CHANNELS, Pixel};
    use crate::error::{BeautyError, Result};
    use image::{Rgba, RgbaImage};

    /// A rectangular, row-major grid of pixels.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Frame {
        /// The width of the frame in pixels.
        width: u32,
        /// The height of the frame in pixels.
        height: u32,
        /// Flattened row-major pixel storage, `width * height` long.
        pixels: Vec<Pixel>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Result<Self> {
            check_area(width, height)?;
            let expected = width as usize * height as usize;
            if pixels.len() != expected {
                return Err(BeautyError::BufferSize {
                    width,
                    height,
                    expected,
                    actual: pixels.len(),
                });
            }
            Ok(Self {
                width,
                height,
                pixels,
            })
        }

        /// A frame where every pixel has the same value.
        pub fn filled(width: u32, height: u32, pixel: Pixel) -> Result<Self> {
            check_area(width, height)?;
            Ok(Self {
                width,
                height,
                pixels: vec![pixel; width as usize * height as usize],
            })
        }

        /// Builds a frame by evaluating `f(x, y)` in row-major order.
        pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Pixel) -> Result<Self> {
            check_area(width, height)?;
            let mut pixels = Vec::with_capacity(width as usize * height as usize);
            for y in 0..height {
                for x in 0..width {
                    pixels.push(f(x, y));
                }
            }
            Ok(Self {
                width,
                height,
                pixels,
            })
        }

        /// Decodes a packed RGBA8 buffer, as delivered by capture devices.
        pub fn from_rgba8(width: u32, height: u32, bytes: &[Byte]) -> Result<Self> {
            check_area(width, height)?;
            let expected = width as usize * height as usize * CHANNELS;
            if bytes.len() != expected {
                return Err(BeautyError::BufferSize {
                    width,
                    height,
                    expected,
                    actual: bytes.len(),
                });
            }
            let pixels = bytes
                .chunks_exact(CHANNELS)
                .map(|px| Pixel::from_bytes([px[0], px[1], px[2], px[3]]))
                .collect();
            Ok(Self {
                width,
                height,
                pixels,
            })
        }

        /// Encodes to a packed RGBA8 buffer, clamping and rounding each channel.
        pub fn to_rgba8(&self) -> Vec<Byte> {
            let mut bytes = Vec::with_capacity(self.pixels.len() * CHANNELS);
            for pixel in &self.pixels {
                bytes.extend_from_slice(&pixel.to_bytes());
            }
            bytes
        }

        /// Trusted constructor for stage outputs built over this frame's grid.
        pub(crate) fn from_grid(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
            debug_assert_eq!(pixels.len(), width as usize * height as usize);
            Self {
                width,
                height,
                pixels,
            }
        }

        pub fn width(&self) -> u32 {
            self.width
        }

        pub fn height(&self) -> u32 {
            self.height
        }

        pub fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        pub fn pixels(&self) -> &[Pixel] {
            &self.pixels
        }

        /// The pixel at `(x, y)`. Coordinates must be inside the frame.
        #[inline]
        pub fn pixel(&self, x: u32, y: u32) -> Pixel {
            self.pixels[y as usize * self.width as usize + x as usize]
        }

        /// The pixel at a signed coordinate, clamped to the nearest border pixel.
        #[inline]
        pub fn sample_clamped(&self, x: i64, y: i64) -> Pixel {
            let cx = x.clamp(0, self.width as i64 - 1) as usize;
            let cy = y.clamp(0, self.height as i64 - 1) as usize;
            self.pixels[cy * self.width as usize + cx]
        }
    }

    impl TryFrom<&RgbaImage> for Frame {
        type Error = BeautyError;

        fn try_from(image: &RgbaImage) -> Result<Self> {
            Frame::from_rgba8(image.width(), image.height(), image.as_raw())
        }
    }

    impl From<&Frame> for RgbaImage {
        fn from(frame: &Frame) -> Self {
            RgbaImage::from_fn(frame.width, frame.height, |x, y| Rgba(frame.pixel(x, y).to_bytes()))
        }
    }

    fn check_area(width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(BeautyError::EmptyFrame { width, height });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::frame::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::error::BeautyError;

    fn ramp(width: u32, height: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            Pixel::rgb(x as f32 / width as f32, y as f32 / height as f32, 0.5)
        })
        .expect("valid ramp")
    }

    #[test]
    fn rejects_zero_area() {
        assert!(matches!(
            Frame::filled(0, 10, Pixel::default()),
            Err(BeautyError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn rejects_short_rgba_buffer() {
        let err = Frame::from_rgba8(2, 2, &[0u8; 15]).unwrap_err();
        assert!(matches!(err, BeautyError::BufferSize { expected: 16, actual: 15, .. }));
    }

    #[test]
    fn sample_clamped_pins_to_border() {
        let frame = ramp(4, 3);
        assert_eq!(frame.sample_clamped(-5, -5), frame.pixel(0, 0));
        assert_eq!(frame.sample_clamped(10, 1), frame.pixel(3, 1));
        assert_eq!(frame.sample_clamped(2, 99), frame.pixel(2, 2));
        assert_eq!(frame.sample_clamped(1, 1), frame.pixel(1, 1));
    }

    #[test]
    fn rgba8_round_trip_preserves_bytes() {
        let bytes: Vec<u8> = (0..(3 * 2 * 4)).map(|i| (i * 10) as u8).collect();
        let frame = Frame::from_rgba8(3, 2, &bytes).unwrap();
        assert_eq!(frame.to_rgba8(), bytes);
    }

    #[test]
    fn image_conversion_matches_layout() {
        let frame = ramp(5, 4);
        let image: image::RgbaImage = (&frame).into();
        assert_eq!(image.dimensions(), (5, 4));
        assert_eq!(image.get_pixel(3, 2).0, frame.pixel(3, 2).to_bytes());
        let back = Frame::try_from(&image).unwrap();
        assert_eq!(back.to_rgba8(), frame.to_rgba8());
    }
}
