pub mod image_helper {
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use std::path::Path;

    use image::ImageEncoder;
    use image::codecs::png::PngEncoder;

    use crate::core_modules::frame::frame::Frame;
    use crate::error::{BeautyError, Result};

    /// Decodes any image format the `image` crate understands into a frame.
    pub fn load_frame(path: &Path) -> Result<Frame> {
        let image = image::open(path)?.to_rgba8();
        Frame::try_from(&image)
    }

    /// Writes `frame` as an 8-bit RGBA PNG.
    pub fn save_frame(path: &Path, frame: &Frame) -> Result<()> {
        let io_error = |source| BeautyError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut output = BufWriter::new(File::create(path).map_err(io_error)?);
        PngEncoder::new(&mut output).write_image(
            &frame.to_rgba8(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        // Dropping a BufWriter swallows the error of its last write.
        output.flush().map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::image_helper::*;
    use crate::core_modules::frame::frame::Frame;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::error::BeautyError;

    #[test]
    fn save_then_load_gradient_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("gradient_file.png");
        let width = 40u32;
        let height = 30u32;
        let frame = Frame::from_fn(width, height, |x, y| {
            Pixel::from_bytes([(x * 6) as u8, (y * 8) as u8, 128, 255])
        })
        .expect("valid frame");

        save_frame(&path, &frame).expect("Error Saving File.");
        let loaded = load_frame(&path).expect("Error Loading File.");

        assert_eq!(loaded.dimensions(), (width, height));
        assert_eq!(loaded.to_rgba8(), frame.to_rgba8());
    }

    #[test]
    fn saving_into_missing_directory_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing").join("white_file.png");
        let frame = Frame::filled(4, 4, Pixel::rgb(1.0, 1.0, 1.0)).expect("valid frame");

        match save_frame(&path, &frame) {
            Err(BeautyError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected an i/o error, got {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn buffered_write_failure_is_reported() {
        // /dev/full accepts the open and fails every write with ENOSPC. A tiny
        // frame fits in the write buffer, so only the final flush can see it.
        let path = std::path::Path::new("/dev/full");
        if !path.exists() {
            return;
        }
        let frame = Frame::filled(2, 2, Pixel::rgb(0.5, 0.5, 0.5)).expect("valid frame");
        match save_frame(path, &frame) {
            Err(BeautyError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected an i/o error, got {other:?}"),
        }
    }

    #[test]
    fn loading_garbage_is_an_image_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("not_an_image.png");
        std::fs::write(&path, b"definitely not a png").expect("write");
        assert!(matches!(load_frame(&path), Err(BeautyError::Image(_))));
    }
}
