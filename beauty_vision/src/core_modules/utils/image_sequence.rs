// THEORY:
// Directory-backed implementations of the `FrameSource` and `FrameSink`
// traits, for offline runs and tests.
//
// The source lists a directory once at open time, keeps the PNG/JPEG files in
// file-name order and decodes one file per `next_frame` call. Every frame must
// match the first one's dimensions. The sink writes `frame_NNNNNN.png` named by
// the submission sequence, so gaps left by dropped frames stay visible in the
// output directory.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::utils::image_helper::image_helper::{load_frame, save_frame};
use crate::error::{BeautyError, Result};
use crate::interfaces::{DEFAULT_FRAME_INTERVAL, FrameSink, FrameSource};
use crate::parallel_pipeline::ProcessedFrame;

const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Reads the PNG/JPEG files of a directory, in file-name order, as a feed.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: VecDeque<PathBuf>,
    dimensions: (u32, u32),
    interval: Duration,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self> {
        let io_error = |source| BeautyError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file() && is_frame_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let first = paths.first().ok_or_else(|| {
            io_error(io::Error::new(io::ErrorKind::NotFound, "no PNG or JPEG frames in directory"))
        })?;
        let dimensions = image::image_dimensions(first)?;
        debug!("found {} frames of {}x{} in {}", paths.len(), dimensions.0, dimensions.1, dir.display());

        Ok(Self {
            paths: paths.into(),
            dimensions,
            interval: DEFAULT_FRAME_INTERVAL,
        })
    }

    /// Overrides the nominal 30 fps pacing.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn frame_interval(&self) -> Duration {
        self.interval
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let frame = load_frame(&path)?;
        if frame.dimensions() != self.dimensions {
            return Err(BeautyError::DimensionMismatch {
                expected_width: self.dimensions.0,
                expected_height: self.dimensions.1,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }
        Ok(Some(frame))
    }
}

/// Writes every delivered frame as `frame_<sequence>.png` into a directory.
#[derive(Debug)]
pub struct ImageSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl ImageSequenceSink {
    /// Creates `dir` (and parents) if needed.
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|source| BeautyError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn path_for(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!("frame_{sequence:06}.png"))
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for ImageSequenceSink {
    fn deliver(&mut self, frame: &ProcessedFrame) -> Result<()> {
        save_frame(&self.path_for(frame.sequence), &frame.frame)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        debug!("wrote {} frames to {}", self.written, self.dir.display());
        Ok(())
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAME_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::parameters::BeautyParameters;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::pipeline::FrameStats;

    fn write_frames(dir: &Path, count: u32, width: u32, height: u32) {
        for i in 0..count {
            let frame = Frame::filled(width, height, Pixel::rgb(0.1 * i as f32, 0.4, 0.5)).unwrap();
            save_frame(&dir.join(format!("{i:03}.png")), &frame).unwrap();
        }
    }

    #[test]
    fn source_reads_frames_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 3, 5, 4);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.dimensions(), (5, 4));
        assert_eq!(source.remaining(), 3);

        let reds: Vec<u8> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.pixel(0, 0).to_bytes()[0])
            .collect();
        assert_eq!(reds, vec![0, 26, 51]);
    }

    #[test]
    fn source_rejects_mixed_sizes() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), 1, 5, 4);
        save_frame(&dir.path().join("999.png"), &Frame::filled(3, 3, Pixel::rgb(0.0, 0.0, 0.0)).unwrap()).unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(matches!(source.next_frame(), Err(BeautyError::DimensionMismatch { .. })));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ImageSequenceSource::open(dir.path()), Err(BeautyError::Io { .. })));
    }

    #[test]
    fn sink_numbers_files_by_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let mut sink = ImageSequenceSink::create(&out).unwrap();
        let processed = ProcessedFrame {
            sequence: 7,
            frame: Frame::filled(2, 2, Pixel::rgb(0.2, 0.3, 0.4)).unwrap(),
            parameters: BeautyParameters::default(),
            stats: FrameStats::default(),
        };
        sink.deliver(&processed).unwrap();
        sink.finish().unwrap();

        assert_eq!(sink.written(), 1);
        assert!(out.join("frame_000007.png").is_file());
    }
}
