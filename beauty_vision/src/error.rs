// THEORY:
// One error enum for the whole crate. Per-pixel math never fails: degenerate
// numbers are resolved in place (zero weight sums fall back to the centre
// pixel, NaN clamps to 0). Errors only come from the edges of the system,
// where frames, files and the stream lifecycle are handled. Variants wrap their
// source with `#[from]` or `#[source]` so the tester can print the full chain.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the beauty engine.
#[derive(Debug, Error)]
pub enum BeautyError {
    #[error("frame buffer holds {actual} values, expected {expected} for a {width}x{height} frame")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("frame has zero area ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("frame is {actual_width}x{actual_height}, session expects {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("stream is shut down")]
    StreamClosed,

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("sink rejected frame {sequence}: {reason}")]
    Sink { sequence: u64, reason: String },

    #[error("session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, BeautyError>;
