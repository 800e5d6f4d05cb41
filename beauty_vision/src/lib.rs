// THEORY:
// This file is the main entry point for the `beauty_vision` library crate. It
// defines the public API exposed to consumers such as the `beauty_tester`
// harness or a capture application.
//
// Two levels of API are offered:
// - `BeautyPipeline`: a pure, single-frame function `(frame, parameters) ->
//   frame`. No threads of its own beyond rayon's data parallelism, no state
//   between frames.
// - `BeautyStream` / `run_session`: a live stream processor built on tokio, with
//   bounded queues, load shedding, in-order delivery and a live parameter
//   channel.
//
// The per-pixel stages (`core_modules`) stay public for callers that want to run
// or test a single stage, but the two types above are the intended surface.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod interfaces;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::BeautyConfig;
pub use core_modules::bilateral_smoother::GaussianForm;
pub use core_modules::frame::frame::Frame;
pub use core_modules::parameters::{BeautyParameters, MappedParameters, ParameterUpdate};
pub use core_modules::pixel::pixel::Pixel;
pub use core_modules::utils::image_helper::image_helper::{load_frame, save_frame};
pub use core_modules::utils::image_sequence::{ImageSequenceSink, ImageSequenceSource};
pub use error::{BeautyError, Result};
pub use interfaces::{FrameSink, FrameSource, ParameterChannel, SessionReport, run_session};
pub use parallel_pipeline::{
    BeautyStream, DropPolicy, FrameSubmitter, ProcessedFrame, StreamConfig, StreamStats, SubmitOutcome,
};
pub use pipeline::{BeautyPipeline, FrameStats, PipelineConfig};
