// THEORY:
// The `pipeline` module is the top-level, single-frame API of the engine. It
// wires the stages of `core_modules` into one pure function:
//
//     frame, parameters  ->  beautified frame
//
// Per frame the work is:
// 1.  Map the parameter snapshot into `MappedParameters` (once, not per pixel).
// 2.  Edge estimator and skin classifier over the input (only when smoothing).
// 3.  Adaptive bilateral smoother.
// 4.  Blend the input toward the smoothed colour by `s * 0.75`, plus the
//     auto-sharpen share of the removed detail when it is active.
// 5.  Tone adjuster (whitening, then rosy) on the blended colour.
// 6.  Explicit sharpening from the original and smoothed colours, then the
//     final clamp.
//
// The pipeline holds no state between frames. Stages that are switched off
// borrow their input instead of copying it, and an all-zero parameter set
// short-circuits to an exact copy of the input, so "effects off" is a true
// bit-exact passthrough.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use log::trace;
use serde::{Deserialize, Serialize};

use crate::core_modules::bilateral_smoother::{BilateralSmoother, GaussianForm, blend_with_original};
use crate::core_modules::edge_estimator::EdgeMap;
use crate::core_modules::frame::frame::Frame;
use crate::core_modules::grid::{DEFAULT_PARALLEL_THRESHOLD, Grid};
use crate::core_modules::parameters::{BeautyParameters, MappedParameters};
use crate::core_modules::sharpener::{Sharpener, auto_sharpen_pixel};
use crate::core_modules::skin_classifier::SkinMap;
use crate::core_modules::tone_adjuster::ToneAdjuster;

/// Configuration for the `BeautyPipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Gaussian used for every kernel weight.
    pub gaussian: GaussianForm,
    /// Frames with at least this many pixels are processed on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gaussian: GaussianForm::default(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

/// Side information gathered while processing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// Fraction of input pixels the classifier called skin. Zero when smoothing was off.
    pub skin_coverage: f32,
    /// Mean edge intensity of the input. Zero when smoothing was off.
    pub mean_edge: f32,
    /// Wall time spent in the pipeline.
    pub elapsed: Duration,
}

/// The beautification engine for single frames.
#[derive(Debug, Clone, Default)]
pub struct BeautyPipeline {
    config: PipelineConfig,
    smoother: BilateralSmoother,
    tone: ToneAdjuster,
    sharpener: Sharpener,
}

impl BeautyPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            smoother: BilateralSmoother::new(config.gaussian),
            tone: ToneAdjuster,
            sharpener: Sharpener,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Beautifies `frame` with one parameter snapshot.
    pub fn process(&self, frame: &Frame, parameters: &BeautyParameters) -> Frame {
        self.process_with_stats(frame, parameters).0
    }

    /// Same as `process`, also returning per-frame statistics.
    pub fn process_with_stats(&self, frame: &Frame, parameters: &BeautyParameters) -> (Frame, FrameStats) {
        let started = Instant::now();
        if parameters.is_neutral() {
            let stats = FrameStats {
                elapsed: started.elapsed(),
                ..FrameStats::default()
            };
            return (frame.clone(), stats);
        }

        let mapped = MappedParameters::from_parameters(parameters);
        let grid = Grid::new(frame.width(), frame.height(), self.config.parallel_threshold);
        let mut stats = FrameStats::default();

        let smoothed: Cow<'_, Frame> = if mapped.smooth_active {
            let edges = EdgeMap::compute(frame, &grid);
            let skin = SkinMap::compute(frame, &grid);
            stats.mean_edge = edges.mean();
            stats.skin_coverage = skin.coverage();
            self.smoother.apply(frame, &edges, &skin, &mapped, &grid)
        } else {
            Cow::Borrowed(frame)
        };

        let blended = blend_stage(frame, &smoothed, &mapped, &grid);
        let toned = self.tone.apply(&blended, &mapped, &grid);
        let output = self.sharpener.apply(frame, &toned, &smoothed, &mapped, &grid);

        stats.elapsed = started.elapsed();
        trace!(
            "processed {}x{} frame in {:?} (skin {:.2}, edge {:.3})",
            frame.width(),
            frame.height(),
            stats.elapsed,
            stats.skin_coverage,
            stats.mean_edge
        );
        (output, stats)
    }
}

/// Mixes `frame` toward `smoothed` and re-adds auto-sharpen detail. Borrows the
/// input when smoothing is off, since the smoother then returned it unchanged.
fn blend_stage<'a>(frame: &'a Frame, smoothed: &Frame, mapped: &MappedParameters, grid: &Grid) -> Cow<'a, Frame> {
    if !mapped.smooth_active {
        return Cow::Borrowed(frame);
    }
    let pixels = grid.map(|x, y| {
        let (original, smooth) = (frame.pixel(x, y), smoothed.pixel(x, y));
        auto_sharpen_pixel(blend_with_original(original, smooth, mapped), original, smooth, mapped)
    });
    Cow::Owned(Frame::from_grid(frame.width(), frame.height(), pixels))
}
