use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use beauty_vision::{
    BeautyConfig, BeautyPipeline, DropPolicy, Frame, FrameSink, FrameSource, GaussianForm, ImageSequenceSink,
    ImageSequenceSource, ParameterChannel, ProcessedFrame, run_session,
};
use clap::Parser;
use image::{RgbaImage, imageops};
use log::{info, warn};
use parking_lot::Mutex;

/// Runs a directory of frames through the beauty engine and writes the results.
#[derive(Parser, Debug)]
#[command(name = "beauty_tester", version, about)]
struct Args {
    /// Directory of PNG/JPEG input frames, processed in file-name order.
    input: PathBuf,
    /// Directory the processed frames are written to.
    output: PathBuf,
    /// JSON configuration file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    smooth: Option<f32>,
    #[arg(long)]
    whiten: Option<f32>,
    #[arg(long)]
    rosy: Option<f32>,
    #[arg(long)]
    sharpen: Option<f32>,
    /// Nominal feed rate used to pace submission. 0 submits as fast as frames load.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,
    #[arg(long)]
    workers: Option<usize>,
    /// `normalized` or `unnormalized`.
    #[arg(long)]
    gaussian: Option<GaussianForm>,
    /// `drop_newest` or `drop_oldest`.
    #[arg(long)]
    drop_policy: Option<DropPolicy>,
    /// Process every N-th frame.
    #[arg(long)]
    stride: Option<u64>,
    /// Write original and processed frames side by side.
    #[arg(long)]
    side_by_side: bool,
    /// Print the effective configuration as JSON before running.
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn effective_config(&self) -> Result<BeautyConfig> {
        let mut config = match &self.config {
            Some(path) => {
                BeautyConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))?
            }
            None => BeautyConfig::default(),
        };
        let parameters = &mut config.parameters;
        parameters.smooth = self.smooth.unwrap_or(parameters.smooth);
        parameters.whiten = self.whiten.unwrap_or(parameters.whiten);
        parameters.rosy = self.rosy.unwrap_or(parameters.rosy);
        parameters.sharpen = self.sharpen.unwrap_or(parameters.sharpen);
        if let Some(workers) = self.workers {
            config.stream.worker_count = workers;
        }
        if let Some(gaussian) = self.gaussian {
            config.pipeline.gaussian = gaussian;
        }
        if let Some(drop_policy) = self.drop_policy {
            config.stream.drop_policy = drop_policy;
        }
        if let Some(stride) = self.stride {
            config.stream.frame_stride = stride;
        }
        Ok(config)
    }

    fn frame_interval(&self) -> Duration {
        if self.fps > 0.0 && self.fps.is_finite() {
            Duration::from_secs_f64(1.0 / self.fps)
        } else {
            Duration::ZERO
        }
    }
}

type Originals = Arc<Mutex<BTreeMap<u64, Frame>>>;

/// Remembers every frame it hands out so the sink can pair it with its output.
struct RecordingSource {
    inner: ImageSequenceSource,
    originals: Originals,
    next_sequence: u64,
}

impl FrameSource for RecordingSource {
    fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    fn frame_interval(&self) -> Duration {
        self.inner.frame_interval()
    }

    fn next_frame(&mut self) -> beauty_vision::Result<Option<Frame>> {
        let frame = self.inner.next_frame()?;
        if let Some(frame) = &frame {
            self.originals.lock().insert(self.next_sequence, frame.clone());
            self.next_sequence += 1;
        }
        Ok(frame)
    }
}

/// Writes `original | processed` composites.
struct SideBySideSink {
    inner: ImageSequenceSink,
    originals: Originals,
}

impl FrameSink for SideBySideSink {
    fn deliver(&mut self, processed: &ProcessedFrame) -> beauty_vision::Result<()> {
        let original = {
            let mut originals = self.originals.lock();
            // Frames before this one were dropped or already written.
            let mut newer = originals.split_off(&processed.sequence);
            let original = newer.remove(&processed.sequence);
            *originals = newer;
            original
        };
        let Some(original) = original else {
            warn!("no original kept for frame {}; writing it alone", processed.sequence);
            return self.inner.deliver(processed);
        };

        let (width, height) = original.dimensions();
        let mut canvas = RgbaImage::new(width * 2, height);
        imageops::replace(&mut canvas, &RgbaImage::from(&original), 0, 0);
        imageops::replace(&mut canvas, &RgbaImage::from(&processed.frame), width as i64, 0);
        canvas.save(self.inner.path_for(processed.sequence))?;
        Ok(())
    }

    fn finish(&mut self) -> beauty_vision::Result<()> {
        self.inner.finish()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = args.effective_config()?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    let source = ImageSequenceSource::open(&args.input)
        .with_context(|| format!("failed to open input frames in {}", args.input.display()))?
        .with_interval(args.frame_interval());
    let sink = ImageSequenceSink::create(&args.output)
        .with_context(|| format!("failed to create output directory {}", args.output.display()))?;
    info!(
        "{} frames of {}x{} from {}",
        source.remaining(),
        source.dimensions().0,
        source.dimensions().1,
        args.input.display()
    );

    let pipeline = BeautyPipeline::new(config.pipeline);
    let parameters = ParameterChannel::new(config.parameters);

    let report = if args.side_by_side {
        let originals = Originals::default();
        let source = RecordingSource {
            inner: source,
            originals: Arc::clone(&originals),
            next_sequence: 0,
        };
        let sink = SideBySideSink { inner: sink, originals };
        run_session(source, sink, pipeline, &parameters, config.stream).await
    } else {
        run_session(source, sink, pipeline, &parameters, config.stream).await
    }
    .context("beauty session failed")?;

    info!(
        "Processing complete: {} read, {} written, {} skipped, {} dropped, {} abandoned in {:?}",
        report.frames_read,
        report.frames_written,
        report.stream.skipped,
        report.stream.dropped,
        report.stream.abandoned,
        report.elapsed
    );
    Ok(())
}
