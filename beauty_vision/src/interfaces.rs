// THEORY:
// The engine talks to the outside world through three seams:
//
// - `FrameSource`: anything that yields fixed-size frames at a nominal rate
//   (a camera, a decoded video, a directory of stills).
// - `FrameSink`: anything that accepts the beautified frames, one per processed
//   input, in order.
// - `ParameterChannel`: the live `{smooth, whiten, rosy, sharpen}` record a UI
//   writes to. Workers read a snapshot of it when they pick up a frame, so a
//   slider move takes effect on the next frame and never half-way through one.
//
// `run_session` wires a source and a sink to a `BeautyStream`. Reading and
// writing happen on tokio's blocking pool, since real sources and sinks do
// blocking I/O, and submission is paced at the source's frame interval so load
// shedding behaves exactly as it would on a live feed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;
use tokio::sync::watch;

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::parameters::{BeautyParameters, ParameterUpdate};
use crate::error::Result;
use crate::parallel_pipeline::{BeautyStream, ProcessedFrame, StreamConfig, StreamStats};
use crate::pipeline::BeautyPipeline;

/// Nominal interval of a 30 fps feed.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 30);

/// A producer of fixed-size frames.
pub trait FrameSource: Send {
    /// Width and height of every frame this source yields.
    fn dimensions(&self) -> (u32, u32);

    /// Time between frames on the original feed.
    fn frame_interval(&self) -> Duration {
        DEFAULT_FRAME_INTERVAL
    }

    /// The next frame, or `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// A consumer of processed frames.
pub trait FrameSink: Send {
    fn deliver(&mut self, frame: &ProcessedFrame) -> Result<()>;

    /// Called once after the last frame.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Shared, settable beauty parameters.
#[derive(Debug, Clone)]
pub struct ParameterChannel {
    sender: Arc<watch::Sender<BeautyParameters>>,
}

impl Default for ParameterChannel {
    fn default() -> Self {
        Self::new(BeautyParameters::default())
    }
}

impl ParameterChannel {
    pub fn new(initial: BeautyParameters) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Replaces the whole record.
    pub fn set(&self, parameters: BeautyParameters) {
        self.sender.send_replace(parameters);
    }

    /// Merges a partial update and returns the resulting record.
    pub fn update(&self, update: &ParameterUpdate) -> BeautyParameters {
        self.sender.send_modify(|current| current.apply(update));
        *self.sender.borrow()
    }

    pub fn current(&self) -> BeautyParameters {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<BeautyParameters> {
        self.sender.subscribe()
    }
}

/// Totals for one `run_session` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionReport {
    pub frames_read: u64,
    pub frames_written: u64,
    pub stream: StreamStats,
    pub elapsed: Duration,
}

/// Drives `source` through a `BeautyStream` into `sink` until the source runs dry.
///
/// Source and sink errors end the session; the stream is still shut down
/// cleanly before the first error is returned.
pub async fn run_session<S, K>(
    mut source: S,
    mut sink: K,
    pipeline: BeautyPipeline,
    parameters: &ParameterChannel,
    config: StreamConfig,
) -> Result<SessionReport>
where
    S: FrameSource + 'static,
    K: FrameSink + 'static,
{
    let started = Instant::now();
    let dimensions = source.dimensions();
    let interval = source.frame_interval();
    info!(
        "session started: {}x{} every {:?} with {:?}",
        dimensions.0,
        dimensions.1,
        interval,
        parameters.current()
    );

    let (stream, mut output) = BeautyStream::spawn(pipeline, dimensions, config, parameters.subscribe());
    let submitter = stream.submitter();

    let producer = tokio::task::spawn_blocking(move || -> Result<u64> {
        let mut frames_read = 0;
        let mut deadline = Instant::now();
        while let Some(frame) = source.next_frame()? {
            submitter.submit(frame)?;
            frames_read += 1;
            deadline = pace(deadline, interval);
        }
        Ok(frames_read)
    });

    let consumer = tokio::task::spawn_blocking(move || -> Result<u64> {
        let mut frames_written = 0;
        while let Some(processed) = output.blocking_recv() {
            sink.deliver(&processed)?;
            frames_written += 1;
        }
        sink.finish()?;
        Ok(frames_written)
    });

    let produced = producer.await;
    let stream_stats = stream.shutdown().await;
    let consumed = consumer.await;

    let report = SessionReport {
        frames_read: produced??,
        frames_written: consumed??,
        stream: stream_stats,
        elapsed: started.elapsed(),
    };
    info!(
        "session finished: read {}, wrote {}, dropped {} in {:?}",
        report.frames_read, report.frames_written, report.stream.dropped, report.elapsed
    );
    Ok(report)
}

/// Sleeps until `previous + interval`. A source that falls behind does not
/// build up sleep debt; the schedule restarts from now.
fn pace(previous: Instant, interval: Duration) -> Instant {
    let deadline = previous + interval;
    let now = Instant::now();
    if deadline > now {
        std::thread::sleep(deadline - now);
        deadline
    } else {
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::error::BeautyError;
    use crate::parallel_pipeline::DropPolicy;
    use crate::pipeline::PipelineConfig;
    use parking_lot::Mutex;

    struct Counting {
        remaining: u32,
        interval: Duration,
    }

    impl FrameSource for Counting {
        fn dimensions(&self) -> (u32, u32) {
            (6, 4)
        }

        fn frame_interval(&self) -> Duration {
            self.interval
        }

        fn next_frame(&mut self) -> Result<Option<Frame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Frame::filled(6, 4, Pixel::rgb(0.6, 0.45, 0.35)).map(Some)
        }
    }

    #[derive(Clone, Default)]
    struct Recording {
        sequences: Arc<Mutex<Vec<u64>>>,
        finished: Arc<Mutex<bool>>,
        fail_at: Option<u64>,
    }

    impl FrameSink for Recording {
        fn deliver(&mut self, frame: &ProcessedFrame) -> Result<()> {
            if Some(frame.sequence) == self.fail_at {
                return Err(BeautyError::Sink {
                    sequence: frame.sequence,
                    reason: "disk full".into(),
                });
            }
            self.sequences.lock().push(frame.sequence);
            Ok(())
        }

        fn finish(&mut self) -> Result<()> {
            *self.finished.lock() = true;
            Ok(())
        }
    }

    fn lossless() -> StreamConfig {
        StreamConfig {
            worker_count: 2,
            queue_capacity: 32,
            output_capacity: 32,
            drop_policy: DropPolicy::DropNewest,
            frame_stride: 1,
        }
    }

    #[test]
    fn partial_updates_merge_into_current_record() {
        let channel = ParameterChannel::default();
        let merged = channel.update(&ParameterUpdate {
            smooth: Some(80.0),
            ..Default::default()
        });
        assert_eq!(merged, BeautyParameters::new(80.0, 50.0, 50.0, 50.0));

        let receiver = channel.subscribe();
        channel.set(BeautyParameters::NEUTRAL);
        assert_eq!(*receiver.borrow(), BeautyParameters::NEUTRAL);
        assert_eq!(channel.current(), BeautyParameters::NEUTRAL);
    }

    #[test]
    fn pace_never_accumulates_debt() {
        let long_ago = Instant::now() - Duration::from_secs(5);
        let next = pace(long_ago, Duration::from_millis(1));
        assert!(next >= long_ago + Duration::from_secs(4));
    }

    #[tokio::test]
    async fn session_delivers_every_frame_in_order() {
        let sink = Recording::default();
        let source = Counting {
            remaining: 12,
            interval: Duration::from_millis(1),
        };
        let channel = ParameterChannel::default();
        let report = run_session(source, sink.clone(), BeautyPipeline::new(PipelineConfig::default()), &channel, lossless())
            .await
            .unwrap();

        assert_eq!(report.frames_read, 12);
        assert_eq!(report.frames_written, 12);
        assert_eq!(*sink.sequences.lock(), (0..12).collect::<Vec<_>>());
        assert!(*sink.finished.lock());
    }

    #[tokio::test]
    async fn sink_error_ends_the_session() {
        let sink = Recording {
            fail_at: Some(3),
            ..Default::default()
        };
        let source = Counting {
            remaining: 8,
            interval: Duration::ZERO,
        };
        let result = run_session(
            source,
            sink.clone(),
            BeautyPipeline::default(),
            &ParameterChannel::new(BeautyParameters::NEUTRAL),
            lossless(),
        )
        .await;

        assert!(matches!(result, Err(BeautyError::Sink { sequence: 3, .. })));
        assert_eq!(*sink.sequences.lock(), vec![0, 1, 2]);
        assert!(!*sink.finished.lock());
    }
}
