// THEORY:
// The `parallel_pipeline` module turns the single-frame `BeautyPipeline` into a
// live stream processor. A camera produces frames at a fixed rate whether or not
// we keep up, so the design goal is: stay current, stay in order, never queue
// without bound.
//
// Shape of the stream:
//
//     submit() -> [bounded intake] -> N workers -> [reorder] -> bounded output
//
// 1.  **Intake**: a small FIFO guarded by a `parking_lot::Mutex`. When it is full
//     the `DropPolicy` decides who loses: the arriving frame (`DropNewest`) or the
//     stalest queued one (`DropOldest`). An optional stride keeps only every N-th
//     submitted frame before the queue is even consulted.
// 2.  **Workers**: each worker takes the next frame, snapshots the parameter
//     channel at that moment, and runs the CPU-bound pipeline on tokio's blocking
//     pool. A frame gets a dispatch ticket when it leaves the queue, so dropped
//     frames never leave gaps in the ticket sequence.
// 3.  **Reorder**: workers finish out of order. The reorder stage parks results in
//     a `BTreeMap` keyed by ticket and releases them strictly in dispatch order.
//     A worker whose job panicked reports the ticket as abandoned, and the stage
//     steps over it instead of stalling.
// 4.  **Output**: a bounded channel. A slow consumer back-pressures the reorder
//     stage, then the workers, then the intake, which is where frames get dropped.

use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;

use crate::core_modules::frame::frame::Frame;
use crate::core_modules::parameters::BeautyParameters;
use crate::error::{BeautyError, Result};
use crate::pipeline::{BeautyPipeline, FrameStats};

const MAX_DEFAULT_WORKERS: usize = 4;
const DEFAULT_QUEUE_CAPACITY: usize = 2;
const DEFAULT_OUTPUT_CAPACITY: usize = 4;

/// What happens to a frame that arrives while the intake queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Reject the arriving frame; queued frames are kept.
    DropNewest,
    /// Evict the oldest queued frame to make room. Keeps latency lowest.
    #[default]
    DropOldest,
}

impl FromStr for DropPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "drop_newest" | "newest" => Ok(DropPolicy::DropNewest),
            "drop_oldest" | "oldest" => Ok(DropPolicy::DropOldest),
            other => Err(format!("unknown drop policy '{other}'; expected 'drop_newest' or 'drop_oldest'")),
        }
    }
}

/// Tunables for a `BeautyStream`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Concurrent frames in flight. Defaults to the CPU count, capped at 4.
    pub worker_count: usize,
    /// Frames allowed to wait for a worker.
    pub queue_capacity: usize,
    /// Finished frames allowed to wait for the consumer.
    pub output_capacity: usize,
    pub drop_policy: DropPolicy,
    /// Process every N-th submitted frame. 1 processes everything.
    pub frame_stride: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            drop_policy: DropPolicy::default(),
            frame_stride: 1,
        }
    }
}

impl StreamConfig {
    /// Replaces zero sizes with the smallest working value.
    fn normalized(self) -> Self {
        Self {
            worker_count: self.worker_count.max(1),
            queue_capacity: self.queue_capacity.max(1),
            output_capacity: self.output_capacity.max(1),
            frame_stride: self.frame_stride.max(1),
            ..self
        }
    }
}

/// A beautified frame leaving the stream.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Index of the frame in submission order, starting at 0.
    pub sequence: u64,
    pub frame: Frame,
    /// The parameter snapshot this frame was processed with.
    pub parameters: BeautyParameters,
    pub stats: FrameStats,
}

/// What `submit` did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Queued for processing. `evicted` names a frame pushed out under `DropOldest`.
    Queued { sequence: u64, evicted: Option<u64> },
    /// Rejected under `DropNewest` because the queue was full.
    Dropped { sequence: u64 },
    /// Skipped by the frame stride.
    Skipped { sequence: u64 },
}

/// Point-in-time stream counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreamStats {
    pub submitted: u64,
    pub accepted: u64,
    pub skipped: u64,
    pub dropped: u64,
    pub delivered: u64,
    pub abandoned: u64,
}

#[derive(Debug, Default)]
struct StreamCounters {
    submitted: AtomicU64,
    accepted: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    abandoned: AtomicU64,
}

impl StreamCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StreamStats {
        StreamStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

struct QueuedFrame {
    sequence: u64,
    frame: Frame,
}

struct Dispatched {
    ticket: u64,
    job: QueuedFrame,
}

#[derive(Default)]
struct IntakeState {
    frames: VecDeque<QueuedFrame>,
    closed: bool,
    next_sequence: u64,
    next_ticket: u64,
}

/// The bounded intake queue shared by submitters and workers.
struct Intake {
    state: Mutex<IntakeState>,
    available: Notify,
    capacity: usize,
    policy: DropPolicy,
    stride: u64,
    dimensions: (u32, u32),
    counters: Arc<StreamCounters>,
}

impl Intake {
    fn push(&self, frame: Frame) -> Result<SubmitOutcome> {
        if frame.dimensions() != self.dimensions {
            let (actual_width, actual_height) = frame.dimensions();
            return Err(BeautyError::DimensionMismatch {
                expected_width: self.dimensions.0,
                expected_height: self.dimensions.1,
                actual_width,
                actual_height,
            });
        }

        let outcome = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BeautyError::StreamClosed);
            }
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            StreamCounters::bump(&self.counters.submitted);

            if sequence % self.stride != 0 {
                StreamCounters::bump(&self.counters.skipped);
                return Ok(SubmitOutcome::Skipped { sequence });
            }

            let mut evicted = None;
            if state.frames.len() >= self.capacity {
                match self.policy {
                    DropPolicy::DropNewest => {
                        StreamCounters::bump(&self.counters.dropped);
                        return Ok(SubmitOutcome::Dropped { sequence });
                    }
                    DropPolicy::DropOldest => {
                        evicted = state.frames.pop_front().map(|old| old.sequence);
                        StreamCounters::bump(&self.counters.dropped);
                    }
                }
            }
            state.frames.push_back(QueuedFrame { sequence, frame });
            StreamCounters::bump(&self.counters.accepted);
            SubmitOutcome::Queued { sequence, evicted }
        };

        self.available.notify_one();
        Ok(outcome)
    }

    /// Waits for the next frame. `None` once the intake is closed and drained.
    async fn pop(&self) -> Option<Dispatched> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if let Some(job) = state.frames.pop_front() {
                    let ticket = state.next_ticket;
                    state.next_ticket += 1;
                    return Some(Dispatched { ticket, job });
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_waiters();
    }

    fn queued(&self) -> usize {
        self.state.lock().frames.len()
    }
}

enum WorkerResult {
    Completed { ticket: u64, output: ProcessedFrame },
    Abandoned { ticket: u64, sequence: u64 },
}

impl WorkerResult {
    fn ticket(&self) -> u64 {
        match self {
            WorkerResult::Completed { ticket, .. } | WorkerResult::Abandoned { ticket, .. } => *ticket,
        }
    }
}

/// A cloneable handle for feeding frames into a running stream.
#[derive(Clone)]
pub struct FrameSubmitter {
    intake: Arc<Intake>,
}

impl FrameSubmitter {
    /// Offers a frame to the stream. Never blocks on processing.
    pub fn submit(&self, frame: Frame) -> Result<SubmitOutcome> {
        let outcome = self.intake.push(frame)?;
        match outcome {
            SubmitOutcome::Queued {
                evicted: Some(old), ..
            } => warn!("intake full, evicted frame {old}"),
            SubmitOutcome::Dropped { sequence } => warn!("intake full, dropped frame {sequence}"),
            _ => {}
        }
        Ok(outcome)
    }
}

/// A running stream: worker pool, reorder stage and counters.
pub struct BeautyStream {
    submitter: FrameSubmitter,
    counters: Arc<StreamCounters>,
    workers: Vec<JoinHandle<()>>,
    reorder: Option<JoinHandle<()>>,
}

impl BeautyStream {
    /// Starts the workers and the reorder stage on the current tokio runtime.
    ///
    /// The returned receiver yields processed frames in submission order. It must
    /// be drained (or dropped) for `shutdown` to complete.
    pub fn spawn(
        pipeline: BeautyPipeline,
        dimensions: (u32, u32),
        config: StreamConfig,
        parameters: watch::Receiver<BeautyParameters>,
    ) -> (Self, mpsc::Receiver<ProcessedFrame>) {
        let config = config.normalized();
        let counters = Arc::new(StreamCounters::default());
        let intake = Arc::new(Intake {
            state: Mutex::new(IntakeState::default()),
            available: Notify::new(),
            capacity: config.queue_capacity,
            policy: config.drop_policy,
            stride: config.frame_stride,
            dimensions,
            counters: Arc::clone(&counters),
        });

        let pipeline = Arc::new(pipeline);
        let (result_sender, result_receiver) = mpsc::channel::<WorkerResult>(config.worker_count * 2);
        let (output_sender, output_receiver) = mpsc::channel::<ProcessedFrame>(config.output_capacity);

        let workers = (0..config.worker_count)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&intake),
                    Arc::clone(&pipeline),
                    parameters.clone(),
                    result_sender.clone(),
                ))
            })
            .collect();
        drop(result_sender);

        let reorder = tokio::spawn(run_reorder(result_receiver, output_sender, Arc::clone(&counters)));

        info!(
            "beauty stream started: {}x{}, {} workers, queue {}, {:?}, stride {}",
            dimensions.0,
            dimensions.1,
            config.worker_count,
            config.queue_capacity,
            config.drop_policy,
            config.frame_stride
        );

        let stream = Self {
            submitter: FrameSubmitter { intake },
            counters,
            workers,
            reorder: Some(reorder),
        };
        (stream, output_receiver)
    }

    pub fn submit(&self, frame: Frame) -> Result<SubmitOutcome> {
        self.submitter.submit(frame)
    }

    pub fn submitter(&self) -> FrameSubmitter {
        self.submitter.clone()
    }

    pub fn stats(&self) -> StreamStats {
        self.counters.snapshot()
    }

    /// Frames currently waiting for a worker.
    pub fn queued(&self) -> usize {
        self.submitter.intake.queued()
    }

    /// Closes intake, processes what is already queued, and stops every task.
    pub async fn shutdown(mut self) -> StreamStats {
        self.submitter.intake.close();
        for joined in join_all(std::mem::take(&mut self.workers)).await {
            if let Err(e) = joined {
                warn!("worker task ended abnormally: {e}");
            }
        }
        if let Some(reorder) = self.reorder.take() {
            if let Err(e) = reorder.await {
                warn!("reorder task ended abnormally: {e}");
            }
        }
        let stats = self.counters.snapshot();
        info!("beauty stream stopped: {stats:?}");
        stats
    }
}

impl Drop for BeautyStream {
    /// Dropping without `shutdown` still lets the workers drain and exit.
    fn drop(&mut self) {
        self.submitter.intake.close();
    }
}

async fn run_worker(
    id: usize,
    intake: Arc<Intake>,
    pipeline: Arc<BeautyPipeline>,
    parameters: watch::Receiver<BeautyParameters>,
    results: mpsc::Sender<WorkerResult>,
) {
    while let Some(Dispatched { ticket, job }) = intake.pop().await {
        let snapshot = *parameters.borrow();
        let sequence = job.sequence;
        let pipeline = Arc::clone(&pipeline);

        let processed = tokio::task::spawn_blocking(move || {
            let (frame, stats) = pipeline.process_with_stats(&job.frame, &snapshot);
            ProcessedFrame {
                sequence,
                frame,
                parameters: snapshot,
                stats,
            }
        })
        .await;

        let result = match processed {
            Ok(output) => {
                debug!("worker {id} finished frame {sequence} in {:?}", output.stats.elapsed);
                WorkerResult::Completed { ticket, output }
            }
            Err(e) => {
                warn!("worker {id} abandoned frame {sequence}: {e}");
                WorkerResult::Abandoned { ticket, sequence }
            }
        };
        if results.send(result).await.is_err() {
            break;
        }
    }
}

async fn run_reorder(
    mut results: mpsc::Receiver<WorkerResult>,
    output: mpsc::Sender<ProcessedFrame>,
    counters: Arc<StreamCounters>,
) {
    let mut pending: BTreeMap<u64, WorkerResult> = BTreeMap::new();
    let mut next_ticket = 0u64;
    let mut consumer_gone = false;

    while let Some(result) = results.recv().await {
        pending.insert(result.ticket(), result);
        while let Some(ready) = pending.remove(&next_ticket) {
            next_ticket += 1;
            match ready {
                WorkerResult::Completed { output: frame, .. } => {
                    if consumer_gone {
                        continue;
                    }
                    if output.send(frame).await.is_ok() {
                        StreamCounters::bump(&counters.delivered);
                    } else {
                        debug!("output receiver dropped; discarding remaining frames");
                        consumer_gone = true;
                    }
                }
                WorkerResult::Abandoned { sequence, .. } => {
                    StreamCounters::bump(&counters.abandoned);
                    debug!("skipping abandoned frame {sequence}");
                }
            }
        }
    }
}
