//! Generation orchestrator.
//!
//! Paces a [`Producer`], applies the emission policy and hands finished
//! batches to the export side over a bounded channel. The run loop is a
//! single tokio task; the only suspension points are the inter-record delay,
//! the batch send and the post-flush window pause, and each of them races the
//! stop token.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::accumulator::Batch;
use crate::config::{BatchLimits, GeneratorConfig};
use crate::error::{ConfigError, GenerateError};
use crate::metrics::{RunMetrics, SharedMetrics};
use crate::policy::{is_run_complete, should_flush};
use crate::producer::Producer;

/// Batches buffered between generation and export before `send` blocks
pub const BATCH_CHANNEL_CAPACITY: usize = 2;

/// How a run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A total-record or runtime ceiling was reached
    Completed,
    /// Stop was requested, or the batch receiver went away
    Stopped,
    /// The producer returned an error
    Failed,
}

/// Channels handed back by [`Generator::start`].
///
/// Fields are public so callers can move the batch receiver into an export
/// pipeline while still selecting on the other two.
#[derive(Debug)]
pub struct Run {
    /// Flushed batches, in generation order
    pub batches: mpsc::Receiver<Batch>,
    /// Cancelled once on natural completion, never on stop or failure
    pub completed: CancellationToken,
    /// Receives at most one generation error
    pub errors: mpsc::Receiver<GenerateError>,
    /// Run loop task; resolves after the batch sender is dropped
    pub task: JoinHandle<RunOutcome>,
}

/// Drives one producer through one run.
pub struct Generator<P> {
    config: GeneratorConfig,
    producer: Option<P>,
    stop: CancellationToken,
    metrics: SharedMetrics,
}

impl<P: Producer + 'static> Generator<P> {
    pub fn new(config: GeneratorConfig, producer: P) -> Self {
        Self {
            config,
            producer: Some(producer),
            stop: CancellationToken::new(),
            metrics: SharedMetrics::new(RunMetrics::new()),
        }
    }

    /// Share run counters with the caller (and the export pipeline)
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Validate the configuration and spawn the run loop.
    ///
    /// Must be called from within a tokio runtime. Fails synchronously on an
    /// invalid configuration, in which case nothing is spawned.
    pub fn start(&mut self) -> Result<Run, ConfigError> {
        let limits = self.config.validate()?;
        let producer = self.producer.take().ok_or(ConfigError::AlreadyStarted)?;

        let (batch_tx, batches) = mpsc::channel(BATCH_CHANNEL_CAPACITY);
        let (error_tx, errors) = mpsc::channel(1);
        let completed = CancellationToken::new();

        log::info!(
            "Generator started: delay={:?}, batching={:?}, max_batch_bytes={}, \
             max_batch_records={}, max_total_records={}, max_runtime={:?}",
            limits.delay,
            limits.batching,
            limits.max_batch_bytes,
            limits.max_batch_records,
            limits.max_total_records,
            limits.max_runtime,
        );

        let run_loop = RunLoop {
            producer,
            limits,
            batch_tx,
            error_tx,
            completed: completed.clone(),
            stop: self.stop.clone(),
            metrics: self.metrics.clone(),
        };
        let task = tokio::spawn(run_loop.run());

        Ok(Run {
            batches,
            completed,
            errors,
            task,
        })
    }

    /// Request the run loop to exit at its next wait point.
    ///
    /// Idempotent and non-blocking. Calling it before `start` makes the run
    /// exit before its first record.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

impl<P> std::fmt::Debug for Generator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("config", &self.config)
            .field("started", &self.producer.is_none())
            .field("stopped", &self.stop.is_cancelled())
            .finish()
    }
}

struct RunLoop<P> {
    producer: P,
    limits: BatchLimits,
    batch_tx: mpsc::Sender<Batch>,
    error_tx: mpsc::Sender<GenerateError>,
    completed: CancellationToken,
    stop: CancellationToken,
    metrics: SharedMetrics,
}

impl<P: Producer> RunLoop<P> {
    async fn run(mut self) -> RunOutcome {
        let started = Instant::now();
        let mut last_flush = started;
        let mut total_records: u64 = 0;
        let mut batch_records: u64 = 0;

        loop {
            if !wait_for(&self.stop, self.limits.delay).await {
                log::info!("Generator stopped after {total_records} records");
                return RunOutcome::Stopped;
            }

            let size = match self.producer.generate() {
                Ok(size) => size,
                Err(e) => {
                    log::error!("Generator failed after {total_records} records: {e}");
                    // Capacity 1 and a single send, so this only fails if the
                    // receiver is gone
                    let _ = self.error_tx.try_send(e);
                    return RunOutcome::Failed;
                }
            };
            total_records += 1;
            batch_records += 1;

            if should_flush(
                last_flush.elapsed(),
                size,
                batch_records,
                total_records,
                &self.limits,
            ) {
                if !self.flush(batch_records).await {
                    return RunOutcome::Stopped;
                }
                batch_records = 0;

                // An early flush (byte or record ceiling) still waits out the
                // window so the next batch starts on cadence. No pause once
                // the run is over.
                if !self.limits.batching.is_zero()
                    && !is_run_complete(started.elapsed(), total_records, &self.limits)
                    && !wait_until(&self.stop, last_flush + self.limits.batching).await
                {
                    log::info!("Generator stopped after {total_records} records");
                    return RunOutcome::Stopped;
                }
                last_flush = Instant::now();
            }

            if is_run_complete(started.elapsed(), total_records, &self.limits) {
                if batch_records > 0 && !self.flush(batch_records).await {
                    return RunOutcome::Stopped;
                }
                let cause = if self.limits.max_total_records > 0
                    && total_records >= self.limits.max_total_records
                {
                    "max_total_records"
                } else {
                    "max_runtime"
                };
                log::info!("Generator completed ({cause}) after {total_records} records");
                self.completed.cancel();
                return RunOutcome::Completed;
            }
        }
    }

    /// Drain the producer and send one batch. Returns false if the run must
    /// end instead (stop requested or receiver dropped).
    async fn flush(&mut self, records: u64) -> bool {
        let batch = Batch::new(self.producer.drain_and_reset(), records);
        let bytes = batch.len();

        tokio::select! {
            biased;
            _ = self.stop.cancelled() => {
                log::info!("Generator stopped with a batch of {records} records pending");
                false
            }
            sent = self.batch_tx.send(batch) => match sent {
                Ok(()) => {
                    self.metrics.record_batch(records);
                    log::debug!("Emitted batch: {records} records, {bytes} bytes");
                    true
                }
                Err(_) => {
                    log::warn!("Batch receiver dropped, stopping generator");
                    false
                }
            },
        }
    }
}

/// Sleep for `delay` unless stopped first. Returns false on stop.
///
/// A zero delay still yields so a tight loop cannot starve the runtime.
async fn wait_for(stop: &CancellationToken, delay: Duration) -> bool {
    if delay.is_zero() {
        tokio::task::yield_now().await;
        return !stop.is_cancelled();
    }
    wait_until(stop, Instant::now() + delay).await
}

async fn wait_until(stop: &CancellationToken, deadline: Instant) -> bool {
    if deadline <= Instant::now() {
        return !stop.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = stop.cancelled() => false,
        _ = sleep_until(deadline) => true,
    }
}
