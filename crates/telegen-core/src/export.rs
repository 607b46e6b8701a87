//! Export pipeline: moves batches from the generator channel into a [`Sink`]

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::accumulator::Batch;
use crate::error::SinkError;
use crate::metrics::{RunMetrics, SharedMetrics};

/// How long `stop` lets an in-flight send run for sinks that don't ask to
/// be waited on
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(1);

/// Export errors buffered before further ones are dropped
const ERROR_CHANNEL_CAPACITY: usize = 4;

/// Destination for batches.
///
/// `send` is called sequentially, one batch at a time, in generation order.
pub trait Sink: Send + 'static {
    fn send(&mut self, batch: &Batch) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Called once after the last batch, on drain or on stop
    fn close(&mut self) -> impl Future<Output = Result<(), SinkError>> + Send {
        async { Ok(()) }
    }

    /// Whether `stop` must wait for an in-flight send instead of abandoning
    /// it after the grace period
    fn wait_for_completion(&self) -> bool {
        false
    }

    /// Short label for logs
    fn name(&self) -> &'static str;
}

/// Unstarted export pipeline for one sink
pub struct ExportPipeline<S> {
    sink: S,
    metrics: SharedMetrics,
    grace: Duration,
}

impl<S: Sink> ExportPipeline<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            metrics: SharedMetrics::new(RunMetrics::new()),
            grace: DEFAULT_STOP_GRACE,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Spawn the consume loop. Must be called from within a tokio runtime.
    ///
    /// Send failures are forwarded on the returned channel without blocking
    /// the loop; the loop carries on with the next batch.
    pub fn start(self, batches: mpsc::Receiver<Batch>) -> (ExportHandle, mpsc::Receiver<SinkError>) {
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let stop = CancellationToken::new();
        let wait_for_completion = self.sink.wait_for_completion();

        log::info!(
            "Exporter started: sink={}, wait_for_completion={wait_for_completion}",
            self.sink.name()
        );
        let task = tokio::spawn(consume(
            self.sink,
            batches,
            error_tx,
            stop.clone(),
            self.metrics,
        ));

        let handle = ExportHandle {
            stop,
            task: Some(task),
            wait_for_completion,
            grace: self.grace,
        };
        (handle, error_rx)
    }
}

impl<S> std::fmt::Debug for ExportPipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportPipeline")
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

/// Control handle for a running export pipeline
#[derive(Debug)]
pub struct ExportHandle {
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
    wait_for_completion: bool,
    grace: Duration,
}

impl ExportHandle {
    /// Stop consuming. Batches still buffered in the channel are dropped.
    ///
    /// Waits for the in-flight send when the sink asked for it; otherwise
    /// gives it the grace period and then abandons it.
    pub async fn stop(&mut self) {
        self.stop.cancel();
        let Some(mut task) = self.task.take() else {
            return;
        };

        if self.wait_for_completion {
            join(task).await;
            return;
        }
        match tokio::time::timeout(self.grace, &mut task).await {
            Ok(result) => log_join(result),
            Err(_) => {
                log::warn!(
                    "Exporter did not stop within {:?}, abandoning in-flight send",
                    self.grace
                );
                task.abort();
            }
        }
    }

    /// Wait for the loop to drain the channel after the generator drops its
    /// sender. Cancel-safe: dropping this future leaves the task running.
    pub async fn finish(&mut self) {
        if let Some(task) = self.task.as_mut() {
            log_join(task.await);
            self.task = None;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

async fn join(task: JoinHandle<()>) {
    log_join(task.await);
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            log::error!("Exporter task panicked: {e}");
        }
    }
}

async fn consume<S: Sink>(
    mut sink: S,
    mut batches: mpsc::Receiver<Batch>,
    errors: mpsc::Sender<SinkError>,
    stop: CancellationToken,
    metrics: SharedMetrics,
) {
    let mut sent: u64 = 0;
    let mut failed: u64 = 0;

    loop {
        let batch = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                log::info!("Exporter stopped");
                break;
            }
            next = batches.recv() => match next {
                Some(batch) => batch,
                None => {
                    log::info!("Batch channel closed, exporter drained");
                    break;
                }
            },
        };

        match sink.send(&batch).await {
            Ok(()) => {
                metrics.record_bytes_sent(batch.len() as u64);
                sent += 1;
            }
            Err(e) => {
                failed += 1;
                log::warn!("{} sink failed to send batch: {e}", sink.name());
                forward(&errors, e);
            }
        }
    }

    if let Err(e) = sink.close().await {
        log::warn!("{} sink failed to close: {e}", sink.name());
        forward(&errors, e);
    }
    log::info!("Exporter finished: {sent} batches sent, {failed} failed");
}

fn forward(errors: &mpsc::Sender<SinkError>, e: SinkError) {
    if let Err(mpsc::error::TrySendError::Full(e)) = errors.try_send(e) {
        log::warn!("Export error channel full, dropping: {e}");
    }
}
