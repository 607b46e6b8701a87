//! End-to-end timing and coordination tests for the generator and export loops.
//!
//! Timing tests run on a paused clock, so "~100ms" below is exact virtual time.

use std::time::Duration;

use telegen_core::{
    Accumulator, Batch, ConfigError, ExportPipeline, FileSink, FileSinkConfig, GenerateError,
    Generator, GeneratorConfig, Producer, RunOutcome, SharedMetrics,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Writes `"<n>\n"` for the n-th record, optionally failing on one call
struct SeqProducer {
    acc: Accumulator,
    next: u64,
    fail_at: Option<u64>,
}

impl SeqProducer {
    fn new() -> Self {
        Self {
            acc: Accumulator::new(),
            next: 1,
            fail_at: None,
        }
    }

    fn failing_at(n: u64) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::new()
        }
    }
}

impl Producer for SeqProducer {
    fn generate(&mut self) -> Result<u64, GenerateError> {
        if self.fail_at == Some(self.next) {
            return Err(GenerateError::Producer(format!("record {} refused", self.next)));
        }
        self.acc.write(format!("{}\n", self.next).as_bytes());
        self.next += 1;
        Ok(self.acc.size())
    }

    fn drain_and_reset(&mut self) -> Vec<u8> {
        self.acc.drain_and_reset()
    }
}

fn config(delay: &str, batching: &str) -> GeneratorConfig {
    GeneratorConfig {
        delay: delay.into(),
        batching: batching.into(),
        ..GeneratorConfig::default()
    }
}

fn numbers(batch: &Batch) -> Vec<u64> {
    std::str::from_utf8(batch.as_bytes())
        .unwrap()
        .lines()
        .map(|l| l.parse().unwrap())
        .collect()
}

/// Drain a batch channel on its own task, stamping each arrival
fn collect(mut rx: mpsc::Receiver<Batch>) -> JoinHandle<Vec<(Duration, Batch)>> {
    let start = Instant::now();
    tokio::spawn(async move {
        let mut out = Vec::new();
        while let Some(batch) = rx.recv().await {
            out.push((start.elapsed(), batch));
        }
        out
    })
}

#[tokio::test]
async fn unbounded_config_is_rejected() {
    let mut cfg = config("0", "0");
    cfg.max_batch_bytes = 0;
    cfg.max_batch_records = 0;
    let mut generator = Generator::new(cfg, SeqProducer::new());

    let err = generator.start().unwrap_err();
    assert_eq!(err, ConfigError::Unbounded);
    assert!(err.to_string().starts_with("invalid configuration"));
}

#[tokio::test(start_paused = true)]
async fn window_only_flushes_every_window() {
    let mut generator = Generator::new(config("10ms", "100ms"), SeqProducer::new());
    let run = generator.start().unwrap();
    let collector = collect(run.batches);

    tokio::time::sleep(Duration::from_millis(350)).await;
    generator.stop();
    assert_eq!(run.task.await.unwrap(), RunOutcome::Stopped);

    let batches = collector.await.unwrap();
    assert_eq!(batches.len(), 3);
    let times: Vec<u128> = batches.iter().map(|(t, _)| t.as_millis()).collect();
    assert_eq!(times, vec![100, 200, 300]);
    // Each window holds the ten records generated inside it
    assert_eq!(numbers(&batches[0].1), (1..=10).collect::<Vec<_>>());
    assert_eq!(numbers(&batches[1].1), (11..=20).collect::<Vec<_>>());
    assert_eq!(numbers(&batches[2].1), (21..=30).collect::<Vec<_>>());
    assert!(!run.completed.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn record_ceiling_flushes_immediately() {
    let mut cfg = config("10ms", "1h");
    cfg.max_batch_records = 5;
    let mut generator = Generator::new(cfg, SeqProducer::new());
    let mut run = generator.start().unwrap();
    let start = Instant::now();

    let batch = run.batches.recv().await.unwrap();
    assert_eq!(batch.records(), 5);
    assert_eq!(numbers(&batch), vec![1, 2, 3, 4, 5]);
    assert_eq!(start.elapsed(), Duration::from_millis(50));
    generator.stop();
}

#[tokio::test(start_paused = true)]
async fn total_ceiling_completes_run() {
    let mut cfg = config("10ms", "1h");
    cfg.max_total_records = 10;
    let metrics = SharedMetrics::default();
    let mut generator = Generator::new(cfg, SeqProducer::new()).with_metrics(metrics.clone());
    let mut run = generator.start().unwrap();

    run.completed.cancelled().await;
    let batch = run.batches.recv().await.unwrap();
    assert_eq!(numbers(&batch), (1..=10).collect::<Vec<_>>());
    // Loop ended, so the sender is gone
    assert!(run.batches.recv().await.is_none());
    assert_eq!(run.task.await.unwrap(), RunOutcome::Completed);
    assert_eq!(metrics.batches(), 1);
    assert_eq!(metrics.elements(), 10);
}

#[tokio::test(start_paused = true)]
async fn stop_during_delay_exits_without_completing() {
    let mut generator = Generator::new(config("1s", "100ms"), SeqProducer::new());
    let mut run = generator.start().unwrap();
    let start = Instant::now();

    tokio::time::sleep(Duration::from_millis(500)).await;
    generator.stop();

    assert_eq!(run.task.await.unwrap(), RunOutcome::Stopped);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(run.batches.recv().await.is_none());
    assert!(!run.completed.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn early_flush_keeps_window_cadence() {
    let mut cfg = config("10ms", "100ms");
    cfg.max_batch_records = 2;
    let mut generator = Generator::new(cfg, SeqProducer::new());
    let run = generator.start().unwrap();
    let collector = collect(run.batches);

    // The flush at 220ms starts a pause until 320ms; stop lands inside it
    tokio::time::sleep(Duration::from_millis(250)).await;
    generator.stop();
    assert_eq!(run.task.await.unwrap(), RunOutcome::Stopped);
    assert!(!run.completed.is_cancelled());

    let times: Vec<u128> = collector
        .await
        .unwrap()
        .iter()
        .map(|(t, _)| t.as_millis())
        .collect();
    assert_eq!(times, vec![20, 120, 220]);
    assert!(times.iter().all(|&t| t <= 250));
}

#[tokio::test(start_paused = true)]
async fn stop_while_send_blocked_on_full_channel() {
    let mut cfg = config("1ms", "0");
    cfg.max_batch_records = 1;
    let mut generator = Generator::new(cfg, SeqProducer::new());
    let run = generator.start().unwrap();
    // Held but never read, so the third flush blocks on send
    let mut held = run.batches;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!run.task.is_finished());
    generator.stop();

    let outcome = tokio::time::timeout(Duration::from_secs(1), run.task)
        .await
        .expect("run loop did not exit after stop")
        .unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);
    assert!(!run.completed.is_cancelled());

    let mut buffered = Vec::new();
    while let Ok(batch) = held.try_recv() {
        buffered.extend(numbers(&batch));
    }
    assert_eq!(buffered, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn batches_arrive_in_flush_order() {
    let mut cfg = config("0", "0");
    cfg.max_batch_records = 3;
    cfg.max_total_records = 30;
    let mut generator = Generator::new(cfg, SeqProducer::new());
    let run = generator.start().unwrap();
    let collector = collect(run.batches);

    assert_eq!(run.task.await.unwrap(), RunOutcome::Completed);
    let batches = collector.await.unwrap();
    assert_eq!(batches.len(), 10);
    let all: Vec<u64> = batches.iter().flat_map(|(_, b)| numbers(b)).collect();
    assert_eq!(all, (1..=30).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn generate_error_is_reported_once() {
    let mut generator = Generator::new(config("10ms", "1h"), SeqProducer::failing_at(3));
    let mut run = generator.start().unwrap();

    let err = run.errors.recv().await.unwrap();
    assert!(err.to_string().contains("record 3 refused"));
    assert!(run.errors.recv().await.is_none());
    assert_eq!(run.task.await.unwrap(), RunOutcome::Failed);
    // Unflushed records are lost and completion never fires
    assert!(run.batches.recv().await.is_none());
    assert!(!run.completed.is_cancelled());
}

#[tokio::test]
async fn completed_run_drains_into_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.ndjson");

    let mut cfg = config("0", "0");
    cfg.max_batch_records = 10;
    cfg.max_total_records = 25;
    let metrics = SharedMetrics::default();
    let mut generator = Generator::new(cfg, SeqProducer::new()).with_metrics(metrics.clone());
    let run = generator.start().unwrap();

    let sink = FileSink::new(&FileSinkConfig {
        path: path.clone(),
        ..FileSinkConfig::default()
    });
    let (mut export, mut export_errors) = ExportPipeline::new(sink)
        .with_metrics(metrics.clone())
        .start(run.batches);

    run.completed.cancelled().await;
    export.finish().await;
    assert!(export_errors.recv().await.is_none());

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<u64> = content.lines().map(|l| l.parse().unwrap()).collect();
    assert_eq!(lines, (1..=25).collect::<Vec<_>>());
    assert_eq!(metrics.batches(), 3);
    assert_eq!(metrics.elements(), 25);
    assert_eq!(metrics.bytes_sent(), content.len() as u64);
}

#[tokio::test(start_paused = true)]
async fn stop_generator_then_exporter() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.ndjson");

    let mut generator = Generator::new(config("10ms", "50ms"), SeqProducer::new());
    let run = generator.start().unwrap();
    let sink = FileSink::new(&FileSinkConfig {
        path: path.clone(),
        ..FileSinkConfig::default()
    });
    let (mut export, _errors) = ExportPipeline::new(sink).start(run.batches);

    tokio::time::sleep(Duration::from_millis(120)).await;
    generator.stop();
    assert_eq!(run.task.await.unwrap(), RunOutcome::Stopped);
    export.stop().await;

    assert!(export.is_finished());
    assert!(!run.completed.is_cancelled());
}
