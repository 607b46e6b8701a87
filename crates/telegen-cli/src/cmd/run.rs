//! `telegen run` - supervise one generation run
//!
//! Wires a producer and a sink through the generator and the export
//! pipeline, then waits for whichever comes first: a signal, a generation
//! error, an export error or natural completion.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::ProgressBar;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use telegen_core::{
    install_signal_handler, status_message, AnySink, ExportPipeline, GenerateError, Generator,
    Run, RunMetrics, SharedMetrics, SharedProgress, SinkError,
};
use telegen_producers::producer_for;

use crate::config::Config;

const STATUS_REFRESH: Duration = Duration::from_millis(250);

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Producer to run (overrides input.type)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Sink to export to (overrides output.type)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Stop after this long, e.g. "30s" or "5m"
    #[arg(long)]
    pub max_runtime: Option<String>,

    /// Stop after this many records
    #[arg(long)]
    pub max_total_records: Option<u64>,

    /// RNG seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write run metrics JSON here instead of logging it
    #[arg(long)]
    pub metrics: Option<PathBuf>,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input.kind.clone_from(input);
        }
        if let Some(output) = &self.output {
            config.output.kind.clone_from(output);
        }
        if let Some(max_runtime) = &self.max_runtime {
            config.input.generator.max_runtime.clone_from(max_runtime);
        }
        if let Some(n) = self.max_total_records {
            config.input.generator.max_total_records = n;
        }
        if self.seed.is_some() {
            config.input.producers.seed = self.seed;
        }
    }
}

/// Why the supervisor stopped waiting
#[derive(Debug)]
enum Exit {
    Completed,
    Interrupted,
    GenerateFailed(GenerateError),
    ExportFailed(SinkError),
    /// Export loop ended while the run was still going
    ExporterGone,
}

pub fn run(args: RunArgs, mut config: Config, progress: &SharedProgress) -> Result<()> {
    args.apply(&mut config);
    // Resolve names before spinning anything up
    config.input_kind()?;
    config.output_kind()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let shutdown = CancellationToken::new();
    install_signal_handler(shutdown.clone()).context("failed to install signal handler")?;

    let metrics = SharedMetrics::new(RunMetrics::new());
    let status = progress.status_line("telegen");
    let result = runtime.block_on(supervise(&config, metrics.clone(), shutdown, status.clone()));
    status.finish_and_clear();

    progress.println(format!("Done: {}", status_message(&metrics)));
    report_metrics(&metrics, args.metrics.as_deref())?;
    result
}

async fn supervise(
    config: &Config,
    metrics: SharedMetrics,
    shutdown: CancellationToken,
    status: ProgressBar,
) -> Result<()> {
    let kind = config.input_kind()?;
    let sink_kind = config.output_kind()?;
    let sink = AnySink::build(sink_kind, &config.output.sinks)
        .with_context(|| format!("failed to build {sink_kind} sink"))?;
    let producer = producer_for(kind, &config.input.producers);
    log::info!("Starting run: input={kind}, output={sink_kind}");

    let mut generator =
        Generator::new(config.input.generator.clone(), producer).with_metrics(metrics.clone());
    let Run {
        batches,
        completed,
        mut errors,
        task,
    } = generator.start()?;
    metrics.record_start(chrono::Utc::now());

    let (mut export, mut export_errors) = ExportPipeline::new(sink)
        .with_metrics(metrics.clone())
        .start(batches);

    let status_done = CancellationToken::new();
    let status_task = spawn_status(status, metrics.clone(), status_done.clone());

    let mut exit = tokio::select! {
        biased;
        _ = shutdown.cancelled() => Exit::Interrupted,
        Some(e) = errors.recv() => Exit::GenerateFailed(e),
        Some(e) = export_errors.recv() => Exit::ExportFailed(e),
        _ = completed.cancelled() => Exit::Completed,
        _ = export.finish() => Exit::ExporterGone,
    };

    if let Exit::Completed = exit {
        log::info!("Run complete, draining buffered batches");
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                log::warn!("Interrupted while draining, stopping exporter");
                export.stop().await;
            }
            _ = export.finish() => log::info!("Exporter drained"),
        }
        if let Ok(e) = export_errors.try_recv() {
            exit = Exit::ExportFailed(e);
        }
    } else {
        log::info!("Stopping generator ({exit:?})");
        generator.stop();
        export.stop().await;
    }

    // Anything past the first failure is only logged
    while let Ok(e) = export_errors.try_recv() {
        log::warn!("Additional export error: {e}");
    }

    match task.await {
        Ok(outcome) => log::debug!("Generator exited: {outcome:?}"),
        Err(e) => log::warn!("Generator task failed: {e}"),
    }
    metrics.record_end(chrono::Utc::now());
    status_done.cancel();
    let _ = status_task.await;

    match exit {
        Exit::Completed => Ok(()),
        Exit::Interrupted => {
            log::info!("Run interrupted");
            Ok(())
        }
        Exit::GenerateFailed(e) => Err(anyhow::Error::new(e).context("generation failed")),
        Exit::ExportFailed(e) => Err(anyhow::Error::new(e).context("export failed")),
        Exit::ExporterGone => anyhow::bail!("exporter exited before the run finished"),
    }
}

/// Refresh the status line from the run counters until `done`
fn spawn_status(
    status: ProgressBar,
    metrics: SharedMetrics,
    done: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(STATUS_REFRESH);
        loop {
            tokio::select! {
                _ = done.cancelled() => break,
                _ = tick.tick() => status.set_message(status_message(&metrics)),
            }
        }
    })
}

fn report_metrics(metrics: &RunMetrics, path: Option<&std::path::Path>) -> Result<()> {
    let json = metrics
        .to_json()
        .context("failed to serialize run metrics")?;
    match path {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write metrics to {}", path.display()))?;
            log::info!("Wrote run metrics to {}", path.display());
        }
        None => log::info!("Run metrics: {json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use telegen_core::{Compression, SinkKind};

    fn args() -> RunArgs {
        RunArgs {
            input: None,
            output: None,
            max_runtime: None,
            max_total_records: None,
            seed: None,
            metrics: None,
        }
    }

    #[test]
    fn flags_override_config() {
        let mut config = Config::default();
        RunArgs {
            input: Some("cloudtrail".into()),
            output: Some("file".into()),
            max_runtime: Some("2m".into()),
            max_total_records: Some(500),
            seed: Some(1),
            metrics: None,
        }
        .apply(&mut config);

        assert_eq!(config.input.kind, "cloudtrail");
        assert_eq!(config.output_kind().unwrap(), SinkKind::File);
        assert_eq!(config.input.generator.max_runtime, "2m");
        assert_eq!(config.input.generator.max_total_records, 500);
        assert_eq!(config.input.producers.seed, Some(1));
    }

    #[test]
    fn absent_flags_keep_config() {
        let mut config = Config::default();
        config.input.producers.seed = Some(5);
        args().apply(&mut config);
        assert_eq!(config.input.producers.seed, Some(5));
        assert_eq!(config, {
            let mut c = Config::default();
            c.input.producers.seed = Some(5);
            c
        });
    }

    fn file_config(dir: &std::path::Path, total: u64) -> Config {
        let mut config = Config::default();
        config.input.kind = "logs".into();
        config.input.producers.seed = Some(3);
        config.input.generator.delay = "0".into();
        config.input.generator.batching = "0".into();
        config.input.generator.max_batch_records = 10;
        config.input.generator.max_total_records = total;
        config.output.kind = "file".into();
        config.output.sinks.file.path = dir.join("out.ndjson");
        config.output.sinks.file.compression = Compression::None;
        config
    }

    #[tokio::test]
    async fn completed_run_drains_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path(), 35);
        let metrics = SharedMetrics::new(RunMetrics::new());

        supervise(
            &config,
            metrics.clone(),
            CancellationToken::new(),
            ProgressBar::hidden(),
        )
        .await
        .unwrap();

        let written = std::fs::read_to_string(dir.path().join("out.ndjson")).unwrap();
        assert_eq!(written.lines().count(), 35);
        let snap = metrics.snapshot();
        assert_eq!(snap.total_elements, 35);
        assert_eq!(snap.total_batches, 4);
        assert_eq!(snap.total_bytes, written.len() as u64);
        assert!(snap.start_time.is_some() && snap.end_time.is_some());
    }

    #[tokio::test]
    async fn interrupted_run_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = file_config(dir.path(), 0);
        config.input.generator.delay = "10ms".into();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let metrics = SharedMetrics::new(RunMetrics::new());
        supervise(&config, metrics.clone(), shutdown, ProgressBar::hidden())
            .await
            .unwrap();
        assert!(metrics.elements() < 10);
    }

    #[tokio::test]
    async fn invalid_generator_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = file_config(dir.path(), 0);
        config.input.generator.max_batch_records = 0;
        let err = supervise(
            &config,
            SharedMetrics::new(RunMetrics::new()),
            CancellationToken::new(),
            ProgressBar::hidden(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn metrics_written_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        let metrics = RunMetrics::new();
        metrics.record_batch(7);
        report_metrics(&metrics, Some(&path)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"totalElements\":7"));
    }
}
