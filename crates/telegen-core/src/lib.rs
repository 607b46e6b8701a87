//! Telegen Core - generation orchestration for synthetic telemetry
//!
//! A [`Producer`] writes records into its [`Accumulator`]; the [`Generator`]
//! paces it, decides when to flush and sends [`Batch`]es over a bounded
//! channel to an [`ExportPipeline`], which hands them to a [`Sink`].

pub mod accumulator;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod producer;
pub mod progress;
pub mod shutdown;
pub mod sink;

// Re-exports for convenience
pub use accumulator::{Accumulator, Batch};
pub use config::{parse_duration, BatchLimits, GeneratorConfig};
pub use error::{ConfigError, GenerateError, SinkError};
pub use export::{ExportHandle, ExportPipeline, Sink, DEFAULT_STOP_GRACE};
pub use generator::{Generator, Run, RunOutcome, BATCH_CHANNEL_CAPACITY};
pub use logging::{init_logging, IndicatifLogger};
pub use metrics::{MetricsSnapshot, RunMetrics, SharedMetrics};
pub use policy::{is_run_complete, should_flush};
pub use producer::Producer;
pub use progress::{fmt_num, status_message, ProgressContext, SharedProgress};
pub use shutdown::{install_signal_handler, FORCED_EXIT_CODE};
pub use sink::{
    AnySink, Compression, DebugSink, DebugSinkConfig, FileSink, FileSinkConfig, HttpSink,
    HttpSinkConfig, SinkKind, SinkSettings, Verbosity,
};
