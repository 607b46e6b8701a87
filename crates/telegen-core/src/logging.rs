//! Logging setup: env_logger backend, routed through indicatif on a TTY

use indicatif::MultiProgress;

fn label(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

fn ansi(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// Last path segment of the log target, `telegen_core::generator` -> `generator`
fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

/// `[LEVEL] module: message`, with the label colored on a TTY
fn render(level: log::Level, target: &str, args: &std::fmt::Arguments<'_>, color: bool) -> String {
    let module = short_target(target);
    if color {
        format!("[{}{}\x1b[0m] {module}: {args}", ansi(level), label(level))
    } else {
        format!("[{}] {module}: {args}", label(level))
    }
}

/// Prints log lines above the status spinner instead of through it.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            let line = render(record.level(), record.target(), record.args(), true);
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Default filter for the given verbosity flags; `RUST_LOG` still wins
fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Install the global logger.
///
/// Pass the progress `MultiProgress` on a TTY so log lines don't tear the
/// status line. Calling this twice is a no-op (the second logger is
/// discarded).
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_level(quiet, debug));

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(env)
            .format_timestamp_millis()
            .build();
        let max_level = logger.filter();

        if log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone()))).is_ok() {
            log::set_max_level(max_level);
        }
    } else {
        // Non-TTY: no ANSI colors
        let _ = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{}",
                    render(record.level(), record.target(), record.args(), false)
                )
            })
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_have_no_escape_codes() {
        let line = render(
            log::Level::Warn,
            "telegen_core::export",
            &format_args!("sink closed"),
            false,
        );
        assert_eq!(line, "[WARN ] export: sink closed");
    }

    #[test]
    fn colored_label_is_reset() {
        let line = render(log::Level::Error, "telegen", &format_args!("boom"), true);
        assert_eq!(line, "[\x1b[31mERROR\x1b[0m] telegen: boom");
    }

    #[test]
    fn labels_are_padded() {
        for level in [log::Level::Error, log::Level::Warn, log::Level::Info, log::Level::Debug] {
            assert_eq!(label(level).len(), 5);
        }
    }

    #[test]
    fn debug_beats_quiet() {
        assert_eq!(default_level(true, true), "debug");
        assert_eq!(default_level(true, false), "warn");
        assert_eq!(default_level(false, false), "info");
    }
}
