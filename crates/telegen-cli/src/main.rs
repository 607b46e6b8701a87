//! telegen - synthetic telemetry generator
//!
//! Generates log and metric records in common cloud formats, batches them
//! and exports the batches to a file, stdout or an HTTP endpoint.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "telegen")]
#[command(about = "Synthetic telemetry generator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./telegen.toml or ~/.config/telegen/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and export records until a ceiling or a signal
    Run(cmd::run::RunArgs),
    /// Print records from one producer, without pacing or batching
    Sample(cmd::sample::SampleArgs),
    /// Show effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = Arc::new(telegen_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug, the status line shows activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    telegen_core::init_logging(quiet, cli.debug, multi);

    let mut config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };
    config.apply_env()?;

    match cli.command {
        Command::Run(args) => cmd::run::run(args, config, &progress),
        Command::Sample(args) => cmd::sample::run(args, &config),
        Command::Config => {
            print_config(&config);
            Ok(())
        }
    }
}

fn print_config(config: &Config) {
    use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let unlimited = |n: u64| {
        if n == 0 {
            "unlimited".to_string()
        } else {
            telegen_core::fmt_num(n)
        }
    };

    let input = &config.input;
    let generator = &input.generator;
    table.add_row(vec!["Input type", &input.kind]);
    table.add_row(vec!["Delay", &generator.delay]);
    table.add_row(vec!["Batching window", &generator.batching]);
    table.add_row(vec!["Max batch bytes", &unlimited(generator.max_batch_bytes)]);
    table.add_row(vec!["Max batch records", &unlimited(generator.max_batch_records)]);
    table.add_row(vec!["Max total records", &unlimited(generator.max_total_records)]);
    table.add_row(vec!["Max runtime", &generator.max_runtime]);
    table.add_row(vec![
        "Seed",
        &input
            .producers
            .seed
            .map_or_else(|| "random".to_string(), |s| s.to_string()),
    ]);

    let sinks = &config.output.sinks;
    table.add_row(vec!["Output type", &config.output.kind]);
    match config.output_kind() {
        Ok(telegen_core::SinkKind::File) => {
            table.add_row(vec!["File path", &sinks.file.path.display().to_string()]);
            table.add_row(vec!["Compression", &format!("{:?}", sinks.file.compression)]);
        }
        Ok(telegen_core::SinkKind::Debug) => {
            table.add_row(vec!["Verbosity", &format!("{:?}", sinks.debug.verbosity)]);
            table.add_row(vec!["Prefix", &sinks.debug.prefix]);
        }
        Ok(telegen_core::SinkKind::Http) => {
            table.add_row(vec!["HTTP URL", &sinks.http.url]);
            table.add_row(vec!["Compression", &format!("{:?}", sinks.http.compression)]);
            table.add_row(vec!["Timeout", &sinks.http.timeout]);
            table.add_row(vec![
                "Token",
                if sinks.http.token.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
        }
        Err(_) => {
            table.add_row(vec!["Output", "unknown type"]);
        }
    }

    eprintln!("\n{table}");
}
