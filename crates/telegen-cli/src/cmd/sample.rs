//! `telegen sample` - print records from one producer

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use telegen_producers::{producer_for, ProducerKind};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Producer to sample (defaults to input.type)
    pub kind: Option<String>,

    /// Number of records
    #[arg(short = 'n', long, default_value_t = 5)]
    pub count: u64,

    /// RNG seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: SampleArgs, config: &Config) -> Result<()> {
    let kind = match &args.kind {
        Some(name) => {
            ProducerKind::from_name(name).with_context(|| format!("unknown producer {name:?}"))?
        }
        None => config.input_kind()?,
    };

    let mut settings = config.input.producers.clone();
    if args.seed.is_some() {
        settings.seed = args.seed;
    }

    let mut producer = producer_for(kind, &settings);
    for _ in 0..args.count {
        producer
            .generate()
            .with_context(|| format!("{kind} producer failed"))?;
    }
    let data = producer.drain_and_reset();
    log::debug!("Sampled {} {kind} records, {} bytes", args.count, data.len());

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data).context("failed to write to stdout")?;
    stdout.flush()?;
    Ok(())
}
