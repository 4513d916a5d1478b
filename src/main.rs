use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use brc_aggregate::{aggregate_path, report, Config, SourceMode, ValueFormat};

/// Per-key min/mean/max over a `<key>;<value>` measurements file
#[derive(Parser, Debug)]
#[command(name = "brc-aggregate", version, long_about = None)]
struct Cli {
    /// Measurements file
    #[arg(value_name = "FILE", required_unless_present = "measurements")]
    file: Option<PathBuf>,

    /// Measurements file (alternative to the positional argument)
    #[arg(long, conflicts_with = "file")]
    measurements: Option<PathBuf>,

    /// Number of chunks/workers (default: available cores)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Read with positional reads instead of memory-mapping the file
    #[arg(long)]
    read_at: bool,

    /// Accept three integer digits in values (e.g. 100.0)
    #[arg(long)]
    extended_values: bool,

    /// Maximum number of malformed records to list
    #[arg(long, default_value_t = 100)]
    max_errors: usize,

    /// Run N times and log the mean duration
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    repeat: u32,

    /// Enable verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default()
            .with_max_reported_errors(self.max_errors)
            .with_source_mode(if self.read_at {
                SourceMode::ReadAt
            } else {
                SourceMode::Mmap
            })
            .with_format(if self.extended_values {
                ValueFormat::Extended
            } else {
                ValueFormat::Standard
            });
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_thread_names(verbose >= 2)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let path = cli
        .file
        .clone()
        .or_else(|| cli.measurements.clone())
        .context("missing measurements file")?;
    let config = cli.config();
    debug!(?config, "starting");

    let mut elapsed = Duration::ZERO;
    let mut last = None;
    for run in 0..cli.repeat {
        let start = Instant::now();
        let result = aggregate_path(&path, &config)
            .with_context(|| format!("failed to aggregate {}", path.display()))?;
        let took = start.elapsed();
        debug!(run, ?took, "run finished");
        elapsed += took;
        last = Some(result);
    }
    info!(runs = cli.repeat, mean = ?(elapsed / cli.repeat), "timing");

    let result = last.context("no runs were executed")?;
    println!("{}", report::render(&result));
    if let Some(errors) = report::render_errors(&result) {
        eprintln!("{errors}");
    }
    Ok(())
}
