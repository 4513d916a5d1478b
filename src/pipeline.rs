//! Fork-join orchestration: partition, scan in parallel, merge.

use std::num::NonZeroUsize;
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::merge::{merge, GlobalResult};
use crate::parse::ValueFormat;
use crate::partition::partition;
use crate::source::{self, ByteSource, SourceMode};
use crate::worker::{scan, ScanOptions};

/// Everything a run needs. Passed in explicitly; there is no global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of chunks, one worker each.
    pub workers: usize,
    pub format: ValueFormat,
    pub source_mode: SourceMode,
    /// Cap on [`ParseError`](crate::ParseError)s kept for the caller.
    pub max_reported_errors: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: hardware_parallelism(),
            format: ValueFormat::Standard,
            source_mode: SourceMode::Mmap,
            max_reported_errors: 100,
        }
    }
}

impl Config {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_source_mode(mut self, source_mode: SourceMode) -> Self {
        self.source_mode = source_mode;
        self
    }

    pub fn with_max_reported_errors(mut self, max: usize) -> Self {
        self.max_reported_errors = max;
        self
    }

    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            format: self.format,
            max_reported_errors: self.max_reported_errors,
        }
    }
}

pub fn hardware_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Aggregates the first `len` bytes of `source` with `workers` workers.
pub fn aggregate<S: ByteSource + ?Sized>(
    source: &S,
    len: u64,
    workers: usize,
) -> Result<GlobalResult<'_>> {
    aggregate_with(source, len, &Config::default().with_workers(workers))
}

/// Aggregates the first `len` bytes of `source`.
///
/// Every worker finishes before the merge starts. The first fatal worker
/// error aborts the run; skipped records are returned in the result.
pub fn aggregate_with<'a, S: ByteSource + ?Sized>(
    source: &'a S,
    len: u64,
    config: &Config,
) -> Result<GlobalResult<'a>> {
    let ranges = partition(source, len, config.workers)?;
    info!(len, chunks = ranges.len(), "partitioned input");
    for (i, range) in ranges.iter().enumerate() {
        debug!(worker = i + 1, start = range.start, end = range.end, "assigned chunk");
    }

    let threads = config.workers.min(hardware_parallelism());
    if threads < config.workers {
        debug!(threads, chunks = config.workers, "more chunks than cores");
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("brc-worker-{i}"))
        .build()?;

    let options = config.scan_options();
    let partials = pool.install(|| {
        ranges
            .into_par_iter()
            .map(|range| scan(source, range, &options))
            .collect::<Result<Vec<_>>>()
    })?;

    info!("merging results");
    let result = merge(partials, config.max_reported_errors);
    if result.skipped() > 0 {
        warn!(
            skipped = result.skipped(),
            lines = result.lines(),
            "input contained malformed records"
        );
    }
    Ok(result)
}

/// Opens `path` according to `config.source_mode` and aggregates all of it.
pub fn aggregate_path(path: &Path, config: &Config) -> Result<GlobalResult<'static>> {
    if config.workers == 0 {
        return Err(Error::InvalidConfig("worker count must be at least 1".into()));
    }
    let source = source::open(path, config.source_mode)?;
    let len = source.len();
    aggregate_with(&*source, len, config).map(GlobalResult::into_owned)
}
