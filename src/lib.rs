//! Per-key min/max/sum/count/mean over large `<key>;<value>` files.
//!
//! The input is split into one line-aligned chunk per worker. Each worker
//! scans its chunk into a private map with no locking, and the maps are
//! merged on the calling thread once every worker is done.
//!
//! ```no_run
//! use std::path::Path;
//! use brc_aggregate::{aggregate_path, report, Config};
//!
//! # fn main() -> brc_aggregate::Result<()> {
//! let result = aggregate_path(Path::new("measurements.txt"), &Config::default())?;
//! println!("{}", report::render(&result));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod merge;
pub mod parse;
pub mod partition;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod stats;
pub mod testing;
pub mod worker;

pub use error::{Error, ParseError, RecordErrorKind, Result};
pub use merge::{merge, GlobalResult, Merger};
pub use parse::{parse_tenths, parse_value, ValueError, ValueFormat};
pub use partition::{partition, ByteRange};
pub use pipeline::{aggregate, aggregate_path, aggregate_with, hardware_parallelism, Config};
pub use source::{ByteSource, MappedFile, ReadAtFile, SourceMode};
pub use stats::{Key, Stats, StatsMap, Summary};
pub use worker::{scan, PartialResult, ScanOptions};
