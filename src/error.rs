//! Error types for the scan-and-aggregate pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::parse::ValueError;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum Error {
    /// The input file could not be opened or stat'ed
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file could not be mapped into memory
    #[error("failed to map {path}: {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A positional read failed while scanning
    #[error("read failed at byte {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// The caller asked for more bytes than the source holds
    #[error("source holds {available} bytes but {requested} were requested")]
    SourceTooShort { requested: u64, available: u64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be started
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single record was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordErrorKind {
    #[error("missing ';' separator")]
    MissingSeparator,

    #[error("malformed value: {0}")]
    MalformedValue(ValueError),
}

/// A record that was skipped. Recoverable: the worker keeps scanning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Absolute byte offset of the start of the offending line
    pub offset: u64,
    /// The line as read, truncated to [`ParseError::RAW_LIMIT`] bytes
    pub raw: Vec<u8>,
    pub kind: RecordErrorKind,
}

impl ParseError {
    pub const RAW_LIMIT: usize = 128;

    pub(crate) fn new(offset: u64, line: &[u8], kind: RecordErrorKind) -> Self {
        let raw = line[..line.len().min(Self::RAW_LIMIT)].to_vec();
        Self { offset, raw, kind }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "byte {}: {} in {:?}",
            self.offset,
            self.kind,
            String::from_utf8_lossy(&self.raw)
        )
    }
}
