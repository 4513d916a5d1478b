//! Splits the input into line-aligned chunks, one per worker.

use memchr::memchr;
use tracing::debug;

use crate::error::{Error, Result};
use crate::source::{read_exact_at, ByteSource};

const PROBE_SIZE: usize = 256;

/// Half-open byte range `[start, end)` of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Produces exactly `workers` ranges covering `[0, len)`.
///
/// Each internal boundary sits right after a `\n`, so no line is split.
/// Consecutive ranges share their boundary. Ranges may be empty when the
/// input is small relative to `workers`.
pub fn partition<S: ByteSource + ?Sized>(
    source: &S,
    len: u64,
    workers: usize,
) -> Result<Vec<ByteRange>> {
    if workers == 0 {
        return Err(Error::InvalidConfig("worker count must be at least 1".into()));
    }
    if len > source.len() {
        return Err(Error::SourceTooShort {
            requested: len,
            available: source.len(),
        });
    }

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for i in 1..workers {
        let candidate = (i as u128 * len as u128 / workers as u128) as u64;
        // The previous boundary already passed this candidate.
        let end = if candidate <= start {
            start
        } else {
            align(source, candidate, len)?
        };
        ranges.push(ByteRange::new(start, end));
        start = end;
    }
    ranges.push(ByteRange::new(start, len));

    debug!(len, workers, "partitioned input");
    Ok(ranges)
}

/// Moves `candidate` forward to just past the next terminator. A candidate
/// whose preceding byte is already `\n` stays put.
fn align<S: ByteSource + ?Sized>(source: &S, candidate: u64, len: u64) -> Result<u64> {
    let from = candidate - 1;
    let found = match source.as_slice() {
        Some(bytes) => memchr(b'\n', &bytes[from as usize..len as usize]).map(|i| from + i as u64),
        None => scan_forward(source, from, len)?,
    };
    Ok(match found {
        Some(terminator) => terminator + 1,
        None => {
            debug!(candidate, "no line terminator before end of input, chunk runs to the end");
            len
        }
    })
}

fn scan_forward<S: ByteSource + ?Sized>(source: &S, mut from: u64, len: u64) -> Result<Option<u64>> {
    let mut buf = [0u8; PROBE_SIZE];
    while from < len {
        let n = (len - from).min(PROBE_SIZE as u64) as usize;
        read_exact_at(source, from, &mut buf[..n])?;
        if let Some(i) = memchr(b'\n', &buf[..n]) {
            return Ok(Some(from + i as u64));
        }
        from += n as u64;
    }
    Ok(None)
}
