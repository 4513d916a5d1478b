//! Scans one chunk into a private map.

use std::borrow::Cow;

use memchr::{memchr, memrchr};
use tracing::{debug, warn};

use crate::error::{Error, ParseError, RecordErrorKind, Result};
use crate::parse::{parse_tenths, ValueFormat};
use crate::partition::ByteRange;
use crate::source::{read_exact_at, ByteSource};
use crate::stats::{record_into, stats_map, Key, Stats, StatsMap};

/// Read size for sources that are not resident in memory.
const SEGMENT_SIZE: usize = 1 << 21;

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    pub format: ValueFormat,
    /// Per-worker cap on stored [`ParseError`]s. Skipped records are always
    /// counted, whether or not their error is kept.
    pub max_reported_errors: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            format: ValueFormat::Standard,
            max_reported_errors: 100,
        }
    }
}

/// One worker's complete aggregate over its chunk.
#[derive(Debug)]
pub struct PartialResult<'a> {
    pub(crate) stats: StatsMap<'a>,
    pub(crate) lines: u64,
    pub(crate) skipped: u64,
    pub(crate) errors: Vec<ParseError>,
}

impl<'a> PartialResult<'a> {
    pub fn new() -> Self {
        Self {
            stats: stats_map(),
            lines: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    pub fn stats(&self) -> &StatsMap<'a> {
        &self.stats
    }

    pub fn get(&self, key: &[u8]) -> Option<&Stats> {
        self.stats.get(key)
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn reject(&mut self, error: ParseError, max_reported: usize) {
        self.skipped += 1;
        if self.errors.len() < max_reported {
            self.errors.push(error);
        }
    }
}

impl Default for PartialResult<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregates every record in `range`.
///
/// Malformed records are skipped and reported; they never end the scan
/// early. Only read failures are fatal.
pub fn scan<'a, S: ByteSource + ?Sized>(
    source: &'a S,
    range: ByteRange,
    options: &ScanOptions,
) -> Result<PartialResult<'a>> {
    if range.end > source.len() {
        return Err(Error::SourceTooShort {
            requested: range.end,
            available: source.len(),
        });
    }

    let mut partial = PartialResult::new();
    if range.is_empty() {
        return Ok(partial);
    }

    match source.as_slice() {
        Some(bytes) => {
            let chunk = &bytes[range.start as usize..range.end as usize];
            scan_lines(chunk, range.start, options, &mut partial, Cow::Borrowed);
        }
        None => scan_segmented(source, range, options, &mut partial)?,
    }

    debug!(
        start = range.start,
        end = range.end,
        lines = partial.lines,
        keys = partial.stats.len(),
        "chunk scanned"
    );
    if partial.skipped > 0 {
        warn!(
            start = range.start,
            end = range.end,
            skipped = partial.skipped,
            "skipped malformed records"
        );
    }
    Ok(partial)
}

/// Reads the range segment by segment. Each segment is cut after its last
/// terminator; the partial line left over is carried into the next read.
fn scan_segmented<'k, S: ByteSource + ?Sized>(
    source: &S,
    range: ByteRange,
    options: &ScanOptions,
    partial: &mut PartialResult<'k>,
) -> Result<()> {
    let mut buf: Vec<u8> = Vec::with_capacity(SEGMENT_SIZE);
    // Absolute offset of buf[0].
    let mut buf_start = range.start;
    let mut pos = range.start;

    while pos < range.end {
        let n = (range.end - pos).min(SEGMENT_SIZE as u64) as usize;
        let filled = buf.len();
        buf.resize(filled + n, 0);
        read_exact_at(source, pos, &mut buf[filled..])?;
        pos += n as u64;

        let complete = if pos == range.end {
            buf.len()
        } else {
            match memrchr(b'\n', &buf[filled..]) {
                Some(i) => filled + i + 1,
                // Line longer than a segment, keep reading.
                None => continue,
            }
        };

        scan_lines(&buf[..complete], buf_start, options, partial, |key: &[u8]| {
            Cow::Owned(key.to_vec())
        });
        buf.drain(..complete);
        buf_start += complete as u64;
    }
    Ok(())
}

fn scan_lines<'b, 'k, F>(
    bytes: &'b [u8],
    base: u64,
    options: &ScanOptions,
    partial: &mut PartialResult<'k>,
    key_of: F,
) where
    F: Fn(&'b [u8]) -> Key<'k>,
{
    let mut offset = 0;
    while let Some((line, next)) = next_line(bytes, offset) {
        partial.lines += 1;
        match do_line(line, options.format) {
            Ok((key, tenths)) => record_into(&mut partial.stats, key, tenths, || key_of(key)),
            Err(kind) => partial.reject(
                ParseError::new(base + offset as u64, line, kind),
                options.max_reported_errors,
            ),
        }
        offset = next;
    }
}

/// The line starting at `start` (without its terminator) and the offset of
/// the line after it. A final line without a terminator still counts.
#[inline]
fn next_line(bytes: &[u8], start: usize) -> Option<(&[u8], usize)> {
    if start >= bytes.len() {
        return None;
    }
    let rest = &bytes[start..];
    Some(match memchr(b'\n', rest) {
        Some(i) => (&rest[..i], start + i + 1),
        None => (rest, bytes.len()),
    })
}

/// Splits a line on its first `;` and parses the value.
#[inline]
fn do_line(
    line: &[u8],
    format: ValueFormat,
) -> std::result::Result<(&[u8], i64), RecordErrorKind> {
    let semicolon = memchr(b';', line).ok_or(RecordErrorKind::MissingSeparator)?;
    let tenths =
        parse_tenths(&line[semicolon + 1..], format).map_err(RecordErrorKind::MalformedValue)?;
    Ok((&line[..semicolon], tenths))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ValueError;
    use crate::testing::{generate, Unresident};

    fn whole(data: &[u8]) -> ByteRange {
        ByteRange::new(0, data.len() as u64)
    }

    #[test]
    fn aggregates_every_line() {
        let data = b"A;1.0\nB;2.0\nA;3.0\n";
        let partial = scan(&data[..], whole(data), &ScanOptions::default()).unwrap();
        let a = partial.get(b"A").unwrap();
        assert_eq!((a.min(), a.max(), a.sum(), a.count()), (1.0, 3.0, 4.0, 2));
        let b = partial.get(b"B").unwrap();
        assert_eq!((b.min(), b.max(), b.sum(), b.count()), (2.0, 2.0, 2.0, 1));
        assert_eq!(partial.lines(), 3);
        assert_eq!(partial.skipped(), 0);
    }

    #[test]
    fn final_line_without_terminator_is_counted() {
        let data = b"A;1.0\nA;2.0";
        let partial = scan(&data[..], whole(data), &ScanOptions::default()).unwrap();
        assert_eq!(partial.get(b"A").unwrap().count(), 2);
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let data = b"A;1.0\nB;xx\nA;2.0\n";
        let partial = scan(&data[..], whole(data), &ScanOptions::default()).unwrap();
        assert_eq!(partial.get(b"A").unwrap().count(), 2);
        assert!(partial.get(b"B").is_none());
        assert_eq!(partial.skipped(), 1);
        let err = &partial.errors()[0];
        assert_eq!(err.offset, 6);
        assert_eq!(err.raw, b"B;xx");
        assert_eq!(err.kind, RecordErrorKind::MalformedValue(ValueError::InvalidByte));
    }

    #[test]
    fn missing_separator_is_reported_with_absolute_offset() {
        let data = b"A;1.0\nno separator\nA;2.0\n";
        let range = ByteRange::new(6, data.len() as u64);
        let partial = scan(&data[..], range, &ScanOptions::default()).unwrap();
        assert_eq!(partial.errors()[0].offset, 6);
        assert_eq!(partial.errors()[0].kind, RecordErrorKind::MissingSeparator);
        assert_eq!(partial.get(b"A").unwrap().count(), 1);
    }

    #[test]
    fn stored_errors_are_capped_but_all_counted() {
        let data = b"x\nx\nx\nx\nA;1.0\n";
        let options = ScanOptions {
            max_reported_errors: 2,
            ..ScanOptions::default()
        };
        let partial = scan(&data[..], whole(data), &options).unwrap();
        assert_eq!(partial.skipped(), 4);
        assert_eq!(partial.errors().len(), 2);
        assert_eq!(partial.get(b"A").unwrap().count(), 1);
    }

    #[test]
    fn empty_range_gives_empty_result() {
        let data = b"A;1.0\n";
        let partial = scan(&data[..], ByteRange::new(3, 3), &ScanOptions::default()).unwrap();
        assert!(partial.stats().is_empty());
        assert_eq!(partial.lines(), 0);
    }

    #[test]
    fn resident_keys_are_borrowed() {
        let data = b"A;1.0\n";
        let partial = scan(&data[..], whole(data), &ScanOptions::default()).unwrap();
        assert!(partial.stats().keys().all(|k| matches!(k, Cow::Borrowed(_))));
    }

    #[test]
    fn segmented_scan_matches_resident_scan() {
        // Several segments, so lines straddle segment edges.
        let data = generate(400_000, 50, 7);
        assert!(data.len() > 2 * SEGMENT_SIZE);
        let options = ScanOptions::default();
        let resident = scan(&data[..], whole(&data), &options).unwrap();
        let unresident = Unresident(&data);
        let segmented = scan(&unresident, whole(&data), &options).unwrap();
        assert_eq!(resident.lines(), segmented.lines());
        assert_eq!(resident.stats().len(), segmented.stats().len());
        for (key, stats) in resident.stats() {
            assert_eq!(Some(stats), segmented.get(key));
        }
    }

    #[test]
    fn range_past_source_end_is_rejected() {
        let data = b"A;1.0\n";
        let err = scan(&data[..], ByteRange::new(0, 10), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, Error::SourceTooShort { .. }));
    }
}
