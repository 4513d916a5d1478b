//! Helpers for exercising the pipeline in tests and benchmarks.

use std::io;

use crate::source::ByteSource;

/// Wraps bytes so they are only reachable through positional reads, the
/// way a [`ReadAtFile`](crate::source::ReadAtFile) behaves.
#[derive(Debug, Clone, Copy)]
pub struct Unresident<'a>(pub &'a [u8]);

impl ByteSource for Unresident<'_> {
    fn len(&self) -> u64 {
        self.0.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read_at(offset, buf)
    }
}

/// Builds `<key>;<value>\n` lines.
pub fn measurements<'a, I>(records: I) -> Vec<u8>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut out = Vec::new();
    for (key, value) in records {
        out.extend_from_slice(key.as_bytes());
        out.push(b';');
        out.extend_from_slice(format!("{value:.1}").as_bytes());
        out.push(b'\n');
    }
    out
}

/// Deterministic pseudo-random input with `keys` distinct keys.
pub fn generate(lines: usize, keys: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let mut next = move || {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    let mut out = Vec::with_capacity(lines * 16);
    for _ in 0..lines {
        let key = next() % keys.max(1) as u64;
        let tenths = (next() % 1999) as i64 - 999;
        out.extend_from_slice(format!("station-{key};{:.1}\n", tenths as f64 / 10.0).as_bytes());
    }
    out
}
