//! Folds per-worker results into the global result.

use hashbrown::HashMap;
use tracing::info;

use crate::error::ParseError;
use crate::stats::{stats_map, Key, StatsMap, Summary};
use crate::worker::PartialResult;

/// Sequential fold of [`PartialResult`]s. Only the coordinating thread
/// touches it.
#[derive(Debug)]
pub struct Merger<'a> {
    stats: StatsMap<'a>,
    lines: u64,
    skipped: u64,
    errors: Vec<ParseError>,
    max_reported_errors: usize,
}

impl<'a> Merger<'a> {
    pub fn new(max_reported_errors: usize) -> Self {
        Self {
            stats: stats_map(),
            lines: 0,
            skipped: 0,
            errors: Vec::new(),
            max_reported_errors,
        }
    }

    /// Takes ownership of one worker's result. Keys seen for the first time
    /// are moved in as they are.
    pub fn fold(&mut self, partial: PartialResult<'a>) {
        for (key, incoming) in partial.stats {
            match self.stats.get_mut(&*key) {
                Some(existing) => existing.merge(&incoming),
                None => {
                    self.stats.insert(key, incoming);
                }
            }
        }
        self.lines += partial.lines;
        self.skipped += partial.skipped;
        self.errors.extend(partial.errors);
    }

    /// Computes the averages, once per key, and seals the result.
    pub fn finish(mut self) -> GlobalResult<'a> {
        info!(keys = self.stats.len(), "calculating averages");
        let stats = self
            .stats
            .into_iter()
            .map(|(key, stats)| (key, stats.summarize()))
            .collect();

        self.errors.sort_by_key(|e| e.offset);
        self.errors.truncate(self.max_reported_errors);

        GlobalResult {
            stats,
            lines: self.lines,
            skipped: self.skipped,
            errors: self.errors,
        }
    }
}

/// Merges `partials` in the order given.
pub fn merge<'a, I>(partials: I, max_reported_errors: usize) -> GlobalResult<'a>
where
    I: IntoIterator<Item = PartialResult<'a>>,
{
    let mut merger = Merger::new(max_reported_errors);
    for partial in partials {
        merger.fold(partial);
    }
    merger.finish()
}

/// The merged aggregate over the whole input. Read-only.
#[derive(Debug, Clone)]
pub struct GlobalResult<'a> {
    stats: HashMap<Key<'a>, Summary, ahash::RandomState>,
    lines: u64,
    skipped: u64,
    errors: Vec<ParseError>,
}

impl<'a> GlobalResult<'a> {
    pub fn get(&self, key: &[u8]) -> Option<&Summary> {
        self.stats.get(key)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Summary)> {
        self.stats.iter().map(|(k, v)| (&**k, v))
    }

    /// Entries ordered by key bytes.
    pub fn sorted(&self) -> Vec<(&[u8], &Summary)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by_key(|(key, _)| *key);
        entries
    }

    /// Lines seen, including skipped ones.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Errors for skipped records, ordered by offset. May be fewer than
    /// [`GlobalResult::skipped`] when the report cap was reached.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Detaches the keys from the source.
    pub fn into_owned(self) -> GlobalResult<'static> {
        GlobalResult {
            stats: self
                .stats
                .into_iter()
                .map(|(k, v)| (Key::Owned(k.into_owned()), v))
                .collect(),
            lines: self.lines,
            skipped: self.skipped,
            errors: self.errors,
        }
    }
}
