//! Per-key running statistics.

use std::borrow::Cow;

use hashbrown::HashMap;

use crate::parse::tenths_to_f64;

/// Key bytes. Borrowed from a resident source, owned when the worker copied
/// the line out of a private read buffer.
pub type Key<'a> = Cow<'a, [u8]>;

pub type StatsMap<'a> = HashMap<Key<'a>, Stats, ahash::RandomState>;

pub(crate) fn stats_map<'a>() -> StatsMap<'a> {
    HashMap::with_capacity_and_hasher(1024, ahash::RandomState::new())
}

/// Running aggregate for one key, kept in exact tenths.
///
/// There is no empty state: every `Stats` starts from one observation, so
/// `count` is at least 1 and the average is always defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    min: i64,
    max: i64,
    sum: i64,
    count: u64,
}

impl Stats {
    #[inline]
    pub fn new(tenths: i64) -> Self {
        Self {
            min: tenths,
            max: tenths,
            sum: tenths,
            count: 1,
        }
    }

    #[inline]
    pub fn record(&mut self, tenths: i64) {
        self.min = self.min.min(tenths);
        self.max = self.max.max(tenths);
        self.sum += tenths;
        self.count += 1;
    }

    #[inline]
    pub fn merge(&mut self, other: &Stats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn min(&self) -> f64 {
        tenths_to_f64(self.min)
    }

    pub fn max(&self) -> f64 {
        tenths_to_f64(self.max)
    }

    pub fn sum(&self) -> f64 {
        tenths_to_f64(self.sum)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum_tenths(&self) -> i64 {
        self.sum
    }

    /// Final view with the derived average.
    ///
    /// `avg` is computed from the exact tenths as `sum_tenths / (count * 10)`,
    /// one rounding step. It can differ in the last bit from
    /// `Summary::sum / count`, which rounds twice: three observations of `0.1`
    /// give `avg == 0.1` where `0.3 / 3.0` is `0.09999999999999999`.
    pub fn summarize(&self) -> Summary {
        debug_assert!(self.count > 0, "stats with zero observations");
        Summary {
            min: self.min(),
            max: self.max(),
            sum: self.sum(),
            count: self.count,
            avg: self.sum as f64 / (self.count as f64 * 10.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
    pub avg: f64,
}

/// Records `tenths` under `key`, inserting a fresh entry on first sight.
///
/// The key is only materialized (and possibly copied) when the entry is new.
#[inline]
pub(crate) fn record_into<'k, K>(map: &mut StatsMap<'k>, key: &[u8], tenths: i64, materialize: K)
where
    K: FnOnce() -> Key<'k>,
{
    match map.get_mut(key) {
        Some(stats) => stats.record(tenths),
        None => {
            map.insert(materialize(), Stats::new(tenths));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tracks_extremes_sum_and_count() {
        let mut s = Stats::new(10);
        s.record(30);
        s.record(-5);
        assert_eq!(s.min(), -0.5);
        assert_eq!(s.max(), 3.0);
        assert_eq!(s.sum_tenths(), 35);
        assert_eq!(s.count(), 3);
    }

    #[test]
    fn merge_combines_both_sides() {
        let mut a = Stats::new(10);
        a.record(30);
        let mut b = Stats::new(-55);
        b.record(55);
        a.merge(&b);
        assert_eq!(a.min(), -5.5);
        assert_eq!(a.max(), 5.5);
        assert_eq!(a.sum(), 4.0);
        assert_eq!(a.count(), 4);
    }

    #[test]
    fn summarize_is_idempotent() {
        let mut s = Stats::new(-55);
        s.record(55);
        let first = s.summarize();
        let second = s.summarize();
        assert_eq!(first, second);
        assert_eq!(first.avg, 0.0);
        assert_eq!(first.sum, 0.0);
    }

    #[test]
    fn average_rounds_once_from_exact_tenths() {
        let mut s = Stats::new(1);
        s.record(1);
        s.record(1);
        let summary = s.summarize();
        assert_eq!(summary.sum, 0.3);
        assert_eq!(summary.avg, 0.1);
        assert_ne!(summary.avg, summary.sum / summary.count as f64);
    }

    #[test]
    fn record_into_updates_existing_entry_in_place() {
        let mut map = stats_map();
        record_into(&mut map, b"A", 10, || Cow::Borrowed(&b"A"[..]));
        record_into(&mut map, b"A", 30, || unreachable!("key already present"));
        let stats = map.get(b"A".as_slice()).unwrap();
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.summarize().avg, 2.0);
    }
}
