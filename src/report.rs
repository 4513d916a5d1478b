//! Text rendering of a [`GlobalResult`].

use std::fmt::{self, Write};

use crate::merge::GlobalResult;
use crate::stats::Summary;

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}/{:.1}/{:.1}", self.min, self.avg, self.max)
    }
}

/// `{key=min/avg/max, ...}` ordered by key bytes.
pub fn render(result: &GlobalResult<'_>) -> String {
    let mut out = String::with_capacity(result.len() * 24 + 2);
    out.push('{');
    for (i, (key, summary)) in result.sorted().into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        // Writing to a String cannot fail.
        let _ = write!(out, "{}={}", String::from_utf8_lossy(key), summary);
    }
    out.push('}');
    out
}

/// Human-readable summary of skipped records, or `None` when there were none.
pub fn render_errors(result: &GlobalResult<'_>) -> Option<String> {
    if result.skipped() == 0 {
        return None;
    }
    let mut out = format!(
        "skipped {} of {} lines as malformed",
        result.skipped(),
        result.lines()
    );
    for error in result.errors() {
        let _ = write!(out, "\n  {error}");
    }
    let hidden = result.skipped() - result.errors().len() as u64;
    if hidden > 0 {
        let _ = write!(out, "\n  ... and {hidden} more");
    }
    Some(out)
}
