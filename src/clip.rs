//! Clipping of raw candidate intervals to the query window.

use crate::interval::GenomicInterval;

/// Result of clipping one raw candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clipped {
    /// The part of the candidate inside the query window.
    Inside(GenomicInterval),
    /// Clipping produced an empty interval: the store returned a row that
    /// does not overlap the query.
    Mismatch { start: u64, end: u64 },
}

/// Restrict `raw` to `query`: `[max(starts), min(ends))`.
#[inline]
pub fn clip(raw: GenomicInterval, query: GenomicInterval) -> Clipped {
    match raw.intersection(&query) {
        Some(interval) => Clipped::Inside(interval),
        None => Clipped::Mismatch {
            start: raw.start().max(query.start()),
            end: raw.end().min(query.end()),
        },
    }
}
