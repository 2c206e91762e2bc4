//! Core interval type for per-query coordinate arithmetic.

use std::cmp::Ordering;
use std::fmt;

/// A non-empty genomic interval.
/// Uses 0-based, half-open coordinates (BED format). The chromosome is
/// carried by the enclosing query or row, not by the interval itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenomicInterval {
    start: u64,
    end: u64,
}

impl GenomicInterval {
    /// Create a new interval, or `None` if `start >= end`.
    #[inline]
    pub fn new(start: u64, end: u64) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Returns the length of the interval. Always at least 1.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Check if this interval shares at least one base with `[start, end)`.
    ///
    /// Strict on both sides: `[100,200)` does not overlap `[200,250)`.
    #[inline]
    pub fn overlaps_range(&self, start: u64, end: u64) -> bool {
        start < self.end && end > self.start
    }

    /// Check if this interval overlaps another.
    #[inline]
    pub fn overlaps(&self, other: &GenomicInterval) -> bool {
        self.overlaps_range(other.start, other.end)
    }

    /// Check if this interval overlaps or abuts another (`a.end == b.start`).
    #[inline]
    pub fn touches(&self, other: &GenomicInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Intersection of two intervals, `None` if they share no base.
    #[inline]
    pub fn intersection(&self, other: &GenomicInterval) -> Option<GenomicInterval> {
        GenomicInterval::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Smallest interval covering both.
    #[inline]
    pub fn hull(&self, other: &GenomicInterval) -> GenomicInterval {
        GenomicInterval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl Ord for GenomicInterval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then(self.end.cmp(&other.end))
    }
}

impl PartialOrd for GenomicInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
