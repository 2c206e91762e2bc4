//! Per-track overlap report produced by a finished query.

use crate::interval::GenomicInterval;
use crate::region::QueryRegion;
use std::cmp::Reverse;
use std::fmt;

/// Overlap of one track with the query window.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackOverlap {
    pub track_id: String,
    /// Disjoint, non-touching, sorted by start.
    pub merged: Vec<GenomicInterval>,
    pub covered_length: u64,
    /// Rows the store returned for this track, before merging.
    pub raw_candidate_count: usize,
    pub tissue: Option<String>,
    pub source: Option<String>,
    window_length: u64,
}

impl TrackOverlap {
    pub(crate) fn new(
        track_id: String,
        merged: Vec<GenomicInterval>,
        covered_length: u64,
        raw_candidate_count: usize,
        window_length: u64,
    ) -> Self {
        Self {
            track_id,
            merged,
            covered_length,
            raw_candidate_count,
            tissue: None,
            source: None,
            window_length,
        }
    }

    /// Share of the query window covered by this track, in `[0, 1]`.
    pub fn fraction_covered(&self) -> f64 {
        if self.window_length == 0 {
            0.0
        } else {
            self.covered_length as f64 / self.window_length as f64
        }
    }
}

/// Report entries for every track that overlaps the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapReport {
    entries: Vec<TrackOverlap>,
}

impl OverlapReport {
    pub fn new(entries: Vec<TrackOverlap>) -> Self {
        Self { entries }
    }

    /// Order by descending covered length, ties by ascending track id.
    pub fn sort_by_coverage(&mut self) {
        self.entries.sort_by(|a, b| {
            Reverse(a.covered_length)
                .cmp(&Reverse(b.covered_length))
                .then_with(|| a.track_id.cmp(&b.track_id))
        });
    }

    /// Keep only the first `n` entries.
    pub fn truncate(&mut self, n: usize) {
        self.entries.truncate(n);
    }

    pub fn entries(&self) -> &[TrackOverlap] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackOverlap> {
        self.entries.iter()
    }

    /// Look up a track by id.
    pub fn get(&self, track_id: &str) -> Option<&TrackOverlap> {
        self.entries.iter().find(|e| e.track_id == track_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counters collected while streaming one query.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryStats {
    /// Items pulled from the store, including malformed rows
    pub rows_pulled: usize,
    /// Rows clipped and merged into a track
    pub rows_accepted: usize,
    /// Rows the store flagged as malformed
    pub malformed_rows: usize,
    /// Rows whose clip came out empty
    pub clip_mismatches: usize,
    /// Rows the store returned from another chromosome
    pub chrom_mismatches: usize,
    /// Rows rejected by the tissue/source filter in the aggregator
    pub filtered_rows: usize,
    /// Distinct tracks that received at least one row
    pub tracks_touched: usize,
    /// Tracks dropped at finalization for failing the disjointness check
    pub tracks_omitted: usize,
}

impl QueryStats {
    /// Rows skipped for data-quality reasons.
    pub fn skipped(&self) -> usize {
        self.malformed_rows + self.clip_mismatches + self.chrom_mismatches
    }
}

impl fmt::Display for QueryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pulled: {}, Accepted: {}, Malformed: {}, Clip mismatches: {}, Chrom mismatches: {}, Filtered: {}, Tracks: {}",
            self.rows_pulled,
            self.rows_accepted,
            self.malformed_rows,
            self.clip_mismatches,
            self.chrom_mismatches,
            self.filtered_rows,
            self.tracks_touched
        )
    }
}

/// A completed query: the report plus how it was produced.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub region: QueryRegion,
    pub report: OverlapReport,
    pub stats: QueryStats,
}

impl QueryOutcome {
    /// True when rows were skipped or tracks omitted. The report is still
    /// valid for everything that was kept.
    pub fn is_partial(&self) -> bool {
        self.stats.skipped() > 0 || self.stats.tracks_omitted > 0
    }
}
