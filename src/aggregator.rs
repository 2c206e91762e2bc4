//! Streaming tally: pull candidate rows, clip them, merge per track.
//!
//! Rows are consumed one at a time straight from the store's iterator; no
//! candidate is buffered. Memory is O(T * k) where T is the number of tracks
//! touched and k the largest merged-interval count of any track.

use crate::cancel::CancelToken;
use crate::clip::{clip, Clipped};
use crate::error::{EngineError, Result};
use crate::merge_state::TrackMergeState;
use crate::region::{QueryRegion, TrackFilter};
use crate::report::{OverlapReport, QueryStats, TrackOverlap};
use crate::store::CandidateRow;
use rustc_hash::FxHashMap;
use tracing::{error, trace, warn};

/// Per-track accumulator.
#[derive(Debug, Default)]
struct TrackTally {
    state: TrackMergeState,
    raw_candidates: usize,
    tissue: Option<String>,
    source: Option<String>,
}

/// Aggregates one query's candidate stream into an [`OverlapReport`].
///
/// Owns all per-track state for the lifetime of one query.
#[derive(Debug)]
pub struct TallyAggregator<'q> {
    region: &'q QueryRegion,
    /// Applied per row when the store did not push it down
    row_filter: Option<&'q TrackFilter>,
    tracks: FxHashMap<String, TrackTally>,
    stats: QueryStats,
}

impl<'q> TallyAggregator<'q> {
    /// New aggregator for `region`; filters are assumed pushed down.
    pub fn new(region: &'q QueryRegion) -> Self {
        Self {
            region,
            row_filter: None,
            tracks: FxHashMap::default(),
            stats: QueryStats::default(),
        }
    }

    /// Apply the region's tissue/source filter to every row.
    pub fn with_row_filter(mut self, enabled: bool) -> Self {
        self.row_filter = if enabled && !self.region.filter().is_empty() {
            Some(self.region.filter())
        } else {
            None
        };
        self
    }

    /// Pull every row from `rows`, checking `cancel` before each pull.
    ///
    /// Row-local errors are counted and skipped. A terminal error stops the
    /// pull, drops `rows`, and is returned with the number of rows consumed.
    pub fn consume<I>(&mut self, rows: I, cancel: &CancelToken) -> Result<()>
    where
        I: IntoIterator<Item = Result<CandidateRow>>,
    {
        let mut rows = rows.into_iter();
        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled {
                    rows_consumed: self.stats.rows_pulled,
                });
            }
            let Some(item) = rows.next() else {
                return Ok(());
            };
            self.stats.rows_pulled += 1;
            match item {
                Ok(row) => self.accept(row),
                Err(err) if err.is_row_local() => {
                    self.stats.malformed_rows += 1;
                    trace!(error = %err, "skipping malformed row");
                }
                Err(EngineError::StoreUnavailable { reason, .. }) => {
                    return Err(EngineError::StoreUnavailable {
                        reason,
                        rows_consumed: self.stats.rows_pulled - 1,
                    });
                }
                // The stream itself gave up waiting on a cancelled token
                Err(EngineError::Cancelled { .. }) => {
                    return Err(EngineError::Cancelled {
                        rows_consumed: self.stats.rows_pulled - 1,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Clip one row and merge it into its track.
    pub fn accept(&mut self, row: CandidateRow) {
        if let Some(filter) = self.row_filter {
            if !filter.matches(row.tissue.as_deref(), row.source.as_deref()) {
                self.stats.filtered_rows += 1;
                return;
            }
        }

        if !self.region.same_chrom(&row.chrom, true) {
            self.stats.chrom_mismatches += 1;
            warn!(
                region = %self.region,
                track = %row.track_id,
                chrom = %row.chrom,
                "store returned a row from another chromosome"
            );
            return;
        }

        let clipped = match clip(row.interval, self.region.interval()) {
            Clipped::Inside(interval) => interval,
            Clipped::Mismatch { start, end } => {
                self.stats.clip_mismatches += 1;
                warn!(
                    region = %self.region,
                    track = %row.track_id,
                    raw = %row.interval,
                    start,
                    end,
                    "store returned a row outside the query window"
                );
                return;
            }
        };

        self.stats.rows_accepted += 1;
        let CandidateRow {
            track_id,
            tissue,
            source,
            ..
        } = row;
        let tally = self
            .tracks
            .entry(track_id)
            .or_insert_with(|| TrackTally {
                tissue,
                source,
                ..TrackTally::default()
            });
        tally.raw_candidates += 1;
        tally.state.insert(clipped);
    }

    /// Counters so far.
    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    /// Number of tracks with state.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Convert every track's state into a report entry.
    ///
    /// A track whose merged set fails the disjointness check is left out of
    /// the report and counted in `tracks_omitted`.
    pub fn finalize(self) -> (OverlapReport, QueryStats) {
        let mut stats = self.stats;
        stats.tracks_touched = self.tracks.len();
        let window_length = self.region.interval().len();

        let mut entries = Vec::with_capacity(self.tracks.len());
        for (track_id, tally) in self.tracks {
            if !tally.state.is_disjoint() {
                stats.tracks_omitted += 1;
                error!(track = %track_id, "merged intervals are not disjoint; omitting track");
                continue;
            }
            let covered_length = tally.state.covered_length();
            let mut entry = TrackOverlap::new(
                track_id,
                tally.state.into_intervals(),
                covered_length,
                tally.raw_candidates,
                window_length,
            );
            entry.tissue = tally.tissue;
            entry.source = tally.source;
            entries.push(entry);
        }

        (OverlapReport::new(entries), stats)
    }
}
