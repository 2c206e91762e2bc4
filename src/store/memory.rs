//! In-memory range index over track intervals.
//!
//! Rows are grouped by chromosome and sorted by start. Each chromosome also
//! records its longest row, which bounds how far left of the query start an
//! overlapping row can begin: the search binary-searches to
//! `query.start - max_len` and scans forward until `row.start >= query.end`.

use super::{CandidateRow, CandidateRows, SpatialStore};
use crate::error::{EngineError, Result};
use crate::interval::GenomicInterval;
use crate::region::{normalize_chrom, QueryRegion};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
struct TrackMeta {
    id: String,
    tissue: Option<String>,
    source: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct StoredRow {
    interval: GenomicInterval,
    track: u32,
}

/// Sorted rows of one chromosome.
#[derive(Debug, Default)]
struct ChromRows {
    /// Chromosome name as first seen, reported back on candidate rows
    name: String,
    rows: Vec<StoredRow>,
    max_len: u64,
    min_start: u64,
    max_end: u64,
}

impl ChromRows {
    fn push(&mut self, row: StoredRow) {
        if self.rows.is_empty() {
            self.min_start = row.interval.start();
            self.max_end = row.interval.end();
        } else {
            self.min_start = self.min_start.min(row.interval.start());
            self.max_end = self.max_end.max(row.interval.end());
        }
        self.max_len = self.max_len.max(row.interval.len());
        self.rows.push(row);
    }

    /// Rows overlapping `[start, end)`, in start order.
    fn overlapping(&self, start: u64, end: u64) -> impl Iterator<Item = &StoredRow> + '_ {
        let in_bounds = start < self.max_end && end > self.min_start;
        let first = if in_bounds {
            let lower = start.saturating_sub(self.max_len);
            self.rows.partition_point(|r| r.interval.start() < lower)
        } else {
            self.rows.len()
        };
        self.rows[first..]
            .iter()
            .take_while(move |r| r.interval.start() < end)
            .filter(move |r| r.interval.end() > start)
    }
}

/// Collects rows and builds an [`InMemoryStore`].
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    normalize_chrom: bool,
    tracks: Vec<TrackMeta>,
    track_ids: FxHashMap<String, u32>,
    chroms: FxHashMap<String, ChromRows>,
    rows_added: usize,
}

impl InMemoryStoreBuilder {
    pub fn new() -> Self {
        Self {
            normalize_chrom: true,
            ..Self::default()
        }
    }

    /// Compare chromosome names after normalization (`chr1` == `1`).
    pub fn with_normalize_chrom(mut self, normalize: bool) -> Self {
        self.normalize_chrom = normalize;
        self
    }

    /// Register or update a track's tissue and source.
    pub fn track_metadata(
        &mut self,
        track_id: &str,
        tissue: Option<&str>,
        source: Option<&str>,
    ) -> &mut Self {
        let idx = self.intern_track(track_id);
        let meta = &mut self.tracks[idx as usize];
        meta.tissue = tissue.map(str::to_string);
        meta.source = source.map(str::to_string);
        self
    }

    /// Add one interval for a track.
    ///
    /// Rows with `start >= end` are rejected with `MalformedRow`, where
    /// `line` is the 1-based position of the row in insertion order.
    pub fn add_row(
        &mut self,
        track_id: &str,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> Result<&mut Self> {
        self.rows_added += 1;
        let line = self.rows_added;
        let interval =
            GenomicInterval::new(start, end).ok_or_else(|| EngineError::MalformedRow {
                line,
                reason: format!("start ({}) >= end ({})", start, end),
            })?;
        let track = self.intern_track(track_id);
        let key = self.chrom_key(chrom);
        self.chroms
            .entry(key)
            .or_insert_with(|| ChromRows {
                name: chrom.to_string(),
                ..ChromRows::default()
            })
            .push(StoredRow { interval, track });
        Ok(self)
    }

    pub fn build(self) -> InMemoryStore {
        let mut chroms = self.chroms;
        for chrom_rows in chroms.values_mut() {
            chrom_rows
                .rows
                .sort_unstable_by_key(|r| (r.interval.start(), r.interval.end()));
        }
        InMemoryStore {
            normalize_chrom: self.normalize_chrom,
            tracks: self.tracks,
            chroms,
        }
    }

    fn intern_track(&mut self, track_id: &str) -> u32 {
        if let Some(&idx) = self.track_ids.get(track_id) {
            return idx;
        }
        let idx = self.tracks.len() as u32;
        self.tracks.push(TrackMeta {
            id: track_id.to_string(),
            tissue: None,
            source: None,
        });
        self.track_ids.insert(track_id.to_string(), idx);
        idx
    }

    fn chrom_key(&self, chrom: &str) -> String {
        if self.normalize_chrom {
            normalize_chrom(chrom).into_owned()
        } else {
            chrom.to_string()
        }
    }
}

/// Immutable sorted index of track intervals, safe to share across threads.
#[derive(Debug)]
pub struct InMemoryStore {
    normalize_chrom: bool,
    tracks: Vec<TrackMeta>,
    chroms: FxHashMap<String, ChromRows>,
}

impl InMemoryStore {
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::new()
    }

    /// Total number of stored rows.
    pub fn len(&self) -> usize {
        self.chroms.values().map(|c| c.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct tracks.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn chrom_rows(&self, chrom: &str) -> Option<&ChromRows> {
        if self.normalize_chrom {
            self.chroms.get(normalize_chrom(chrom).as_ref())
        } else {
            self.chroms.get(chrom)
        }
    }
}

impl SpatialStore for InMemoryStore {
    fn range_query(&self, region: &QueryRegion) -> Result<CandidateRows<'_>> {
        let Some(chrom_rows) = self.chrom_rows(region.chrom()) else {
            return Ok(Box::new(std::iter::empty::<Result<CandidateRow>>()));
        };
        let rows = chrom_rows
            .overlapping(region.start(), region.end())
            .map(move |row| {
                let meta = &self.tracks[row.track as usize];
                Ok::<_, EngineError>(CandidateRow {
                    track_id: meta.id.clone(),
                    chrom: chrom_rows.name.clone(),
                    interval: row.interval,
                    tissue: meta.tissue.clone(),
                    source: meta.source.clone(),
                })
            });
        Ok(Box::new(rows))
    }
}
