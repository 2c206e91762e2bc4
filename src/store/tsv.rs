//! Line-scanning adapter over a tab-separated track-interval file.
//!
//! Each query opens the file and streams it once, keeping a single line
//! buffer. Nothing is indexed, so cost is linear in file size, but memory is
//! constant and the rows need no particular order.
//!
//! Tissue/source filters are applied while scanning (pushed down), so
//! filtered-out rows never reach the aggregator.

use super::parsing::{parse_row_core, should_skip_line, trim_line_end, Fields};
use super::{CandidateRow, CandidateRows, SpatialStore};
use crate::error::{EngineError, Result};
use crate::interval::GenomicInterval;
use crate::region::{normalize_chrom, QueryRegion, TrackFilter};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Input buffer size for scanning (256 KB).
const SCAN_BUFFER_SIZE: usize = 256 * 1024;

/// File-backed store: `chrom  start  end  track_id  [tissue  source]`.
#[derive(Debug, Clone)]
pub struct TsvStore {
    path: PathBuf,
    normalize_chrom: bool,
}

impl TsvStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            normalize_chrom: true,
        }
    }

    /// Compare chromosome names after normalization (`chr1` == `1`).
    pub fn with_normalize_chrom(mut self, normalize: bool) -> Self {
        self.normalize_chrom = normalize;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SpatialStore for TsvStore {
    fn range_query(&self, region: &QueryRegion) -> Result<CandidateRows<'_>> {
        let file = File::open(&self.path).map_err(|e| {
            EngineError::unavailable(format!("cannot open {}: {}", self.path.display(), e))
        })?;
        Ok(Box::new(TsvRows::new(file, region, self.normalize_chrom)))
    }

    fn pushes_down_filters(&self) -> bool {
        true
    }
}

/// Streaming scan over any readable source of track-interval lines.
pub struct TsvRows<R: Read> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
    line_number: usize,
    /// Normalized when `normalize_chrom` is set
    chrom: String,
    normalize_chrom: bool,
    interval: GenomicInterval,
    filter: TrackFilter,
    done: bool,
}

impl<R: Read> TsvRows<R> {
    pub fn new(reader: R, region: &QueryRegion, normalize: bool) -> Self {
        let chrom = if normalize {
            normalize_chrom(region.chrom()).into_owned()
        } else {
            region.chrom().to_string()
        };
        Self {
            reader: BufReader::with_capacity(SCAN_BUFFER_SIZE, reader),
            buffer: Vec::with_capacity(1024),
            line_number: 0,
            chrom,
            normalize_chrom: normalize,
            interval: region.interval(),
            filter: region.filter().clone(),
            done: false,
        }
    }

    fn chrom_matches(&self, name: &str) -> bool {
        if self.normalize_chrom {
            normalize_chrom(name) == self.chrom.as_str()
        } else {
            name == self.chrom
        }
    }

    /// Evaluate the line currently in the buffer.
    ///
    /// `None` means the line is not a candidate (header, other chromosome,
    /// no overlap, filtered out). A chromosome column that is not UTF-8
    /// cannot be compared, so the line is reported as malformed.
    fn evaluate_line(&self) -> Option<Result<CandidateRow>> {
        let line = trim_line_end(&self.buffer);
        if should_skip_line(line) {
            return None;
        }
        let fields = Fields::split(line);
        let Ok(chrom) = std::str::from_utf8(fields.get(0)?) else {
            return Some(Err(EngineError::MalformedRow {
                line: self.line_number,
                reason: "chromosome name is not valid UTF-8".to_string(),
            }));
        };
        if !self.chrom_matches(chrom) {
            return None;
        }

        let core = match parse_row_core(&fields) {
            Ok(core) => core,
            Err(reason) => {
                return Some(Err(EngineError::MalformedRow {
                    line: self.line_number,
                    reason: reason.to_string(),
                }))
            }
        };
        let Some(interval) = GenomicInterval::new(core.start, core.end) else {
            return Some(Err(EngineError::MalformedRow {
                line: self.line_number,
                reason: format!("start ({}) >= end ({})", core.start, core.end),
            }));
        };
        if !interval.overlaps(&self.interval) {
            return None;
        }

        let tissue = fields.metadata(4);
        let source = fields.metadata(5);
        if !self.filter.matches(tissue, source) {
            return None;
        }

        Some(Ok(CandidateRow {
            track_id: core.track_id.to_string(),
            chrom: chrom.to_string(),
            interval,
            tissue: tissue.map(str::to_string),
            source: source.map(str::to_string),
        }))
    }
}

impl<R: Read> Iterator for TsvRows<R> {
    type Item = Result<CandidateRow>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_number += 1;
                    if let Some(item) = self.evaluate_line() {
                        return Some(item);
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(EngineError::StoreUnavailable {
                        reason: format!("read failed at line {}: {}", self.line_number + 1, e),
                        rows_consumed: 0,
                    }));
                }
            }
        }
        None
    }
}
