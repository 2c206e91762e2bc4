//! Spatial store adapters.
//!
//! A store answers one question: which rows overlap `[start, end)` on a
//! chromosome. The contract is deliberately loose so that any range index can
//! sit behind it:
//! - every row satisfies `row.start < query.end && row.end > query.start`
//! - rows come in no particular order and may repeat
//! - rows are not clipped
//! - a bad row is yielded as `EngineError::MalformedRow` and the stream goes on
//! - a lost backend is yielded as `EngineError::StoreUnavailable` and ends it
//!
//! The returned stream is lazy, finite and single-use.

pub mod channel;
pub mod memory;
pub mod parsing;
pub mod tsv;

pub use channel::{ChannelRows, ChannelStore, RowSender};
pub use memory::{InMemoryStore, InMemoryStoreBuilder};
pub use tsv::TsvStore;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::interval::GenomicInterval;
use crate::region::QueryRegion;

/// One row returned by a store, before clipping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub track_id: String,
    pub chrom: String,
    pub interval: GenomicInterval,
    pub tissue: Option<String>,
    pub source: Option<String>,
}

impl CandidateRow {
    pub fn new(
        track_id: impl Into<String>,
        chrom: impl Into<String>,
        interval: GenomicInterval,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            chrom: chrom.into(),
            interval,
            tissue: None,
            source: None,
        }
    }

    pub fn with_tissue(mut self, tissue: impl Into<String>) -> Self {
        self.tissue = Some(tissue.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Lazy stream of candidate rows for one query.
pub type CandidateRows<'a> = Box<dyn Iterator<Item = Result<CandidateRow>> + 'a>;

/// Read-only range index over track intervals.
///
/// Implementations must tolerate concurrent `range_query` calls.
pub trait SpatialStore: Sync {
    /// Start streaming the rows overlapping `region`.
    ///
    /// When [`pushes_down_filters`](Self::pushes_down_filters) is true the
    /// store also honours `region.filter()`; otherwise it ignores it.
    fn range_query(&self, region: &QueryRegion) -> Result<CandidateRows<'_>>;

    /// Like [`range_query`](Self::range_query), for stores whose next row
    /// can take arbitrarily long to arrive.
    ///
    /// Such a store should stop waiting once `cancel` fires and yield
    /// `EngineError::Cancelled`. Stores that never block just ignore it.
    fn range_query_with_cancel(
        &self,
        region: &QueryRegion,
        _cancel: &CancelToken,
    ) -> Result<CandidateRows<'_>> {
        self.range_query(region)
    }

    /// Whether the store applies tissue/source filters itself.
    fn pushes_down_filters(&self) -> bool {
        false
    }
}
