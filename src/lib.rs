//! Track overlap: which genomic tracks overlap a region, and by how much.
//!
//! Candidate rows stream out of a range-indexed store in any order. Each row
//! is clipped to the query window and folded into its track's running
//! interval union, so a track with many overlapping or adjacent sub-intervals
//! is never double-counted and memory stays bounded by the number of merged
//! intervals, not the number of rows.
//!
//! # Features
//!
//! - **Streaming**: one row in flight, no candidate buffering
//! - **Order independent**: online union per track, no global sort
//! - **Fault tolerant**: malformed rows are skipped and counted
//! - **Parallel batches**: independent queries run on the Rayon pool
//!
//! # Example
//!
//! ```rust
//! use track_overlap::{InMemoryStore, QueryEngine, TrackFilter};
//!
//! let mut builder = InMemoryStore::builder();
//! builder.add_row("A", "chr1", 900, 1500).unwrap();
//! builder.add_row("A", "chr1", 1400, 1800).unwrap();
//! builder.add_row("A", "chr1", 1900, 2100).unwrap();
//!
//! let engine = QueryEngine::new(builder.build());
//! let outcome = engine.query("chr1", 1000, 2000, TrackFilter::new()).unwrap();
//! assert_eq!(outcome.report.get("A").unwrap().covered_length, 900);
//! ```

pub mod aggregator;
pub mod cancel;
pub mod clip;
pub mod config;
pub mod error;
pub mod interval;
pub mod merge_state;
pub mod orchestrator;
pub mod output;
pub mod region;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use interval::GenomicInterval;
pub use merge_state::TrackMergeState;
pub use orchestrator::QueryEngine;
pub use region::{QueryRegion, TrackFilter};
pub use report::{OverlapReport, QueryOutcome, QueryStats, TrackOverlap};
pub use store::{CandidateRow, ChannelStore, InMemoryStore, SpatialStore, TsvStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::config::EngineConfig;
    pub use crate::error::{EngineError, Result};
    pub use crate::interval::GenomicInterval;
    pub use crate::orchestrator::QueryEngine;
    pub use crate::region::{QueryRegion, TrackFilter};
    pub use crate::report::{OverlapReport, QueryOutcome, TrackOverlap};
    pub use crate::store::{CandidateRow, InMemoryStore, SpatialStore, TsvStore};
}
