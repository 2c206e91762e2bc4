//! Query orchestration: validate, stream, finalize, rank.

use crate::aggregator::TallyAggregator;
use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::region::{QueryRegion, TrackFilter};
use crate::report::QueryOutcome;
use crate::store::SpatialStore;
use rayon::prelude::*;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Runs overlap queries against one store.
///
/// The engine holds no per-query state, so a single instance can serve any
/// number of concurrent queries.
pub struct QueryEngine<S: SpatialStore> {
    store: S,
    config: EngineConfig,
}

impl<S: SpatialStore> QueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate raw coordinates and run the query.
    ///
    /// An invalid region fails with `InvalidRegion` before the store is
    /// touched.
    pub fn query(
        &self,
        chrom: &str,
        start: i64,
        end: i64,
        filter: TrackFilter,
    ) -> Result<QueryOutcome> {
        let region = QueryRegion::new(chrom, start, end)?.with_filter(filter);
        self.run(&region)
    }

    /// Run a validated region to completion.
    pub fn run(&self, region: &QueryRegion) -> Result<QueryOutcome> {
        self.run_with_cancel(region, &CancelToken::new())
    }

    /// Run a region, stopping at the next pull once `cancel` fires.
    pub fn run_with_cancel(
        &self,
        region: &QueryRegion,
        cancel: &CancelToken,
    ) -> Result<QueryOutcome> {
        let pushdown = self.config.pushdown_filters && self.store.pushes_down_filters();
        let store_region = if pushdown {
            Cow::Borrowed(region)
        } else {
            Cow::Owned(region.without_filter())
        };
        debug!(%region, pushdown, "starting overlap query");

        let rows = self.store.range_query_with_cancel(&store_region, cancel)?;
        let mut aggregator = TallyAggregator::new(region).with_row_filter(!pushdown);
        aggregator.consume(rows, cancel)?;

        let (mut report, stats) = aggregator.finalize();
        report.sort_by_coverage();
        if let Some(max_tracks) = self.config.max_tracks {
            report.truncate(max_tracks);
        }

        let outcome = QueryOutcome {
            region: region.clone(),
            report,
            stats,
        };
        if outcome.is_partial() {
            warn!(
                %region,
                malformed = outcome.stats.malformed_rows,
                clip_mismatches = outcome.stats.clip_mismatches,
                omitted = outcome.stats.tracks_omitted,
                "partial result"
            );
        }
        debug!(%region, stats = %outcome.stats, "finished overlap query");
        Ok(outcome)
    }

    /// Run independent queries in parallel. Results keep the input order.
    pub fn run_batch(&self, regions: &[QueryRegion]) -> Vec<Result<QueryOutcome>> {
        regions.par_iter().map(|region| self.run(region)).collect()
    }
}
