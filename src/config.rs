//! Runtime configuration for the overlap engine.
//!
//! One `EngineConfig` is shared read-only by every query an engine runs.

/// Default `--max-tracks` of the command line front end.
pub const DEFAULT_MAX_TRACKS: usize = 20;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Keep only the top-N tracks by covered length.
    pub max_tracks: Option<usize>,
    /// Let the store apply tissue/source filters when it can.
    ///
    /// When off, or when the store cannot push filters down, the aggregator
    /// applies them per row. Both paths yield the same report.
    pub pushdown_filters: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            max_tracks: None,
            pushdown_filters: true,
        }
    }

    /// Cap the number of reported tracks.
    pub fn with_max_tracks(mut self, max_tracks: Option<usize>) -> Self {
        self.max_tracks = max_tracks;
        self
    }

    /// Allow or forbid filter push-down.
    pub fn with_pushdown_filters(mut self, pushdown: bool) -> Self {
        self.pushdown_filters = pushdown;
        self
    }
}
