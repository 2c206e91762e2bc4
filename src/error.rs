//! Error taxonomy for overlap queries.

use std::io;
use thiserror::Error;

/// Errors that can occur while resolving an overlap query.
///
/// `MalformedRow` is the only row-local variant: the aggregator skips and
/// counts it. Everything else ends the query.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("Store unavailable after {rows_consumed} rows: {reason}")]
    StoreUnavailable { reason: String, rows_consumed: usize },

    #[error("Query cancelled after {rows_consumed} rows")]
    Cancelled { rows_consumed: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl EngineError {
    /// Shorthand for a store failure before any row was produced.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        EngineError::StoreUnavailable {
            reason: reason.into(),
            rows_consumed: 0,
        }
    }

    /// True for errors that affect a single row and must not abort the query.
    #[inline]
    pub fn is_row_local(&self) -> bool {
        matches!(self, EngineError::MalformedRow { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
