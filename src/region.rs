//! Query regions, metadata filters, and chromosome-name normalization.

use crate::error::{EngineError, Result};
use crate::interval::GenomicInterval;
use std::borrow::Cow;
use std::fmt;

/// Normalize a chromosome name for comparison.
///
/// Lowercases and strips a leading `chr`, so `chr1`, `Chr1` and `1` compare
/// equal. Allocation-free when the name is already normalized.
pub fn normalize_chrom(name: &str) -> Cow<'_, str> {
    let stripped = match name.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &name[3..],
        _ => name,
    };
    if stripped.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(stripped.to_ascii_lowercase())
    } else {
        Cow::Borrowed(stripped)
    }
}

/// Optional tissue/source predicates applied to candidate rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub tissue: Option<String>,
    pub source: Option<String>,
}

impl TrackFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tissue(mut self, tissue: impl Into<String>) -> Self {
        self.tissue = Some(tissue.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// True if no predicate is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tissue.is_none() && self.source.is_none()
    }

    /// Check a row's metadata against the filter.
    ///
    /// Comparison is ASCII case-insensitive. A row without a value for a
    /// filtered field never matches.
    pub fn matches(&self, tissue: Option<&str>, source: Option<&str>) -> bool {
        fn field_matches(want: &Option<String>, have: Option<&str>) -> bool {
            match want {
                None => true,
                Some(w) => have.is_some_and(|h| h.eq_ignore_ascii_case(w)),
            }
        }
        field_matches(&self.tissue, tissue) && field_matches(&self.source, source)
    }
}

/// A validated single-chromosome query window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRegion {
    chrom: String,
    interval: GenomicInterval,
    filter: TrackFilter,
}

impl QueryRegion {
    /// Validate and build a region.
    ///
    /// Fails with `InvalidRegion` on an empty chromosome, a negative
    /// coordinate, or `start >= end`.
    pub fn new(chrom: impl Into<String>, start: i64, end: i64) -> Result<Self> {
        let chrom = chrom.into();
        if chrom.trim().is_empty() {
            return Err(EngineError::InvalidRegion(
                "chromosome must not be empty".to_string(),
            ));
        }
        if start < 0 || end < 0 {
            return Err(EngineError::InvalidRegion(format!(
                "coordinates must be non-negative, got {}:{}-{}",
                chrom, start, end
            )));
        }
        let interval = GenomicInterval::new(start as u64, end as u64).ok_or_else(|| {
            EngineError::InvalidRegion(format!(
                "start ({}) must be less than end ({})",
                start, end
            ))
        })?;
        Ok(Self {
            chrom,
            interval,
            filter: TrackFilter::default(),
        })
    }

    /// Attach tissue/source predicates.
    pub fn with_filter(mut self, filter: TrackFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Copy of this region with no tissue/source predicates.
    pub fn without_filter(&self) -> Self {
        Self {
            chrom: self.chrom.clone(),
            interval: self.interval,
            filter: TrackFilter::default(),
        }
    }

    #[inline]
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    #[inline]
    pub fn interval(&self) -> GenomicInterval {
        self.interval
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.interval.start()
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.interval.end()
    }

    #[inline]
    pub fn filter(&self) -> &TrackFilter {
        &self.filter
    }

    /// Check whether a chromosome name refers to this region's chromosome.
    pub fn same_chrom(&self, other: &str, normalize: bool) -> bool {
        if normalize {
            normalize_chrom(&self.chrom) == normalize_chrom(other)
        } else {
            self.chrom == other
        }
    }
}

impl fmt::Display for QueryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chrom, self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chrom() {
        assert_eq!(normalize_chrom("chr1"), "1");
        assert_eq!(normalize_chrom("Chr1"), "1");
        assert_eq!(normalize_chrom("1"), "1");
        assert_eq!(normalize_chrom("chrX"), "x");
        assert_eq!(normalize_chrom("ch"), "ch");
        assert!(matches!(normalize_chrom("chr7"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_region_validation() {
        assert!(QueryRegion::new("chr1", 1000, 2000).is_ok());
        assert!(matches!(
            QueryRegion::new("", 1000, 2000),
            Err(EngineError::InvalidRegion(_))
        ));
        assert!(matches!(
            QueryRegion::new("chr1", -5, 2000),
            Err(EngineError::InvalidRegion(_))
        ));
        assert!(matches!(
            QueryRegion::new("chr1", 2000, 2000),
            Err(EngineError::InvalidRegion(_))
        ));
        assert!(matches!(
            QueryRegion::new("chr1", 2000, 1000),
            Err(EngineError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_same_chrom() {
        let region = QueryRegion::new("chr1", 0, 10).unwrap();
        assert!(region.same_chrom("1", true));
        assert!(region.same_chrom("CHR1", true));
        assert!(!region.same_chrom("1", false));
        assert!(!region.same_chrom("chr10", true));
    }

    #[test]
    fn test_filter_matching() {
        let filter = TrackFilter::new().with_tissue("Brain");
        assert!(filter.matches(Some("brain"), None));
        assert!(!filter.matches(Some("liver"), Some("ENCODE")));
        assert!(!filter.matches(None, Some("ENCODE")));

        let both = TrackFilter::new().with_tissue("brain").with_source("encode");
        assert!(both.matches(Some("Brain"), Some("ENCODE")));
        assert!(!both.matches(Some("Brain"), Some("Roadmap")));

        assert!(TrackFilter::new().matches(None, None));
    }
}
