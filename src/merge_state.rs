//! Online interval union for a single track.
//!
//! Clipped intervals arrive in arbitrary order. The state keeps the disjoint
//! union of everything seen so far, so memory is bounded by the number of
//! merged intervals rather than the number of rows.
//!
//! # Algorithm
//!
//! Merged intervals live in an ordered map keyed by start. For each insert:
//! 1. Look up the last interval starting at or before the new start; if it
//!    reaches the new start it joins the run
//! 2. Every interval starting inside `[new.start, new.end]` joins the run
//!    (the closed upper bound fuses intervals that merely touch)
//! 3. The run is removed and replaced by its hull with the new interval
//! 4. `covered_length` is adjusted by the difference, never recomputed
//!
//! # Complexity
//!
//! O(log k) to locate plus O(log k) per absorbed interval, where k is the
//! current number of merged intervals. Each interval is absorbed at most once,
//! so N inserts cost O(N log k) overall.

use crate::interval::GenomicInterval;
use std::collections::BTreeMap;

/// Disjoint, non-touching merged intervals of one track plus their total length.
///
/// For consecutive merged intervals `a`, `b`: `a.end < b.start`.
#[derive(Debug, Clone, Default)]
pub struct TrackMergeState {
    /// start -> end
    merged: BTreeMap<u64, u64>,
    covered_length: u64,
}

impl TrackMergeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one clipped interval to the union.
    ///
    /// Returns the number of bases newly covered by this insert (0 when the
    /// interval was already fully covered).
    pub fn insert(&mut self, interval: GenomicInterval) -> u64 {
        let mut run = interval;

        if let Some(left) = self.last_starting_at_or_before(interval.start()) {
            if left.end() >= interval.end() {
                // Already covered
                return 0;
            }
            if left.touches(&interval) {
                run = run.hull(&left);
            }
        }

        let mut removed: u64 = 0;
        while let Some(next) = self.first_starting_in(run.start(), interval.end()) {
            self.merged.remove(&next.start());
            removed += next.len();
            run = run.hull(&next);
        }

        self.merged.insert(run.start(), run.end());
        let added = run.len() - removed;
        self.covered_length += added;
        added
    }

    fn last_starting_at_or_before(&self, pos: u64) -> Option<GenomicInterval> {
        let (&start, &end) = self.merged.range(..=pos).next_back()?;
        GenomicInterval::new(start, end)
    }

    /// First merged interval whose start lies in `[from, to]`.
    fn first_starting_in(&self, from: u64, to: u64) -> Option<GenomicInterval> {
        let (&start, &end) = self.merged.range(from..=to).next()?;
        GenomicInterval::new(start, end)
    }

    /// Total bases covered by the merged intervals.
    #[inline]
    pub fn covered_length(&self) -> u64 {
        self.covered_length
    }

    /// Number of merged intervals.
    #[inline]
    pub fn len(&self) -> usize {
        self.merged.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    /// Merged intervals in ascending start order.
    pub fn iter(&self) -> impl Iterator<Item = GenomicInterval> + '_ {
        self.merged
            .iter()
            .filter_map(|(&start, &end)| GenomicInterval::new(start, end))
    }

    /// Full scan of the disjointness and length invariants.
    pub fn is_disjoint(&self) -> bool {
        let mut prev_end: Option<u64> = None;
        let mut total: u64 = 0;
        for (&start, &end) in &self.merged {
            if start >= end {
                return false;
            }
            if let Some(prev) = prev_end {
                if prev >= start {
                    return false;
                }
            }
            total += end - start;
            prev_end = Some(end);
        }
        total == self.covered_length
    }

    /// Consume the state, returning the merged intervals in start order.
    pub fn into_intervals(self) -> Vec<GenomicInterval> {
        self.merged
            .into_iter()
            .filter_map(|(start, end)| GenomicInterval::new(start, end))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: u64, end: u64) -> GenomicInterval {
        GenomicInterval::new(start, end).unwrap()
    }

    fn merged(state: &TrackMergeState) -> Vec<(u64, u64)> {
        state.iter().map(|i| (i.start(), i.end())).collect()
    }

    fn rescanned_length(state: &TrackMergeState) -> u64 {
        state.iter().map(|i| i.len()).sum()
    }

    #[test]
    fn test_disjoint_inserts() {
        let mut state = TrackMergeState::new();
        assert_eq!(state.insert(iv(300, 400)), 100);
        assert_eq!(state.insert(iv(100, 200)), 100);

        assert_eq!(merged(&state), vec![(100, 200), (300, 400)]);
        assert_eq!(state.covered_length(), 200);
        assert!(state.is_disjoint());
    }

    #[test]
    fn test_overlapping_insert_extends() {
        let mut state = TrackMergeState::new();
        state.insert(iv(100, 200));
        assert_eq!(state.insert(iv(150, 250)), 50);

        assert_eq!(merged(&state), vec![(100, 250)]);
        assert_eq!(state.covered_length(), 150);
    }

    #[test]
    fn test_insert_extends_to_the_left() {
        let mut state = TrackMergeState::new();
        state.insert(iv(100, 200));
        assert_eq!(state.insert(iv(50, 150)), 50);

        assert_eq!(merged(&state), vec![(50, 200)]);
    }

    #[test]
    fn test_touching_intervals_fuse() {
        let mut state = TrackMergeState::new();
        state.insert(iv(100, 200));
        state.insert(iv(200, 300));
        assert_eq!(merged(&state), vec![(100, 300)]);

        state.insert(iv(50, 100));
        assert_eq!(merged(&state), vec![(50, 300)]);
        assert_eq!(state.covered_length(), 250);
    }

    #[test]
    fn test_bridge_two_runs() {
        let mut state = TrackMergeState::new();
        state.insert(iv(10, 20));
        state.insert(iv(25, 30));
        assert_eq!(state.len(), 2);

        assert_eq!(state.insert(iv(20, 25)), 5);
        assert_eq!(merged(&state), vec![(10, 30)]);
        assert_eq!(state.covered_length(), 20);
    }

    #[test]
    fn test_bridge_many_runs_in_one_step() {
        let mut state = TrackMergeState::new();
        for start in (0..100).step_by(10) {
            state.insert(iv(start, start + 5));
        }
        assert_eq!(state.len(), 10);
        assert_eq!(state.covered_length(), 50);

        // Spans the middle of the first through the start of the last
        assert_eq!(state.insert(iv(3, 90)), 45);
        assert_eq!(merged(&state), vec![(0, 95)]);
        assert_eq!(state.covered_length(), 95);
        assert!(state.is_disjoint());
    }

    #[test]
    fn test_contained_insert_is_noop() {
        let mut state = TrackMergeState::new();
        state.insert(iv(100, 500));
        state.insert(iv(600, 700));
        let before = merged(&state);

        assert_eq!(state.insert(iv(200, 300)), 0);
        assert_eq!(state.insert(iv(100, 500)), 0);
        assert_eq!(state.insert(iv(600, 601)), 0);
        assert_eq!(merged(&state), before);
        assert_eq!(state.covered_length(), 500);
    }

    #[test]
    fn test_duplicate_start_longer_end() {
        let mut state = TrackMergeState::new();
        state.insert(iv(100, 200));
        assert_eq!(state.insert(iv(100, 250)), 50);
        assert_eq!(merged(&state), vec![(100, 250)]);
    }

    #[test]
    fn test_length_conserved_after_every_insert() {
        let inputs = [
            (50, 60),
            (10, 20),
            (55, 80),
            (19, 21),
            (0, 5),
            (5, 10),
            (30, 40),
            (21, 30),
            (79, 200),
            (150, 160),
        ];
        let mut state = TrackMergeState::new();
        for (start, end) in inputs {
            state.insert(iv(start, end));
            assert_eq!(state.covered_length(), rescanned_length(&state));
            assert!(state.is_disjoint());
        }
        assert_eq!(merged(&state), vec![(0, 40), (50, 200)]);
    }

    #[test]
    fn test_into_intervals() {
        let mut state = TrackMergeState::new();
        state.insert(iv(1900, 2000));
        state.insert(iv(1000, 1500));
        state.insert(iv(1400, 1800));

        assert_eq!(state.covered_length(), 900);
        assert_eq!(
            state.into_intervals(),
            vec![iv(1000, 1800), iv(1900, 2000)]
        );
    }
}
