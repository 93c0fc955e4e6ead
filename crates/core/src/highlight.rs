use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HighlightError {
    #[error("highlight range must satisfy start < end, got [{start}, {end})")]
    EmptyRange { start: u32, end: u32 },
}

//
// ─── RANGE ─────────────────────────────────────────────────────────────────────
//

/// A half-open span `[start, end)` of text offsets the learner has marked.
///
/// Zero-width ranges are not representable; `new` rejects `start >= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HighlightRange {
    start: u32,
    end: u32,
}

impl HighlightRange {
    /// Creates a range covering `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns `HighlightError::EmptyRange` when `start >= end`.
    pub fn new(start: u32, end: u32) -> Result<Self, HighlightError> {
        if start >= end {
            return Err(HighlightError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> u32 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> u32 {
        self.end
    }
}

//
// ─── MERGE ─────────────────────────────────────────────────────────────────────
//

/// Merges arbitrary ranges into a minimal sorted, non-overlapping set.
///
/// Sorts by `(start, end)` ascending, then sweeps left to right coalescing
/// any range whose start falls at or before the accumulator's end. Touching
/// ranges merge too, so adjacent outputs always satisfy
/// `out[i].end < out[i + 1].start`. Idempotent: merging merged output is a
/// no-op.
#[must_use]
pub fn merge_ranges(mut ranges: Vec<HighlightRange>) -> Vec<HighlightRange> {
    ranges.sort_unstable();

    let mut merged: Vec<HighlightRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

//
// ─── HIGHLIGHT MAP ─────────────────────────────────────────────────────────────
//

/// Per-question highlight storage.
///
/// Invariant: every stored sequence is merged (sorted, non-overlapping,
/// non-touching) and non-empty; a question with no highlights is absent from
/// the map rather than stored as an empty sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightMap {
    entries: BTreeMap<QuestionId, Vec<HighlightRange>>,
}

impl HighlightMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored ranges for a question, empty when absent.
    #[must_use]
    pub fn get(&self, question_id: &QuestionId) -> &[HighlightRange] {
        self.entries.get(question_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.entries.contains_key(question_id)
    }

    /// Replaces a question's ranges verbatim; the caller is responsible for
    /// having merged. An empty replacement deletes the key.
    pub fn set(&mut self, question_id: &QuestionId, ranges: Vec<HighlightRange>) {
        if question_id.is_empty() {
            return;
        }
        if ranges.is_empty() {
            self.entries.remove(question_id);
        } else {
            self.entries.insert(question_id.clone(), ranges);
        }
    }

    /// Appends a range and re-merges the question's sequence.
    pub fn add(&mut self, question_id: &QuestionId, range: HighlightRange) {
        if question_id.is_empty() {
            return;
        }
        let mut ranges = self.entries.remove(question_id).unwrap_or_default();
        ranges.push(range);
        self.entries.insert(question_id.clone(), merge_ranges(ranges));
    }

    /// Deletes ranges matching `range` exactly on both start and end.
    ///
    /// Overlap is not enough; a near-miss leaves the sequence unchanged. The
    /// key is dropped when the sequence empties.
    pub fn remove(&mut self, question_id: &QuestionId, range: HighlightRange) {
        if question_id.is_empty() {
            return;
        }
        let Some(ranges) = self.entries.get_mut(question_id) else {
            return;
        };
        ranges.retain(|r| *r != range);
        if ranges.is_empty() {
            self.entries.remove(question_id);
        }
    }

    /// Empties one question's highlights.
    pub fn clear(&mut self, question_id: &QuestionId) {
        self.entries.remove(question_id);
    }

    /// Empties every question's highlights.
    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Re-merges every sequence and drops empty entries.
    ///
    /// The session store calls this after each mutation pass so restored or
    /// replaced state always satisfies the map invariant.
    pub fn normalize(&mut self) {
        for ranges in self.entries.values_mut() {
            *ranges = merge_ranges(std::mem::take(ranges));
        }
        self.entries.retain(|_, ranges| !ranges.is_empty());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates questions in id order with their merged ranges.
    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &[HighlightRange])> {
        self.entries.iter().map(|(id, ranges)| (id, ranges.as_slice()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> HighlightRange {
        HighlightRange::new(start, end).unwrap()
    }

    #[test]
    fn range_rejects_zero_width() {
        let err = HighlightRange::new(4, 4).unwrap_err();
        assert_eq!(err, HighlightError::EmptyRange { start: 4, end: 4 });
        assert!(HighlightRange::new(5, 4).is_err());
    }

    #[test]
    fn merge_overlapping_and_disjoint() {
        let merged = merge_ranges(vec![range(1, 3), range(2, 5), range(7, 9)]);
        assert_eq!(merged, vec![range(1, 5), range(7, 9)]);
    }

    #[test]
    fn merge_sorts_unsorted_input() {
        let merged = merge_ranges(vec![range(4, 6), range(1, 2)]);
        assert_eq!(merged, vec![range(1, 2), range(4, 6)]);
    }

    #[test]
    fn merge_empty_is_empty() {
        assert_eq!(merge_ranges(Vec::new()), Vec::new());
    }

    #[test]
    fn merge_single_is_unchanged() {
        assert_eq!(merge_ranges(vec![range(3, 8)]), vec![range(3, 8)]);
    }

    #[test]
    fn merge_coalesces_touching_ranges() {
        let merged = merge_ranges(vec![range(1, 3), range(3, 5)]);
        assert_eq!(merged, vec![range(1, 5)]);
    }

    #[test]
    fn merge_contained_range_disappears() {
        let merged = merge_ranges(vec![range(1, 10), range(3, 4)]);
        assert_eq!(merged, vec![range(1, 10)]);
    }

    #[test]
    fn merge_is_idempotent() {
        let once = merge_ranges(vec![range(5, 9), range(1, 3), range(2, 6), range(20, 22)]);
        let twice = merge_ranges(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn merged_output_is_sorted_and_non_touching() {
        let merged = merge_ranges(vec![
            range(10, 12),
            range(1, 4),
            range(3, 6),
            range(6, 8),
            range(15, 16),
        ]);
        for pair in merged.windows(2) {
            assert!(pair[0].end() < pair[1].start());
        }
    }

    #[test]
    fn map_add_merges_and_remove_empties_key() {
        let mut map = HighlightMap::new();
        let q = QuestionId::new("q-1");

        map.add(&q, range(2, 4));
        map.add(&q, range(3, 6));
        assert_eq!(map.get(&q), &[range(2, 6)]);

        map.remove(&q, range(2, 6));
        assert!(map.get(&q).is_empty());
        assert!(!map.contains(&q));
    }

    #[test]
    fn map_remove_requires_exact_match() {
        let mut map = HighlightMap::new();
        let q = QuestionId::new("q-1");
        map.add(&q, range(2, 6));

        map.remove(&q, range(2, 5));
        assert_eq!(map.get(&q), &[range(2, 6)]);
    }

    #[test]
    fn map_set_empty_deletes_key() {
        let mut map = HighlightMap::new();
        let q = QuestionId::new("q-1");
        map.add(&q, range(1, 2));

        map.set(&q, Vec::new());
        assert!(!map.contains(&q));
    }

    #[test]
    fn map_mutators_ignore_empty_question_id() {
        let mut map = HighlightMap::new();
        let empty = QuestionId::new("");

        map.add(&empty, range(1, 2));
        map.set(&empty, vec![range(1, 2)]);
        assert!(map.is_empty());
        assert!(map.get(&empty).is_empty());
    }

    #[test]
    fn map_clear_one_and_all() {
        let mut map = HighlightMap::new();
        let q1 = QuestionId::new("q-1");
        let q2 = QuestionId::new("q-2");
        map.add(&q1, range(1, 2));
        map.add(&q2, range(3, 4));

        map.clear(&q1);
        assert!(!map.contains(&q1));
        assert!(map.contains(&q2));

        map.clear_all();
        assert!(map.is_empty());
    }

    #[test]
    fn normalize_merges_raw_sequences() {
        let mut map = HighlightMap::new();
        let q = QuestionId::new("q-1");
        // set() takes the caller's word; normalize() restores the invariant.
        map.set(&q, vec![range(4, 6), range(1, 3), range(2, 5)]);

        map.normalize();
        assert_eq!(map.get(&q), &[range(1, 6)]);
    }
}
