use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::alignment::DiffGroup;
use super::range::Range;
use super::WitnessId;

/// A merged, renderable record of one difference region in the base text.
///
/// Created the first time a base-relative range is seen during change-list
/// construction, then mutated as further witnesses and adjacent records are
/// folded in. The `index` is a stable tie-break ordering key assigned at
/// creation and never changes; the range is widened by merging and by
/// zero-length adjustment. Owned exclusively by the change-list builder
/// during construction, read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    index: u64,
    range: Range,
    group: DiffGroup,
    witnesses: BTreeSet<WitnessId>,
}

impl Change {
    pub fn new(index: u64, range: Range, group: DiffGroup) -> Self {
        Self {
            index,
            range,
            group,
            witnesses: BTreeSet::new(),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn range(&self) -> Range {
        self.range
    }

    pub fn group(&self) -> DiffGroup {
        self.group
    }

    /// Witness ids implicated in this difference, in ascending order
    pub fn witnesses(&self) -> &BTreeSet<WitnessId> {
        &self.witnesses
    }

    /// How many witnesses disagree with the base over this region
    pub fn difference_frequency(&self) -> usize {
        self.witnesses.len()
    }

    /// Record that a witness disagrees with the base here
    pub fn add_witness(&mut self, witness_id: WitnessId) {
        self.witnesses.insert(witness_id);
    }

    /// Replace the range. Used to widen zero-length insertion/deletion
    /// points so they are visible in the rendered output.
    pub fn adjust_range(&mut self, start: u64, end: u64) {
        self.range = Range::new(start, end);
    }

    /// Absorb an adjacent change: the range extends to cover both records
    /// and the witness sets are unioned. The absorbed change is dropped by
    /// the caller.
    pub fn merge(&mut self, other: &Change) {
        let start = self.range.start.min(other.range.start);
        let end = self.range.end.max(other.range.end);
        self.range = Range::new(start, end);
        self.witnesses.extend(other.witnesses.iter().copied());
    }

    pub fn has_matching_group(&self, other: &Change) -> bool {
        self.group == other.group
    }

    pub fn has_matching_witnesses(&self, other: &Change) -> bool {
        self.witnesses == other.witnesses
    }
}

impl PartialOrd for Change {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Change {
    fn cmp(&self, other: &Self) -> Ordering {
        self.range
            .cmp(&other.range)
            .then(self.index.cmp(&other.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_change_has_no_witnesses() {
        let change = Change::new(0, Range::new(10, 15), DiffGroup::Change);
        assert_eq!(change.difference_frequency(), 0);
        assert_eq!(change.range(), Range::new(10, 15));
    }

    #[test]
    fn test_add_witness_deduplicates() {
        let mut change = Change::new(0, Range::new(10, 15), DiffGroup::Change);
        change.add_witness(7);
        change.add_witness(7);
        change.add_witness(9);
        assert_eq!(change.difference_frequency(), 2);
    }

    #[test]
    fn test_merge_extends_range_and_unions_witnesses() {
        let mut prior = Change::new(0, Range::new(10, 15), DiffGroup::Change);
        prior.add_witness(7);
        let mut next = Change::new(1, Range::new(15, 20), DiffGroup::Change);
        next.add_witness(7);
        next.add_witness(8);

        prior.merge(&next);
        assert_eq!(prior.range(), Range::new(10, 20));
        assert_eq!(prior.difference_frequency(), 2);
        // index is stable across merges
        assert_eq!(prior.index(), 0);
    }

    #[test]
    fn test_ordering_by_range_then_index() {
        let a = Change::new(5, Range::new(0, 4), DiffGroup::Change);
        let b = Change::new(1, Range::new(0, 4), DiffGroup::Change);
        let c = Change::new(0, Range::new(2, 4), DiffGroup::Change);
        let mut list = vec![a.clone(), c.clone(), b.clone()];
        list.sort();
        assert_eq!(list, vec![b, a, c]);
    }
}
