//! Change-List Builder Property Tests
//!
//! Randomized coverage of the invariants the builder promises for every
//! input regime:
//!
//! 1. Output ordered by range start, ranges disjoint
//! 2. No zero-length range survives
//! 3. No adjacent pair left with identical group and witness set
//! 4. The base witness never appears in a change's witness set

use proptest::prelude::*;

use variorum_core::errors::Result;
use variorum_core::model::{
    AlignedAnnotation, Alignment, DiffGroup, Range, SetWitness, VisualizationInfo, Witness,
    WitnessId,
};
use variorum_core::sources::{AlignmentSource, TokenIndex};
use variorum_core::{build_change_list, CancelToken};

const BASE_ID: WitnessId = 1;
const BASE_LEN: u64 = 1000;

/// Token starts fall on even offsets
struct EvenTokens;

impl TokenIndex for EvenTokens {
    fn next_token_start(&self, _witness_id: WitnessId, offset: u64) -> Result<u64> {
        if offset % 2 == 0 {
            Ok(offset)
        } else {
            Ok(offset + 1)
        }
    }
}

struct VecAlignments {
    alignments: Vec<Alignment>,
}

impl AlignmentSource for VecAlignments {
    fn pair_alignments(
        &self,
        _set_id: i64,
        base_id: WitnessId,
        witness_id: WitnessId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Alignment>> {
        Ok(self
            .alignments
            .iter()
            .filter(|a| {
                a.witness_annotation(base_id).is_some()
                    && a.witness_annotation(witness_id).is_some()
            })
            .cloned()
            .skip(offset)
            .take(limit)
            .collect())
    }
}

fn groups() -> [DiffGroup; 3] {
    [DiffGroup::Insertion, DiffGroup::Deletion, DiffGroup::Change]
}

/// Random alignment runs: strictly advancing base positions, a mix of
/// zero-length and spanning ranges, witnesses 2 and 3 against base 1
fn alignment_runs() -> impl Strategy<Value = Vec<Alignment>> {
    proptest::collection::vec(
        (2u64..6, 0u64..5, 0usize..3, prop_oneof![Just(2i64), Just(3i64)]),
        0..12,
    )
    .prop_map(|steps| {
        let mut pos = 2u64;
        let mut out = Vec::new();
        for (i, (gap, len, group_ix, witness)) in steps.into_iter().enumerate() {
            pos += gap;
            out.push(Alignment::new(
                i as i64 + 1,
                groups()[group_ix],
                vec![
                    AlignedAnnotation::new(BASE_ID, Range::new(pos, pos + len)),
                    AlignedAnnotation::new(witness, Range::new(pos, pos + len.max(1))),
                ],
            ));
            pos += len;
        }
        out
    })
}

fn set_witnesses() -> Vec<SetWitness> {
    [1i64, 2, 3]
        .iter()
        .map(|id| SetWitness::new(Witness::new(*id, format!("w{id}")), BASE_LEN, *id == BASE_ID))
        .collect()
}

proptest! {
    #[test]
    fn prop_output_is_sorted_and_disjoint(alignments in alignment_runs()) {
        let source = VecAlignments { alignments };
        let info = VisualizationInfo::new(1, BASE_ID, Vec::new());
        let mut wits = set_witnesses();
        let changes = build_change_list(
            &source, &EvenTokens, &info, BASE_LEN, &mut wits, 5, &CancelToken::new(),
        ).unwrap();

        for pair in changes.windows(2) {
            prop_assert!(pair[0].range().start <= pair[1].range().start);
            prop_assert!(
                pair[0].range().end <= pair[1].range().start,
                "overlapping ranges {} and {}", pair[0].range(), pair[1].range()
            );
        }
    }

    #[test]
    fn prop_no_zero_length_range_survives(alignments in alignment_runs()) {
        let source = VecAlignments { alignments };
        let info = VisualizationInfo::new(1, BASE_ID, Vec::new());
        let mut wits = set_witnesses();
        let changes = build_change_list(
            &source, &EvenTokens, &info, BASE_LEN, &mut wits, 5, &CancelToken::new(),
        ).unwrap();

        for change in &changes {
            prop_assert!(change.range().length() > 0, "zero-length {}", change.range());
        }
    }

    #[test]
    fn prop_adjacent_records_are_not_mergeable(alignments in alignment_runs()) {
        let source = VecAlignments { alignments };
        let info = VisualizationInfo::new(1, BASE_ID, Vec::new());
        let mut wits = set_witnesses();
        let changes = build_change_list(
            &source, &EvenTokens, &info, BASE_LEN, &mut wits, 5, &CancelToken::new(),
        ).unwrap();

        for pair in changes.windows(2) {
            let same_group = pair[0].has_matching_group(&pair[1]);
            let same_witnesses = pair[0].has_matching_witnesses(&pair[1]);
            prop_assert!(
                !(same_group && same_witnesses),
                "adjacent mergeable records {} and {}", pair[0].range(), pair[1].range()
            );
        }
    }

    #[test]
    fn prop_base_witness_never_implicated(alignments in alignment_runs()) {
        let source = VecAlignments { alignments };
        let info = VisualizationInfo::new(1, BASE_ID, Vec::new());
        let mut wits = set_witnesses();
        let changes = build_change_list(
            &source, &EvenTokens, &info, BASE_LEN, &mut wits, 5, &CancelToken::new(),
        ).unwrap();

        for change in &changes {
            prop_assert!(!change.witnesses().contains(&BASE_ID));
            prop_assert!(change.difference_frequency() <= 2);
        }
    }

    #[test]
    fn prop_batch_size_does_not_change_result(alignments in alignment_runs()) {
        let info = VisualizationInfo::new(1, BASE_ID, Vec::new());

        let small = {
            let source = VecAlignments { alignments: alignments.clone() };
            let mut wits = set_witnesses();
            build_change_list(
                &source, &EvenTokens, &info, BASE_LEN, &mut wits, 2, &CancelToken::new(),
            ).unwrap()
        };
        let large = {
            let source = VecAlignments { alignments };
            let mut wits = set_witnesses();
            build_change_list(
                &source, &EvenTokens, &info, BASE_LEN, &mut wits, 100, &CancelToken::new(),
            ).unwrap()
        };

        let key = |cs: &[variorum_core::Change]| -> Vec<(Range, Vec<WitnessId>)> {
            cs.iter()
                .map(|c| (c.range(), c.witnesses().iter().copied().collect()))
                .collect()
        };
        prop_assert_eq!(key(&small), key(&large));
    }
}
