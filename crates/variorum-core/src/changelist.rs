//! Change-list construction: folds batched pairwise alignments into a
//! sorted, merged, gap-free sequence of [`Change`] records for one base
//! witness against all comparison witnesses.

use std::collections::HashMap;

use tracing::{debug, info, trace};

use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::model::{Change, Range, SetWitness, VisualizationInfo, WitnessId};
use crate::sources::{AlignmentSource, TokenIndex};

/// Build the consolidated change list for one base witness.
///
/// Witnesses are processed one at a time; after each witness's alignments
/// are folded in, the accumulated list is re-sorted and the merge pass is
/// re-run over the whole set so far. This ordering is essential: the merge
/// is not globally idempotent across witness order otherwise.
///
/// Range identity is the dedup key, first-seen wins. A record that was
/// absorbed by a neighbor stays reachable through a redirect table, so a
/// later witness hitting the same base range joins the surviving merged
/// record instead of resurrecting a duplicate.
///
/// The result is ordered by range start (then creation index), contains no
/// zero-length ranges, and no two adjacent records with identical
/// group/witness-set/frequency.
///
/// # Arguments
/// * `alignments` - paginated pairwise alignment source
/// * `tokens` - token boundary index for the base witness
/// * `info` - visualization identity (set, base, exclusion filter)
/// * `base_len` - tokenized length of the base witness (must be non-zero)
/// * `witnesses` - per-render accumulators; diff totals are folded in here
/// * `batch_size` - alignment fetch page size
/// * `cancel` - polled between batches
///
/// # Errors
/// * `Canceled` - cancellation was requested mid-build
/// * `Persistence` - the alignment source or token index failed
#[allow(clippy::too_many_arguments)]
pub fn build_change_list(
    alignments: &dyn AlignmentSource,
    tokens: &dyn TokenIndex,
    info: &VisualizationInfo,
    base_len: u64,
    witnesses: &mut [SetWitness],
    batch_size: usize,
    cancel: &CancelToken,
) -> Result<Vec<Change>> {
    let base_id = info.base_id();
    let mut next_index: u64 = 0;
    let mut changes: Vec<Change> = Vec::new();
    // first-seen base range -> creation index of the change it produced
    let mut owner_of_range: HashMap<Range, u64> = HashMap::new();
    // absorbed creation index -> absorber creation index
    let mut redirect: HashMap<u64, u64> = HashMap::new();

    let witness_ids: Vec<WitnessId> = witnesses
        .iter()
        .filter(|w| !w.is_base() && !info.is_filtered(w.id()))
        .map(|w| w.id())
        .collect();

    for witness_id in witness_ids {
        debug!(base = base_id, witness = witness_id, "generating heatmap data for pair");

        // creation index -> position in the current list. Positions are
        // stable within one witness's fold because changes are only pushed.
        let mut pos_of: HashMap<u64, usize> = changes
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.index(), pos))
            .collect();

        let mut offset = 0usize;
        loop {
            cancel.ensure_active()?;
            let batch =
                alignments.pair_alignments(info.set_id(), base_id, witness_id, offset, batch_size)?;
            let exhausted = batch.len() < batch_size;

            for align in &batch {
                // the heatmap is from the perspective of the base text, so
                // only annotations that refer to it matter
                let Some(base_anno) = align.witness_annotation(base_id) else {
                    trace!(alignment = align.id, "alignment missing base annotation; skipped");
                    continue;
                };

                let known = owner_of_range
                    .get(&base_anno.range)
                    .map(|&idx| resolve(&redirect, idx))
                    .and_then(|idx| pos_of.get(&idx).copied());
                let pos = match known {
                    Some(pos) => pos,
                    None => {
                        // unseen range, or its record was discarded during
                        // widening; either way a fresh record is created
                        let idx = next_index;
                        next_index += 1;
                        owner_of_range.insert(base_anno.range, idx);
                        pos_of.insert(idx, changes.len());
                        changes.push(Change::new(idx, base_anno.range, align.group));
                        changes.len() - 1
                    }
                };

                let Some(wit_anno) = align.counterpart(base_id) else {
                    trace!(alignment = align.id, "alignment missing counterpart annotation; skipped");
                    continue;
                };
                if info.is_filtered(wit_anno.witness_id) {
                    trace!(witness = wit_anno.witness_id, "skipping diff from filtered witness");
                    continue;
                }

                // accumulate total diff length for this witness; it feeds
                // the change index. Always add on the longest side.
                let longest = base_anno.range.length().max(wit_anno.range.length());
                if let Some(sw) = witnesses.iter_mut().find(|w| w.id() == wit_anno.witness_id) {
                    sw.add_diff_len(longest);
                }

                changes[pos].add_witness(wit_anno.witness_id);
            }

            if exhausted {
                break;
            }
            offset += batch_size;
        }

        // the merge walk below depends on range order
        changes.sort();
        changes = merge_pass(changes, &mut redirect, tokens, base_id, base_len)?;
    }

    info!(count = changes.len(), "changelist generated");
    Ok(changes)
}

fn resolve(redirect: &HashMap<u64, u64>, mut idx: u64) -> u64 {
    while let Some(&next) = redirect.get(&idx) {
        idx = next;
    }
    idx
}

/// Walk the sorted list, widening zero-length ranges so insertions and
/// deletions stay visible, and collapsing adjacent same-intensity changes
/// into one region. Builds a fresh output list instead of removing during
/// iteration.
fn merge_pass(
    changes: Vec<Change>,
    redirect: &mut HashMap<u64, u64>,
    tokens: &dyn TokenIndex,
    base_id: WitnessId,
    base_len: u64,
) -> Result<Vec<Change>> {
    let mut retained: Vec<Change> = Vec::with_capacity(changes.len());

    for mut change in changes {
        let mut drop_prior = false;
        if let Some(prior) = retained.last_mut() {
            // widen zero-length add/del points so they are visible
            if prior.range().length() == 0 {
                widen(prior, tokens, base_id)?;
                // a prior widened into the current change is discarded;
                // the current change takes its place as the walk anchor
                if change.range().start <= prior.range().start {
                    drop_prior = true;
                }
            }
        }
        if drop_prior {
            retained.pop();
            retained.push(change);
            continue;
        }

        // merge criteria: same alignment group, same witnesses, same
        // difference frequency
        let merged = match retained.last_mut() {
            Some(prior)
                if change.has_matching_group(prior)
                    && change.has_matching_witnesses(prior)
                    && change.difference_frequency() == prior.difference_frequency() =>
            {
                if change.range().length() == 0 {
                    widen(&mut change, tokens, base_id)?;
                }
                prior.merge(&change);
                redirect.insert(change.index(), prior.index());
                true
            }
            _ => false,
        };
        if !merged {
            retained.push(change);
        }
    }

    // the LAST change may still have zero length; make it visible. Past
    // end-of-text there is no next token, so step backward one unit
    // instead. Preserved exactly; changing it alters region boundaries.
    if let Some(last) = retained.last_mut() {
        if last.range().length() == 0 {
            let start = last.range().start;
            if start < base_len {
                let new_start = tokens.next_token_start(base_id, start)?;
                if new_start == start {
                    last.adjust_range(start, start + 1);
                } else {
                    last.adjust_range(new_start, new_start + 1);
                }
            } else if start > 0 {
                last.adjust_range(start - 1, start);
            }
        }
    }

    Ok(retained)
}

/// Widen a zero-length change by one unit: to `[0, 1)` when it starts at
/// offset 0, otherwise to one unit at the next token boundary.
fn widen(change: &mut Change, tokens: &dyn TokenIndex, base_id: WitnessId) -> Result<()> {
    let start = change.range().start;
    if start == 0 {
        change.adjust_range(0, 1);
    } else {
        let new_start = tokens.next_token_start(base_id, start)?;
        change.adjust_range(new_start, new_start + 1);
    }
    Ok(())
}
