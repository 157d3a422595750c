use serde::{Deserialize, Serialize};

use super::WitnessId;

/// One version of the text among those being compared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub id: WitnessId,
    pub name: String,
}

impl Witness {
    pub fn new(id: WitnessId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A witness decorated with per-render accumulators.
///
/// The total difference length against the base is folded in during
/// change-list construction and yields the change index used for display
/// ranking. Rebuilt for every render request; never shared across jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetWitness {
    pub witness: Witness,
    base_len: u64,
    total_diff_len: u64,
    is_base: bool,
}

impl SetWitness {
    pub fn new(witness: Witness, base_len: u64, is_base: bool) -> Self {
        Self {
            witness,
            base_len,
            total_diff_len: 0,
            is_base,
        }
    }

    pub fn id(&self) -> WitnessId {
        self.witness.id
    }

    pub fn is_base(&self) -> bool {
        self.is_base
    }

    /// Accumulate the longest side of one difference into the running total
    pub fn add_diff_len(&mut self, longest_diff: u64) {
        self.total_diff_len += longest_diff;
    }

    /// Normalized share of the base text this witness disagrees over.
    /// Display ranking only; not used in any merge decision.
    pub fn change_index(&self) -> f32 {
        if self.base_len == 0 {
            return 0.0;
        }
        self.total_diff_len as f32 / self.base_len as f32
    }
}
