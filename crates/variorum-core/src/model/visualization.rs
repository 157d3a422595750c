use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{SetId, WitnessId};

/// Derived identity for a cacheable rendering: comparison set, base witness,
/// and the set of witness ids excluded by the request filter.
///
/// The key is a SHA-256 digest over exactly these three inputs, so identical
/// requests collide in the cache and distinct filter sets never do. The
/// filter is held as an ordered set so insertion order cannot perturb the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationInfo {
    set_id: SetId,
    base_id: WitnessId,
    filter: BTreeSet<WitnessId>,
    key: String,
}

impl VisualizationInfo {
    pub fn new(set_id: SetId, base_id: WitnessId, filter: impl IntoIterator<Item = WitnessId>) -> Self {
        // the base witness can never be filtered out of its own visualization
        let filter: BTreeSet<WitnessId> =
            filter.into_iter().filter(|id| *id != base_id).collect();
        let key = derive_key(set_id, base_id, &filter);
        Self {
            set_id,
            base_id,
            filter,
            key,
        }
    }

    pub fn set_id(&self) -> SetId {
        self.set_id
    }

    pub fn base_id(&self) -> WitnessId {
        self.base_id
    }

    /// Witness ids excluded from this visualization
    pub fn filter(&self) -> &BTreeSet<WitnessId> {
        &self.filter
    }

    pub fn is_filtered(&self, witness_id: WitnessId) -> bool {
        self.filter.contains(&witness_id)
    }

    /// Stable cache key over (set, base, filter)
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn derive_key(set_id: SetId, base_id: WitnessId, filter: &BTreeSet<WitnessId>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(set_id.to_le_bytes());
    hasher.update(base_id.to_le_bytes());
    for id in filter {
        hasher.update(id.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}
