use serde::{Deserialize, Serialize};

use super::range::Range;
use super::WitnessId;

/// Kind of difference detected between two witness spans.
///
/// Two changes are only merge candidates when their groups match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffGroup {
    /// Text present in the other witness but absent from this one
    Insertion,
    /// Text present in this witness but absent from the other
    Deletion,
    /// Text differs on both sides
    Change,
}

impl DiffGroup {
    /// Stable lowercase tag, used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffGroup::Insertion => "insertion",
            DiffGroup::Deletion => "deletion",
            DiffGroup::Change => "change",
        }
    }

    /// Parse a persisted tag back into a group
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "insertion" => Some(DiffGroup::Insertion),
            "deletion" => Some(DiffGroup::Deletion),
            "change" => Some(DiffGroup::Change),
            _ => None,
        }
    }
}

/// One side of a pairwise alignment: a witness and the span of its text
/// implicated in the difference. Produced by the alignment source; immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedAnnotation {
    pub witness_id: WitnessId,
    pub range: Range,
}

impl AlignedAnnotation {
    pub fn new(witness_id: WitnessId, range: Range) -> Self {
        Self { witness_id, range }
    }
}

/// A matched pair of annotations across exactly two witnesses for one
/// detected difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub id: i64,
    pub group: DiffGroup,
    pub annotations: Vec<AlignedAnnotation>,
}

impl Alignment {
    pub fn new(id: i64, group: DiffGroup, annotations: Vec<AlignedAnnotation>) -> Self {
        Self {
            id,
            group,
            annotations,
        }
    }

    /// The annotation belonging to the given witness, if present.
    ///
    /// Damaged comparison data can leave a side missing; callers skip the
    /// alignment rather than abort the pass.
    pub fn witness_annotation(&self, witness_id: WitnessId) -> Option<&AlignedAnnotation> {
        self.annotations
            .iter()
            .find(|a| a.witness_id == witness_id)
    }

    /// The annotation NOT belonging to the given witness, if present
    pub fn counterpart(&self, witness_id: WitnessId) -> Option<&AlignedAnnotation> {
        self.annotations
            .iter()
            .find(|a| a.witness_id != witness_id)
    }
}
