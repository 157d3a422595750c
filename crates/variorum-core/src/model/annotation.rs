use serde::{Deserialize, Serialize};

use super::range::Range;
use super::WitnessId;

/// A marginal note attached to a witness.
///
/// Anchored notes wrap a span of the base text; notes with no anchor (or
/// whose anchor lies past the end of the text) are emitted as trailing
/// markers after the final rendered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub witness_id: WitnessId,
    pub anchor: Option<Range>,
    pub content: String,
}

impl Note {
    pub fn new(id: i64, witness_id: WitnessId, anchor: Option<Range>, content: impl Into<String>) -> Self {
        Self {
            id,
            witness_id,
            anchor,
            content: content.into(),
        }
    }
}

/// Kind of revision site recorded in the base text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionKind {
    Addition,
    Deletion,
}

impl RevisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevisionKind::Addition => "addition",
            RevisionKind::Deletion => "deletion",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "addition" => Some(RevisionKind::Addition),
            "deletion" => Some(RevisionKind::Deletion),
            _ => None,
        }
    }
}

/// An authorial revision mark over a span of a witness's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: i64,
    pub witness_id: WitnessId,
    pub kind: RevisionKind,
    pub range: Range,
}

impl Revision {
    pub fn new(id: i64, witness_id: WitnessId, kind: RevisionKind, range: Range) -> Self {
        Self {
            id,
            witness_id,
            kind,
            range,
        }
    }
}

/// A page boundary in the source document. A point event, not a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBreak {
    pub id: i64,
    pub witness_id: WitnessId,
    pub position: u64,
    pub label: Option<String>,
}

impl PageBreak {
    pub fn new(id: i64, witness_id: WitnessId, position: u64, label: Option<String>) -> Self {
        Self {
            id,
            witness_id,
            position,
            label,
        }
    }
}
