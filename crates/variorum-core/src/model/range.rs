use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)` over character offsets in a witness's
/// tokenized text.
///
/// Zero-length ranges are legal transiently (they mark insertion/deletion
/// points) but are widened before any change list is handed to a renderer.
/// Ordering is by start offset, then end offset, which is the order the
/// change-list merge walk relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: u64,
    pub end: u64,
}

impl Range {
    /// Create a new range. Invariant: `start <= end`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end, "range start must not exceed end");
        Self { start, end }
    }

    /// Number of characters covered by this range
    pub fn length(&self) -> u64 {
        self.end - self.start
    }

    /// True when the range covers no characters
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when `other` lies entirely within this range
    pub fn contains(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
