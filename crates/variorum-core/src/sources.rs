//! Read-only accessors for the external collaborators the heatmap core
//! consumes: alignments, witness text, annotations, and the render cache.
//!
//! The store crate implements these over SQLite; tests use in-memory fakes.
//! All traits are `Send + Sync` because render jobs run on worker threads.

use crate::errors::Result;
use crate::model::{Alignment, Note, PageBreak, Revision, SetId, Witness, WitnessId};

/// Comparison-set membership and cached collation metadata
pub trait SetSource: Send + Sync {
    /// Witnesses belonging to the set, in membership order. The first
    /// witness is the default base.
    fn witnesses(&self, set_id: SetId) -> Result<Vec<Witness>>;

    /// Tokenized length of a witness's text, cached at collation time.
    /// Zero means the set needs re-collation.
    fn tokenized_length(&self, set_id: SetId, witness_id: WitnessId) -> Result<u64>;
}

/// Paginated pairwise difference alignments for a (set, base, witness) pair
pub trait AlignmentSource: Send + Sync {
    /// Fetch one batch of alignments ordered by base position, starting at
    /// `offset` and at most `limit` long. A batch shorter than `limit`
    /// signals exhaustion.
    fn pair_alignments(
        &self,
        set_id: SetId,
        base_id: WitnessId,
        witness_id: WitnessId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Alignment>>;
}

/// Token boundary lookups for a witness's tokenized text
pub trait TokenIndex: Send + Sync {
    /// First valid token start at or after `offset`. When the index holds
    /// no boundary at or after `offset`, returns `offset` itself.
    fn next_token_start(&self, witness_id: WitnessId, offset: u64) -> Result<u64>;
}

/// Raw content access for a witness
pub trait ContentSource: Send + Sync {
    fn content(&self, witness_id: WitnessId) -> Result<String>;
}

/// Marginal notes for a witness, ordered by anchor position
pub trait NoteSource: Send + Sync {
    fn notes(&self, witness_id: WitnessId) -> Result<Vec<Note>>;

    fn has_notes(&self, witness_id: WitnessId) -> Result<bool> {
        Ok(!self.notes(witness_id)?.is_empty())
    }
}

/// Revision sites for a witness, ordered by range start
pub trait RevisionSource: Send + Sync {
    fn revisions(&self, witness_id: WitnessId) -> Result<Vec<Revision>>;

    fn has_revisions(&self, witness_id: WitnessId) -> Result<bool> {
        Ok(!self.revisions(witness_id)?.is_empty())
    }
}

/// Page breaks for a witness, ordered by position
pub trait PageBreakSource: Send + Sync {
    fn page_breaks(&self, witness_id: WitnessId) -> Result<Vec<PageBreak>>;

    fn has_page_breaks(&self, witness_id: WitnessId) -> Result<bool> {
        Ok(!self.page_breaks(witness_id)?.is_empty())
    }
}

/// Persisted, fully rendered heatmaps keyed by (set, visualization key,
/// condensed flag). An entry only becomes visible on full successful
/// completion of a render job.
pub trait HeatmapCache: Send + Sync {
    fn exists(&self, set_id: SetId, key: &str, condensed: bool) -> Result<bool>;

    fn read(&self, set_id: SetId, key: &str, condensed: bool) -> Result<Option<String>>;

    fn write(&self, set_id: SetId, key: &str, condensed: bool, content: &str) -> Result<()>;

    /// Drop every cached heatmap for the set (re-collation, explicit refresh)
    fn delete_all(&self, set_id: SetId) -> Result<()>;
}
