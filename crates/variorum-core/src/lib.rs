//! Variorum Core - Textual collation heatmap kernel
//!
//! This crate provides the foundational data structures and algorithms for
//! Variorum, including:
//! - Comparison set, witness, and alignment models
//! - Change-list construction from pairwise alignment diffs
//! - Position-synchronized markup injectors (changes, notes, revisions,
//!   page breaks)
//! - A streaming HTML renderer for annotated base texts
//! - Cooperative cancellation tokens shared with background render tasks
//!
//! Persistence and task scheduling live in the companion crates; this one
//! is pure computation over the source traits in [`sources`].

pub mod cancel;
pub mod changelist;
pub mod errors;
pub mod inject;
pub mod logging_facility;
pub mod model;
pub mod render;
pub mod sources;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use changelist::build_change_list;
pub use errors::{Result, VariorumError};
pub use model::{
    Alignment, Change, DiffGroup, Note, PageBreak, Range, Revision, SetWitness,
    VisualizationInfo, Witness,
};
pub use render::render_stream;
