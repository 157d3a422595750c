//! Domain models for witness comparison and heatmap rendering

pub mod alignment;
pub mod annotation;
pub mod change;
pub mod range;
pub mod visualization;
pub mod witness;

pub use alignment::{AlignedAnnotation, Alignment, DiffGroup};
pub use annotation::{Note, PageBreak, Revision, RevisionKind};
pub use change::Change;
pub use range::Range;
pub use visualization::VisualizationInfo;
pub use witness::{SetWitness, Witness};

/// Row id of a comparison set
pub type SetId = i64;

/// Row id of a witness
pub type WitnessId = i64;
