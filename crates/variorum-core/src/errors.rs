use thiserror::Error;

use crate::model::{SetId, WitnessId};

/// Result type alias using VariorumError
pub type Result<T> = std::result::Result<T, VariorumError>;

/// Comprehensive error taxonomy for heatmap operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariorumError {
    // ===== Request Validation =====
    /// Comparison set has fewer than two members; nothing to compare
    #[error("Comparison set {set_id} contains fewer than two witnesses. Unable to view heatmap.")]
    TooFewWitnesses { set_id: SetId },

    /// Comparison set not found in the backing store
    #[error("Comparison set not found: {set_id}")]
    SetNotFound { set_id: SetId },

    /// Witness not found in the set (or store)
    #[error("Witness not found: {witness_id}")]
    WitnessNotFound { witness_id: WitnessId },

    // ===== Data Integrity =====
    /// Cached tokenized length of the base witness is missing or zero.
    /// Rendering must not proceed; the set needs to be re-collated.
    #[error("Missing tokenized length of base witness {witness_id}. Please re-collate.")]
    MissingBaseLength { witness_id: WitnessId },

    /// A range with start > end was supplied by a source
    #[error("Invalid range [{start}, {end}) for witness {witness_id}")]
    InvalidRange {
        witness_id: WitnessId,
        start: u64,
        end: u64,
    },

    // ===== Render Lifecycle =====
    /// Render was canceled before completion. Terminal but not a failure;
    /// leaves no cache entry.
    #[error("Render canceled")]
    Canceled,

    /// Output buffers could not grow. Converted to a user-visible degraded
    /// response rather than aborting the process.
    #[error(
        "The server has insufficient resources to generate this visualization. \
         Try again later. If this fails, try breaking large witnesses up into smaller segments."
    )]
    ResourceExhausted,

    // ===== Integration =====
    /// Backing store error (SQLite or other persistence)
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for VariorumError {
    fn from(err: serde_json::Error) -> Self {
        VariorumError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::collections::TryReserveError> for VariorumError {
    fn from(_: std::collections::TryReserveError) -> Self {
        VariorumError::ResourceExhausted
    }
}
