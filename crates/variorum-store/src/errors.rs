//! Error handling for variorum-store
//!
//! Wraps variorum-core's error type with store-specific helpers

use variorum_core::VariorumError;

/// Result type alias using VariorumError
pub type Result<T> = std::result::Result<T, VariorumError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> VariorumError {
    VariorumError::Persistence {
        message: format!("Migration {} failed: {}", migration_id, reason),
    }
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> VariorumError {
    VariorumError::Persistence {
        message: err.to_string(),
    }
}

/// Create an error for a corrupt or unrecognized stored value
pub fn corrupt_value(column: &str, value: &str) -> VariorumError {
    VariorumError::Persistence {
        message: format!("Unrecognized value in column {}: {}", column, value),
    }
}
