//! Variorum Store - SQLite persistence for comparison sets
//!
//! Provides:
//! - SQLite schema with migrations framework
//! - [`SqliteStore`], the concrete implementation of every source trait
//!   the heatmap core consumes
//! - The persisted heatmap cache

pub mod db;
pub mod errors;
pub mod migrations;
pub mod store;

// Re-export key types
pub use errors::Result;
pub use store::SqliteStore;
