//! Structured logging facility for Variorum
//!
//! Single initialization point via `init(profile)`. Modules emit events
//! through the `tracing` macros directly; the facility only decides how
//! those events are formatted and filtered.

pub mod init;

pub use init::{init, Profile};
