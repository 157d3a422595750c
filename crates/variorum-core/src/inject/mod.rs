//! Position-synchronized markup injection.
//!
//! Each injector owns a private, pre-loaded, ascending sequence of
//! (position, payload) events for exactly one base witness and an internal
//! cursor advanced only forward. Injectors are constructed fresh per render
//! pass and discarded after.
//!
//! Nesting discipline: the renderer emits start markup outermost to
//! innermost in the declared pipeline order (revision, page break, note,
//! change) and end markup in the exact reverse. Violating that order
//! corrupts the output structurally, not just cosmetically.

pub mod change;
pub mod note;
pub mod page_break;
pub mod revision;

pub use change::ChangeInjector;
pub use note::NoteInjector;
pub use page_break::BreakInjector;
pub use revision::RevisionInjector;

use crate::errors::Result;

/// A stateful annotator that adds markup at specific text positions during
/// a streaming render.
///
/// `has_content` may be called repeatedly at the same position; the
/// renderer loops until every injector reports false, so several co-located
/// events all fire.
pub trait Injector {
    /// Does this injector have markup to emit at `pos`?
    fn has_content(&self, pos: u64) -> bool;

    /// Emit any start markup due at `pos` into the line buffer
    fn inject_start(&mut self, line: &mut String, pos: u64) -> Result<()>;

    /// Emit any end markup due at `pos` into the line buffer
    fn inject_end(&mut self, line: &mut String, pos: u64) -> Result<()>;

    /// Emit data not anchored to any position, after the final line.
    /// Returns true when something was written.
    fn append_trailing(&mut self, _line: &mut String) -> Result<bool> {
        Ok(false)
    }
}

/// Build the injector pipeline in its fixed nesting order.
pub fn pipeline(
    revisions: RevisionInjector,
    breaks: BreakInjector,
    notes: NoteInjector,
    changes: ChangeInjector,
) -> Vec<Box<dyn Injector>> {
    vec![
        Box::new(revisions),
        Box::new(breaks),
        Box::new(notes),
        Box::new(changes),
    ]
}

/// Grow-checked append used by every injector, so a huge render degrades
/// into a descriptive error instead of aborting the process.
pub(crate) fn try_push_str(buf: &mut String, s: &str) -> Result<()> {
    buf.try_reserve(s.len())?;
    buf.push_str(s);
    Ok(())
}
