use std::fmt::Write as _;

use super::{try_push_str, Injector};
use crate::errors::Result;
use crate::model::Change;

/// Wraps every change region in a heat-colored span.
///
/// Intensity is the difference frequency scaled against the number of
/// non-base witnesses, so a region all witnesses disagree over renders at
/// full heat regardless of set size.
#[derive(Debug)]
pub struct ChangeInjector {
    changes: Vec<Change>,
    witness_count: usize,
    cursor: usize,
    open: bool,
}

impl ChangeInjector {
    /// `witness_count` is the total witness count of the set, base included.
    pub fn new(changes: Vec<Change>, witness_count: usize) -> Self {
        Self {
            changes,
            witness_count,
            cursor: 0,
            open: false,
        }
    }

    fn intensity(&self, change: &Change) -> u32 {
        let others = self.witness_count.saturating_sub(1).max(1);
        (change.difference_frequency() * 100 / others) as u32
    }
}

impl Injector for ChangeInjector {
    fn has_content(&self, pos: u64) -> bool {
        match self.changes.get(self.cursor) {
            Some(change) if !self.open => change.range().start == pos,
            Some(change) => change.range().end == pos,
            None => false,
        }
    }

    fn inject_start(&mut self, line: &mut String, pos: u64) -> Result<()> {
        if self.open {
            return Ok(());
        }
        if let Some(change) = self.changes.get(self.cursor) {
            if change.range().start == pos {
                let mut tag = String::new();
                write!(
                    tag,
                    "<span class=\"heatmap\" id=\"change-{}\" data-intensity=\"{}\">",
                    change.index(),
                    self.intensity(change)
                )
                .map_err(|e| crate::errors::VariorumError::Internal {
                    message: e.to_string(),
                })?;
                try_push_str(line, &tag)?;
                self.open = true;
            }
        }
        Ok(())
    }

    fn inject_end(&mut self, line: &mut String, pos: u64) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        if let Some(change) = self.changes.get(self.cursor) {
            if change.range().end == pos {
                try_push_str(line, "</span>")?;
                self.open = false;
                self.cursor += 1;
            }
        }
        Ok(())
    }
}
