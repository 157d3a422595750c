use std::fmt::Write as _;

use super::{try_push_str, Injector};
use crate::errors::Result;
use crate::model::{Revision, RevisionKind};

/// Wraps revision sites in the base text with add/delete spans. Declared
/// first in the pipeline so revision markup encloses everything else.
#[derive(Debug)]
pub struct RevisionInjector {
    revisions: Vec<Revision>,
    cursor: usize,
    open: bool,
}

impl RevisionInjector {
    /// `revisions` must be ordered by range start.
    pub fn new(revisions: Vec<Revision>) -> Self {
        Self {
            revisions,
            cursor: 0,
            open: false,
        }
    }
}

impl Injector for RevisionInjector {
    fn has_content(&self, pos: u64) -> bool {
        match self.revisions.get(self.cursor) {
            Some(rev) if !self.open => rev.range.start == pos,
            Some(rev) => rev.range.end == pos,
            None => false,
        }
    }

    fn inject_start(&mut self, line: &mut String, pos: u64) -> Result<()> {
        if self.open {
            return Ok(());
        }
        if let Some(rev) = self.revisions.get(self.cursor) {
            if rev.range.start == pos {
                let class = match rev.kind {
                    RevisionKind::Addition => "add",
                    RevisionKind::Deletion => "del",
                };
                let mut tag = String::new();
                write!(tag, "<span class=\"revision {}\" id=\"rev-{}\">", class, rev.id).map_err(
                    |e| crate::errors::VariorumError::Internal {
                        message: e.to_string(),
                    },
                )?;
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
        if let Some(rev) = self.revisions.get(self.cursor) {
            if rev.range.end == pos {
                try_push_str(line, "</span>")?;
                self.open = false;
                self.cursor += 1;
            }
        }
        Ok(())
    }
}
