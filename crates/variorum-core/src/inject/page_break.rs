use std::fmt::Write as _;

use super::{try_push_str, Injector};
use crate::errors::Result;
use crate::model::PageBreak;
use crate::render::escape_into;

/// Emits a page boundary marker at each break position. A point event:
/// all markup goes out in the start phase and there is nothing to close.
#[derive(Debug)]
pub struct BreakInjector {
    breaks: Vec<PageBreak>,
    cursor: usize,
}

impl BreakInjector {
    /// `breaks` must be ordered by position.
    pub fn new(breaks: Vec<PageBreak>) -> Self {
        Self { breaks, cursor: 0 }
    }
}

impl Injector for BreakInjector {
    fn has_content(&self, pos: u64) -> bool {
        matches!(self.breaks.get(self.cursor), Some(pb) if pb.position == pos)
    }

    fn inject_start(&mut self, line: &mut String, pos: u64) -> Result<()> {
        if let Some(pb) = self.breaks.get(self.cursor) {
            if pb.position == pos {
                let mut tag = String::new();
                write!(tag, "<div class=\"page-break\" id=\"pb-{}\"", pb.id).map_err(|e| {
                    crate::errors::VariorumError::Internal {
                        message: e.to_string(),
                    }
                })?;
                try_push_str(line, &tag)?;
                if let Some(label) = &pb.label {
                    try_push_str(line, " title=\"")?;
                    escape_into(line, label)?;
                    try_push_str(line, "\"")?;
                }
                try_push_str(line, "></div>")?;
                self.cursor += 1;
            }
        }
        Ok(())
    }

    fn inject_end(&mut self, _line: &mut String, _pos: u64) -> Result<()> {
        Ok(())
    }
}
