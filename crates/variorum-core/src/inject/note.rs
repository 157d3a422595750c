use std::fmt::Write as _;

use super::{try_push_str, Injector};
use crate::errors::Result;
use crate::model::Note;

/// Wraps each anchored note's span with an anchor marker. Notes without an
/// anchor, or whose anchor was never reached before end of text, are
/// emitted as trailing markers after the final line. Note bodies are not
/// streamed; callers assembling margin boxes read them via [`Self::notes`].
#[derive(Debug)]
pub struct NoteInjector {
    notes: Vec<Note>,
    anchored: Vec<Note>,
    cursor: usize,
    open: bool,
}

impl NoteInjector {
    /// `notes` must be ordered by anchor position, unanchored last.
    pub fn new(notes: Vec<Note>) -> Self {
        let anchored: Vec<Note> = notes.iter().filter(|n| n.anchor.is_some()).cloned().collect();
        Self {
            notes,
            anchored,
            cursor: 0,
            open: false,
        }
    }

    /// All note payloads, for margin assembly by external callers
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }
}

impl Injector for NoteInjector {
    fn has_content(&self, pos: u64) -> bool {
        match self.anchored.get(self.cursor).and_then(|n| n.anchor) {
            Some(anchor) if !self.open => anchor.start == pos,
            Some(anchor) => anchor.end == pos,
            None => false,
        }
    }

    fn inject_start(&mut self, line: &mut String, pos: u64) -> Result<()> {
        if self.open {
            return Ok(());
        }
        if let Some(note) = self.anchored.get(self.cursor) {
            if note.anchor.map_or(false, |a| a.start == pos) {
                let mut tag = String::new();
                write!(tag, "<span class=\"note-anchor\" id=\"note-anchor-{}\">", note.id)
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
        if let Some(note) = self.anchored.get(self.cursor) {
            if note.anchor.map_or(false, |a| a.end == pos) {
                try_push_str(line, "</span>")?;
                self.open = false;
                self.cursor += 1;
            }
        }
        Ok(())
    }

    /// Unanchored notes, plus any anchored past end of text, trail the
    /// document as empty markers
    fn append_trailing(&mut self, line: &mut String) -> Result<bool> {
        let mut wrote = false;
        for note in self.anchored.iter().skip(self.cursor) {
            let mut tag = String::new();
            write!(tag, "<a class=\"note-anchor trailing\" id=\"note-anchor-{}\"></a>", note.id)
                .map_err(|e| crate::errors::VariorumError::Internal {
                    message: e.to_string(),
                })?;
            try_push_str(line, &tag)?;
            wrote = true;
        }
        self.cursor = self.anchored.len();
        for note in self.notes.iter().filter(|n| n.anchor.is_none()) {
            let mut tag = String::new();
            write!(tag, "<a class=\"note-anchor trailing\" id=\"note-anchor-{}\"></a>", note.id)
                .map_err(|e| crate::errors::VariorumError::Internal {
                    message: e.to_string(),
                })?;
            try_push_str(line, &tag)?;
            wrote = true;
        }
        Ok(wrote)
    }
}
