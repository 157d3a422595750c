//! The character-walk renderer.
//!
//! Walks the base witness text one character at a time, giving every
//! injector a chance to emit markup at each position before the character
//! itself is escaped and appended. Newlines flush the accumulated line to
//! the output with a `<br/>` so the output stays line-oriented and never
//! holds more than one line of working state beyond the final buffer.

use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::inject::{try_push_str, Injector};
use crate::render::escape_char_into;

/// How many characters go by between cancellation checks
const CANCEL_POLL_INTERVAL: u64 = 4096;

/// Render `content` to HTML, weaving in markup from `injectors`.
///
/// Positions are character offsets into `content`. Injectors are queried
/// one final time at the end-of-text position so spans that close there
/// are terminated, then trailing data (unanchored notes) is appended as a
/// final line.
///
/// # Errors
///
/// Returns [`VariorumError::Canceled`](crate::errors::VariorumError::Canceled)
/// when the token trips mid-walk, and
/// [`VariorumError::ResourceExhausted`](crate::errors::VariorumError::ResourceExhausted)
/// when the output buffer cannot grow.
pub fn render_stream(
    content: &str,
    injectors: &mut [Box<dyn Injector>],
    cancel: &CancelToken,
) -> Result<String> {
    cancel.ensure_active()?;

    let mut out = String::new();
    out.try_reserve(content.len())?;
    let mut line = String::new();

    let mut pos: u64 = 0;
    for c in content.chars() {
        if pos % CANCEL_POLL_INTERVAL == 0 {
            cancel.ensure_active()?;
        }
        run_injectors(&mut line, injectors, pos)?;
        if c == '\n' {
            try_push_str(&mut line, "<br/>")?;
            flush_line(&mut out, &mut line)?;
        } else {
            escape_char_into(&mut line, c)?;
        }
        pos += 1;
    }

    // end-of-text position closes anything still open
    run_injectors(&mut line, injectors, pos)?;
    try_push_str(&mut line, "<br/>")?;
    flush_line(&mut out, &mut line)?;

    let mut wrote_trailing = false;
    for injector in injectors.iter_mut() {
        if injector.append_trailing(&mut line)? {
            wrote_trailing = true;
        }
    }
    if wrote_trailing {
        flush_line(&mut out, &mut line)?;
    }

    Ok(out)
}

/// Drive every injector at `pos` until none has anything left to emit.
/// Ends run innermost-first (reverse pipeline order), then starts run
/// outermost-first, so markup closed and opened at the same position nests
/// correctly.
fn run_injectors(line: &mut String, injectors: &mut [Box<dyn Injector>], pos: u64) -> Result<()> {
    while injectors.iter().any(|i| i.has_content(pos)) {
        for injector in injectors.iter_mut().rev() {
            injector.inject_end(line, pos)?;
        }
        for injector in injectors.iter_mut() {
            injector.inject_start(line, pos)?;
        }
    }
    Ok(())
}

fn flush_line(out: &mut String, line: &mut String) -> Result<()> {
    out.try_reserve(line.len() + 1)?;
    out.push_str(line);
    out.push('\n');
    line.clear();
    Ok(())
}
