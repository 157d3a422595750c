//! Streaming HTML rendering of a base witness text with injected markup.

pub mod stream;

pub use stream::render_stream;

use crate::errors::Result;
use crate::inject::try_push_str;

/// Append `s` to `buf` with the HTML-significant characters escaped.
pub fn escape_into(buf: &mut String, s: &str) -> Result<()> {
    buf.try_reserve(s.len())?;
    for c in s.chars() {
        escape_char_into(buf, c)?;
    }
    Ok(())
}

/// Append a single character, escaped if HTML-significant.
pub(crate) fn escape_char_into(buf: &mut String, c: char) -> Result<()> {
    match c {
        '&' => try_push_str(buf, "&amp;"),
        '<' => try_push_str(buf, "&lt;"),
        '>' => try_push_str(buf, "&gt;"),
        '"' => try_push_str(buf, "&quot;"),
        '\'' => try_push_str(buf, "&#39;"),
        _ => {
            buf.try_reserve(c.len_utf8())?;
            buf.push(c);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_covers_markup_characters() {
        let mut buf = String::new();
        escape_into(&mut buf, "a < b & c > \"d\" 'e'").unwrap();
        assert_eq!(buf, "a &lt; b &amp; c &gt; &quot;d&quot; &#39;e&#39;");
    }

    #[test]
    fn test_escape_passes_plain_text_through() {
        let mut buf = String::new();
        escape_into(&mut buf, "plain text, no markup").unwrap();
        assert_eq!(buf, "plain text, no markup");
    }
}
