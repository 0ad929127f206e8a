//! Diagnostic message-accumulation buffer, matching `pri_msg_line` in
//! `q921.c`/`pri_internal.h`: diagnostic text is appended piecemeal and
//! flushed as a complete line whenever a `\n` is appended, rather than
//! formatted and emitted in one call. Kept structurally intact -- it plays
//! no part in any FSM transition.

use arrayvec::ArrayString;

/// Matches the source's fixed `PRI_MAX_MSG_LINE`-sized static buffer.
pub const MAX_LINE: usize = 256;

#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: ArrayString<MAX_LINE>,
}

impl LineBuffer {
    pub fn new() -> Self {
        LineBuffer::default()
    }

    /// Appends `text`, returning a completed line (without the trailing
    /// `\n`) each time one is closed off. `text` may itself contain zero,
    /// one, or several newlines.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        let mut completed = Vec::new();
        for ch in text.chars() {
            if ch == '\n' {
                completed.push(self.buf.as_str().to_string());
                self.buf.clear();
            } else if self.buf.try_push(ch).is_err() {
                // Line longer than MAX_LINE: flush what we have, matching
                // the source's behavior of never growing the buffer.
                completed.push(self.buf.as_str().to_string());
                self.buf.clear();
                let _ = self.buf.try_push(ch);
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_until_newline() {
        let mut lb = LineBuffer::new();
        assert!(lb.push("partial ").is_empty());
        let lines = lb.push("line\nsecond\n");
        assert_eq!(lines, vec!["partial line".to_string(), "second".to_string()]);
    }

    #[test]
    fn overlong_line_flushes_without_growing() {
        let mut lb = LineBuffer::new();
        let long = "x".repeat(MAX_LINE + 10);
        let lines = lb.push(&long);
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|l| l.len() <= MAX_LINE));
    }
}
