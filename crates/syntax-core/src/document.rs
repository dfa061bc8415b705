//! The document boundary.
//!
//! The services in this crate never own the text they derive state from; they
//! observe it through the [`Document`] trait. [`TextBuffer`] is a rope-backed
//! reference implementation used by the tests, benches, and examples, and is
//! perfectly usable as a minimal in-memory buffer.

use std::sync::Mutex;

use ropey::Rope;

/// Read-only view of a line-addressable text buffer.
///
/// Implementations must be callable from worker threads (`Send + Sync`); the
/// services only read through this trait and never mutate the document.
pub trait Document: Send + Sync {
    /// Number of logical lines. An empty document still has one (empty) line.
    fn line_count(&self) -> usize;

    /// The text of line `index` without its trailing line break.
    ///
    /// Out-of-range indices return an empty string; derived-state services
    /// treat that as "no content", never as an error.
    fn line(&self, index: usize) -> String;
}

/// Rope-backed in-memory text buffer with line-oriented edit helpers.
///
/// Line access is O(log n) via the rope. Edit helpers mirror the
/// notifications an editor document emits: change one line, insert lines,
/// delete lines. The rope sits behind a mutex so the same buffer handle can
/// be shared with the derived-state services and edited in place.
pub struct TextBuffer {
    rope: Mutex<Rope>,
}

impl TextBuffer {
    /// Create a buffer from initial text.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Mutex::new(Rope::from_str(text)),
        }
    }

    /// Create an empty buffer (a single empty line).
    pub fn new() -> Self {
        Self {
            rope: Mutex::new(Rope::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Rope> {
        self.rope.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Replace the contents of line `index` with `text` (no line break).
    pub fn set_line(&self, index: usize, text: &str) {
        let mut rope = self.lock();
        if index >= rope.len_lines() {
            return;
        }
        let start = rope.line_to_char(index);
        let line = rope.line(index);
        let mut end = start + line.len_chars();
        // Keep the trailing line break.
        let line_str = line.to_string();
        if line_str.ends_with('\n') {
            end -= 1;
            if line_str.ends_with("\r\n") {
                end -= 1;
            }
        }
        rope.remove(start..end);
        rope.insert(start, text);
    }

    /// Insert a new line containing `text` so that it becomes line `index`.
    pub fn insert_line(&self, index: usize, text: &str) {
        let mut rope = self.lock();
        if index >= rope.len_lines() {
            let len = rope.len_chars();
            rope.insert(len, "\n");
            rope.insert(len + 1, text);
            return;
        }
        let start = rope.line_to_char(index);
        rope.insert(start, "\n");
        rope.insert(start, text);
    }

    /// Delete line `index` entirely, including its line break.
    pub fn remove_line(&self, index: usize) {
        let mut rope = self.lock();
        if index >= rope.len_lines() {
            return;
        }
        let start = rope.line_to_char(index);
        let end = if index + 1 < rope.len_lines() {
            rope.line_to_char(index + 1)
        } else {
            rope.len_chars()
        };
        rope.remove(start..end);
    }

    /// Split line `index` at character `column`, producing two lines.
    pub fn split_line(&self, index: usize, column: usize) {
        let mut rope = self.lock();
        if index >= rope.len_lines() {
            return;
        }
        let start = rope.line_to_char(index);
        let mut line = rope.line(index).to_string();
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        let len = line.chars().count();
        let at = start + column.min(len);
        rope.insert(at, "\n");
    }

    /// Full buffer contents.
    pub fn text(&self) -> String {
        self.lock().to_string()
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for TextBuffer {
    fn line_count(&self) -> usize {
        self.lock().len_lines()
    }

    fn line(&self, index: usize) -> String {
        let rope = self.lock();
        if index >= rope.len_lines() {
            return String::new();
        }
        let mut text = rope.line(index).to_string();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_access_strips_line_breaks() {
        let buffer = TextBuffer::from_text("alpha\nbeta\r\ngamma");
        assert_eq!(buffer.line_count(), 3);
        assert_eq!(buffer.line(0), "alpha");
        assert_eq!(buffer.line(1), "beta");
        assert_eq!(buffer.line(2), "gamma");
        assert_eq!(buffer.line(3), "");
    }

    #[test]
    fn test_set_line_replaces_content_only() {
        let buffer = TextBuffer::from_text("one\ntwo\nthree");
        buffer.set_line(1, "TWO");
        assert_eq!(buffer.text(), "one\nTWO\nthree");
        assert_eq!(buffer.line_count(), 3);
    }

    #[test]
    fn test_insert_and_remove_line() {
        let buffer = TextBuffer::from_text("a\nc");
        buffer.insert_line(1, "b");
        assert_eq!(buffer.text(), "a\nb\nc");
        buffer.remove_line(1);
        assert_eq!(buffer.text(), "a\nc");
    }

    #[test]
    fn test_split_line() {
        let buffer = TextBuffer::from_text("hello world");
        buffer.split_line(0, 5);
        assert_eq!(buffer.line(0), "hello");
        assert_eq!(buffer.line(1), " world");
    }
}
