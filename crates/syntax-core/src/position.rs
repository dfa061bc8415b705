//! Shared positional data model.
//!
//! Positions are `(line, column)` pairs counted in characters, matching the
//! coordinate space of [`crate::tokenizer::TokenSpan`] columns.

/// A `(line, column)` position inside a document, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextPosition {
    /// Logical line index (0-based).
    pub line: usize,
    /// Character column within the line (0-based).
    pub column: usize,
}

impl TextPosition {
    /// Create a position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A source range between two positions.
///
/// Ranges are normalized so that `start <= end`; a malformed range handed to
/// [`TextRange::new`] is swapped in place rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextRange {
    /// Inclusive start position.
    pub start: TextPosition,
    /// Inclusive end position.
    pub end: TextPosition,
}

impl TextRange {
    /// Create a normalized range.
    pub fn new(start: TextPosition, end: TextPosition) -> Self {
        let mut range = Self { start, end };
        range.normalize();
        range
    }

    /// Swap `start` and `end` if they are out of order.
    pub fn normalize(&mut self) {
        if self.end < self.start {
            std::mem::swap(&mut self.start, &mut self.end);
        }
    }

    /// Whether the range spans more than one line.
    pub fn is_multiline(&self) -> bool {
        self.start.line != self.end.line
    }

    /// Whether `line` falls inside the range's line span.
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start.line && line <= self.end.line
    }
}
