//! The tokenizer primitive boundary and its data model.
//!
//! Turning one line of text into token spans is an opaque, pure function from
//! the point of view of this crate: callers supply any [`Tokenize`]
//! implementation (a regex rule engine, a generated lexer, an FFI grammar).
//! The only contract the cache relies on is purity: identical
//! `(text, state)` inputs must always produce identical outputs.

use std::hash::{Hash, Hasher};

/// Opaque, value-comparable lexer state carried from one line's end to the
/// next line's start ("what construct are we inside of").
///
/// The mapping from a state value to a grammar construct is the tokenizer's
/// private concern; the cache only ever compares states for equality.
/// `LexerState::default()` is the "no state" value used for line 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LexerState(pub u64);

/// Identifier of a (sub-)grammar, resolved from a [`LexerState`] by the
/// tokenizer. `SyntaxId::PLAIN` means "no grammar" (plain text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SyntaxId(pub u32);

impl SyntaxId {
    /// Plain text, no grammar.
    pub const PLAIN: SyntaxId = SyntaxId(0);
}

/// Classification of a token span.
///
/// A small `Copy` enum rather than a tag string: point queries and the
/// brace-based fold scan classify tokens on hot paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenKind {
    /// Catch-all for ungrammatical text; fills coverage gaps.
    #[default]
    Normal,
    /// Language keyword.
    Keyword,
    /// String literal contents (including delimiters).
    String,
    /// Comment text, single- or multi-line.
    Comment,
    /// Numeric literal.
    Number,
    /// Operator character(s).
    Operator,
    /// Function or method name.
    Function,
    /// Non-string, non-number literal (`true`, `null`, ...).
    Literal,
    /// Punctuation / delimiter.
    Symbol,
}

/// A typed sub-range of one line's text, in character columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenSpan {
    /// Token classification.
    pub kind: TokenKind,
    /// Start column (inclusive).
    pub start: usize,
    /// Length in characters.
    pub len: usize,
}

impl TokenSpan {
    /// Create a span.
    pub fn new(kind: TokenKind, start: usize, len: usize) -> Self {
        Self { kind, start, len }
    }

    /// End column (exclusive).
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether `column` falls inside the span.
    pub fn contains(&self, column: usize) -> bool {
        column >= self.start && column < self.end()
    }
}

/// The external tokenizer primitive.
///
/// Must be pure: no internal mutable state may influence the result. This
/// makes it safe to call from any thread without locking, which the
/// background tokenization path relies on.
pub trait Tokenize: Send + Sync {
    /// Tokenize one line of text given the incoming lexer state, returning
    /// the covering spans and the outgoing state.
    fn tokenize(&self, text: &str, state: LexerState) -> (Vec<TokenSpan>, LexerState);

    /// Resolve the active (sub-)grammar for a lexer state.
    ///
    /// Tokenizers without embedded sub-grammars can keep the default.
    fn definition_from_state(&self, _state: LexerState) -> SyntaxId {
        SyntaxId::PLAIN
    }

    /// Whether this tokenizer has any patterns at all. When `false` the
    /// highlighter skips tokenization and serves whole lines as
    /// [`TokenKind::Normal`].
    fn has_patterns(&self) -> bool {
        true
    }
}

/// One line's cached tokenization result.
#[derive(Debug, Clone, Default)]
pub struct TokenizedLine {
    /// Lexer state this line was tokenized with (the predecessor's end state).
    pub init_state: LexerState,
    /// Content hash of the line text at tokenization time.
    pub hash: u64,
    /// Ordered, non-overlapping spans covering the whole line.
    pub tokens: Vec<TokenSpan>,
    /// Lexer state propagated to the successor line.
    pub end_state: LexerState,
}

impl TokenizedLine {
    /// Signature over the token spans, used by external consumers to detect
    /// that a re-tokenization actually changed anything visible.
    pub fn signature(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.tokens.hash(&mut hasher);
        hasher.finish()
    }
}

/// Content hash for one line of text.
pub fn line_hash(text: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Repair a span list so it covers `[0, line_len)` exactly: sorts by start,
/// clamps overlap and overflow, and fills gaps with [`TokenKind::Normal`].
///
/// Tokenizers are expected to produce covering output already; this is the
/// self-healing path for ones that do not.
pub fn normalize_spans(mut spans: Vec<TokenSpan>, line_len: usize) -> Vec<TokenSpan> {
    spans.sort_by_key(|span| span.start);
    let mut covered = Vec::with_capacity(spans.len());
    let mut cursor = 0usize;
    for mut span in spans {
        if cursor >= line_len {
            break;
        }
        if span.start > cursor {
            covered.push(TokenSpan::new(TokenKind::Normal, cursor, span.start - cursor));
            cursor = span.start;
        }
        if span.start < cursor {
            let clip = cursor - span.start;
            if clip >= span.len {
                continue;
            }
            span.start += clip;
            span.len -= clip;
        }
        if span.end() > line_len {
            span.len = line_len - span.start;
        }
        if span.len == 0 {
            continue;
        }
        cursor = span.end();
        covered.push(span);
    }
    if cursor < line_len {
        covered.push(TokenSpan::new(TokenKind::Normal, cursor, line_len - cursor));
    }
    covered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_spans_fills_gaps_and_clamps() {
        let spans = vec![
            TokenSpan::new(TokenKind::Keyword, 2, 3),
            TokenSpan::new(TokenKind::String, 4, 10),
        ];
        let covered = normalize_spans(spans, 10);
        assert_eq!(covered[0], TokenSpan::new(TokenKind::Normal, 0, 2));
        assert_eq!(covered[1], TokenSpan::new(TokenKind::Keyword, 2, 3));
        assert_eq!(covered[2], TokenSpan::new(TokenKind::String, 5, 5));
        let total: usize = covered.iter().map(|s| s.len).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_normalize_spans_empty_input_covers_line() {
        let covered = normalize_spans(Vec::new(), 7);
        assert_eq!(covered, vec![TokenSpan::new(TokenKind::Normal, 0, 7)]);
        assert!(normalize_spans(Vec::new(), 0).is_empty());
    }

    #[test]
    fn test_signature_tracks_token_changes() {
        let mut line = TokenizedLine {
            tokens: vec![TokenSpan::new(TokenKind::Normal, 0, 4)],
            ..Default::default()
        };
        let before = line.signature();
        line.tokens[0].kind = TokenKind::Keyword;
        assert_ne!(before, line.signature());
    }
}
