#![warn(missing_docs)]
//! Syntax Core - Incremental Line-State Services for Code Editors
//!
//! # Overview
//!
//! `syntax-core` maintains derived, line-indexed editor state that must stay
//! consistent while a document mutates, without re-scanning the whole
//! document on every keystroke. It is headless: no rendering, no widget
//! tree, no grammar engine. The document, the tokenizer, and the font
//! metrics are all supplied through traits.
//!
//! # Core Services
//!
//! - **Syntax highlighting**: a per-line tokenizer-state cache with lazy
//!   computation and bounded incremental recomputation after edits
//! - **Fold regions**: strategy-driven detection of collapsible ranges
//!   (braces, indentation, markup tags, markdown) kept valid across edits
//! - **Soft wrapping**: pure per-line break computation plus a stateful
//!   logical-to-visual line-index mapping for cursor and scroll logic
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  EditPipeline (edit notification fan-out)   │
//! ├──────────────┬───────────────┬──────────────┤
//! │ Highlighter  │ FoldRanges    │ LineWrapping │  ← derived line state
//! ├──────────────┴───────────────┴──────────────┤
//! │  Document / Tokenize / FontMetrics traits   │  ← external collaborators
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use syntax_core::{Document, LexerState, SyntaxHighlighter, TextBuffer, TokenKind, TokenSpan, Tokenize};
//!
//! struct CommentTokenizer;
//!
//! impl Tokenize for CommentTokenizer {
//!     fn tokenize(&self, text: &str, state: LexerState) -> (Vec<TokenSpan>, LexerState) {
//!         let kind = if text.trim_start().starts_with("//") {
//!             TokenKind::Comment
//!         } else {
//!             TokenKind::Normal
//!         };
//!         (vec![TokenSpan::new(kind, 0, text.chars().count())], state)
//!     }
//! }
//!
//! let doc = Arc::new(TextBuffer::from_text("// hello\nlet x = 1;"));
//! let highlighter = SyntaxHighlighter::new(doc, Arc::new(CommentTokenizer));
//! assert_eq!(highlighter.get_line(0)[0].kind, TokenKind::Comment);
//! ```
//!
//! # Concurrency Model
//!
//! Plain threads and mutexes, no async. [`SyntaxHighlighter`] and
//! [`FoldRangeService`] each guard their cache with their own mutex and can
//! be driven from worker threads; [`LineWrapping`] is UI-thread-only state
//! with no internal locking. The tokenizer primitive must be pure, which
//! makes it safe to call from any thread without coordination.
//!
//! # Module Description
//!
//! - [`position`] - shared `(line, column)` positions and ranges
//! - [`document`] - the text-buffer boundary and a rope-backed buffer
//! - [`tokenizer`] - the tokenizer primitive boundary and token data model
//! - [`highlighter`] - the incremental highlighting cache
//! - [`folding`] - fold-region detection and bookkeeping
//! - [`wrap`] - soft wrapping and the logical-to-visual mapping
//! - [`edits`] - edit notification fan-out

pub mod document;
pub mod edits;
pub mod folding;
pub mod highlighter;
pub mod position;
pub mod tokenizer;
pub mod wrap;

pub use document::{Document, TextBuffer};
pub use edits::EditPipeline;
pub use folding::{FoldConfig, FoldRangeProvider, FoldRangeService, FoldRangeType, ShiftError};
pub use highlighter::SyntaxHighlighter;
pub use position::{TextPosition, TextRange};
pub use tokenizer::{
    LexerState, SyntaxId, TokenKind, TokenSpan, Tokenize, TokenizedLine, line_hash,
    normalize_spans,
};
pub use wrap::{
    FontMetrics, FontStyle, LineWrapping, MonospaceMetrics, WrapConfig, WrapInfo, WrapMode,
    compute_line_breaks,
};
