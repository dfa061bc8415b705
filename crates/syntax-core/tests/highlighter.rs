//! Integration tests for the incremental highlighting cache: coverage,
//! determinism, and the bounded-recomputation contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use syntax_core::{
    Document, LexerState, SyntaxHighlighter, TextBuffer, TextPosition, TokenKind, TokenSpan,
    Tokenize,
};

/// Line-oriented toy grammar: double quotes toggle an "inside string" state
/// that carries across lines; `#` starts a comment outside strings. Counts
/// tokenizer invocations so tests can assert recomputation bounds.
struct ToyTokenizer {
    calls: AtomicUsize,
}

impl ToyTokenizer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

const IN_STRING: LexerState = LexerState(1);

impl Tokenize for ToyTokenizer {
    fn tokenize(&self, text: &str, state: LexerState) -> (Vec<TokenSpan>, LexerState) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut spans = Vec::new();
        let mut in_string = state == IN_STRING;
        let mut span_start = 0usize;
        let mut col = 0usize;
        for ch in text.chars() {
            if in_string {
                if ch == '"' {
                    spans.push(TokenSpan::new(
                        TokenKind::String,
                        span_start,
                        col + 1 - span_start,
                    ));
                    span_start = col + 1;
                    in_string = false;
                }
            } else if ch == '"' {
                if col > span_start {
                    spans.push(TokenSpan::new(TokenKind::Normal, span_start, col - span_start));
                }
                span_start = col;
                in_string = true;
            } else if ch == '#' {
                if col > span_start {
                    spans.push(TokenSpan::new(TokenKind::Normal, span_start, col - span_start));
                }
                spans.push(TokenSpan::new(
                    TokenKind::Comment,
                    col,
                    text.chars().count() - col,
                ));
                return (spans, LexerState::default());
            }
            col += 1;
        }
        if col > span_start {
            let kind = if in_string {
                TokenKind::String
            } else {
                TokenKind::Normal
            };
            spans.push(TokenSpan::new(kind, span_start, col - span_start));
        }
        let out = if in_string {
            IN_STRING
        } else {
            LexerState::default()
        };
        (spans, out)
    }
}

fn fixture(text: &str) -> (Arc<TextBuffer>, Arc<ToyTokenizer>, Arc<SyntaxHighlighter>) {
    let doc = Arc::new(TextBuffer::from_text(text));
    let tokenizer = Arc::new(ToyTokenizer::new());
    let highlighter = Arc::new(SyntaxHighlighter::new(doc.clone(), tokenizer.clone()));
    (doc, tokenizer, highlighter)
}

fn warm(highlighter: &SyntaxHighlighter, lines: usize) {
    for line in 0..lines {
        highlighter.get_line(line);
    }
}

#[test]
fn test_coverage_spans_are_contiguous_and_cover_each_line() {
    let text = "plain text\n\"open string\nstill inside\" done\n# comment\n\ttabs\tand \"q\" mix";
    let (doc, _, highlighter) = fixture(text);
    for line in 0..doc.line_count() {
        let spans = highlighter.get_line(line);
        let line_len = doc.line(line).chars().count();
        let mut cursor = 0usize;
        for span in &spans {
            assert_eq!(span.start, cursor, "gap or overlap at line {line}");
            cursor = span.end();
        }
        assert_eq!(cursor, line_len, "line {line} not fully covered");
    }
}

#[test]
fn test_reset_reproduces_identical_results() {
    let text = "a = \"one\n two\" # three\nplain";
    let (doc, _, highlighter) = fixture(text);
    warm(&highlighter, doc.line_count());
    let before: Vec<_> = (0..doc.line_count()).map(|i| highlighter.get_line(i)).collect();
    let signatures: Vec<_> = (0..doc.line_count())
        .map(|i| highlighter.line_signature(i))
        .collect();
    highlighter.reset();
    warm(&highlighter, doc.line_count());
    let after: Vec<_> = (0..doc.line_count()).map(|i| highlighter.get_line(i)).collect();
    assert_eq!(before, after);
    for (i, signature) in signatures.iter().enumerate() {
        assert_eq!(*signature, highlighter.line_signature(i));
    }
}

#[test]
fn test_unterminated_string_edit_recomputes_only_downstream_lines() {
    let (doc, tokenizer, highlighter) = fixture("a=1\nb=2\nc=3");
    warm(&highlighter, 3);
    assert!(highlighter.update_dirty(10));
    let baseline = tokenizer.calls();
    assert_eq!(baseline, 3);

    // Opening an unterminated string on line 1 changes its end state, which
    // changes line 2's entry state. There is no line 3 to touch.
    doc.set_line(1, "b=\"x");
    highlighter.invalidate(1);
    assert!(highlighter.update_dirty(10));
    assert_eq!(tokenizer.calls() - baseline, 2);
    assert_eq!(highlighter.get_line(2)[0].kind, TokenKind::String);
    assert_eq!(
        highlighter.token_kind_at(TextPosition::new(1, 2)),
        TokenKind::String
    );
}

#[test]
fn test_settled_state_stops_forward_recomputation() {
    let (doc, tokenizer, highlighter) = fixture("x=\"a\nb\" y\nplain\nmore");
    warm(&highlighter, 4);
    assert!(highlighter.update_dirty(10));
    let baseline = tokenizer.calls();

    // Line 0 still opens an unterminated string after the edit, so its end
    // state is unchanged and lines 1..3 never recompute.
    doc.set_line(0, "x=\"zz");
    highlighter.invalidate(0);
    assert!(highlighter.update_dirty(10));
    assert_eq!(tokenizer.calls() - baseline, 1);
}

#[test]
fn test_disjoint_invalidations_are_both_recomputed() {
    let (doc, tokenizer, highlighter) = fixture("one\ntwo\nthree\nfour\nfive");
    warm(&highlighter, 5);
    assert!(highlighter.update_dirty(10));
    let baseline = tokenizer.calls();

    // Line 1 settles immediately (its end state is unchanged), which must
    // not swallow the separate invalidation of line 3.
    doc.set_line(1, "TWO");
    doc.set_line(3, "FOURTEEN");
    highlighter.invalidate(1);
    highlighter.invalidate(3);
    assert!(highlighter.update_dirty(10));
    assert_eq!(tokenizer.calls() - baseline, 2);

    // Both edits are already served from the cache.
    assert_eq!(highlighter.get_line(1)[0].len, 3);
    assert_eq!(highlighter.get_line(3)[0].len, 8);
    assert_eq!(tokenizer.calls() - baseline, 2);
}

/// End state tracks line length, so every content change propagates and
/// settle-early never fires. Used to exercise the work budget.
struct LenTokenizer {
    calls: AtomicUsize,
}

impl Tokenize for LenTokenizer {
    fn tokenize(&self, text: &str, _state: LexerState) -> (Vec<TokenSpan>, LexerState) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let len = text.chars().count();
        (
            vec![TokenSpan::new(TokenKind::Normal, 0, len)],
            LexerState(len as u64),
        )
    }
}

#[test]
fn test_update_dirty_budget_bounds_work_per_call() {
    let text = (0..20).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let doc = Arc::new(TextBuffer::from_text(&text));
    let tokenizer = Arc::new(LenTokenizer {
        calls: AtomicUsize::new(0),
    });
    let highlighter = SyntaxHighlighter::new(doc.clone(), tokenizer.clone());
    warm(&highlighter, 20);
    assert!(highlighter.update_dirty(20));

    // Stale every line with content of a new, distinct length.
    for i in 0..20 {
        doc.set_line(i, &"y".repeat(30 + i));
    }
    highlighter.invalidate(0);
    let before = tokenizer.calls.load(Ordering::Relaxed);
    assert!(!highlighter.update_dirty(5));
    assert_eq!(tokenizer.calls.load(Ordering::Relaxed) - before, 5);

    let mut rounds = 0;
    while !highlighter.update_dirty(5) {
        rounds += 1;
        assert!(rounds < 20, "update_dirty never completed");
    }
    assert_eq!(tokenizer.calls.load(Ordering::Relaxed) - before, 20);
}

#[test]
fn test_out_of_range_queries_are_empty_not_errors() {
    let (_, _, highlighter) = fixture("only line");
    assert!(highlighter.get_line(5).is_empty());
    assert_eq!(
        highlighter.token_kind_at(TextPosition::new(5, 0)),
        TokenKind::Normal
    );
}

#[test]
fn test_background_drain_tokenizes_all_lines() {
    let text = (0..50).map(|i| format!("bg {i}")).collect::<Vec<_>>().join("\n");
    let (_, tokenizer, highlighter) = fixture(&text);
    let handle = highlighter
        .tokenize_in_background(None)
        .expect("no drain running");
    handle.join().expect("worker panicked");
    assert!(tokenizer.calls() >= 50);
    // A second drain may start once the first finished.
    assert!(highlighter.tokenize_in_background(None).is_some());
}
