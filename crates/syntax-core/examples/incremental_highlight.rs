use std::sync::Arc;

use syntax_core::{
    LexerState, SyntaxHighlighter, TextBuffer, TokenKind, TokenSpan, Tokenize,
};

/// Minimal stateful grammar: `"` toggles an in-string state across lines.
struct QuoteTokenizer;

const IN_STRING: LexerState = LexerState(1);

impl Tokenize for QuoteTokenizer {
    fn tokenize(&self, text: &str, state: LexerState) -> (Vec<TokenSpan>, LexerState) {
        let mut in_string = state == IN_STRING;
        let mut spans = Vec::new();
        let mut start = 0usize;
        let mut col = 0usize;
        for ch in text.chars() {
            if ch == '"' {
                let (kind, end) = if in_string {
                    (TokenKind::String, col + 1)
                } else {
                    (TokenKind::Normal, col)
                };
                if end > start {
                    spans.push(TokenSpan::new(kind, start, end - start));
                }
                start = end;
                in_string = !in_string;
            }
            col += 1;
        }
        if col > start {
            let kind = if in_string {
                TokenKind::String
            } else {
                TokenKind::Normal
            };
            spans.push(TokenSpan::new(kind, start, col - start));
        }
        let out = if in_string { IN_STRING } else { LexerState::default() };
        (spans, out)
    }
}

fn main() {
    let doc = Arc::new(TextBuffer::from_text("a=1\nb=2\nc=3"));
    let highlighter = SyntaxHighlighter::new(doc.clone(), Arc::new(QuoteTokenizer));

    // The viewport requests its visible lines lazily.
    for line in 0..3 {
        highlighter.get_line(line);
    }

    // Opening an unterminated string on line 1 invalidates downstream state;
    // the render loop drains the dirt in bounded slices.
    doc.set_line(1, "b=\"x");
    highlighter.invalidate(1);
    while !highlighter.update_dirty(16) {}

    assert_eq!(highlighter.get_line(2)[0].kind, TokenKind::String);
    println!("line 2 now renders as a string continuation");
}
