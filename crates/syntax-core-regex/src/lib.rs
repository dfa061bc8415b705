#![warn(missing_docs)]
//! `syntax-core-regex` - Regex rule-based tokenizer for `syntax-core`.
//!
//! A lightweight [`Tokenize`] implementation for grammars that are well
//! served by per-line regex rules: single-line patterns, keyword classing,
//! and multi-line constructs (block comments, unterminated strings) whose
//! "inside" is carried across lines through [`LexerState`]. It is *not* a
//! full grammar engine; languages with real nesting want a dedicated lexer
//! behind the same trait.

use std::collections::HashMap;

use regex::Regex;
use syntax_core::{LexerState, SyntaxId, TokenKind, TokenSpan, Tokenize, normalize_spans};

/// A single-line regex rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    kind: TokenKind,
}

impl RegexRule {
    /// Compile a rule. The pattern is searched anywhere in the unconsumed
    /// remainder of the line; `^` anchors to that remainder's start.
    pub fn new(pattern: &str, kind: TokenKind) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            kind,
        })
    }

    /// Token kind this rule produces.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }
}

/// A construct that may span lines: `start` opens it, `end` closes it.
/// While open, the whole remainder of each line carries `kind` and the
/// lexer state records the open construct.
#[derive(Debug, Clone)]
pub struct SpanRule {
    start: Regex,
    end: Regex,
    kind: TokenKind,
}

impl SpanRule {
    /// Compile a multi-line construct rule. `end` is matched against the
    /// text following the opening match (or the line start while the
    /// construct is open), so it should be `^`-anchored.
    pub fn new(start: &str, end: &str, kind: TokenKind) -> Result<Self, regex::Error> {
        Ok(Self {
            start: Regex::new(start)?,
            end: Regex::new(end)?,
            kind,
        })
    }
}

/// Regex rule-based tokenizer.
///
/// Pure: all state lives in the compiled rules and the [`LexerState`] value
/// threaded through [`Tokenize::tokenize`], so one instance can serve any
/// number of threads.
#[derive(Debug)]
pub struct RegexTokenizer {
    id: SyntaxId,
    span_rules: Vec<SpanRule>,
    rules: Vec<RegexRule>,
    word: Option<Regex>,
    keywords: HashMap<String, TokenKind>,
}

impl RegexTokenizer {
    /// Create a tokenizer from rule lists. `id` identifies this grammar in
    /// [`Tokenize::definition_from_state`] answers.
    pub fn new(id: SyntaxId, span_rules: Vec<SpanRule>, rules: Vec<RegexRule>) -> Self {
        Self {
            id,
            span_rules,
            rules,
            word: None,
            keywords: HashMap::new(),
        }
    }

    /// Classify words matching `pattern` through a keyword table; words not
    /// in the table stay [`TokenKind::Normal`].
    pub fn with_keywords(
        mut self,
        pattern: &str,
        keywords: HashMap<String, TokenKind>,
    ) -> Result<Self, regex::Error> {
        self.word = Some(Regex::new(pattern)?);
        self.keywords = keywords;
        Ok(self)
    }

    /// A small C-like grammar: `//` and `/* */` comments, double-quoted
    /// strings (spanning lines while unterminated), numbers, common
    /// operators and delimiters, plus the given keywords.
    pub fn c_like(id: SyntaxId, keywords: &[&str]) -> Result<Self, regex::Error> {
        let span_rules = vec![
            SpanRule::new(r"/\*", r"^(?s:.)*?\*/", TokenKind::Comment)?,
            SpanRule::new(r#"""#, r#"^(?:[^"\\]|\\.)*""#, TokenKind::String)?,
        ];
        let rules = vec![
            RegexRule::new(r"//.*", TokenKind::Comment)?,
            RegexRule::new(r"\b\d+(?:\.\d+)?\b", TokenKind::Number)?,
            RegexRule::new(r"[+\-*/%=<>!&|^~]+", TokenKind::Operator)?,
            RegexRule::new(r"[{}()\[\];,.]", TokenKind::Symbol)?,
        ];
        let mut table: HashMap<String, TokenKind> = keywords
            .iter()
            .map(|kw| ((*kw).to_string(), TokenKind::Keyword))
            .collect();
        for literal in ["true", "false", "null"] {
            table.insert(literal.to_string(), TokenKind::Literal);
        }
        Self::new(id, span_rules, rules).with_keywords(r"[A-Za-z_][A-Za-z0-9_]*", table)
    }

    /// A small INI grammar (sections, keys, comments).
    pub fn ini(id: SyntaxId) -> Result<Self, regex::Error> {
        let rules = vec![
            RegexRule::new(r"^\s*\[[^\]]+\]\s*$", TokenKind::Keyword)?,
            RegexRule::new(r"^\s*[;#].*$", TokenKind::Comment)?,
            RegexRule::new(r"^\s*[^=\s]+", TokenKind::Function)?,
            RegexRule::new(r#""(?:\\.|[^"\\])*""#, TokenKind::String)?,
        ];
        Ok(Self::new(id, Vec::new(), rules))
    }

    /// Earliest match in `rest` across all rule classes. Ties go to span
    /// rules, then single-line rules in order, then keywords.
    fn earliest_match(&self, rest: &str) -> Option<Match> {
        let mut best: Option<Match> = None;
        let mut consider = |start: usize, end: usize, action: MatchAction| {
            if start == end {
                return;
            }
            let better = match &best {
                Some(found) => start < found.start,
                None => true,
            };
            if better {
                best = Some(Match { start, end, action });
            }
        };
        for (index, rule) in self.span_rules.iter().enumerate() {
            if let Some(found) = rule.start.find(rest) {
                consider(found.start(), found.end(), MatchAction::OpenSpan(index));
            }
        }
        for rule in &self.rules {
            if let Some(found) = rule.regex.find(rest) {
                consider(found.start(), found.end(), MatchAction::Single(rule.kind));
            }
        }
        if let Some(word) = &self.word {
            if let Some(found) = word.find(rest) {
                let kind = self
                    .keywords
                    .get(found.as_str())
                    .copied()
                    .unwrap_or(TokenKind::Normal);
                if kind != TokenKind::Normal {
                    consider(found.start(), found.end(), MatchAction::Single(kind));
                }
            }
        }
        best
    }
}

struct Match {
    start: usize,
    end: usize,
    action: MatchAction,
}

enum MatchAction {
    OpenSpan(usize),
    Single(TokenKind),
}

impl Tokenize for RegexTokenizer {
    fn tokenize(&self, text: &str, state: LexerState) -> (Vec<TokenSpan>, LexerState) {
        let mut spans = Vec::new();
        let mut byte = 0usize;
        let mut col = 0usize;
        let mut out_state = LexerState::default();

        // Emit a span for text[from..to], keeping the byte/column cursors in
        // step (columns are counted in characters).
        let mut emit = |spans: &mut Vec<TokenSpan>,
                        byte: &mut usize,
                        col: &mut usize,
                        from: usize,
                        to: usize,
                        kind: TokenKind| {
            debug_assert!(from >= *byte);
            *col += text[*byte..from].chars().count();
            let len = text[from..to].chars().count();
            if len > 0 {
                spans.push(TokenSpan::new(kind, *col, len));
            }
            *col += len;
            *byte = to;
        };

        // Resume an open multi-line construct.
        if state != LexerState::default() {
            let index = (state.0 - 1) as usize;
            match self.span_rules.get(index) {
                Some(rule) => match rule.end.find(text) {
                    Some(found) => {
                        emit(&mut spans, &mut byte, &mut col, 0, found.end(), rule.kind);
                    }
                    None => {
                        let len = text.chars().count();
                        if len > 0 {
                            spans.push(TokenSpan::new(rule.kind, 0, len));
                        }
                        return (normalize_spans(spans, len), state);
                    }
                },
                // Unknown state value (grammar changed): treat as no state.
                None => {}
            }
        }

        while byte < text.len() {
            let rest = &text[byte..];
            let Some(found) = self.earliest_match(rest) else {
                break;
            };
            let start = byte + found.start;
            let end = byte + found.end;
            match found.action {
                MatchAction::Single(kind) => {
                    emit(&mut spans, &mut byte, &mut col, start, end, kind);
                }
                MatchAction::OpenSpan(index) => {
                    let rule = &self.span_rules[index];
                    match rule.end.find(&text[end..]) {
                        Some(close) => {
                            emit(
                                &mut spans,
                                &mut byte,
                                &mut col,
                                start,
                                end + close.end(),
                                rule.kind,
                            );
                        }
                        None => {
                            // Construct stays open past this line.
                            emit(&mut spans, &mut byte, &mut col, start, text.len(), rule.kind);
                            out_state = LexerState(index as u64 + 1);
                            break;
                        }
                    }
                }
            }
        }

        (normalize_spans(spans, text.chars().count()), out_state)
    }

    fn definition_from_state(&self, _state: LexerState) -> SyntaxId {
        self.id
    }

    fn has_patterns(&self) -> bool {
        !self.span_rules.is_empty() || !self.rules.is_empty() || self.word.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c_like() -> RegexTokenizer {
        RegexTokenizer::c_like(SyntaxId(1), &["fn", "let", "return"]).unwrap()
    }

    fn kinds(tokenizer: &RegexTokenizer, text: &str, state: LexerState) -> Vec<(TokenKind, usize)> {
        let (spans, _) = tokenizer.tokenize(text, state);
        spans.iter().map(|span| (span.kind, span.len)).collect()
    }

    #[test]
    fn test_coverage_and_kinds() {
        let tokenizer = c_like();
        let text = "let x = 42; // tail";
        let (spans, state) = tokenizer.tokenize(text, LexerState::default());
        assert_eq!(state, LexerState::default());
        let total: usize = spans.iter().map(|span| span.len).sum();
        assert_eq!(total, text.chars().count());
        assert_eq!(spans[0].kind, TokenKind::Keyword);
        assert!(spans.iter().any(|span| span.kind == TokenKind::Number));
        assert_eq!(spans.last().unwrap().kind, TokenKind::Comment);
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let tokenizer = c_like();
        let (_, open) = tokenizer.tokenize("start /* inside", LexerState::default());
        assert_ne!(open, LexerState::default());
        let (spans, closed) = tokenizer.tokenize("still */ let x", open);
        assert_eq!(closed, LexerState::default());
        assert_eq!(spans[0].kind, TokenKind::Comment);
        assert!(spans.iter().any(|span| span.kind == TokenKind::Keyword));
    }

    #[test]
    fn test_unterminated_string_carries_state() {
        let tokenizer = c_like();
        let (spans, state) = tokenizer.tokenize(r#"b="x"#, LexerState::default());
        assert_ne!(state, LexerState::default());
        assert_eq!(spans.last().unwrap().kind, TokenKind::String);
        // Next line remains inside the string until a quote shows up.
        let (spans, state) = tokenizer.tokenize("no quote here", state);
        assert_ne!(state, LexerState::default());
        assert_eq!(spans, vec![TokenSpan::new(TokenKind::String, 0, 13)]);
        let (_, state) = tokenizer.tokenize("done\"", state);
        assert_eq!(state, LexerState::default());
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let tokenizer = c_like();
        let (spans, state) = tokenizer.tokenize(r#"s = "a\"b";"#, LexerState::default());
        assert_eq!(state, LexerState::default());
        let string_len: usize = spans
            .iter()
            .filter(|span| span.kind == TokenKind::String)
            .map(|span| span.len)
            .sum();
        assert_eq!(string_len, 6);
    }

    #[test]
    fn test_determinism() {
        let tokenizer = c_like();
        let text = "fn f() { return /* a */ 1; }";
        let a = kinds(&tokenizer, text, LexerState::default());
        let b = kinds(&tokenizer, text, LexerState::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_ini_rules() {
        let tokenizer = RegexTokenizer::ini(SyntaxId(2)).unwrap();
        let (spans, _) = tokenizer.tokenize("[core]", LexerState::default());
        assert_eq!(spans[0].kind, TokenKind::Keyword);
        let (spans, _) = tokenizer.tokenize("; comment", LexerState::default());
        assert_eq!(spans[0].kind, TokenKind::Comment);
    }
}
