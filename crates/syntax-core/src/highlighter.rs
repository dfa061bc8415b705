//! Incremental syntax highlighting cache.
//!
//! [`SyntaxHighlighter`] maps line indices to token spans, computing them
//! lazily through the external [`Tokenize`] primitive and caching the result
//! together with the lexer state each line was entered with. A cache entry is
//! stale when its content hash no longer matches the live line text, or when
//! its recorded entry state no longer matches the predecessor's propagated
//! end state. Both cases silently trigger recomputation, never an error.
//!
//! Lines are always tokenized in strictly increasing index order starting at
//! the first invalid line: a line's result depends only on the preceding
//! line's end state, so forward propagation is the whole algorithm. The cost
//! of re-highlighting after an edit is bounded by the number of lines whose
//! propagated state actually changed, not by document size.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::document::Document;
use crate::position::TextPosition;
use crate::tokenizer::{
    LexerState, SyntaxId, TokenKind, TokenSpan, Tokenize, TokenizedLine, line_hash,
    normalize_spans,
};

struct CacheState {
    /// Visible tokenization per line. Entries may be overridden by
    /// [`SyntaxHighlighter::set_line`] / `merge_line`.
    lines: HashMap<usize, TokenizedLine>,
    /// Raw tokenizer output per line, kept so `merge_line` can overlay spans
    /// onto an unmodified base even after a previous merge.
    base_lines: HashMap<usize, TokenizedLine>,
    /// No line below this index needs recomputation.
    first_invalid: usize,
    /// Highest line index the UI has requested so far.
    max_wanted: usize,
}

/// Per-line tokenizer-state cache with bounded incremental recomputation.
pub struct SyntaxHighlighter {
    doc: Arc<dyn Document>,
    tokenizer: Arc<dyn Tokenize>,
    state: Mutex<CacheState>,
    /// Lines longer than this are served as plain chunks without running the
    /// tokenizer. 0 disables the guard.
    max_tokenization_length: AtomicUsize,
    stop_background: AtomicBool,
    background_running: AtomicBool,
}

impl SyntaxHighlighter {
    /// Create a highlighter over `doc` using `tokenizer` as the grammar
    /// primitive. No line is tokenized until requested.
    pub fn new(doc: Arc<dyn Document>, tokenizer: Arc<dyn Tokenize>) -> Self {
        Self {
            doc,
            tokenizer,
            state: Mutex::new(CacheState {
                lines: HashMap::new(),
                base_lines: HashMap::new(),
                first_invalid: 0,
                max_wanted: 0,
            }),
            max_tokenization_length: AtomicUsize::new(0),
            stop_background: AtomicBool::new(false),
            background_running: AtomicBool::new(false),
        }
    }

    /// Drop all cached state. Also signals a running background drain to
    /// stop; partially completed entries stay valid and are simply cleared.
    pub fn reset(&self) {
        if self.background_running.load(Ordering::Acquire) {
            self.stop_background.store(true, Ordering::Release);
        }
        let mut state = self.lock();
        state.lines.clear();
        state.base_lines.clear();
        state.first_invalid = 0;
        state.max_wanted = 0;
    }

    /// Record that line `index` (and therefore everything after it) may be
    /// stale. Does not evict anything; recomputation starts no later than
    /// `index` on the next [`update_dirty`](Self::update_dirty) pass.
    pub fn invalidate(&self, index: usize) {
        let mut state = self.lock();
        state.first_invalid = state.first_invalid.min(index);
        let last = self.doc.line_count().saturating_sub(1);
        state.max_wanted = state.max_wanted.min(last);
    }

    /// First line index that may need recomputation.
    pub fn first_invalid_line(&self) -> usize {
        self.lock().first_invalid
    }

    /// Highest line index the UI has requested so far.
    pub fn max_wanted_line(&self) -> usize {
        self.lock().max_wanted
    }

    /// Longest line the tokenizer will be asked to process (0 = unlimited).
    pub fn max_tokenization_length(&self) -> usize {
        self.max_tokenization_length.load(Ordering::Relaxed)
    }

    /// Set the long-line guard. Lines beyond the limit are chunked as
    /// [`TokenKind::Normal`] spans without touching the tokenizer.
    pub fn set_max_tokenization_length(&self, length: usize) {
        self.max_tokenization_length.store(length, Ordering::Relaxed);
    }

    /// Tokens for line `index`, computing and caching them if needed.
    ///
    /// Returns an empty vector for out-of-range indices. A cached entry is
    /// reused only while its content hash still matches the live text.
    pub fn get_line(&self, index: usize) -> Vec<TokenSpan> {
        if index >= self.doc.line_count() {
            return Vec::new();
        }
        let text = self.doc.line(index);
        if !self.tokenizer.has_patterns() {
            let len = text.chars().count();
            if len == 0 {
                return Vec::new();
            }
            return vec![TokenSpan::new(TokenKind::Normal, 0, len)];
        }

        let hash = line_hash(&text);
        let prev_state;
        {
            let mut state = self.lock();
            prev_state = if index > 0 {
                state
                    .lines
                    .get(&(index - 1))
                    .map(|entry| entry.end_state)
                    .unwrap_or_default()
            } else {
                LexerState::default()
            };
            let known_prev = index == 0 || state.lines.contains_key(&(index - 1));
            if let Some(entry) = state.lines.get(&index)
                && entry.hash == hash
                && (!known_prev || entry.init_state == prev_state)
            {
                let tokens = entry.tokens.clone();
                state.max_wanted = state.max_wanted.max(index);
                return tokens;
            }
        }

        // Tokenize outside the lock; the primitive is pure.
        let line = self.tokenize_line(&text, prev_state);
        let tokens = line.tokens.clone();
        let mut state = self.lock();
        state.base_lines.insert(index, line.clone());
        state.lines.insert(index, line);
        state.max_wanted = state.max_wanted.max(index);
        tokens
    }

    /// Walk forward from the first invalid line, visiting at most `budget`
    /// lines and advancing `first_invalid` past each completed one. A
    /// visited line is re-tokenized only when its content hash or its
    /// incoming state changed; once a re-tokenized line's outgoing state
    /// matches the previously cached value, downstream lines pass the state
    /// check again and are skipped at hash-comparison cost. Propagation
    /// settles without redundant tokenization, while lines invalidated by
    /// their own edits are still reached.
    ///
    /// Returns `true` when every wanted line is clean, so a render loop can
    /// re-invoke across frames until completion.
    pub fn update_dirty(&self, budget: usize) -> bool {
        let line_count = self.doc.line_count();
        if line_count == 0 {
            return true;
        }
        let (start, upper) = {
            let mut state = self.lock();
            if state.first_invalid > state.max_wanted {
                state.max_wanted = 0;
                return true;
            }
            let upper = state.max_wanted.min(line_count - 1);
            (state.first_invalid, upper)
        };
        if budget == 0 {
            return false;
        }

        let mut index = start;
        let end = upper.min(start.saturating_add(budget - 1));
        while index <= end {
            let text = self.doc.line(index);
            let hash = line_hash(&text);
            let (prev_state, stale, old_end) = {
                let state = self.lock();
                let prev_state = if index > 0 {
                    state
                        .lines
                        .get(&(index - 1))
                        .map(|entry| entry.end_state)
                        .unwrap_or_default()
                } else {
                    LexerState::default()
                };
                let entry = state.lines.get(&index);
                let stale = match entry {
                    Some(entry) => entry.hash != hash || entry.init_state != prev_state,
                    None => true,
                };
                (prev_state, stale, entry.map(|entry| entry.end_state))
            };

            if stale {
                let line = self.tokenize_line(&text, prev_state);
                if old_end == Some(line.end_state) {
                    log::trace!("highlight state settled at line {index}");
                }
                let mut state = self.lock();
                state.base_lines.insert(index, line.clone());
                state.lines.insert(index, line);
                state.first_invalid = index + 1;
            } else {
                self.lock().first_invalid = index + 1;
            }
            index += 1;
        }

        let state = self.lock();
        state.first_invalid > state.max_wanted.min(line_count - 1)
    }

    /// Relocate still-valid cache entries after `num_lines` lines were
    /// inserted (positive) or deleted (negative) at `from_line`. Entries are
    /// moved only when their content hash matches the line text at the new
    /// index; everything else is left for normal recomputation.
    pub fn shift_lines(&self, from_line: usize, num_lines: isize) {
        if num_lines == 0 {
            return;
        }
        let line_count = self.doc.line_count();
        let mut state = self.lock();
        if num_lines > 0 {
            let shift = num_lines as usize;
            for index in (from_line..line_count).rev() {
                let Some(source) = index.checked_sub(shift) else {
                    continue;
                };
                if source < from_line {
                    continue;
                }
                if let Some(entry) = state.lines.remove(&source) {
                    if entry.hash == line_hash(&self.doc.line(index)) {
                        state.lines.insert(index, entry);
                    }
                }
                if let Some(entry) = state.base_lines.remove(&source) {
                    state.base_lines.insert(index, entry);
                }
            }
        } else {
            let shift = num_lines.unsigned_abs();
            for index in from_line..line_count {
                let source = index + shift;
                if let Some(entry) = state.lines.remove(&source) {
                    if entry.hash == line_hash(&self.doc.line(index)) {
                        state.lines.insert(index, entry);
                    }
                }
                if let Some(entry) = state.base_lines.remove(&source) {
                    state.base_lines.insert(index, entry);
                }
            }
        }
    }

    /// Token kind covering `pos`, or [`TokenKind::Normal`] when the position
    /// is out of range.
    pub fn token_kind_at(&self, pos: TextPosition) -> TokenKind {
        self.token_span_at(pos).kind
    }

    /// The unique token span covering `pos` (guaranteed unique by the
    /// coverage invariant), or an empty `Normal` span when out of range.
    pub fn token_span_at(&self, pos: TextPosition) -> TokenSpan {
        if pos.line >= self.doc.line_count() {
            return TokenSpan::new(TokenKind::Normal, 0, 0);
        }
        let tokens = self.get_line(pos.line);
        for token in tokens {
            if pos.column < token.end() {
                return token;
            }
        }
        TokenSpan::new(TokenKind::Normal, 0, 0)
    }

    /// Resolve the (sub-)grammar active at `pos` from the cached line state.
    /// Uncached lines resolve to [`SyntaxId::PLAIN`].
    pub fn definition_from_position(&self, pos: TextPosition) -> SyntaxId {
        let state = {
            let cache = self.lock();
            match cache.lines.get(&pos.line) {
                Some(entry) => entry.end_state,
                None => return SyntaxId::PLAIN,
            }
        };
        self.tokenizer.definition_from_state(state)
    }

    /// Signature of the cached tokenization for `index` (0 when absent).
    pub fn line_signature(&self, index: usize) -> u64 {
        self.lock()
            .lines
            .get(&index)
            .map(TokenizedLine::signature)
            .unwrap_or(0)
    }

    /// Write a pre-computed tokenization for `index` into the cache,
    /// replacing whatever was there.
    pub fn set_line(&self, index: usize, line: TokenizedLine) {
        self.lock().lines.insert(index, line);
    }

    /// Overlay externally computed spans onto the base tokenization of
    /// `index`, splitting the covering base spans around each overlay span.
    /// Used by embedded sub-grammar highlighters that refine a sub-range of
    /// a line.
    pub fn merge_line(&self, index: usize, overlay: TokenizedLine) {
        let text = self.doc.line(index);
        let hash = line_hash(&text);
        let mut base = {
            let state = self.lock();
            state
                .base_lines
                .get(&index)
                .filter(|entry| entry.hash == hash)
                .cloned()
        }
        .unwrap_or_else(|| {
            let prev_state = {
                let state = self.lock();
                if index > 0 {
                    state
                        .lines
                        .get(&(index - 1))
                        .map(|entry| entry.end_state)
                        .unwrap_or_default()
                } else {
                    LexerState::default()
                }
            };
            let line = self.tokenize_line(&text, prev_state);
            self.lock().base_lines.insert(index, line.clone());
            line
        });

        for span in &overlay.tokens {
            let mut result = Vec::with_capacity(base.tokens.len() + 2);
            for token in &base.tokens {
                if span.start >= token.start && span.end() <= token.end() {
                    if span.start > token.start {
                        result.push(TokenSpan::new(
                            token.kind,
                            token.start,
                            span.start - token.start,
                        ));
                    }
                    result.push(*span);
                    if span.end() < token.end() {
                        result.push(TokenSpan::new(token.kind, span.end(), token.end() - span.end()));
                    }
                } else {
                    result.push(*token);
                }
            }
            base.tokens = result;
        }

        self.lock().lines.insert(index, base);
    }

    /// Drain every invalid line on a plain worker thread. Returns `None` if
    /// a drain is already running. `reset()` cancels cooperatively.
    pub fn tokenize_in_background(
        self: &Arc<Self>,
        on_done: Option<Box<dyn FnOnce() + Send>>,
    ) -> Option<JoinHandle<()>> {
        if self
            .background_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let this = Arc::clone(self);
        Some(std::thread::spawn(move || {
            let start = this.first_invalid_line();
            let line_count = this.doc.line_count();
            for index in start..line_count {
                if this.stop_background.load(Ordering::Acquire) {
                    break;
                }
                this.get_line(index);
            }
            log::debug!("background tokenization finished at line {line_count}");
            this.stop_background.store(false, Ordering::Release);
            this.background_running.store(false, Ordering::Release);
            if let Some(on_done) = on_done {
                on_done();
            }
        }))
    }

    fn tokenize_line(&self, text: &str, init_state: LexerState) -> TokenizedLine {
        let len = text.chars().count();
        let max_len = self.max_tokenization_length();
        if max_len != 0 && len > max_len {
            // Pathologically long line: serve plain chunks, keep the state
            // flowing through unchanged.
            let mut tokens = Vec::with_capacity(len / max_len + 1);
            let mut pos = 0;
            while pos < len {
                let chunk = max_len.min(len - pos);
                tokens.push(TokenSpan::new(TokenKind::Normal, pos, chunk));
                pos += chunk;
            }
            return TokenizedLine {
                init_state,
                hash: line_hash(text),
                tokens,
                end_state: init_state,
            };
        }
        let (tokens, end_state) = self.tokenizer.tokenize(text, init_state);
        TokenizedLine {
            init_state,
            hash: line_hash(text),
            tokens: normalize_spans(tokens, len),
            end_state,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
