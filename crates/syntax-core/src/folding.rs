//! Fold-region detection and bookkeeping.
//!
//! [`FoldRangeService`] owns a line-indexed map of collapsible source ranges
//! and keeps it valid across edits, independent of rendering. Regions are
//! keyed by start line; at most one region per start line (last write wins).
//!
//! Detection runs one strategy, selected by the document's grammar: balanced
//! brace pairs, indentation decreases, matching markup tags, or markdown
//! sections. An external [`FoldRangeProvider`] (an LSP client, typically)
//! pre-empts the internal scan entirely when present.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;

use crate::document::Document;
use crate::highlighter::SyntaxHighlighter;
use crate::position::{TextPosition, TextRange};
use crate::tokenizer::TokenKind;

/// Fold detection strategy selected by the active grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoldRangeType {
    /// Folding disabled for this grammar.
    #[default]
    Undefined,
    /// Balanced delimiter pairs spanning more than one line.
    Braces,
    /// Regions bounded by indentation decreases.
    Indentation,
    /// Matching markup open/close tags.
    Tag,
    /// Markdown heading sections and fenced code blocks.
    Markdown,
}

/// Grammar-supplied fold configuration (dependency-injected, never global).
#[derive(Debug, Clone, Default)]
pub struct FoldConfig {
    /// Active strategy.
    pub kind: FoldRangeType,
    /// Delimiter pairs for [`FoldRangeType::Braces`].
    pub braces: Vec<(char, char)>,
}

impl FoldConfig {
    /// Brace folding over `{}`, `[]` and `()`.
    pub fn braces() -> Self {
        Self {
            kind: FoldRangeType::Braces,
            braces: vec![('{', '}'), ('[', ']'), ('(', ')')],
        }
    }

    /// Indentation folding.
    pub fn indentation() -> Self {
        Self {
            kind: FoldRangeType::Indentation,
            braces: Vec::new(),
        }
    }

    /// Markup tag folding.
    pub fn tag() -> Self {
        Self {
            kind: FoldRangeType::Tag,
            braces: Vec::new(),
        }
    }

    /// Markdown folding.
    pub fn markdown() -> Self {
        Self {
            kind: FoldRangeType::Markdown,
            braces: Vec::new(),
        }
    }
}

/// External fold-range source that pre-empts the internal scan.
pub trait FoldRangeProvider: Send + Sync {
    /// Whether the provider can currently supply fold ranges.
    fn folding_range_provider(&self) -> bool;

    /// Ask the provider to compute fold ranges; it reports results back
    /// through [`FoldRangeService::set_folding_regions`].
    fn request_fold_range(&self);
}

/// Error surfaced when an edit-driven shift would corrupt the region map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShiftError {
    /// The shift would move a region endpoint below line 0.
    #[error("shifting fold regions from line {from_line} by {num_lines} would produce a negative line index")]
    NegativeLine {
        /// First affected line.
        from_line: usize,
        /// Shift amount.
        num_lines: isize,
    },
}

/// Line-keyed fold-region cache with strategy-driven detection.
pub struct FoldRangeService {
    doc: Arc<dyn Document>,
    config: Mutex<FoldConfig>,
    regions: Mutex<HashMap<usize, TextRange>>,
    highlighter: Mutex<Option<Arc<SyntaxHighlighter>>>,
    provider: Mutex<Option<Arc<dyn FoldRangeProvider>>>,
    enabled: AtomicBool,
}

impl FoldRangeService {
    /// Create a service over `doc` with the grammar's fold configuration.
    pub fn new(doc: Arc<dyn Document>, config: FoldConfig) -> Self {
        Self {
            doc,
            config: Mutex::new(config),
            regions: Mutex::new(HashMap::new()),
            highlighter: Mutex::new(None),
            provider: Mutex::new(None),
            enabled: AtomicBool::new(true),
        }
    }

    /// Attach a highlighter so the brace scan can skip delimiters inside
    /// strings and comments.
    pub fn set_highlighter(&self, highlighter: Option<Arc<SyntaxHighlighter>>) {
        *self.lock(&self.highlighter) = highlighter;
    }

    /// Replace the grammar fold configuration (grammar change). Drops all
    /// cached regions.
    pub fn set_config(&self, config: FoldConfig) {
        *self.lock(&self.config) = config;
        self.clear();
    }

    /// Whether fold detection is currently possible.
    pub fn can_fold(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        if let Some(provider) = self.lock(&self.provider).as_ref()
            && provider.folding_range_provider()
        {
            return true;
        }
        self.lock(&self.config).kind != FoldRangeType::Undefined
    }

    /// Run fold detection: the external provider when present, otherwise the
    /// grammar's strategy. Results replace the current region set.
    pub fn find_regions(&self) {
        if !self.can_fold() {
            return;
        }
        let provider = self.lock(&self.provider).clone();
        if let Some(provider) = provider
            && provider.folding_range_provider()
        {
            provider.request_fold_range();
            return;
        }
        self.find_regions_native();
    }

    /// Run the internal strategy scan, ignoring any provider.
    pub fn find_regions_native(&self) {
        if !self.can_fold() {
            return;
        }
        let started = Instant::now();
        let config = self.lock(&self.config).clone();
        let regions = match config.kind {
            FoldRangeType::Braces => self.scan_braces(&config.braces),
            FoldRangeType::Indentation => self.scan_indentation(),
            FoldRangeType::Tag => self.scan_tags(),
            FoldRangeType::Markdown => self.scan_markdown(),
            FoldRangeType::Undefined => return,
        };
        log::debug!(
            "fold scan ({:?}) found {} regions in {:?}",
            config.kind,
            regions.len(),
            started.elapsed()
        );
        self.set_folding_regions(regions);
    }

    /// Region starting at line `index`, if any.
    pub fn find(&self, index: usize) -> Option<TextRange> {
        self.lock(&self.regions).get(&index).copied()
    }

    /// Cheaper existence check for a region starting at line `index`.
    pub fn is_folding_region_in_line(&self, index: usize) -> bool {
        self.lock(&self.regions).contains_key(&index)
    }

    /// Add one region, normalizing a malformed (end < start) range in place.
    pub fn add_fold_region(&self, mut region: TextRange) {
        region.normalize();
        self.lock(&self.regions).insert(region.start.line, region);
    }

    /// Remove the region starting at line `index`, if any.
    pub fn remove_folded_region(&self, index: usize) -> Option<TextRange> {
        self.lock(&self.regions).remove(&index)
    }

    /// Bulk-replace all regions (keyed by start line, last write wins).
    pub fn set_folding_regions(&self, mut regions: Vec<TextRange>) {
        regions.sort();
        let mut map = HashMap::with_capacity(regions.len());
        for mut region in regions {
            region.normalize();
            map.insert(region.start.line, region);
        }
        *self.lock(&self.regions) = map;
    }

    /// Shift every region with start line >= `from_line` by `num_lines`
    /// (both endpoints). Must run immediately after an insert/delete at
    /// `from_line`, before any post-edit query is trusted.
    ///
    /// A shift that would drive any affected endpoint below line 0 is
    /// rejected without mutating the map.
    pub fn shift_folding_regions(&self, from_line: usize, num_lines: isize) -> Result<(), ShiftError> {
        if num_lines == 0 {
            return Ok(());
        }
        let mut regions = self.lock(&self.regions);
        if num_lines < 0 {
            let shift = num_lines.unsigned_abs();
            let corrupting = regions.values().any(|region| {
                region.start.line >= from_line && region.start.line < shift
            });
            if corrupting {
                return Err(ShiftError::NegativeLine {
                    from_line,
                    num_lines,
                });
            }
        }
        let mut shifted = HashMap::with_capacity(regions.len());
        for region in regions.values() {
            let mut region = *region;
            if region.start.line >= from_line {
                region.start.line = region.start.line.checked_add_signed(num_lines).unwrap_or(0);
                region.end.line = region.end.line.checked_add_signed(num_lines).unwrap_or(0);
            }
            shifted.insert(region.start.line, region);
        }
        *regions = shifted;
        Ok(())
    }

    /// Drop all regions (grammar change, full reload).
    pub fn clear(&self) {
        self.lock(&self.regions).clear();
    }

    /// Whether no regions are currently known.
    pub fn is_empty(&self) -> bool {
        self.lock(&self.regions).is_empty()
    }

    /// Number of known regions.
    pub fn len(&self) -> usize {
        self.lock(&self.regions).len()
    }

    /// Currently attached provider, if any.
    pub fn provider(&self) -> Option<Arc<dyn FoldRangeProvider>> {
        self.lock(&self.provider).clone()
    }

    /// Attach or detach an external provider. Detaching drops all regions
    /// the provider reported.
    pub fn set_provider(&self, provider: Option<Arc<dyn FoldRangeProvider>>) {
        let detached = provider.is_none();
        *self.lock(&self.provider) = provider;
        if detached {
            self.clear();
        }
    }

    /// Whether the service is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable the service.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn scan_braces(&self, braces: &[(char, char)]) -> Vec<TextRange> {
        let mut regions = Vec::new();
        let line_count = self.doc.line_count();
        if line_count <= 1 || braces.is_empty() {
            return regions;
        }
        let highlighter = self.lock(&self.highlighter).clone();
        let literal = |pos: TextPosition| {
            highlighter.as_ref().is_some_and(|h| {
                matches!(h.token_kind_at(pos), TokenKind::String | TokenKind::Comment)
            })
        };
        let mut stack: Vec<TextPosition> = Vec::new();
        for line_idx in 0..line_count {
            let line = self.doc.line(line_idx);
            for (col_idx, ch) in line.chars().enumerate() {
                for &(open, close) in braces {
                    let pos = TextPosition::new(line_idx, col_idx);
                    if ch == open {
                        if !literal(pos) {
                            stack.push(pos);
                        }
                    } else if ch == close && !stack.is_empty() && !literal(pos) {
                        if let Some(start) = stack.pop()
                            && start.line != line_idx
                        {
                            regions.push(TextRange::new(start, pos));
                        }
                    }
                }
            }
        }
        regions
    }

    fn scan_indentation(&self) -> Vec<TextRange> {
        let mut regions = Vec::new();
        let line_count = self.doc.line_count();
        if line_count <= 1 {
            return regions;
        }
        // Stack entries are (start line, indent level at the block header).
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut current_indent = 0usize;
        for line_idx in 0..line_count {
            let line = self.doc.line(line_idx);
            let new_indent = line
                .chars()
                .take_while(|&ch| ch == ' ' || ch == '\t')
                .count();
            if new_indent > current_indent && line_idx > 0 {
                // Block starts at the previous line.
                stack.push((line_idx - 1, current_indent));
            } else if new_indent < current_indent {
                while let Some(&(start, indent)) = stack.last() {
                    if indent < new_indent {
                        break;
                    }
                    stack.pop();
                    if start < line_idx {
                        regions.push(TextRange::new(
                            TextPosition::new(start, 0),
                            TextPosition::new(line_idx - 1, 0),
                        ));
                    }
                }
            }
            current_indent = new_indent;
        }
        while let Some((start, _)) = stack.pop() {
            regions.push(TextRange::new(
                TextPosition::new(start, 0),
                TextPosition::new(line_count - 1, 0),
            ));
        }
        regions
    }

    fn scan_tags(&self) -> Vec<TextRange> {
        let mut regions = Vec::new();
        let line_count = self.doc.line_count();
        if line_count <= 1 {
            return regions;
        }
        // Stack entries are (tag name, open position).
        let mut stack: Vec<(String, TextPosition)> = Vec::new();
        for line_idx in 0..line_count {
            let line: Vec<char> = self.doc.line(line_idx).chars().collect();
            let mut col = 0usize;
            while col < line.len() {
                if line[col] != '<' {
                    col += 1;
                    continue;
                }
                let closing = col + 1 < line.len() && line[col + 1] == '/';
                let name_start = col + if closing { 2 } else { 1 };
                let mut name_end = name_start;
                while name_end < line.len()
                    && (line[name_end].is_alphanumeric() || line[name_end] == '-')
                {
                    name_end += 1;
                }
                if name_end == name_start {
                    // Not a tag (`<!--`, `<?`, stray `<`).
                    col += 1;
                    continue;
                }
                let name: String = line[name_start..name_end].iter().collect();
                let mut gt = name_end;
                while gt < line.len() && line[gt] != '>' {
                    gt += 1;
                }
                let self_closing = gt > 0 && gt < line.len() && line[gt - 1] == '/';
                if closing {
                    if let Some(top) = stack.iter().rposition(|(n, _)| *n == name) {
                        let (_, open_pos) = stack.remove(top);
                        if open_pos.line != line_idx {
                            regions.push(TextRange::new(
                                open_pos,
                                TextPosition::new(line_idx, col),
                            ));
                        }
                    }
                } else if !self_closing {
                    stack.push((name, TextPosition::new(line_idx, col)));
                }
                col = if gt < line.len() { gt + 1 } else { line.len() };
            }
        }
        regions
    }

    fn scan_markdown(&self) -> Vec<TextRange> {
        let mut regions = Vec::new();
        let line_count = self.doc.line_count();
        if line_count <= 1 {
            return regions;
        }
        // Open heading sections as (line, level).
        let mut sections: Vec<(usize, usize)> = Vec::new();
        let mut code_block_start: Option<usize> = None;
        for line_idx in 0..line_count {
            let line = self.doc.line(line_idx);
            let trimmed = line.trim();
            if let Some(start) = code_block_start {
                if trimmed.starts_with("```") {
                    if start < line_idx {
                        regions.push(TextRange::new(
                            TextPosition::new(start, 0),
                            TextPosition::new(line_idx - 1, 0),
                        ));
                    }
                    code_block_start = None;
                }
                continue;
            }
            if trimmed.starts_with("```") {
                code_block_start = Some(line_idx);
            } else if trimmed.starts_with('#') {
                let hashes = trimmed.chars().take_while(|&ch| ch == '#').count();
                let heading = hashes <= 6 && trimmed.chars().nth(hashes) == Some(' ');
                if heading {
                    while let Some(&(heading_line, level)) = sections.last() {
                        if level < hashes {
                            break;
                        }
                        sections.pop();
                        if heading_line < line_idx {
                            regions.push(TextRange::new(
                                TextPosition::new(heading_line, 0),
                                TextPosition::new(line_idx - 1, 0),
                            ));
                        }
                    }
                    sections.push((line_idx, hashes));
                }
            }
        }
        while let Some((heading_line, _)) = sections.pop() {
            regions.push(TextRange::new(
                TextPosition::new(heading_line, 0),
                TextPosition::new(line_count - 1, 0),
            ));
        }
        if let Some(start) = code_block_start {
            regions.push(TextRange::new(
                TextPosition::new(start, 0),
                TextPosition::new(line_count - 1, 0),
            ));
        }
        regions
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
