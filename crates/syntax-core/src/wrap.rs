//! Soft line wrapping.
//!
//! Two layers: [`compute_line_breaks`] is a pure function deciding, for one
//! logical line, the columns where it splits into visual sub-lines given a
//! maximum width and a wrap policy; [`LineWrapping`] maintains the resulting
//! logical-to-visual line-index mapping over a whole document, updating it
//! incrementally after edits.
//!
//! `LineWrapping` performs no internal locking and is intended for the UI
//! thread; callers that share it across threads must synchronize externally.

use std::sync::Arc;

use unicode_width::UnicodeWidthChar;

use crate::document::Document;
use crate::position::{TextPosition, TextRange};

/// Soft wrapping policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// Never break a logical line.
    #[default]
    NoWrap,
    /// Break at the last character whose cumulative advance still fits.
    Letter,
    /// Break at the last word boundary at or before the fitting column,
    /// falling back to a letter break when a single word exceeds the width.
    Word,
}

impl WrapMode {
    /// Parse a configuration string (`"word"`, `"letter"`, anything else is
    /// no-wrap).
    pub fn from_config(mode: &str) -> Self {
        match mode.to_ascii_lowercase().as_str() {
            "word" => WrapMode::Word,
            "letter" => WrapMode::Letter,
            _ => WrapMode::NoWrap,
        }
    }

    /// Configuration string for this mode.
    pub fn as_config(&self) -> &'static str {
        match self {
            WrapMode::Word => "word",
            WrapMode::Letter => "letter",
            WrapMode::NoWrap => "nowrap",
        }
    }
}

/// Font style inputs to metric queries.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontStyle {
    /// Point size (or any consistent scale factor).
    pub size: f32,
    /// Bold face.
    pub bold: bool,
    /// Italic face.
    pub italic: bool,
}

/// Glyph metric source for wrapping decisions.
///
/// Implementations must be pure with respect to `(ch, style)`.
pub trait FontMetrics: Send + Sync {
    /// Horizontal advance of `ch` at `style`.
    fn advance(&self, ch: char, style: FontStyle) -> f32;

    /// Advance of one tab stop unit at `style`; a `'\t'` advances by this
    /// times the configured tab width.
    fn tab_advance(&self, style: FontStyle) -> f32 {
        self.advance(' ', style)
    }
}

/// Cell-based metrics for monospace rendering: every glyph advances by its
/// UAX #11 column width times a fixed cell size.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMetrics {
    /// Width of one cell.
    pub cell: f32,
}

impl MonospaceMetrics {
    /// Metrics with a cell size of 1.0 (columns).
    pub fn columns() -> Self {
        Self { cell: 1.0 }
    }
}

impl FontMetrics for MonospaceMetrics {
    fn advance(&self, ch: char, _style: FontStyle) -> f32 {
        UnicodeWidthChar::width(ch).unwrap_or(1) as f32 * self.cell
    }

    fn tab_advance(&self, _style: FontStyle) -> f32 {
        self.cell
    }
}

/// Per-logical-line wrap result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WrapInfo {
    /// Strictly increasing break columns; the implicit leading column 0 is
    /// not stored. A line renders as `breaks.len() + 1` visual lines.
    pub breaks: Vec<usize>,
    /// Measured width of the line's leading whitespace when indentation is
    /// kept; continuation sub-lines start at this offset.
    pub padding_start: f32,
}

impl WrapInfo {
    /// Number of visual lines this logical line occupies.
    pub fn visual_count(&self) -> usize {
        self.breaks.len() + 1
    }
}

/// Wrapping configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WrapConfig {
    /// Wrap policy.
    pub mode: WrapMode,
    /// Align continuation sub-lines under the first non-whitespace character.
    pub keep_indentation: bool,
    /// Tab width in tab stop units.
    pub tab_width: usize,
}

impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            mode: WrapMode::NoWrap,
            keep_indentation: true,
            tab_width: 4,
        }
    }
}

/// Compute the wrap breaks for one line of text. Pure and stateless.
///
/// Guarantees: returned break columns are strictly increasing and the
/// computation always terminates; a glyph with zero (or pathological)
/// advance still consumes one character per break decision.
pub fn compute_line_breaks(
    text: &str,
    metrics: &dyn FontMetrics,
    style: FontStyle,
    max_width: f32,
    mode: WrapMode,
    keep_indentation: bool,
    tab_width: usize,
) -> WrapInfo {
    let mut info = WrapInfo::default();
    if text.is_empty() || mode == WrapMode::NoWrap || max_width <= 0.0 {
        return info;
    }

    let tab = metrics.tab_advance(style) * tab_width.max(1) as f32;
    let char_advance = |ch: char| -> f32 {
        match ch {
            '\t' => tab,
            '\r' => 0.0,
            _ => metrics.advance(ch, style),
        }
    };

    if keep_indentation {
        info.padding_start = text
            .chars()
            .take_while(|ch| ch.is_whitespace())
            .map(char_advance)
            .sum();
        // Indentation wider than the viewport would leave no room at all.
        if info.padding_start >= max_width {
            info.padding_start = 0.0;
        }
    }

    let mut x = 0.0f32;
    // Width of the segment up to and including the last break opportunity.
    let mut width_at_boundary = 0.0f32;
    let mut boundary: Option<usize> = None;
    let mut last_break = 0usize;

    for (idx, ch) in text.chars().enumerate() {
        let advance = char_advance(ch);
        x += advance;

        if x > max_width && idx > last_break {
            if mode == WrapMode::Word
                && let Some(space) = boundary
                && space + 1 > last_break
            {
                info.breaks.push(space + 1);
                last_break = space + 1;
                x = info.padding_start + (x - width_at_boundary);
            } else {
                info.breaks.push(idx);
                last_break = idx;
                x = info.padding_start + advance;
            }
            boundary = None;
        } else if matches!(ch, ' ' | '.' | '-' | ',') {
            boundary = Some(idx);
            width_at_boundary = x;
        }
    }

    info
}

/// Stateful logical-to-visual mapping over a document.
pub struct LineWrapping {
    doc: Arc<dyn Document>,
    metrics: Arc<dyn FontMetrics>,
    font_style: FontStyle,
    config: WrapConfig,
    max_width: f32,
    /// Visual index -> (logical line, start column).
    wrapped_lines: Vec<TextPosition>,
    /// Logical line -> first visual index.
    first_visual: Vec<usize>,
    /// Logical line -> continuation padding.
    line_padding: Vec<f32>,
}

impl LineWrapping {
    /// Create a mapping; no layout exists until a width is set.
    pub fn new(
        doc: Arc<dyn Document>,
        metrics: Arc<dyn FontMetrics>,
        font_style: FontStyle,
        config: WrapConfig,
    ) -> Self {
        Self {
            doc,
            metrics,
            font_style,
            config,
            max_width: 0.0,
            wrapped_lines: Vec::new(),
            first_visual: Vec::new(),
            line_padding: Vec::new(),
        }
    }

    /// Whether wrapping is active at all.
    pub fn is_wrap_enabled(&self) -> bool {
        self.config.mode != WrapMode::NoWrap
    }

    /// Current configuration.
    pub fn config(&self) -> WrapConfig {
        self.config
    }

    /// Replace the configuration; any change rebuilds the whole layout
    /// (wrap decisions are a pure function of text and policy).
    pub fn set_config(&mut self, config: WrapConfig) {
        if config != self.config {
            self.config = config;
            self.reconstruct_breaks();
        }
    }

    /// Set the available width; a change rebuilds the whole layout.
    pub fn set_max_width(&mut self, max_width: f32) {
        if max_width != self.max_width {
            self.max_width = max_width;
            self.reconstruct_breaks();
        }
    }

    /// Replace the font style; a change rebuilds the whole layout.
    pub fn set_font_style(&mut self, font_style: FontStyle) {
        if font_style != self.font_style {
            self.font_style = font_style;
            self.reconstruct_breaks();
        }
    }

    /// Total visual line count.
    pub fn total_lines(&self) -> usize {
        if !self.is_wrap_enabled() || self.wrapped_lines.is_empty() {
            self.doc.line_count()
        } else {
            self.wrapped_lines.len()
        }
    }

    /// Recompute the entire mapping from the document.
    pub fn reconstruct_breaks(&mut self) {
        self.wrapped_lines.clear();
        self.first_visual.clear();
        self.line_padding.clear();
        if !self.is_wrap_enabled() || self.max_width <= 0.0 {
            return;
        }
        let line_count = self.doc.line_count();
        self.wrapped_lines.reserve(line_count);
        self.first_visual.reserve(line_count);
        self.line_padding.reserve(line_count);
        for line in 0..line_count {
            let info = self.breaks_for_line(line);
            self.first_visual.push(self.wrapped_lines.len());
            self.line_padding.push(info.padding_start);
            self.wrapped_lines.push(TextPosition::new(line, 0));
            for &col in &info.breaks {
                self.wrapped_lines.push(TextPosition::new(line, col));
            }
        }
    }

    /// Recompute breaks for the edited logical range `[from_line, to_line]`
    /// (pre-edit numbering), where the edit changed the document by
    /// `num_lines` lines, then shift all subsequent visual entries by the
    /// resulting delta. O(edited range), not O(document).
    ///
    /// Multiple edits must be applied in ascending `from_line` order.
    pub fn update_breaks(&mut self, from_line: usize, to_line: usize, num_lines: isize) {
        if !self.is_wrap_enabled() || self.max_width <= 0.0 {
            return;
        }
        if self.wrapped_lines.is_empty() {
            self.reconstruct_breaks();
            return;
        }
        let from_line = from_line.min(self.first_visual.len().saturating_sub(1));
        let to_line = to_line.min(self.first_visual.len().saturating_sub(1)).max(from_line);

        let old_idx_from = self.to_wrapped_index(from_line, false);
        let old_idx_to = self.to_wrapped_index(to_line, true);

        self.wrapped_lines.drain(old_idx_from..=old_idx_to);
        self.line_padding.drain(from_line..=to_line);

        // Shift surviving entries into post-edit numbering.
        if num_lines != 0 {
            for pos in self.wrapped_lines.iter_mut().skip(old_idx_from) {
                pos.line = pos.line.checked_add_signed(num_lines).unwrap_or(0);
            }
        }

        // Splice in the recomputed range.
        let last_recomputed = to_line as isize + num_lines;
        let mut insert_at = old_idx_from;
        let mut line = from_line;
        while (line as isize) <= last_recomputed {
            let info = self.breaks_for_line(line);
            self.line_padding.insert(line, info.padding_start);
            self.wrapped_lines.insert(insert_at, TextPosition::new(line, 0));
            insert_at += 1;
            for &col in &info.breaks {
                self.wrapped_lines.insert(insert_at, TextPosition::new(line, col));
                insert_at += 1;
            }
            line += 1;
        }

        // Rebuild the logical -> first-visual map from the splice point on.
        let line_count = self.doc.line_count();
        self.first_visual.truncate(from_line);
        self.first_visual.resize(line_count, 0);
        let mut logical = from_line;
        for visual in old_idx_from..self.wrapped_lines.len() {
            if self.wrapped_lines[visual].column == 0 {
                if logical < line_count {
                    self.first_visual[logical] = visual;
                }
                logical += 1;
            }
        }
        self.first_visual.truncate(line_count);
    }

    /// First (or, with `return_last`, last) visual index of a logical line.
    /// Identity when wrapping is off.
    pub fn to_wrapped_index(&self, doc_line: usize, return_last: bool) -> usize {
        if !self.is_wrap_enabled() || self.first_visual.is_empty() {
            return doc_line;
        }
        let clamped = doc_line.min(self.first_visual.len() - 1);
        if return_last {
            // Binary search for the first visual entry past this line.
            self.wrapped_lines
                .partition_point(|pos| pos.line <= clamped)
                .saturating_sub(1)
        } else {
            self.first_visual[clamped]
        }
    }

    /// Whether a logical line wraps into more than one visual line.
    pub fn is_wrapped_line(&self, doc_line: usize) -> bool {
        self.is_wrap_enabled()
            && self.to_wrapped_index(doc_line, false) != self.to_wrapped_index(doc_line, true)
    }

    /// Logical position at which a visual line starts. Identity when
    /// wrapping is off.
    pub fn document_line(&self, visual_index: usize) -> TextPosition {
        if !self.is_wrap_enabled() || self.wrapped_lines.is_empty() {
            return TextPosition::new(visual_index, 0);
        }
        let clamped = visual_index.min(self.wrapped_lines.len() - 1);
        self.wrapped_lines[clamped]
    }

    /// Continuation padding for a logical line (0 when wrapping is off).
    pub fn line_offset(&self, doc_line: usize) -> f32 {
        if !self.is_wrap_enabled() || self.line_padding.is_empty() {
            return 0.0;
        }
        self.line_padding[doc_line.min(self.line_padding.len() - 1)]
    }

    /// The source range covered by one visual line.
    pub fn visual_line_range(&self, visual_index: usize) -> TextRange {
        let start = self.document_line(visual_index);
        let end_col = if self.is_wrap_enabled()
            && visual_index + 1 < self.wrapped_lines.len()
            && self.wrapped_lines[visual_index + 1].line == start.line
        {
            self.wrapped_lines[visual_index + 1].column
        } else {
            self.doc.line(start.line).chars().count()
        };
        TextRange::new(start, TextPosition::new(start.line, end_col))
    }

    fn breaks_for_line(&self, line: usize) -> WrapInfo {
        compute_line_breaks(
            &self.doc.line(line),
            self.metrics.as_ref(),
            self.font_style,
            self.max_width,
            self.config.mode,
            self.config.keep_indentation,
            self.config.tab_width,
        )
    }
}
