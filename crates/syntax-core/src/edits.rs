//! Edit integration.
//!
//! A document edit invalidates derived state in all three services, and the
//! caches only stay coherent when the resulting calls happen in the right
//! order: highlighter cache relocation and invalidation first, fold-region
//! shifts before any post-edit fold query, wrap updates over exactly the
//! edited logical range. [`EditPipeline`] centralizes that ordering.

use std::sync::Arc;

use crate::folding::{FoldRangeService, ShiftError};
use crate::highlighter::SyntaxHighlighter;
use crate::wrap::LineWrapping;

/// Fans document edit notifications out to the highlighter, fold service,
/// and wrapping in the order their contracts require.
///
/// Owns the [`LineWrapping`] (UI-thread state); the shared services are held
/// through `Arc` and may also be driven from worker threads.
pub struct EditPipeline {
    highlighter: Arc<SyntaxHighlighter>,
    folds: Arc<FoldRangeService>,
    wrapping: LineWrapping,
}

impl EditPipeline {
    /// Bundle the three services.
    pub fn new(
        highlighter: Arc<SyntaxHighlighter>,
        folds: Arc<FoldRangeService>,
        wrapping: LineWrapping,
    ) -> Self {
        Self {
            highlighter,
            folds,
            wrapping,
        }
    }

    /// The wrapped [`LineWrapping`], for mapping queries.
    pub fn wrapping(&self) -> &LineWrapping {
        &self.wrapping
    }

    /// Mutable access to the wrapping (config/width changes).
    pub fn wrapping_mut(&mut self) -> &mut LineWrapping {
        &mut self.wrapping
    }

    /// `count` lines were inserted so that the first of them is line `at`
    /// (the document already reflects the edit).
    ///
    /// Multiple edits must be reported in ascending line order.
    pub fn lines_inserted(&mut self, at: usize, count: usize) -> Result<(), ShiftError> {
        if count == 0 {
            return Ok(());
        }
        let delta = count as isize;
        self.highlighter.shift_lines(at, delta);
        self.highlighter.invalidate(at.saturating_sub(1));
        self.folds.shift_folding_regions(at, delta)?;
        // The line holding the insertion point changed content; the inserted
        // lines are new.
        let from = at.saturating_sub(1);
        self.wrapping.update_breaks(from, from, delta);
        Ok(())
    }

    /// `count` lines starting at line `at` were deleted (the document
    /// already reflects the edit).
    pub fn lines_deleted(&mut self, at: usize, count: usize) -> Result<(), ShiftError> {
        if count == 0 {
            return Ok(());
        }
        let delta = -(count as isize);
        self.highlighter.shift_lines(at, delta);
        self.highlighter.invalidate(at.saturating_sub(1));
        self.folds.shift_folding_regions(at, delta)?;
        let from = at.saturating_sub(1);
        self.wrapping.update_breaks(from, from + count, delta);
        Ok(())
    }

    /// The content of line `index` changed in place.
    pub fn line_changed(&mut self, index: usize) {
        self.highlighter.invalidate(index);
        self.wrapping.update_breaks(index, index, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextBuffer;
    use crate::folding::FoldConfig;
    use crate::position::{TextPosition, TextRange};
    use crate::tokenizer::{LexerState, TokenKind, TokenSpan, Tokenize};
    use crate::wrap::{FontStyle, MonospaceMetrics, WrapConfig};

    struct PlainTokenizer;

    impl Tokenize for PlainTokenizer {
        fn tokenize(&self, text: &str, state: LexerState) -> (Vec<TokenSpan>, LexerState) {
            (
                vec![TokenSpan::new(TokenKind::Normal, 0, text.chars().count())],
                state,
            )
        }
    }

    fn pipeline(doc: Arc<TextBuffer>) -> EditPipeline {
        let highlighter = Arc::new(SyntaxHighlighter::new(doc.clone(), Arc::new(PlainTokenizer)));
        let folds = Arc::new(FoldRangeService::new(doc.clone(), FoldConfig::braces()));
        let wrapping = LineWrapping::new(
            doc,
            Arc::new(MonospaceMetrics::columns()),
            FontStyle::default(),
            WrapConfig::default(),
        );
        EditPipeline::new(highlighter, folds, wrapping)
    }

    #[test]
    fn test_delete_past_start_surfaces_shift_error() {
        let doc = Arc::new(TextBuffer::from_text("a\nb\nc\nd"));
        let mut pipeline = pipeline(doc.clone());
        pipeline.folds.add_fold_region(TextRange::new(
            TextPosition::new(1, 0),
            TextPosition::new(3, 0),
        ));
        // A deletion claiming more removed lines than exist above the region.
        let result = pipeline.lines_deleted(0, 2);
        assert!(result.is_err());
    }

    #[test]
    fn test_insert_shifts_folds_and_invalidates_highlight() {
        let doc = Arc::new(TextBuffer::from_text("a\nb\nc\nd\ne"));
        let mut pipeline = pipeline(doc.clone());
        pipeline.folds.add_fold_region(TextRange::new(
            TextPosition::new(3, 0),
            TextPosition::new(4, 0),
        ));
        pipeline.highlighter.get_line(4);
        pipeline.lines_inserted(2, 1).unwrap();
        assert!(pipeline.folds.is_folding_region_in_line(4));
        assert!(!pipeline.folds.is_folding_region_in_line(3));
        assert!(pipeline.highlighter.first_invalid_line() <= 1);
    }
}
