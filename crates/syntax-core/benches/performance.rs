use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use syntax_core::{
    FoldConfig, FoldRangeService, FontStyle, LexerState, LineWrapping, MonospaceMetrics,
    SyntaxHighlighter, TextBuffer, TokenKind, TokenSpan, Tokenize, WrapConfig, WrapMode,
};

/// Cheap word-classifying tokenizer so the benches measure the cache and the
/// mapping machinery, not an expensive grammar.
struct WordTokenizer;

impl Tokenize for WordTokenizer {
    fn tokenize(&self, text: &str, state: LexerState) -> (Vec<TokenSpan>, LexerState) {
        let mut spans = Vec::new();
        let mut start = 0usize;
        let mut col = 0usize;
        for ch in text.chars() {
            if ch == ' ' {
                if col > start {
                    spans.push(TokenSpan::new(TokenKind::Normal, start, col - start));
                }
                spans.push(TokenSpan::new(TokenKind::Symbol, col, 1));
                start = col + 1;
            }
            col += 1;
        }
        if col > start {
            spans.push(TokenSpan::new(TokenKind::Normal, start, col - start));
        }
        (spans, state)
    }
}

fn large_text(line_count: usize) -> String {
    let words = ["let", "value", "return", "match", "buffer", "index", "while"];
    let mut rng = StdRng::seed_from_u64(42);
    let mut out = String::with_capacity(line_count * 48);
    for i in 0..line_count {
        out.push_str(&format!("{i:06}"));
        for _ in 0..rng.gen_range(4..10) {
            out.push(' ');
            out.push_str(words[rng.gen_range(0..words.len())]);
        }
        out.push('\n');
    }
    // Remove the final '\n' to avoid creating an extra trailing empty line.
    out.pop();
    out
}

fn bench_cold_highlight(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("highlight_cold/50k_lines", |b| {
        b.iter_batched(
            || {
                let doc = Arc::new(TextBuffer::from_text(&text));
                SyntaxHighlighter::new(doc, Arc::new(WordTokenizer))
            },
            |highlighter| {
                for line in 0..50_000 {
                    black_box(highlighter.get_line(line));
                }
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_incremental_rehighlight(c: &mut Criterion) {
    let text = large_text(50_000);
    let doc = Arc::new(TextBuffer::from_text(&text));
    let highlighter = SyntaxHighlighter::new(doc.clone(), Arc::new(WordTokenizer));
    for line in 0..50_000 {
        highlighter.get_line(line);
    }

    c.bench_function("highlight_incremental/mid_edit", |b| {
        b.iter(|| {
            doc.set_line(25_000, "edited while benchmarking");
            highlighter.invalidate(25_000);
            while !highlighter.update_dirty(64) {}
            black_box(highlighter.get_line(25_000));
        })
    });
}

fn bench_fold_scan(c: &mut Criterion) {
    let mut text = String::new();
    for i in 0..10_000 {
        text.push_str(&format!("fn item_{i}() {{\n    body();\n}}\n"));
    }
    text.pop();
    let doc = Arc::new(TextBuffer::from_text(&text));
    let service = FoldRangeService::new(doc, FoldConfig::braces());

    c.bench_function("fold_scan/10k_blocks", |b| {
        b.iter(|| {
            service.find_regions_native();
            black_box(service.len());
        })
    });
}

fn bench_wrap_reconstruct(c: &mut Criterion) {
    let text = large_text(50_000);
    let doc = Arc::new(TextBuffer::from_text(&text));
    let config = WrapConfig {
        mode: WrapMode::Word,
        keep_indentation: true,
        tab_width: 4,
    };

    c.bench_function("wrap_reconstruct/50k_lines", |b| {
        b.iter_batched(
            || {
                LineWrapping::new(
                    doc.clone(),
                    Arc::new(MonospaceMetrics::columns()),
                    FontStyle::default(),
                    config,
                )
            },
            |mut wrapping| {
                wrapping.set_max_width(40.0);
                black_box(wrapping.total_lines());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_wrap_incremental_update(c: &mut Criterion) {
    let text = large_text(50_000);
    let doc = Arc::new(TextBuffer::from_text(&text));
    let config = WrapConfig {
        mode: WrapMode::Word,
        keep_indentation: true,
        tab_width: 4,
    };
    let mut wrapping = LineWrapping::new(
        doc.clone(),
        Arc::new(MonospaceMetrics::columns()),
        FontStyle::default(),
        config,
    );
    wrapping.set_max_width(40.0);

    c.bench_function("wrap_update/mid_edit", |b| {
        b.iter(|| {
            doc.set_line(25_000, "short edit");
            wrapping.update_breaks(25_000, 25_000, 0);
            black_box(wrapping.total_lines());
        })
    });
}

criterion_group!(
    benches,
    bench_cold_highlight,
    bench_incremental_rehighlight,
    bench_fold_scan,
    bench_wrap_reconstruct,
    bench_wrap_incremental_update
);
criterion_main!(benches);
