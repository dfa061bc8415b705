use std::sync::Arc;

use syntax_core::{
    FontStyle, LineWrapping, MonospaceMetrics, TextBuffer, WrapConfig, WrapMode,
};

fn main() {
    let doc = Arc::new(TextBuffer::from_text("short\n\t\tHello World"));
    let mut wrapping = LineWrapping::new(
        doc,
        Arc::new(MonospaceMetrics::columns()),
        FontStyle::default(),
        WrapConfig {
            mode: WrapMode::Word,
            keep_indentation: true,
            tab_width: 4,
        },
    );
    wrapping.set_max_width(14.0);

    for visual in 0..wrapping.total_lines() {
        let pos = wrapping.document_line(visual);
        println!(
            "visual {visual} -> logical {} col {} (padding {})",
            pos.line,
            pos.column,
            wrapping.line_offset(pos.line)
        );
    }
    assert!(wrapping.is_wrapped_line(1));
}
