use std::sync::Arc;

use syntax_core::{FoldConfig, FoldRangeService, TextBuffer};

fn main() {
    let doc = Arc::new(TextBuffer::from_text("fn main() {\n    work();\n}"));
    let service = FoldRangeService::new(doc.clone(), FoldConfig::braces());

    service.find_regions();
    let region = service.find(0).unwrap();
    println!("block region: {:?} .. {:?}", region.start, region.end);

    // An insertion above the block shifts it without a rescan.
    doc.insert_line(0, "// header");
    service.shift_folding_regions(0, 1).unwrap();
    assert!(service.is_folding_region_in_line(1));
}
