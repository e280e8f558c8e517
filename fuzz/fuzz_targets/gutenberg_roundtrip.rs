#![no_main]

use libfuzzer_sys::fuzz_target;
use pagebridge_core::{ApplyOptions, BuilderAdapter, ExtractOptions};
use pagebridge_gutenberg::GutenbergAdapter;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let adapter = GutenbergAdapter;
        let first = adapter.extract_layout_from_content(s, &ExtractOptions::default());
        assert!(first.success, "block markup never fails structurally");

        let markup = adapter.apply_layout(&first.data, &ApplyOptions::default());
        assert!(markup.success);

        // Whatever we write must read back
        let second = adapter.extract_layout_from_content(&markup.data, &ExtractOptions::default());
        assert!(second.success);
    }
});
