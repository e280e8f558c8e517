#![no_main]

use libfuzzer_sys::fuzz_target;
use pagebridge_core::{BuilderAdapter, ExtractOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Invalid data is reported on the result, never a panic
        let _ = pagebridge_elementor::ElementorAdapter
            .extract_layout_from_content(s, &ExtractOptions::default());
    }
});
