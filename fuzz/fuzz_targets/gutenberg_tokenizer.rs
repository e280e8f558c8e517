#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Tokenizing never panics, and serialized blocks tokenize again
        let blocks = pagebridge_gutenberg::tokenize(s);
        let markup = pagebridge_gutenberg::serialize_blocks(&blocks);
        let _ = pagebridge_gutenberg::tokenize(&markup);
    }
});
