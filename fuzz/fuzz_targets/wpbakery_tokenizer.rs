#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let (nodes, _) = pagebridge_wpbakery::parse_with_report(s);

        // Text and strays are kept, so serializing reproduces every shortcode
        let markup = pagebridge_wpbakery::serialize_nodes(&nodes);
        let again = pagebridge_wpbakery::parse(&markup);
        assert_eq!(
            count(&nodes),
            count(&again),
            "shortcode count changed through reserialization"
        );
    }
});

fn count(nodes: &[pagebridge_wpbakery::Node]) -> usize {
    nodes
        .iter()
        .map(|n| match n {
            pagebridge_wpbakery::Node::Text(_) => 0,
            pagebridge_wpbakery::Node::Shortcode(s) => 1 + count(&s.children),
        })
        .sum()
}
