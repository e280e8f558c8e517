//! Round trips through the neutral layout, within and across builders.

use pagebridge::prelude::*;
use pagebridge::{AttrsExt, attr};

const GUTENBERG_PAGE: &str = r#"<!-- wp:heading {"level":1} -->
<h1>Pricing</h1>
<!-- /wp:heading -->

<!-- wp:paragraph -->
<p>Pick a plan.</p>
<!-- /wp:paragraph -->

<!-- wp:columns -->
<div class="wp-block-columns"><!-- wp:column {"width":"50%"} -->
<div class="wp-block-column" style="flex-basis:50%"><!-- wp:paragraph -->
<p>Basic</p>
<!-- /wp:paragraph --></div>
<!-- /wp:column -->

<!-- wp:column {"width":"50%"} -->
<div class="wp-block-column" style="flex-basis:50%"><!-- wp:paragraph -->
<p>Pro</p>
<!-- /wp:paragraph --></div>
<!-- /wp:column --></div>
<!-- /wp:columns -->

<!-- wp:separator /-->"#;

const ELEMENTOR_PAGE: &str = r#"[
  {"id":"a1","elType":"section","settings":{},"elements":[
    {"id":"b1","elType":"column","settings":{"_column_size":50},"elements":[
      {"id":"c1","elType":"widget","widgetType":"heading","settings":{"title":"Pricing","header_size":"h1"},"elements":[]},
      {"id":"c2","elType":"widget","widgetType":"text-editor","settings":{"editor":"<p>Basic</p>"},"elements":[]}
    ]},
    {"id":"b2","elType":"column","settings":{"_column_size":50},"elements":[
      {"id":"c3","elType":"widget","widgetType":"text-editor","settings":{"editor":"<p>Pro</p>"},"elements":[]}
    ]}
  ]}
]"#;

const WPBAKERY_PAGE: &str = concat!(
    "[vc_row][vc_column width=\"1/2\"]",
    "[vc_custom_heading text=\"Pricing\" font_container=\"tag:h1\"]",
    "[vc_column_text]<p>Basic</p>[/vc_column_text]",
    "[/vc_column][vc_column width=\"1/2\"]",
    "[vc_column_text]<p>Pro</p>[/vc_column_text]",
    "[/vc_column][/vc_row]"
);

fn registry() -> AdapterRegistry {
    AdapterRegistry::with_defaults()
}

fn extract(builder: &str, raw: &str) -> ConversionResult<NeutralLayout> {
    registry()
        .get(builder)
        .unwrap()
        .extract_layout_from_content(raw, &ExtractOptions::default())
}

fn apply(builder: &str, layout: &NeutralLayout) -> ConversionResult<String> {
    registry()
        .apply(layout, builder, &ApplyOptions::default())
        .unwrap()
}

fn kinds(layout: &NeutralLayout) -> Vec<ElementType> {
    layout.walk().map(|e| e.kind.clone()).collect()
}

/// Text of headings, paragraphs and buttons in document order.
fn leaf_text(layout: &NeutralLayout) -> Vec<String> {
    layout
        .walk()
        .filter(|e| {
            matches!(
                e.kind,
                ElementType::Heading | ElementType::Paragraph | ElementType::Button
            )
        })
        .map(|e| e.content.clone().unwrap_or_default())
        .collect()
}

fn column_widths(layout: &NeutralLayout) -> Vec<String> {
    layout
        .walk()
        .filter(|e| e.kind == ElementType::Column)
        .filter_map(|e| e.attrs.get_str(attr::WIDTH).map(str::to_string))
        .collect()
}

mod same_builder {
    use super::*;

    fn assert_round_trip(builder: &str, raw: &str) {
        let first = extract(builder, raw);
        assert!(first.success);
        let markup = apply(builder, &first.data);
        assert!(markup.success);
        let second = extract(builder, &markup.data);

        assert_eq!(kinds(&second.data), kinds(&first.data));
        assert_eq!(leaf_text(&second.data), leaf_text(&first.data));
    }

    #[test]
    fn test_gutenberg() {
        assert_round_trip("gutenberg", GUTENBERG_PAGE);
    }

    #[test]
    fn test_elementor() {
        assert_round_trip("elementor", ELEMENTOR_PAGE);
    }

    #[test]
    fn test_wpbakery() {
        assert_round_trip("wpbakery", WPBAKERY_PAGE);
    }

    #[test]
    fn test_gutenberg_columns_structure() {
        let layout = extract("gutenberg", GUTENBERG_PAGE).data;
        let row = &layout.elements[2];
        assert_eq!(row.kind, ElementType::Row);
        assert_eq!(row.children.len(), 2);
        assert_eq!(row.children[0].kind, ElementType::Column);
        assert_eq!(row.children[0].children[0].kind, ElementType::Paragraph);
        assert_eq!(column_widths(&layout), vec!["50%", "50%"]);

        let markup = apply("gutenberg", &layout).data;
        assert!(markup.contains("<!-- wp:columns -->"));
        assert!(markup.contains("<!-- wp:column {\"width\":\"50%\"} -->"));
    }

    #[test]
    fn test_unknown_blocks_survive() {
        let raw = "<!-- wp:acme/slider {\"speed\":3} -->\n<div class=\"slider\"></div>\n<!-- /wp:acme/slider -->";
        let first = extract("gutenberg", raw);
        assert!(first.unsupported_elements.contains("acme/slider"));
        assert_eq!(first.data.elements[0].kind, ElementType::Unknown);

        let markup = apply("gutenberg", &first.data).data;
        assert_eq!(markup, raw);
    }
}

mod cross_builder {
    use super::*;

    fn convert(from: &str, raw: &str, to: &str) -> (ConversionResult<String>, NeutralLayout) {
        let page = PageData::from_raw(raw);
        let result = registry()
            .convert(
                &page,
                Some(from),
                to,
                &ExtractOptions::default(),
                &ApplyOptions::default(),
            )
            .unwrap();
        let back = extract(to, &result.data).data;
        (result, back)
    }

    #[test]
    fn test_gutenberg_to_elementor() {
        let (result, back) = convert("gutenberg", GUTENBERG_PAGE, "elementor");
        assert!(result.success);
        assert_eq!(
            leaf_text(&back),
            vec!["Pricing", "Pick a plan.", "Basic", "Pro"]
        );
        assert_eq!(column_widths(&back), vec!["50%", "50%"]);
    }

    #[test]
    fn test_gutenberg_to_wpbakery() {
        let (result, back) = convert("gutenberg", GUTENBERG_PAGE, "wpbakery");
        assert!(result.success);
        assert!(result.data.starts_with("[vc_row]"));
        assert_eq!(
            leaf_text(&back),
            vec!["Pricing", "Pick a plan.", "Basic", "Pro"]
        );
        assert!(column_widths(&back).contains(&"50%".to_string()));
    }

    #[test]
    fn test_elementor_to_gutenberg() {
        let (result, back) = convert("elementor", ELEMENTOR_PAGE, "gutenberg");
        assert!(result.success);
        assert_eq!(leaf_text(&back), vec!["Pricing", "Basic", "Pro"]);
        assert_eq!(column_widths(&back), vec!["50%", "50%"]);
        assert_eq!(back.elements[0].kind, ElementType::Row);
    }

    #[test]
    fn test_wpbakery_to_elementor() {
        let (result, back) = convert("wpbakery", WPBAKERY_PAGE, "elementor");
        assert!(result.success);
        assert_eq!(leaf_text(&back), vec!["Pricing", "Basic", "Pro"]);
        let heading = back
            .walk()
            .find(|e| e.kind == ElementType::Heading)
            .unwrap();
        assert_eq!(heading.attrs.get_i64(attr::LEVEL), Some(1));
    }

    #[test]
    fn test_detected_source() {
        let page = PageData::from_raw(WPBAKERY_PAGE);
        let result = registry()
            .convert(
                &page,
                None,
                "gutenberg",
                &ExtractOptions::default(),
                &ApplyOptions::default(),
            )
            .unwrap();
        assert!(result.data.contains("<!-- wp:columns -->"));
    }

    #[test]
    fn test_unknown_reported_across_builders() {
        let raw = "<!-- wp:acme/slider -->\n<div>slides</div>\n<!-- /wp:acme/slider -->";
        let (result, _) = convert("gutenberg", raw, "wpbakery");
        assert!(result.success);
        assert!(result.unsupported_elements.contains("acme/slider"));
        assert!(result.has_warnings());
        assert!(result.data.contains("[vc_raw_html]"));
    }
}
