//! Edge case tests for pagebridge.
//!
//! Empty and malformed input, Unicode, nesting extremes and detection corner
//! cases across every adapter.

use pagebridge::prelude::*;
use pagebridge::{Severity, WarningKind};

const BUILDERS: [&str; 3] = ["gutenberg", "elementor", "wpbakery"];

fn extract(builder: &str, raw: &str) -> ConversionResult<NeutralLayout> {
    AdapterRegistry::with_defaults()
        .get(builder)
        .unwrap()
        .extract_layout_from_content(raw, &ExtractOptions::default())
}

fn apply(builder: &str, layout: &NeutralLayout) -> ConversionResult<String> {
    AdapterRegistry::with_defaults()
        .apply(layout, builder, &ApplyOptions::default())
        .unwrap()
}

mod empty {
    use super::*;

    #[test]
    fn test_empty_input_extracts_nothing() {
        for builder in BUILDERS {
            let result = extract(builder, "");
            assert!(result.success, "{builder}");
            assert!(result.data.elements.is_empty(), "{builder}");
            assert!(result.warnings.is_empty(), "{builder}");
            let stats = result.stats.unwrap();
            assert_eq!(stats.total_elements, 0);
        }
    }

    #[test]
    fn test_empty_layout_applies() {
        for builder in BUILDERS {
            let result = apply(builder, &NeutralLayout::new(builder));
            assert!(result.success, "{builder}");
            assert!(result.warnings.is_empty(), "{builder}");
        }
    }

    #[test]
    fn test_empty_page_detects_nothing() {
        let registry = AdapterRegistry::with_defaults();
        let page = PageData::from_raw("");
        assert!(registry.detect_builder(&page, None).is_none());
        assert!(registry.detect_all_builders(&page, Some(0.0)).is_empty());
    }
}

mod malformed {
    use super::*;

    #[test]
    fn test_gutenberg_unclosed_block_is_text() {
        let result = extract("gutenberg", "<!-- wp:paragraph --><p>never closed</p>");
        assert!(result.success);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| matches!(w.kind, WarningKind::MalformedMarkup(_)))
        );
        assert!(result.data.elements.iter().all(|e| !e.kind.is_unknown()));
    }

    #[test]
    fn test_gutenberg_bad_attribute_json() {
        let result = extract("gutenberg", "<!-- wp:heading {\"level\": -->x<!-- /wp:heading -->");
        assert!(result.success);
        assert!(!result.data.elements.is_empty());
    }

    #[test]
    fn test_elementor_invalid_json_fails() {
        let result = extract("elementor", "[{\"elType\": ");
        assert!(!result.success);
        assert!(result.data.elements.is_empty());
        assert!(result.has_errors());
        assert!(result.warnings.iter().any(|w| w.severity == Severity::Error));
    }

    #[test]
    fn test_wpbakery_brackets_in_text() {
        let result = extract("wpbakery", "Price: [5] or [/vc_row] maybe");
        assert!(result.success);
        assert_eq!(result.data.elements.len(), 1);
        assert_eq!(result.data.elements[0].kind, ElementType::Html);
    }
}

mod unicode {
    use super::*;

    const TEXT: &str = "Héllo 👋🏽 中文 👨‍👩‍👧‍👦";

    fn heading_text(builder: &str, raw: &str) -> String {
        extract(builder, raw)
            .data
            .walk()
            .find(|e| e.kind == ElementType::Heading)
            .and_then(|e| e.content.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_gutenberg() {
        let raw = format!("<!-- wp:heading -->\n<h2>{TEXT}</h2>\n<!-- /wp:heading -->");
        assert_eq!(heading_text("gutenberg", &raw), TEXT);
    }

    #[test]
    fn test_elementor() {
        let raw = format!(
            r#"[{{"id":"1","elType":"widget","widgetType":"heading","settings":{{"title":"{TEXT}"}},"elements":[]}}]"#
        );
        assert_eq!(heading_text("elementor", &raw), TEXT);
    }

    #[test]
    fn test_wpbakery() {
        let raw = format!("[vc_custom_heading text=\"{TEXT}\"]");
        assert_eq!(heading_text("wpbakery", &raw), TEXT);
    }

    #[test]
    fn test_survives_every_builder() {
        let layout = pagebridge::builder::layout("gutenberg", |l| l.heading(2, TEXT));
        for builder in BUILDERS {
            let markup = apply(builder, &layout).data;
            assert_eq!(heading_text(builder, &markup), TEXT, "{builder}");
        }
    }
}

mod structure {
    use super::*;

    #[test]
    fn test_deep_gutenberg_nesting() {
        let depth = 400;
        let mut raw = String::new();
        for _ in 0..depth {
            raw.push_str("<!-- wp:group --><div class=\"wp-block-group\">");
        }
        raw.push_str("<!-- wp:paragraph --><p>deep</p><!-- /wp:paragraph -->");
        for _ in 0..depth {
            raw.push_str("</div><!-- /wp:group -->");
        }

        let result = extract("gutenberg", &raw);
        assert!(result.success);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| matches!(w.kind, WarningKind::Simplified(_)))
        );
    }

    #[test]
    fn test_preserve_builder_data_names() {
        let options = ExtractOptions {
            preserve_builder_data: true,
        };
        let registry = AdapterRegistry::with_defaults();
        let adapter = registry.get("wpbakery").unwrap();
        let result = adapter.extract_layout_from_content(
            "[vc_row][vc_column width=\"1/2\"][vc_separator style=\"dashed\"][/vc_column][/vc_row]",
            &options,
        );
        let names: Vec<_> = result
            .data
            .walk()
            .map(|e| e.builder_data().unwrap().block_name)
            .collect();
        assert_eq!(names, vec!["vc_row", "vc_column", "vc_separator"]);
    }

    #[test]
    fn test_stats_count_recursively() {
        let result = extract(
            "wpbakery",
            "[vc_row][vc_column][vc_separator][my_widget][/vc_column][/vc_row]",
        );
        let stats = result.stats.unwrap();
        assert_eq!(stats.total_elements, 4);
        assert_eq!(stats.converted_elements, 3);
    }
}

mod detection {
    use super::*;

    #[test]
    fn test_each_builder_detected() {
        let registry = AdapterRegistry::with_defaults();
        let pages = [
            (
                "gutenberg",
                PageData::from_raw("<!-- wp:paragraph --><p>a</p><!-- /wp:paragraph -->"),
            ),
            (
                "elementor",
                PageData::from_raw(
                    r#"[{"id":"1","elType":"section","settings":{},"elements":[{"id":"2","elType":"column","settings":{},"elements":[]}]}]"#,
                ),
            ),
            (
                "wpbakery",
                PageData::from_raw("[vc_row][vc_column][vc_column_text]a[/vc_column_text][/vc_column][/vc_row]"),
            ),
        ];
        for (expected, page) in pages {
            let found = registry.detect_builder(&page, None).unwrap();
            assert_eq!(found.name, expected);
        }
    }

    #[test]
    fn test_confidence_grows_with_markers() {
        let registry = AdapterRegistry::with_defaults();
        let adapter = registry.get("wpbakery").unwrap();
        let mut last = 0.0;
        for n in 1..20 {
            let page = PageData::from_raw("[vc_separator]".repeat(n));
            let d = adapter.detect(&page).unwrap();
            assert!(d.confidence >= last);
            last = d.confidence;
        }
    }

    #[test]
    fn test_disabled_adapter_not_detected() {
        let mut registry = AdapterRegistry::with_defaults();
        registry.set_enabled("gutenberg", false);
        let page = PageData::from_raw("<!-- wp:paragraph --><p>a</p><!-- /wp:paragraph -->");
        assert!(registry.detect_builder(&page, None).is_none());
    }
}
