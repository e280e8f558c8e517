//! Elementor adapter for pagebridge.
//!
//! Elementor does not keep its layout in the post body. The element tree is a
//! JSON array in the `_elementor_data` post meta, and the post body only holds
//! the rendered HTML. [`ElementorAdapter::extract_layout`] reads the meta first
//! and falls back to raw content that parses as the same array.

mod document;
mod mapping;

use std::time::Instant;

use pagebridge_core::markup::class_tokens;
use pagebridge_core::{
    AdapterError, ApplyOptions, BuilderAdapter, Capabilities, ConversionResult, ConversionStats,
    ConversionWarning, Detection, ElementPath, ExtractOptions, NeutralLayout, PageData, Severity,
    WarningKind, count_all,
};
use serde_json::Value;
use tracing::debug;

pub use document::{
    ElementorElement, IdGenerator, META_KEY, count_elements, document_from_value, parse_document,
};
pub use mapping::{ElementorKind, MAX_DEPTH};

use mapping::{Applier, Extractor};

/// Registry key.
pub const NAME: &str = "elementor";

/// Markers needed for 0.5 confidence.
const HALF_CONFIDENCE: f64 = 2.0;

/// Adapter for Elementor's JSON element tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementorAdapter;

impl ElementorAdapter {
    pub fn new() -> Self {
        Self
    }

    fn extract_document(
        &self,
        document: serde_json::Result<Vec<ElementorElement>>,
        options: &ExtractOptions,
        started: Instant,
    ) -> ConversionResult<NeutralLayout> {
        let document = match document {
            Ok(document) => document,
            Err(err) => {
                debug!(error = %err, "elementor data is not an element array");
                return ConversionResult::failed(
                    NeutralLayout::new(NAME),
                    ConversionWarning::new(
                        Severity::Error,
                        WarningKind::MalformedMarkup("elementor-data".into()),
                        format!("invalid Elementor data: {err}"),
                    ),
                );
            }
        };

        let mut extractor = Extractor::new(options);
        let elements = extractor.elements(&document, &ElementPath::root());
        let (total_elements, converted_elements) = count_all(&elements);
        debug!(total_elements, converted_elements, "elementor extract");

        extractor.diagnostics.finish(
            NeutralLayout::new(NAME).with_elements(elements),
            ConversionStats {
                total_elements,
                converted_elements,
                processing_time: started.elapsed(),
            },
        )
    }
}

/// The stored tree, as text.
fn stored_data(page: &PageData) -> Option<String> {
    match page.meta.get(META_KEY)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) if !items.is_empty() => Some(Value::Array(items.clone()).to_string()),
        _ => None,
    }
}

impl BuilderAdapter for ElementorAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        "Elementor"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            element_types: ElementorKind::ALL.iter().map(|k| k.element_type()).collect(),
            nesting: true,
            responsive: true,
            animation: true,
        }
    }

    fn detect(&self, page: &PageData) -> Result<Detection, AdapterError> {
        let data = stored_data(page).or_else(|| {
            page.content
                .raw
                .as_deref()
                .filter(|raw| raw.trim_start().starts_with('['))
                .map(str::to_string)
        });
        let data_markers = data.as_deref().map_or(0, count_elements);
        let class_markers = class_tokens(&page.content.rendered)
            .iter()
            .filter(|c| *c == "elementor-element")
            .count();
        debug!(data_markers, class_markers, "elementor markers");

        let method = if data_markers > 0 {
            "elementor-data"
        } else {
            "rendered-classes"
        };
        Ok(Detection::from_markers(
            data_markers + class_markers,
            HALF_CONFIDENCE,
            method,
        ))
    }

    fn extract_layout(
        &self,
        page: &PageData,
        options: &ExtractOptions,
    ) -> ConversionResult<NeutralLayout> {
        match page.meta.get(META_KEY) {
            Some(value @ (Value::String(_) | Value::Array(_))) if stored_data(page).is_some() => {
                self.extract_document(document_from_value(value), options, Instant::now())
            }
            _ => self.extract_layout_from_content(page.source_content(), options),
        }
    }

    fn extract_layout_from_content(
        &self,
        raw: &str,
        options: &ExtractOptions,
    ) -> ConversionResult<NeutralLayout> {
        let started = Instant::now();
        if raw.trim().is_empty() {
            return self.extract_document(Ok(Vec::new()), options, started);
        }
        self.extract_document(parse_document(raw), options, started)
    }

    fn apply_layout(
        &self,
        layout: &NeutralLayout,
        options: &ApplyOptions,
    ) -> ConversionResult<String> {
        let started = Instant::now();
        let mut applier = Applier::new(layout.source.builder == NAME);
        let document = applier.document(&layout.elements);

        let json = if options.pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        let json = match json {
            Ok(json) => json,
            Err(err) => {
                return ConversionResult::failed(
                    String::new(),
                    ConversionWarning::new(
                        Severity::Error,
                        WarningKind::MalformedMarkup("elementor-data".into()),
                        format!("could not serialize Elementor data: {err}"),
                    ),
                );
            }
        };
        debug!(
            total = applier.total,
            converted = applier.converted,
            bytes = json.len(),
            "elementor apply"
        );

        let stats = ConversionStats {
            total_elements: applier.total,
            converted_elements: applier.converted,
            processing_time: started.elapsed(),
        };
        applier.diagnostics.finish(json, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagebridge_core::builder::layout;
    use pagebridge_core::{AttrsExt, ElementType, attr};
    use serde_json::json;

    const PAGE: &str = r#"[
      {"id":"1a2b3c4","elType":"section","settings":[],"elements":[
        {"id":"2b3c4d5","elType":"column","settings":{"_column_size":50},"elements":[
          {"id":"3c4d5e6","elType":"widget","widgetType":"heading",
           "settings":{"title":"Welcome","header_size":"h1"},"elements":[]},
          {"id":"4d5e6f7","elType":"widget","widgetType":"text-editor",
           "settings":{"editor":"<p>Hello there</p>"},"elements":[]}
        ]},
        {"id":"5e6f7a8","elType":"column","settings":{"_column_size":50},"elements":[
          {"id":"6f7a8b9","elType":"widget","widgetType":"image",
           "settings":{"image":{"id":7,"url":"https://x.test/a.png","alt":"A"},"image_size":"large"},"elements":[]},
          {"id":"7a8b9c0","elType":"widget","widgetType":"slides",
           "settings":{"speed":500},"elements":[]}
        ]}
      ]}
    ]"#;

    fn extract(raw: &str) -> ConversionResult<NeutralLayout> {
        ElementorAdapter.extract_layout_from_content(raw, &ExtractOptions::default())
    }

    #[test]
    fn test_extract_section() {
        let result = extract(PAGE);
        assert!(result.success);
        let row = &result.data.elements[0];
        assert_eq!(row.kind, ElementType::Row);
        assert_eq!(row.children[0].attrs.get_str(attr::WIDTH), Some("50%"));

        let heading = &row.children[0].children[0];
        assert_eq!(heading.kind, ElementType::Heading);
        assert_eq!(heading.attrs.get_i64(attr::LEVEL), Some(1));
        assert_eq!(heading.content.as_deref(), Some("Welcome"));
        assert_eq!(
            row.children[0].children[1].content.as_deref(),
            Some("Hello there")
        );

        let image = &row.children[1].children[0];
        assert_eq!(image.attrs.get_i64(attr::MEDIA_ID), Some(7));
        assert_eq!(image.attrs.get_str(attr::SIZE_SLUG), Some("large"));
    }

    #[test]
    fn test_unknown_widget() {
        let result = extract(PAGE);
        assert!(result.unsupported_elements.contains("slides"));
        let slides = &result.data.elements[0].children[1].children[1];
        assert_eq!(slides.kind, ElementType::Unknown);
        assert_eq!(slides.builder_data().unwrap().block_name, "slides");

        let stats = result.stats.unwrap();
        assert_eq!(stats.total_elements, 7);
        assert_eq!(stats.converted_elements, 6);
    }

    #[test]
    fn test_invalid_json_fails() {
        let result = extract("[{\"elType\":");
        assert!(!result.success);
        assert!(result.data.elements.is_empty());
        assert!(result.has_errors());
    }

    #[test]
    fn test_empty_content_succeeds() {
        let result = extract("  ");
        assert!(result.success);
        assert!(result.data.elements.is_empty());
    }

    #[test]
    fn test_extract_from_meta() {
        let page = PageData::from_rendered("<div class=\"elementor\"></div>")
            .with_meta(META_KEY, json!([{"id":"a","elType":"container","elements":[
                {"id":"b","elType":"widget","widgetType":"spacer",
                 "settings":{"space":{"unit":"px","size":40}}}
            ]}]));
        let result = ElementorAdapter.extract_layout(&page, &ExtractOptions::default());
        assert!(result.success);
        let spacer = &result.data.elements[0].children[0];
        assert_eq!(spacer.attrs.get_str(attr::HEIGHT), Some("40px"));
    }

    #[test]
    fn test_detect() {
        let d = ElementorAdapter.detect(&PageData::from_raw(PAGE)).unwrap();
        assert!(d.detected);
        assert_eq!(d.method, "elementor-data");
        assert!(d.confidence > 0.7);

        let d = ElementorAdapter
            .detect(&PageData::from_raw("<!-- wp:paragraph --><p>x</p><!-- /wp:paragraph -->"))
            .unwrap();
        assert!(!d.detected);
    }

    #[test]
    fn test_detect_rendered_classes() {
        let page = PageData::from_rendered(
            "<div class=\"elementor-element elementor-widget\"></div><div class=\"elementor-element\"></div>",
        );
        let d = ElementorAdapter.detect(&page).unwrap();
        assert_eq!(d.method, "rendered-classes");
        assert_eq!(d.confidence, 0.5);
    }

    #[test]
    fn test_apply_wraps_loose_widgets() {
        let l = layout("gutenberg", |l| {
            l.heading(2, "Hi").paragraph("text").row(|r| {
                r.column("50%", |c| c.paragraph("a"))
                    .column("50%", |c| c.paragraph("b"))
            })
        });
        let result = ElementorAdapter.apply_layout(&l, &ApplyOptions::default());
        assert!(result.success);
        let doc = parse_document(&result.data).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc[0].el_type, "container");
        assert_eq!(doc[0].elements.len(), 2);
        assert_eq!(doc[1].el_type, "section");
        assert_eq!(doc[1].elements[0].settings["_column_size"], 50);
        assert_eq!(doc[0].elements[0].settings["header_size"], "h2");
    }

    #[test]
    fn test_round_trip_keeps_ids_and_unknowns() {
        let options = ExtractOptions {
            preserve_builder_data: true,
        };
        let extracted = ElementorAdapter.extract_layout_from_content(PAGE, &options);
        let applied = ElementorAdapter.apply_layout(&extracted.data, &ApplyOptions::default());
        assert!(applied.warnings.is_empty());

        let original = parse_document(PAGE).unwrap();
        let written = parse_document(&applied.data).unwrap();
        assert_eq!(written[0].id, original[0].id);
        let slides = &written[0].elements[1].elements[1];
        assert_eq!(slides.widget_type.as_deref(), Some("slides"));
        assert_eq!(slides.settings["speed"], 500);
        assert_eq!(written[0].elements[0].elements[0].settings["title"], "Welcome");
    }

    #[test]
    fn test_column_fraction_width() {
        let l = layout(NAME, |l| l.row(|r| r.column("33.33%", |c| c)));
        let out = ElementorAdapter.apply_layout(&l, &ApplyOptions::default());
        let back = extract(&out.data);
        assert_eq!(
            back.data.elements[0].children[0].attrs.get_str(attr::WIDTH),
            Some("33.33%")
        );
    }
}
