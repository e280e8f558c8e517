//! Gutenberg (block editor) adapter for pagebridge.
//!
//! Gutenberg stores a page as HTML with block delimiters in comments:
//!
//! ```text
//! <!-- wp:heading {"level":2} -->
//! <h2>My Heading</h2>
//! <!-- /wp:heading -->
//! ```
//!
//! [`tokenize`] turns that into a [`Block`] tree, [`serialize_blocks`] turns
//! it back, and [`GutenbergAdapter`] maps blocks to and from the neutral
//! layout.

mod mapping;
mod serializer;
mod tokenizer;

use std::time::Instant;

use pagebridge_core::markup::class_tokens;
use pagebridge_core::{
    AdapterError, ApplyOptions, BuilderAdapter, Capabilities, ConversionResult, ConversionStats,
    ConversionWarning, Detection, ElementPath, ElementType, ExtractOptions, NeutralLayout,
    PageData, Severity, WarningKind, count_all,
};
use tracing::debug;

pub use mapping::{BlockKind, MAX_DEPTH};
pub use serializer::{serialize_attrs, serialize_block, serialize_blocks};
pub use tokenizer::{
    Block, ContentPart, DEFAULT_NAMESPACE, FREEFORM, MAX_NESTING, StrayMarker, count_markers,
    tokenize, tokenize_with_report,
};

use mapping::{Applier, Extractor};

/// Registry key.
pub const NAME: &str = "gutenberg";

/// Block markers needed for 0.5 confidence.
const MARKER_HALF_CONFIDENCE: f64 = 1.0;

/// Rendered `wp-block-*` classes needed for 0.5 confidence.
const CLASS_HALF_CONFIDENCE: f64 = 4.0;

/// Adapter for the WordPress block editor.
#[derive(Debug, Clone, Copy, Default)]
pub struct GutenbergAdapter;

impl GutenbergAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl BuilderAdapter for GutenbergAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        "Gutenberg (Block Editor)"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn capabilities(&self) -> Capabilities {
        let mut element_types: Vec<ElementType> = Vec::new();
        for kind in BlockKind::ALL {
            let t = kind.element_type();
            if !element_types.contains(&t) {
                element_types.push(t);
            }
        }
        Capabilities {
            element_types,
            nesting: true,
            responsive: false,
            animation: false,
        }
    }

    fn detect(&self, page: &PageData) -> Result<Detection, AdapterError> {
        if let Some(raw) = page.content.raw.as_deref() {
            let markers = count_markers(raw);
            if markers > 0 {
                debug!(markers, "gutenberg block comments");
                return Ok(Detection::from_markers(
                    markers,
                    MARKER_HALF_CONFIDENCE,
                    "block-comments",
                ));
            }
        }

        let classes = class_tokens(&page.content.rendered)
            .iter()
            .filter(|c| c.starts_with("wp-block-"))
            .count();
        debug!(classes, "gutenberg rendered classes");
        Ok(Detection::from_markers(
            classes,
            CLASS_HALF_CONFIDENCE,
            "rendered-classes",
        ))
    }

    fn extract_layout_from_content(
        &self,
        raw: &str,
        options: &ExtractOptions,
    ) -> ConversionResult<NeutralLayout> {
        let started = Instant::now();
        let (blocks, strays) = tokenize_with_report(raw);

        let mut extractor = Extractor::new(options);
        for stray in &strays {
            let which = if stray.closer { "closing" } else { "opening" };
            extractor.diagnostics.warn(ConversionWarning::new(
                Severity::Minor,
                WarningKind::MalformedMarkup(stray.name.clone()),
                format!(
                    "unmatched {which} marker for '{}' at byte {} kept as text",
                    stray.name, stray.offset
                ),
            ));
        }

        let elements = extractor.blocks(&blocks, &ElementPath::root());
        let (total_elements, converted_elements) = count_all(&elements);
        debug!(
            blocks = blocks.len(),
            total_elements,
            converted_elements,
            unsupported = extractor.diagnostics.unsupported_elements.len(),
            "gutenberg extract"
        );

        let layout = NeutralLayout::new(NAME).with_elements(elements);
        extractor.diagnostics.finish(
            layout,
            ConversionStats {
                total_elements,
                converted_elements,
                processing_time: started.elapsed(),
            },
        )
    }

    fn apply_layout(
        &self,
        layout: &NeutralLayout,
        _options: &ApplyOptions,
    ) -> ConversionResult<String> {
        let started = Instant::now();
        let mut applier = Applier::new(layout.source.builder == NAME);
        let blocks = applier.elements(&layout.elements, &ElementPath::root());
        let markup = serialize_blocks(&blocks);
        debug!(
            total = applier.total,
            converted = applier.converted,
            bytes = markup.len(),
            "gutenberg apply"
        );

        let stats = ConversionStats {
            total_elements: applier.total,
            converted_elements: applier.converted,
            processing_time: started.elapsed(),
        };
        applier.diagnostics.finish(markup, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagebridge_core::builder::layout;
    use pagebridge_core::{AttrsExt, attr};

    fn extract(raw: &str) -> ConversionResult<NeutralLayout> {
        GutenbergAdapter.extract_layout_from_content(raw, &ExtractOptions::default())
    }

    #[test]
    fn test_detect_block_comments() {
        let page = PageData::from_raw(
            "<!-- wp:paragraph --><p>a</p><!-- /wp:paragraph -->\n\n<!-- wp:separator /-->",
        );
        let d = GutenbergAdapter.detect(&page).unwrap();
        assert!(d.detected);
        assert_eq!(d.method, "block-comments");
        assert!(d.confidence > 0.5);
    }

    #[test]
    fn test_detect_nothing() {
        let page = PageData::from_raw("<p>plain</p>");
        let d = GutenbergAdapter.detect(&page).unwrap();
        assert!(!d.detected);
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn test_detect_rendered_only() {
        let page = PageData::from_rendered(
            "<div class=\"wp-block-columns\"><div class=\"wp-block-column\"></div></div>",
        );
        let d = GutenbergAdapter.detect(&page).unwrap();
        assert!(d.detected);
        assert_eq!(d.method, "rendered-classes");
        assert!(d.confidence < 0.5);
    }

    #[test]
    fn test_extract_empty() {
        let result = extract("");
        assert!(result.success);
        assert!(result.data.elements.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_extract_stats() {
        let result = extract(concat!(
            "<!-- wp:heading --><h2>T</h2><!-- /wp:heading -->",
            "<!-- wp:acme/widget /-->"
        ));
        let stats = result.stats.unwrap();
        assert_eq!(stats.total_elements, 2);
        assert_eq!(stats.converted_elements, 1);
        assert!(result.unsupported_elements.contains("acme/widget"));
        assert_eq!(result.data.source.builder, NAME);
    }

    #[test]
    fn test_stray_marker_warns() {
        let result = extract("<!-- /wp:paragraph --><p>x</p>");
        assert!(result.success);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| matches!(w.kind, WarningKind::MalformedMarkup(_)))
        );
    }

    #[test]
    fn test_preserve_builder_data() {
        let result = GutenbergAdapter.extract_layout_from_content(
            "<!-- wp:paragraph {\"dropCap\":true} --><p>x</p><!-- /wp:paragraph -->",
            &ExtractOptions {
                preserve_builder_data: true,
            },
        );
        let data = result.data.elements[0].builder_data().unwrap();
        assert_eq!(data.block_name, "core/paragraph");
        assert_eq!(data.attrs.get_bool("dropCap"), Some(true));
    }

    #[test]
    fn test_apply_built_layout() {
        let l = layout(NAME, |l| {
            l.heading(2, "Plans")
                .separator(Some("wide"))
                .row(|r| {
                    r.column("50%", |c| c.paragraph("Basic"))
                        .column("50%", |c| c.paragraph("Pro"))
                })
        });
        let result = GutenbergAdapter.apply_layout(&l, &ApplyOptions::default());
        assert!(result.success);
        assert!(result.warnings.is_empty());
        let out = &result.data;
        assert!(out.contains("<!-- wp:heading {\"level\":2} -->"));
        assert!(out.contains("<!-- wp:separator {\"className\":\"is-style-wide\"} -->"));
        assert!(out.contains("<!-- wp:column {\"width\":\"50%\"} -->"));
        assert!(out.contains("style=\"flex-basis:50%\""));
        let stats = result.stats.unwrap();
        assert_eq!(stats.total_elements, 7);
        assert_eq!(stats.converted_elements, 7);

        let back = extract(out);
        let row = &back.data.elements[2];
        assert_eq!(row.kind, ElementType::Row);
        assert_eq!(row.children[1].attrs.get_str(attr::WIDTH), Some("50%"));
        assert_eq!(back.data.elements[1].attrs.get_str(attr::STYLE), Some("wide"));
    }

    #[test]
    fn test_extract_very_deep_nesting() {
        let depth = 20_000;
        let raw = format!(
            "{}x{}",
            "<!-- wp:group -->".repeat(depth),
            "<!-- /wp:group -->".repeat(depth)
        );
        let result = extract(&raw);
        assert!(result.success);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| matches!(w.kind, WarningKind::Simplified(_)))
        );
        let deepest = result.data.walk().last().unwrap();
        assert_eq!(deepest.kind, ElementType::Html);
        assert!(deepest.content.as_deref().unwrap().contains('x'));
    }
}
