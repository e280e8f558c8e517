//! WPBakery Page Builder adapter for pagebridge.
//!
//! WPBakery stores its layout in the post body as nested shortcodes:
//!
//! ```text
//! [vc_row][vc_column width="1/2"][vc_column_text]<p>Hi</p>[/vc_column_text][/vc_column][/vc_row]
//! ```

mod mapping;
mod tokenizer;

use std::time::Instant;

use pagebridge_core::{
    AdapterError, ApplyOptions, BuilderAdapter, Capabilities, ConversionResult, ConversionStats,
    ConversionWarning, Detection, ElementPath, ExtractOptions, NeutralLayout, PageData, Severity,
    WarningKind, count_all,
};
use tracing::debug;

pub use mapping::{
    MAX_DEPTH, ShortcodeKind, decode_raw_html, encode_raw_html, fraction_to_percent, parse_pairs,
    percent_to_fraction,
};
pub use tokenizer::{
    MAX_NESTING, Node, Shortcode, StrayCloser, count_openers, parse, parse_attrs,
    parse_with_report, serialize_nodes, serialize_shortcode,
};

use mapping::{Applier, Extractor};

/// Registry key.
pub const NAME: &str = "wpbakery";

/// Shortcode name prefix used by every WPBakery element.
const PREFIX: &str = "vc_";

/// `vc_` openers needed for 0.5 confidence.
const HALF_CONFIDENCE: f64 = 2.0;

/// Adapter for WPBakery shortcodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WpBakeryAdapter;

impl WpBakeryAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl BuilderAdapter for WpBakeryAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn display_name(&self) -> &str {
        "WPBakery Page Builder"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn capabilities(&self) -> Capabilities {
        let mut element_types = Vec::new();
        for kind in ShortcodeKind::ALL {
            let t = kind.element_type();
            if !element_types.contains(&t) {
                element_types.push(t);
            }
        }
        Capabilities {
            element_types,
            nesting: true,
            responsive: true,
            animation: false,
        }
    }

    fn detect(&self, page: &PageData) -> Result<Detection, AdapterError> {
        let openers = count_openers(page.source_content(), PREFIX);
        debug!(openers, "wpbakery shortcodes");
        Ok(Detection::from_markers(openers, HALF_CONFIDENCE, "shortcodes"))
    }

    fn extract_layout_from_content(
        &self,
        raw: &str,
        options: &ExtractOptions,
    ) -> ConversionResult<NeutralLayout> {
        let started = Instant::now();
        let (nodes, strays) = parse_with_report(raw);

        let mut extractor = Extractor::new(options);
        for stray in &strays {
            extractor.diagnostics.warn(ConversionWarning::new(
                Severity::Minor,
                WarningKind::MalformedMarkup(stray.name.clone()),
                format!(
                    "closing [/{}] at byte {} has no opener, kept as text",
                    stray.name, stray.offset
                ),
            ));
        }

        let elements = extractor.nodes(&nodes, &ElementPath::root());
        let (total_elements, converted_elements) = count_all(&elements);
        debug!(total_elements, converted_elements, "wpbakery extract");

        extractor.diagnostics.finish(
            NeutralLayout::new(NAME).with_elements(elements),
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
        options: &ApplyOptions,
    ) -> ConversionResult<String> {
        let started = Instant::now();
        let mut applier = Applier::new(layout.source.builder == NAME);
        let nodes = applier.document(&layout.elements);

        let separator = if options.pretty { "\n\n" } else { "" };
        let markup = nodes
            .iter()
            .map(|n| serialize_nodes(std::slice::from_ref(n)))
            .collect::<Vec<_>>()
            .join(separator);
        debug!(
            total = applier.total,
            converted = applier.converted,
            bytes = markup.len(),
            "wpbakery apply"
        );

        let stats = ConversionStats {
            total_elements: applier.total,
            converted_elements: applier.converted,
            processing_time: started.elapsed(),
        };
        applier.diagnostics.finish(markup, stats)
    }
}
