//! The builder adapter contract and its option/result types.

use serde::Serialize;

use crate::{ConversionResult, ElementType, NeutralLayout, PageData};

/// Options for extraction (native → neutral).
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Store the original native name and attributes on every element.
    pub preserve_builder_data: bool,
}

/// Options for application (neutral → native).
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Pretty-print output where the dialect allows it.
    pub pretty: bool,
}

/// Error raised by an adapter outside of a conversion.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("detection failed: {0}")]
    Detection(String),
    #[error("unsupported input: {0}")]
    Unsupported(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of running an adapter's detector over a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub detected: bool,
    /// Heuristic score in `[0, 1]`.
    pub confidence: f64,
    /// Which signal produced the score.
    pub method: String,
}

impl Detection {
    /// No markers found.
    pub fn none(method: impl Into<String>) -> Self {
        Self {
            detected: false,
            confidence: 0.0,
            method: method.into(),
        }
    }

    /// Score a marker count with `n / (n + k)`.
    ///
    /// Zero markers give exactly zero; the score grows with every marker and
    /// approaches one. `k` is the count at which confidence reaches 0.5.
    pub fn from_markers(count: usize, k: f64, method: impl Into<String>) -> Self {
        if count == 0 {
            return Self::none(method);
        }
        let n = count as f64;
        Self {
            detected: true,
            confidence: (n / (n + k.max(f64::EPSILON))).clamp(0.0, 1.0),
            method: method.into(),
        }
    }
}

/// What an adapter can express.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Capabilities {
    pub element_types: Vec<ElementType>,
    pub nesting: bool,
    pub responsive: bool,
    pub animation: bool,
}

impl Capabilities {
    pub fn supports(&self, kind: &ElementType) -> bool {
        self.element_types.contains(kind)
    }
}

/// Converts one page builder's dialect to and from the neutral layout.
///
/// Conversions never fail outright: element-level problems are reported as
/// warnings on the returned [`ConversionResult`], and `success` turns false
/// only when nothing at all could be parsed.
pub trait BuilderAdapter: Send + Sync {
    /// Registry key (e.g., "gutenberg").
    fn name(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Whether this build of the adapter is usable.
    fn supported(&self) -> bool {
        true
    }

    fn version(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Score how likely it is that this builder produced the page.
    fn detect(&self, page: &PageData) -> Result<Detection, AdapterError>;

    /// Extract a layout from a page, preferring raw content over rendered.
    fn extract_layout(
        &self,
        page: &PageData,
        options: &ExtractOptions,
    ) -> ConversionResult<NeutralLayout> {
        self.extract_layout_from_content(page.source_content(), options)
    }

    /// Extract a layout from native markup.
    fn extract_layout_from_content(
        &self,
        raw: &str,
        options: &ExtractOptions,
    ) -> ConversionResult<NeutralLayout>;

    /// Serialize a layout to native markup.
    fn apply_layout(&self, layout: &NeutralLayout, options: &ApplyOptions)
    -> ConversionResult<String>;
}
