//! Fidelity tracking - know what was lost in conversion.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Result of a conversion operation, including fidelity warnings.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult<T> {
    /// False only for structural failures where nothing could be produced.
    pub success: bool,
    /// The conversion output.
    pub data: T,
    /// Warnings about information that was lost or transformed.
    pub warnings: Vec<ConversionWarning>,
    /// Native type identifiers that had no mapping.
    pub unsupported_elements: BTreeSet<String>,
    pub stats: Option<ConversionStats>,
}

impl<T> ConversionResult<T> {
    /// Create a successful result with no warnings.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            warnings: Vec::new(),
            unsupported_elements: BTreeSet::new(),
            stats: None,
        }
    }

    /// Create a structurally failed result.
    pub fn failed(data: T, warning: ConversionWarning) -> Self {
        Self {
            success: false,
            data,
            warnings: vec![warning],
            unsupported_elements: BTreeSet::new(),
            stats: None,
        }
    }

    /// Add a warning.
    pub fn warn(mut self, warning: ConversionWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Attach statistics.
    pub fn with_stats(mut self, stats: ConversionStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if there are any major or error-level warnings.
    pub fn has_errors(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w.severity, Severity::Major | Severity::Error))
    }
}

/// Element counts and timing for one conversion call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConversionStats {
    pub total_elements: usize,
    pub converted_elements: usize,
    #[serde(rename = "processing_time_ms", serialize_with = "as_millis")]
    pub processing_time: Duration,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Collects warnings and unsupported identifiers while a conversion runs.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub warnings: Vec<ConversionWarning>,
    pub unsupported_elements: BTreeSet<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, warning: ConversionWarning) {
        self.warnings.push(warning);
    }

    /// Record a native construct with no mapping.
    pub fn unsupported(&mut self, native: &str, path: &ElementPath) {
        self.unsupported_elements.insert(native.to_string());
        self.warnings.push(
            ConversionWarning::new(
                Severity::Minor,
                WarningKind::UnsupportedBlock(native.to_string()),
                format!("no mapping for '{native}', kept verbatim"),
            )
            .at(path.clone()),
        );
    }

    /// Finish into a successful result.
    pub fn finish<T>(self, data: T, stats: ConversionStats) -> ConversionResult<T> {
        ConversionResult {
            success: true,
            data,
            warnings: self.warnings,
            unsupported_elements: self.unsupported_elements,
            stats: Some(stats),
        }
    }
}

/// A warning about fidelity loss during conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionWarning {
    /// How severe is this warning?
    pub severity: Severity,
    /// What kind of issue?
    pub kind: WarningKind,
    /// Human-readable message.
    pub message: String,
    /// Where in the element tree this occurred.
    pub path: Option<ElementPath>,
}

impl ConversionWarning {
    /// Create a new warning.
    pub fn new(severity: Severity, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            path: None,
        }
    }

    /// Set the element path.
    pub fn at(mut self, path: ElementPath) -> Self {
        self.path = Some(path);
        self
    }
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (at {})", self.message, path),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Severity of a fidelity warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Information only, no data lost.
    Info,
    /// Minor formatting may differ.
    Minor,
    /// Significant information lost.
    Major,
    /// Conversion may be incorrect.
    Error,
}

/// Kind of fidelity issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum WarningKind {
    /// Native block with no neutral mapping.
    UnsupportedBlock(String),
    /// Neutral element the target builder cannot express.
    UnsupportedElement(String),
    /// Input could not be parsed as the builder's dialect.
    MalformedMarkup(String),
    /// Complex structure simplified.
    Simplified(String),
    /// Attribute dropped by the target builder.
    AttributeLost(String),
}

/// Position of an element in the tree, as child indices from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElementPath(pub Vec<usize>);

impl ElementPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of the `index`-th child of this path.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl std::fmt::Display for ElementPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_records_warning() {
        let mut diag = Diagnostics::new();
        diag.unsupported("acme/slider", &ElementPath::root().child(2));
        diag.unsupported("acme/slider", &ElementPath::root().child(4));
        let result = diag.finish((), ConversionStats::default());
        assert_eq!(result.unsupported_elements.len(), 1);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.warnings[0].path.as_ref().unwrap().to_string(), "/2");
        assert!(result.success);
    }

    #[test]
    fn test_has_errors() {
        let result = ConversionResult::ok(()).warn(ConversionWarning::new(
            Severity::Minor,
            WarningKind::Simplified("x".into()),
            "simplified",
        ));
        assert!(result.has_warnings());
        assert!(!result.has_errors());

        let failed = ConversionResult::failed(
            (),
            ConversionWarning::new(
                Severity::Error,
                WarningKind::MalformedMarkup("json".into()),
                "bad",
            ),
        );
        assert!(!failed.success);
        assert!(failed.has_errors());
    }
}
