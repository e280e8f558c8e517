//! Adapter registry and builder detection.
//!
//! The registry is built once and then shared immutably; detection only needs
//! `&AdapterRegistry`, so an `Arc<AdapterRegistry>` can serve concurrent
//! callers.

use std::panic::{AssertUnwindSafe, catch_unwind};

use pagebridge_core::{
    ApplyOptions, BuilderAdapter, ConversionResult, Detection, ExtractOptions, NeutralLayout,
    PageData,
};
use tracing::{debug, warn};

use crate::config::RegistryConfig;

/// Priority given to adapters registered without one.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Threshold for [`AdapterRegistry::detect_builder`].
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Threshold for [`AdapterRegistry::detect_all_builders`].
pub const DEFAULT_MIN_CONFIDENCE_ALL: f64 = 0.3;

/// Errors from registry lookups and registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("adapter '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("no adapter named '{0}'")]
    NotFound(String),
    #[error("adapter '{0}' is not supported in this build")]
    Unsupported(String),
    #[error("could not detect which builder produced the page")]
    NotDetected,
}

/// How an adapter is registered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterOptions {
    /// Higher priority adapters are listed first.
    pub priority: i32,
    pub enabled: bool,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            enabled: true,
        }
    }
}

impl RegisterOptions {
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// A registered adapter.
pub struct AdapterRegistration {
    pub adapter: Box<dyn BuilderAdapter>,
    pub priority: i32,
    pub enabled: bool,
    /// Registration order, used to break ties.
    seq: u64,
}

impl AdapterRegistration {
    pub fn name(&self) -> &str {
        self.adapter.name()
    }
}

impl std::fmt::Debug for AdapterRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistration")
            .field("name", &self.adapter.name())
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .field("seq", &self.seq)
            .finish()
    }
}

/// A builder that passed detection.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderMatch {
    /// Registry key of the adapter.
    pub name: String,
    pub display_name: String,
    pub confidence: f64,
    pub method: String,
}

/// Counts reported by [`AdapterRegistry::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub total: usize,
    pub enabled: usize,
    pub supported: usize,
}

/// Named, prioritized adapter registrations.
///
/// # Examples
///
/// ```
/// use pagebridge::{AdapterRegistry, RegisterOptions};
/// use pagebridge::gutenberg::GutenbergAdapter;
///
/// let mut registry = AdapterRegistry::new();
/// registry
///     .register(GutenbergAdapter, RegisterOptions::default().priority(100))
///     .unwrap();
/// assert!(registry.has("gutenberg"));
/// ```
pub struct AdapterRegistry {
    registrations: Vec<AdapterRegistration>,
    next_seq: u64,
    min_confidence: f64,
    min_confidence_all: f64,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("registrations", &self.registrations)
            .field("min_confidence", &self.min_confidence)
            .field("min_confidence_all", &self.min_confidence_all)
            .finish()
    }
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            next_seq: 0,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_confidence_all: DEFAULT_MIN_CONFIDENCE_ALL,
        }
    }

    /// A registry holding every adapter compiled into this build.
    pub fn with_defaults() -> Self {
        Self::from_config(&RegistryConfig::default())
    }

    /// Register the built-in adapters with configured priorities and
    /// thresholds. Adapters the config does not mention get the defaults.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let mut registry = Self::new();
        registry.min_confidence = config.detection.min_confidence;
        registry.min_confidence_all = config.detection.min_confidence_all;

        for adapter in builtin_adapters() {
            let settings = config.adapter(adapter.name());
            let options = RegisterOptions {
                priority: settings.priority,
                enabled: settings.enabled,
            };
            let name = adapter.name().to_string();
            if let Err(e) = registry.register_boxed(adapter, options) {
                warn!(adapter = %name, error = %e, "built-in adapter not registered");
            }
        }

        for name in config.adapters.keys() {
            if !registry.has(name) {
                warn!(adapter = %name, "configured adapter is not available in this build");
            }
        }
        registry
    }

    /// Add an adapter under its own name.
    pub fn register<A>(
        &mut self,
        adapter: A,
        options: RegisterOptions,
    ) -> Result<(), RegistryError>
    where
        A: BuilderAdapter + 'static,
    {
        self.register_boxed(Box::new(adapter), options)
    }

    pub fn register_boxed(
        &mut self,
        adapter: Box<dyn BuilderAdapter>,
        options: RegisterOptions,
    ) -> Result<(), RegistryError> {
        let name = adapter.name().to_string();
        if self.has(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        debug!(adapter = %name, priority = options.priority, enabled = options.enabled, "register");
        self.registrations.push(AdapterRegistration {
            adapter,
            priority: options.priority,
            enabled: options.enabled,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        Ok(())
    }

    /// Remove an adapter. Returns whether it was registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.name() != name);
        self.registrations.len() != before
    }

    pub fn has(&self, name: &str) -> bool {
        self.registration(name).is_some()
    }

    /// Look up an adapter by name, enabled or not.
    pub fn get(&self, name: &str) -> Option<&dyn BuilderAdapter> {
        self.registration(name).map(|r| r.adapter.as_ref())
    }

    /// Every registration, enabled or not, in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = &AdapterRegistration> {
        self.registrations.iter()
    }

    pub fn registration(&self, name: &str) -> Option<&AdapterRegistration> {
        self.registrations.iter().find(|r| r.name() == name)
    }

    /// Enable or disable an adapter. Returns whether it was registered.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.registrations.iter_mut().find(|r| r.name() == name) {
            Some(r) => {
                r.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Enabled registrations, highest priority first, then in registration
    /// order.
    pub fn get_all(&self) -> Vec<&AdapterRegistration> {
        let mut all: Vec<_> = self.registrations.iter().filter(|r| r.enabled).collect();
        all.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        all
    }

    /// [`get_all`](Self::get_all) restricted to adapters usable in this build.
    pub fn get_supported(&self) -> Vec<&AdapterRegistration> {
        self.get_all()
            .into_iter()
            .filter(|r| r.adapter.supported())
            .collect()
    }

    /// The most confident builder at or above `min_confidence` (default 0.5,
    /// or the configured threshold).
    ///
    /// Priority is not consulted; equal confidence goes to the adapter that
    /// was registered first. Adapters that fail or panic are skipped.
    pub fn detect_builder(
        &self,
        page: &PageData,
        min_confidence: Option<f64>,
    ) -> Option<BuilderMatch> {
        let threshold = min_confidence.unwrap_or(self.min_confidence);
        let mut best: Option<(u64, BuilderMatch)> = None;
        for (seq, found) in self.detections(page, threshold) {
            let better = match &best {
                None => true,
                Some((best_seq, current)) => {
                    found.confidence > current.confidence
                        || (found.confidence == current.confidence && seq < *best_seq)
                }
            };
            if better {
                best = Some((seq, found));
            }
        }
        let best = best.map(|(_, m)| m);
        debug!(builder = ?best.as_ref().map(|m| &m.name), threshold, "detect builder");
        best
    }

    /// Every builder at or above `min_confidence` (default 0.3, or the
    /// configured threshold), most confident first.
    pub fn detect_all_builders(
        &self,
        page: &PageData,
        min_confidence: Option<f64>,
    ) -> Vec<BuilderMatch> {
        let threshold = min_confidence.unwrap_or(self.min_confidence_all);
        let mut found = self.detections(page, threshold);
        found.sort_by(|(a_seq, a), (b_seq, b)| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a_seq.cmp(b_seq))
        });
        found.into_iter().map(|(_, m)| m).collect()
    }

    fn detections(&self, page: &PageData, threshold: f64) -> Vec<(u64, BuilderMatch)> {
        let mut out = Vec::new();
        for registration in self.get_supported() {
            let adapter = registration.adapter.as_ref();
            let Some(detection) = run_detect(adapter, page) else {
                continue;
            };
            debug!(
                adapter = adapter.name(),
                confidence = detection.confidence,
                method = %detection.method,
                "detect"
            );
            if detection.detected && detection.confidence >= threshold {
                out.push((
                    registration.seq,
                    BuilderMatch {
                        name: adapter.name().to_string(),
                        display_name: adapter.display_name().to_string(),
                        confidence: detection.confidence,
                        method: detection.method,
                    },
                ));
            }
        }
        out
    }

    /// Remove every registration.
    pub fn clear(&mut self) {
        self.registrations.clear();
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total: self.registrations.len(),
            enabled: self.registrations.iter().filter(|r| r.enabled).count(),
            supported: self
                .registrations
                .iter()
                .filter(|r| r.enabled && r.adapter.supported())
                .count(),
        }
    }

    fn usable(&self, name: &str) -> Result<&dyn BuilderAdapter, RegistryError> {
        let adapter = self
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if !adapter.supported() {
            return Err(RegistryError::Unsupported(name.to_string()));
        }
        Ok(adapter)
    }

    /// Extract a page's layout with the named adapter.
    pub fn extract(
        &self,
        page: &PageData,
        builder: &str,
        options: &ExtractOptions,
    ) -> Result<ConversionResult<NeutralLayout>, RegistryError> {
        Ok(self.usable(builder)?.extract_layout(page, options))
    }

    /// Write a layout as the named builder's markup.
    pub fn apply(
        &self,
        layout: &NeutralLayout,
        builder: &str,
        options: &ApplyOptions,
    ) -> Result<ConversionResult<String>, RegistryError> {
        Ok(self.usable(builder)?.apply_layout(layout, options))
    }

    /// Extract with `from` (detected when `None`) and apply with `to`.
    ///
    /// Warnings and unsupported elements from both steps are combined; the
    /// stats are those of the apply step.
    pub fn convert(
        &self,
        page: &PageData,
        from: Option<&str>,
        to: &str,
        extract: &ExtractOptions,
        apply: &ApplyOptions,
    ) -> Result<ConversionResult<String>, RegistryError> {
        let target = self.usable(to)?;
        let source = match from {
            Some(name) => name.to_string(),
            None => {
                self.detect_builder(page, None)
                    .ok_or(RegistryError::NotDetected)?
                    .name
            }
        };

        let extracted = self.extract(page, &source, extract)?;
        if !extracted.success {
            let mut failed = ConversionResult::ok(String::new());
            failed.success = false;
            failed.warnings = extracted.warnings;
            failed.unsupported_elements = extracted.unsupported_elements;
            return Ok(failed);
        }

        let mut applied = target.apply_layout(&extracted.data, apply);
        let mut warnings = extracted.warnings;
        warnings.append(&mut applied.warnings);
        applied.warnings = warnings;
        applied
            .unsupported_elements
            .extend(extracted.unsupported_elements);
        debug!(from = %source, to, warnings = applied.warnings.len(), "convert");
        Ok(applied)
    }
}

fn run_detect(adapter: &dyn BuilderAdapter, page: &PageData) -> Option<Detection> {
    match catch_unwind(AssertUnwindSafe(|| adapter.detect(page))) {
        Ok(Ok(detection)) => Some(detection),
        Ok(Err(e)) => {
            warn!(adapter = adapter.name(), error = %e, "detection failed");
            None
        }
        Err(_) => {
            warn!(adapter = adapter.name(), "detection panicked");
            None
        }
    }
}

fn builtin_adapters() -> Vec<Box<dyn BuilderAdapter>> {
    #[allow(unused_mut)]
    let mut adapters: Vec<Box<dyn BuilderAdapter>> = Vec::new();
    #[cfg(feature = "gutenberg")]
    adapters.push(Box::new(pagebridge_gutenberg::GutenbergAdapter));
    #[cfg(feature = "elementor")]
    adapters.push(Box::new(pagebridge_elementor::ElementorAdapter));
    #[cfg(feature = "wpbakery")]
    adapters.push(Box::new(pagebridge_wpbakery::WpBakeryAdapter));
    adapters
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagebridge_core::{AdapterError, Capabilities};

    /// Adapter with a fixed detection outcome.
    struct Fixed {
        name: &'static str,
        confidence: f64,
        supported: bool,
    }

    impl Fixed {
        fn new(name: &'static str, confidence: f64) -> Self {
            Self {
                name,
                confidence,
                supported: true,
            }
        }
    }

    impl BuilderAdapter for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn display_name(&self) -> &str {
            self.name
        }
        fn supported(&self) -> bool {
            self.supported
        }
        fn version(&self) -> &str {
            "0"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }
        fn detect(&self, _page: &PageData) -> Result<Detection, AdapterError> {
            Ok(Detection {
                detected: self.confidence > 0.0,
                confidence: self.confidence,
                method: "fixed".into(),
            })
        }
        fn extract_layout_from_content(
            &self,
            _raw: &str,
            _options: &ExtractOptions,
        ) -> ConversionResult<NeutralLayout> {
            ConversionResult::ok(NeutralLayout::new(self.name))
        }
        fn apply_layout(
            &self,
            _layout: &NeutralLayout,
            _options: &ApplyOptions,
        ) -> ConversionResult<String> {
            ConversionResult::ok(self.name.to_string())
        }
    }

    struct Failing;

    impl BuilderAdapter for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn display_name(&self) -> &str {
            "Failing"
        }
        fn version(&self) -> &str {
            "0"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }
        fn detect(&self, _page: &PageData) -> Result<Detection, AdapterError> {
            Err(AdapterError::Detection("boom".into()))
        }
        fn extract_layout_from_content(
            &self,
            _raw: &str,
            _options: &ExtractOptions,
        ) -> ConversionResult<NeutralLayout> {
            ConversionResult::ok(NeutralLayout::new("failing"))
        }
        fn apply_layout(
            &self,
            _layout: &NeutralLayout,
            _options: &ApplyOptions,
        ) -> ConversionResult<String> {
            ConversionResult::ok(String::new())
        }
    }

    struct Panicking;

    impl BuilderAdapter for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }
        fn display_name(&self) -> &str {
            "Panicking"
        }
        fn version(&self) -> &str {
            "0"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }
        fn detect(&self, _page: &PageData) -> Result<Detection, AdapterError> {
            panic!("detector bug")
        }
        fn extract_layout_from_content(
            &self,
            _raw: &str,
            _options: &ExtractOptions,
        ) -> ConversionResult<NeutralLayout> {
            ConversionResult::ok(NeutralLayout::new("panicking"))
        }
        fn apply_layout(
            &self,
            _layout: &NeutralLayout,
            _options: &ApplyOptions,
        ) -> ConversionResult<String> {
            ConversionResult::ok(String::new())
        }
    }

    fn page() -> PageData {
        PageData::from_raw("anything")
    }

    fn names(regs: &[&AdapterRegistration]) -> Vec<String> {
        regs.iter().map(|r| r.name().to_string()).collect()
    }

    #[test]
    fn test_duplicate_name_fails() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Fixed::new("a", 0.9), RegisterOptions::default())
            .unwrap();
        let err = registry
            .register(Fixed::new("a", 0.1), RegisterOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(name) if name == "a"));
        assert_eq!(registry.stats().total, 1);
    }

    #[test]
    fn test_get_all_sorts_and_filters() {
        let mut registry = AdapterRegistry::new();
        let opts = RegisterOptions::default();
        registry.register(Fixed::new("low", 0.5), opts.priority(10)).unwrap();
        registry.register(Fixed::new("first", 0.5), opts).unwrap();
        registry.register(Fixed::new("high", 0.5), opts.priority(90)).unwrap();
        registry.register(Fixed::new("second", 0.5), opts).unwrap();
        registry
            .register(Fixed::new("off", 0.5), opts.priority(100).enabled(false))
            .unwrap();

        assert_eq!(
            names(&registry.get_all()),
            vec!["high", "first", "second", "low"]
        );
        assert!(registry.get("off").is_some());
    }

    #[test]
    fn test_get_supported() {
        let mut registry = AdapterRegistry::new();
        let mut stub = Fixed::new("stub", 0.9);
        stub.supported = false;
        registry.register(stub, RegisterOptions::default()).unwrap();
        registry
            .register(Fixed::new("real", 0.9), RegisterOptions::default())
            .unwrap();

        assert_eq!(names(&registry.get_supported()), vec!["real"]);
        assert_eq!(
            registry.stats(),
            RegistryStats {
                total: 2,
                enabled: 2,
                supported: 1
            }
        );
        assert_eq!(registry.detect_builder(&page(), None).unwrap().name, "real");
    }

    #[test]
    fn test_unregister_and_set_enabled() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Fixed::new("a", 0.9), RegisterOptions::default())
            .unwrap();
        assert!(registry.set_enabled("a", false));
        assert!(!registry.set_enabled("missing", false));
        assert!(registry.get_all().is_empty());
        assert!(registry.detect_builder(&page(), None).is_none());

        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert!(!registry.has("a"));
    }

    #[test]
    fn test_detect_highest_confidence() {
        let mut registry = AdapterRegistry::new();
        let opts = RegisterOptions::default();
        registry.register(Fixed::new("weak", 0.6), opts.priority(100)).unwrap();
        registry.register(Fixed::new("strong", 0.9), opts).unwrap();
        registry.register(Fixed::new("none", 0.0), opts).unwrap();

        let found = registry.detect_builder(&page(), None).unwrap();
        assert_eq!(found.name, "strong");
        assert_eq!(found.confidence, 0.9);
    }

    #[test]
    fn test_detect_tie_goes_to_first_registered() {
        let mut registry = AdapterRegistry::new();
        let opts = RegisterOptions::default();
        registry.register(Fixed::new("early", 0.8), opts).unwrap();
        registry.register(Fixed::new("late", 0.8), opts.priority(100)).unwrap();

        assert_eq!(registry.detect_builder(&page(), None).unwrap().name, "early");
        let all = registry.detect_all_builders(&page(), None);
        assert_eq!(all[0].name, "early");
        assert_eq!(all[1].name, "late");
    }

    #[test]
    fn test_detect_threshold() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Fixed::new("maybe", 0.4), RegisterOptions::default())
            .unwrap();

        assert!(registry.detect_builder(&page(), None).is_none());
        assert!(registry.detect_builder(&page(), Some(0.3)).is_some());
        assert_eq!(registry.detect_all_builders(&page(), None).len(), 1);
        assert!(registry.detect_all_builders(&page(), Some(0.45)).is_empty());
    }

    #[test]
    fn test_failing_adapters_are_excluded() {
        let mut registry = AdapterRegistry::new();
        let opts = RegisterOptions::default();
        registry.register(Failing, opts).unwrap();
        registry.register(Panicking, opts).unwrap();
        registry.register(Fixed::new("ok", 0.7), opts).unwrap();

        assert_eq!(registry.detect_builder(&page(), None).unwrap().name, "ok");
        assert_eq!(registry.detect_all_builders(&page(), None).len(), 1);
    }

    #[test]
    fn test_detect_all_sorted_by_confidence() {
        let mut registry = AdapterRegistry::new();
        let opts = RegisterOptions::default();
        registry.register(Fixed::new("b", 0.35), opts).unwrap();
        registry.register(Fixed::new("a", 0.95), opts).unwrap();
        registry.register(Fixed::new("c", 0.6), opts).unwrap();

        let all: Vec<_> = registry
            .detect_all_builders(&page(), None)
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(all, vec!["a", "c", "b"]);
    }

    #[cfg(feature = "gutenberg")]
    #[test]
    fn test_clear() {
        let mut registry = AdapterRegistry::with_defaults();
        assert!(registry.stats().total > 0);
        registry.clear();
        assert_eq!(registry.stats(), RegistryStats::default());
    }

    #[test]
    fn test_unknown_builder() {
        let registry = AdapterRegistry::new();
        let err = registry
            .extract(&page(), "nope", &ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_from_config_registers_every_builtin() {
        let builtins = builtin_adapters();
        let registry = AdapterRegistry::from_config(&RegistryConfig::default());
        assert_eq!(registry.stats().total, builtins.len());
        for adapter in &builtins {
            assert!(registry.has(adapter.name()), "{}", adapter.name());
        }
    }

    #[cfg(all(feature = "gutenberg", feature = "elementor", feature = "wpbakery"))]
    #[test]
    fn test_with_defaults() {
        let registry = AdapterRegistry::with_defaults();
        assert_eq!(
            names(&registry.get_all()),
            vec!["gutenberg", "elementor", "wpbakery"]
        );
    }
}
