//! pagebridge - WordPress page builder conversion
//!
//! pagebridge translates page layouts between WordPress page builders by
//! routing every dialect through one builder-neutral layout:
//! - Gutenberg block comments
//! - Elementor JSON element trees
//! - WPBakery shortcodes
//!
//! Every conversion reports what it could not carry over (warnings,
//! unsupported native elements, element counts) instead of failing.
//!
//! # Quick Start
//!
//! ```rust
//! use pagebridge::prelude::*;
//!
//! let registry = AdapterRegistry::with_defaults();
//! let page = PageData::from_raw(
//!     "<!-- wp:heading {\"level\":2} -->\n<h2>Hello</h2>\n<!-- /wp:heading -->",
//! );
//!
//! let found = registry.detect_builder(&page, None).unwrap();
//! assert_eq!(found.name, "gutenberg");
//!
//! let layout = registry.extract(&page, "gutenberg", &ExtractOptions::default()).unwrap();
//! assert_eq!(layout.data.elements[0].content.as_deref(), Some("Hello"));
//! ```
//!
//! # Features
//!
//! - `gutenberg` - block editor adapter (default)
//! - `elementor` - Elementor adapter (default)
//! - `wpbakery` - WPBakery adapter (default)
//! - `all` - every adapter

mod config;
mod registry;

pub use pagebridge_core::*;

pub use config::{AdapterConfig, ConfigError, DetectionConfig, RegistryConfig};
pub use registry::{
    AdapterRegistration, AdapterRegistry, BuilderMatch, DEFAULT_MIN_CONFIDENCE,
    DEFAULT_MIN_CONFIDENCE_ALL, DEFAULT_PRIORITY, RegisterOptions, RegistryError, RegistryStats,
};

/// Gutenberg block editor support.
#[cfg(feature = "gutenberg")]
pub mod gutenberg {
    pub use pagebridge_gutenberg::*;
}

/// Elementor support.
#[cfg(feature = "elementor")]
pub mod elementor {
    pub use pagebridge_elementor::*;
}

/// WPBakery support.
#[cfg(feature = "wpbakery")]
pub mod wpbakery {
    pub use pagebridge_wpbakery::*;
}

/// Commonly used types.
pub mod prelude {
    pub use crate::registry::{AdapterRegistry, BuilderMatch, RegisterOptions};
    pub use pagebridge_core::{
        ApplyOptions, BuilderAdapter, ConversionResult, ElementType, ExtractOptions,
        NeutralElement, NeutralLayout, PageData,
    };
}
