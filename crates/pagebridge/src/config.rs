//! Registry configuration loaded from TOML.
//!
//! ```toml
//! [detection]
//! min_confidence = 0.5
//! min_confidence_all = 0.3
//!
//! [adapters.gutenberg]
//! priority = 100
//! enabled = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registry::{DEFAULT_MIN_CONFIDENCE, DEFAULT_MIN_CONFIDENCE_ALL, DEFAULT_PRIORITY};

/// Errors from loading a [`RegistryConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field} must be between 0 and 1, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub detection: DetectionConfig,
    /// Per-adapter settings keyed by registry name.
    pub adapters: BTreeMap<String, AdapterConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub min_confidence: f64,
    pub min_confidence_all: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            min_confidence_all: DEFAULT_MIN_CONFIDENCE_ALL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub priority: i32,
    pub enabled: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            enabled: true,
        }
    }
}

impl RegistryConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Settings for one adapter, defaulted when absent.
    pub fn adapter(&self, name: &str) -> AdapterConfig {
        self.adapters.get(name).copied().unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("min_confidence", self.detection.min_confidence),
            ("min_confidence_all", self.detection.min_confidence_all),
        ];
        for (field, value) in checks {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}
