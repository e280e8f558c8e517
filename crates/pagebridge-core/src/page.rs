//! Page records supplied by the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A page as fetched from WordPress.
///
/// Field names follow the REST API shape so a response body deserializes
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: Rendered,
    pub content: PageContent,
    #[serde(default)]
    pub status: String,
    /// Post meta; JSON-tree builders keep their data here.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

/// A rendered-only text field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// Page body in rendered and (when authorized) raw form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    #[serde(default)]
    pub rendered: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl PageData {
    /// A page carrying only raw content.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            content: PageContent {
                rendered: String::new(),
                raw: Some(raw.into()),
            },
            ..Default::default()
        }
    }

    /// A page carrying only rendered HTML.
    pub fn from_rendered(rendered: impl Into<String>) -> Self {
        Self {
            content: PageContent {
                rendered: rendered.into(),
                raw: None,
            },
            ..Default::default()
        }
    }

    /// Raw content, falling back to the rendered body.
    pub fn source_content(&self) -> &str {
        self.content
            .raw
            .as_deref()
            .unwrap_or(&self.content.rendered)
    }

    /// Set a meta entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}
