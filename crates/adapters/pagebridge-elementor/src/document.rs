//! Elementor's stored element tree.
//!
//! Elementor keeps a page as a JSON array in the `_elementor_data` post meta.
//! Every node has the same shape; `elType` says whether it is a section,
//! column, container or widget, and widgets name their kind in `widgetType`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Post meta key holding the element tree.
pub const META_KEY: &str = "_elementor_data";

/// One node of the Elementor tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementorElement {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(rename = "elType")]
    pub el_type: String,
    #[serde(
        rename = "widgetType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub widget_type: Option<String>,
    #[serde(rename = "isInner", default, skip_serializing_if = "is_false")]
    pub is_inner: bool,
    #[serde(default, deserialize_with = "lenient_settings")]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub elements: Vec<ElementorElement>,
}

impl ElementorElement {
    pub fn new(id: impl Into<String>, el_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            el_type: el_type.into(),
            widget_type: None,
            is_inner: false,
            settings: Map::new(),
            elements: Vec::new(),
        }
    }

    pub fn widget(id: impl Into<String>, widget_type: impl Into<String>) -> Self {
        Self {
            widget_type: Some(widget_type.into()),
            ..Self::new(id, "widget")
        }
    }

    pub fn setting(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }

    /// `widgetType` for widgets, `elType` for everything else.
    pub fn native_name(&self) -> &str {
        match &self.widget_type {
            Some(w) if self.el_type == "widget" => w,
            _ => &self.el_type,
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// PHP writes an empty settings object as `[]`.
fn lenient_settings<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Ids are hex strings, but older exports sometimes store numbers.
fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Parse the stored JSON array.
pub fn parse_document(raw: &str) -> serde_json::Result<Vec<ElementorElement>> {
    serde_json::from_str(raw)
}

/// Parse a meta value that is either the JSON text or the decoded array.
pub fn document_from_value(value: &Value) -> serde_json::Result<Vec<ElementorElement>> {
    match value {
        Value::String(raw) => parse_document(raw),
        other => Vec::<ElementorElement>::deserialize(other),
    }
}

/// Number of `elType` keys in serialized data.
pub fn count_elements(raw: &str) -> usize {
    raw.matches("\"elType\"").count()
}

/// Sequential ids in Elementor's 7-hex-digit form.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    pub fn next_id(&mut self) -> String {
        self.next += 1;
        format!("{:07x}", self.next)
    }
}
