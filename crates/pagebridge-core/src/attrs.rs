//! Attribute vocabulary and typed accessors over JSON attribute maps.

use serde_json::{Map, Value};

/// Standard neutral attribute keys.
pub mod attr {
    /// Heading level (1-6).
    pub const LEVEL: &str = "level";
    /// Media library id of an image.
    pub const MEDIA_ID: &str = "mediaId";
    /// Named image size (e.g., "large").
    pub const SIZE_SLUG: &str = "sizeSlug";
    /// Source URL for images and videos.
    pub const SRC: &str = "src";
    /// Alt text for images.
    pub const ALT: &str = "alt";
    /// Caption for images and videos.
    pub const CAPTION: &str = "caption";
    /// Link target for buttons, images and embeds.
    pub const URL: &str = "url";
    /// Visual style variant (separators).
    pub const STYLE: &str = "style";
    /// CSS length for spacers.
    pub const HEIGHT: &str = "height";
    /// CSS width for columns (e.g., "50%").
    pub const WIDTH: &str = "width";
    /// Whether a list is ordered.
    pub const ORDERED: &str = "ordered";
    /// Quote attribution.
    pub const CITATION: &str = "citation";
    /// Text or block alignment.
    pub const ALIGN: &str = "align";
    /// Embed provider slug (e.g., "youtube").
    pub const PROVIDER: &str = "provider";
    /// Programming language of a code element.
    pub const LANGUAGE: &str = "language";
    /// Original native block name and attributes.
    pub const BUILDER_DATA: &str = "_builderData";
}

/// Typed reads over a JSON attribute map.
///
/// Builders are loose about scalar types (`"50"` vs `50`), so the numeric
/// getters accept numeric strings too.
pub trait AttrsExt {
    fn get_str(&self, key: &str) -> Option<&str>;
    fn get_i64(&self, key: &str) -> Option<i64>;
    fn get_f64(&self, key: &str) -> Option<f64>;
    fn get_bool(&self, key: &str) -> Option<bool>;

    /// A scalar rendered as a string (`50` → `"50"`).
    fn get_string(&self, key: &str) -> Option<String>;
}

impl AttrsExt for Map<String, Value> {
    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_numeric_strings() {
        let a = attrs(json!({"level": "3", "height": 40, "ratio": "0.5"}));
        assert_eq!(a.get_i64("level"), Some(3));
        assert_eq!(a.get_i64("height"), Some(40));
        assert_eq!(a.get_f64("ratio"), Some(0.5));
        assert_eq!(a.get_string("height").as_deref(), Some("40"));
    }

    #[test]
    fn test_missing_and_mistyped() {
        let a = attrs(json!({"flag": [1], "name": "x"}));
        assert_eq!(a.get_bool("flag"), None);
        assert_eq!(a.get_i64("name"), None);
        assert_eq!(a.get_str("missing"), None);
    }

    #[test]
    fn test_bool_strings() {
        let a = attrs(json!({"a": "yes", "b": false, "c": ""}));
        assert_eq!(a.get_bool("a"), Some(true));
        assert_eq!(a.get_bool("b"), Some(false));
        assert_eq!(a.get_bool("c"), Some(false));
    }
}
