//! Neutral layout - the builder-agnostic element tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attr;

/// Schema tag written into every layout.
pub const LAYOUT_VERSION: &str = "1.0";

/// A page layout expressed independently of any page builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeutralLayout {
    /// Schema version, currently [`LAYOUT_VERSION`].
    pub layout_version: String,
    /// Which adapter produced (or will consume) this layout.
    pub source: LayoutSource,
    /// Root-level elements in document order.
    #[serde(default)]
    pub elements: Vec<NeutralElement>,
}

/// Origin information for a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSource {
    /// Adapter name (e.g., "gutenberg", "elementor").
    pub builder: String,
}

impl NeutralLayout {
    /// Create an empty layout for the given builder.
    pub fn new(builder: impl Into<String>) -> Self {
        Self {
            layout_version: LAYOUT_VERSION.to_string(),
            source: LayoutSource {
                builder: builder.into(),
            },
            elements: Vec::new(),
        }
    }

    /// Set the root elements.
    pub fn with_elements(mut self, elements: Vec<NeutralElement>) -> Self {
        self.elements = elements;
        self
    }

    /// Parse a layout from its JSON wire form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Count elements at every depth: `(total, non-unknown)`.
    pub fn count_elements(&self) -> (usize, usize) {
        count_all(&self.elements)
    }

    /// Iterate over every element, depth first, in document order.
    pub fn walk(&self) -> impl Iterator<Item = &NeutralElement> {
        let mut stack: Vec<&NeutralElement> = self.elements.iter().rev().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }
}

/// Count elements recursively: `(total, non-unknown)`.
pub fn count_all(elements: &[NeutralElement]) -> (usize, usize) {
    elements.iter().fold((0, 0), |(total, converted), el| {
        let (t, c) = count_all(&el.children);
        let own = usize::from(!el.kind.is_unknown());
        (total + 1 + t, converted + own + c)
    })
}

/// A single element of a neutral layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeutralElement {
    /// Element type.
    #[serde(rename = "type")]
    pub kind: ElementType,
    /// Semantic attributes.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
    /// Text or HTML payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Child elements (containers only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NeutralElement>,
}

impl NeutralElement {
    /// Create a new element with the given type.
    pub fn new(kind: impl Into<ElementType>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Map::new(),
            content: None,
            children: Vec::new(),
        }
    }

    /// Set an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Set an attribute when a value is present.
    pub fn attr_opt(self, key: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.attr(key, v),
            None => self,
        }
    }

    /// Set the content payload.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Add a child element.
    pub fn child(mut self, child: NeutralElement) -> Self {
        self.children.push(child);
        self
    }

    /// Add multiple child elements.
    pub fn children(mut self, children: impl IntoIterator<Item = NeutralElement>) -> Self {
        self.children.extend(children);
        self
    }

    /// Attach the original native block name and attributes.
    pub fn with_builder_data(mut self, data: BuilderData) -> Self {
        self.attrs.insert(attr::BUILDER_DATA.to_string(), data.into_value());
        self
    }

    /// Original native data, if it was preserved during extraction.
    pub fn builder_data(&self) -> Option<BuilderData> {
        BuilderData::from_value(self.attrs.get(attr::BUILDER_DATA)?)
    }

    /// Concatenated text of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = self.content.clone().unwrap_or_default();
        for child in &self.children {
            out.push_str(&child.text());
        }
        out
    }
}

/// Native block name and attributes kept for near-lossless reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderData {
    pub block_name: String,
    pub attrs: Map<String, Value>,
    /// Native element id, for dialects that assign one.
    pub id: Option<String>,
}

impl BuilderData {
    pub fn new(block_name: impl Into<String>, attrs: Map<String, Value>) -> Self {
        Self {
            block_name: block_name.into(),
            attrs,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert("blockName".to_string(), Value::String(self.block_name));
        map.insert("attrs".to_string(), Value::Object(self.attrs));
        if let Some(id) = self.id {
            map.insert("id".to_string(), Value::String(id));
        }
        Value::Object(map)
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let block_name = obj.get("blockName")?.as_str()?.to_string();
        let attrs = obj
            .get("attrs")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let id = obj.get("id").and_then(Value::as_str).map(str::to_string);
        Some(Self {
            block_name,
            attrs,
            id,
        })
    }
}

/// Neutral element type.
///
/// The vocabulary is closed for the types adapters understand. Types read
/// from JSON that are not part of it are kept verbatim in [`ElementType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementType {
    Paragraph,
    Heading,
    Image,
    Button,
    Buttons,
    Separator,
    Spacer,
    Row,
    Column,
    Section,
    List,
    ListItem,
    Quote,
    Code,
    Html,
    Video,
    Embed,
    Unknown,
    Other(String),
}

impl ElementType {
    /// Every named type, in declaration order.
    pub const ALL: &'static [ElementType] = &[
        ElementType::Paragraph,
        ElementType::Heading,
        ElementType::Image,
        ElementType::Button,
        ElementType::Buttons,
        ElementType::Separator,
        ElementType::Spacer,
        ElementType::Row,
        ElementType::Column,
        ElementType::Section,
        ElementType::List,
        ElementType::ListItem,
        ElementType::Quote,
        ElementType::Code,
        ElementType::Html,
        ElementType::Video,
        ElementType::Embed,
        ElementType::Unknown,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ElementType::Paragraph => "paragraph",
            ElementType::Heading => "heading",
            ElementType::Image => "image",
            ElementType::Button => "button",
            ElementType::Buttons => "buttons",
            ElementType::Separator => "separator",
            ElementType::Spacer => "spacer",
            ElementType::Row => "row",
            ElementType::Column => "column",
            ElementType::Section => "section",
            ElementType::List => "list",
            ElementType::ListItem => "list_item",
            ElementType::Quote => "quote",
            ElementType::Code => "code",
            ElementType::Html => "html",
            ElementType::Video => "video",
            ElementType::Embed => "embed",
            ElementType::Unknown => "unknown",
            ElementType::Other(s) => s,
        }
    }

    /// Whether this type holds child elements.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ElementType::Row
                | ElementType::Column
                | ElementType::Section
                | ElementType::Buttons
                | ElementType::List
                | ElementType::Quote
        )
    }

    /// Unknown and unrecognized types both count as unmapped.
    pub fn is_unknown(&self) -> bool {
        matches!(self, ElementType::Unknown | ElementType::Other(_))
    }
}

impl From<&str> for ElementType {
    fn from(s: &str) -> Self {
        ElementType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .cloned()
            .unwrap_or_else(|| ElementType::Other(s.to_string()))
    }
}

impl From<String> for ElementType {
    fn from(s: String) -> Self {
        ElementType::from(s.as_str())
    }
}

impl From<ElementType> for String {
    fn from(t: ElementType) -> Self {
        match t {
            ElementType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
