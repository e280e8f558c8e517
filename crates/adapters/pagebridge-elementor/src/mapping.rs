//! Elementor element ↔ neutral element mapping tables.

use pagebridge_core::markup::{escape_attr, inner_of};
use pagebridge_core::{
    AttrsExt, BuilderData, ConversionWarning, Diagnostics, ElementPath, ElementType,
    ExtractOptions, NeutralElement, Severity, WarningKind, attr, count_all,
};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::document::{ElementorElement, IdGenerator};

/// Nesting beyond this depth is kept verbatim instead of mapped.
pub const MAX_DEPTH: usize = 128;

/// Elementor's default spacer height.
pub const DEFAULT_SPACER_HEIGHT: &str = "50px";

/// Element kinds with a neutral mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementorKind {
    Section,
    Column,
    Container,
    Heading,
    TextEditor,
    Image,
    Button,
    Divider,
    Spacer,
    Video,
    Html,
}

impl ElementorKind {
    pub const ALL: &'static [ElementorKind] = &[
        ElementorKind::Section,
        ElementorKind::Column,
        ElementorKind::Container,
        ElementorKind::Heading,
        ElementorKind::TextEditor,
        ElementorKind::Image,
        ElementorKind::Button,
        ElementorKind::Divider,
        ElementorKind::Spacer,
        ElementorKind::Video,
        ElementorKind::Html,
    ];

    /// `elType` of structural kinds, `widgetType` of widgets.
    pub fn native_name(self) -> &'static str {
        match self {
            ElementorKind::Section => "section",
            ElementorKind::Column => "column",
            ElementorKind::Container => "container",
            ElementorKind::Heading => "heading",
            ElementorKind::TextEditor => "text-editor",
            ElementorKind::Image => "image",
            ElementorKind::Button => "button",
            ElementorKind::Divider => "divider",
            ElementorKind::Spacer => "spacer",
            ElementorKind::Video => "video",
            ElementorKind::Html => "html",
        }
    }

    pub fn is_widget(self) -> bool {
        !matches!(
            self,
            ElementorKind::Section | ElementorKind::Column | ElementorKind::Container
        )
    }

    pub fn from_element(el: &ElementorElement) -> Option<Self> {
        let name = el.native_name();
        let kind = ElementorKind::ALL
            .iter()
            .copied()
            .find(|k| k.native_name() == name)?;
        (kind.is_widget() == (el.el_type == "widget")).then_some(kind)
    }

    pub fn element_type(self) -> ElementType {
        match self {
            ElementorKind::Section => ElementType::Row,
            ElementorKind::Column => ElementType::Column,
            ElementorKind::Container => ElementType::Section,
            ElementorKind::Heading => ElementType::Heading,
            ElementorKind::TextEditor => ElementType::Paragraph,
            ElementorKind::Image => ElementType::Image,
            ElementorKind::Button => ElementType::Button,
            ElementorKind::Divider => ElementType::Separator,
            ElementorKind::Spacer => ElementType::Spacer,
            ElementorKind::Video => ElementType::Video,
            ElementorKind::Html => ElementType::Html,
        }
    }
}

// ---------------------------------------------------------------------------
// Forward
// ---------------------------------------------------------------------------

pub(crate) struct Extractor<'a> {
    options: &'a ExtractOptions,
    pub diagnostics: Diagnostics,
}

impl<'a> Extractor<'a> {
    pub fn new(options: &'a ExtractOptions) -> Self {
        Self {
            options,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn elements(
        &mut self,
        elements: &[ElementorElement],
        path: &ElementPath,
    ) -> Vec<NeutralElement> {
        elements
            .iter()
            .enumerate()
            .map(|(i, el)| self.element(el, &path.child(i)))
            .collect()
    }

    fn element(&mut self, el: &ElementorElement, path: &ElementPath) -> NeutralElement {
        let Some(kind) = ElementorKind::from_element(el) else {
            debug!(element = el.native_name(), %path, "unsupported elementor element");
            self.diagnostics.unsupported(el.native_name(), path);
            return verbatim(ElementType::Unknown, el);
        };

        if path.0.len() > MAX_DEPTH {
            self.diagnostics.warn(
                ConversionWarning::new(
                    Severity::Major,
                    WarningKind::Simplified(el.native_name().to_string()),
                    format!("nesting deeper than {MAX_DEPTH} kept as raw JSON"),
                )
                .at(path.clone()),
            );
            return verbatim(ElementType::Html, el);
        }

        let children = if kind.is_widget() {
            Vec::new()
        } else {
            self.elements(&el.elements, path)
        };

        let element = to_element(kind, &el.settings).children(children);
        if self.options.preserve_builder_data {
            element.with_builder_data(
                BuilderData::new(el.native_name(), el.settings.clone()).with_id(&el.id),
            )
        } else {
            element
        }
    }
}

/// Whole element as JSON, plus its name and settings.
fn verbatim(kind: ElementType, el: &ElementorElement) -> NeutralElement {
    let payload = serde_json::to_string(el).unwrap_or_default();
    NeutralElement::new(kind).content(payload).with_builder_data(
        BuilderData::new(el.native_name(), el.settings.clone()).with_id(&el.id),
    )
}

/// `{"unit":"px","size":40}` → `"40px"`.
fn dimension(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    let size = match obj.get("size")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) if !s.is_empty() => s.clone(),
        _ => return None,
    };
    let unit = obj.get_str("unit").unwrap_or("px");
    Some(format!("{size}{unit}"))
}

/// `"40px"` → `{"unit":"px","size":40}`.
fn split_dimension(css: &str) -> Value {
    let css = css.trim();
    let split = css
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(css.len());
    let (number, unit) = css.split_at(split);
    let unit = if unit.is_empty() { "px" } else { unit };
    let size = number
        .parse::<i64>()
        .map(Value::from)
        .or_else(|_| number.parse::<f64>().map(Value::from))
        .unwrap_or(Value::Null);
    json!({"unit": unit, "size": size})
}

fn nested_str<'a>(settings: &'a Map<String, Value>, outer: &str, inner: &str) -> Option<&'a str> {
    settings
        .get(outer)?
        .as_object()?
        .get(inner)?
        .as_str()
        .filter(|s| !s.is_empty())
}

/// Forward table.
fn to_element(kind: ElementorKind, s: &Map<String, Value>) -> NeutralElement {
    let el = NeutralElement::new(kind.element_type());
    match kind {
        ElementorKind::Section | ElementorKind::Container => el,

        ElementorKind::Column => {
            let width = s
                .get_f64("_inline_size")
                .or_else(|| s.get_f64("_column_size"))
                .map(|w| format!("{}%", trim_float(w)));
            el.attr_opt(attr::WIDTH, width)
        }

        ElementorKind::Heading => {
            let level = s
                .get_str("header_size")
                .and_then(|h| h.strip_prefix('h'))
                .and_then(|n| n.parse::<i64>().ok())
                .unwrap_or(2);
            el.attr(attr::LEVEL, level)
                .attr_opt(attr::ALIGN, s.get_string("align"))
                .content(s.get_str("title").unwrap_or(""))
        }

        ElementorKind::TextEditor => el
            .attr_opt(attr::ALIGN, s.get_string("align"))
            .content(inner_of(s.get_str("editor").unwrap_or(""), &["p"])),

        ElementorKind::Image => {
            let url = match s.get_str("link_to") {
                Some("custom") => nested_str(s, "link", "url"),
                _ => None,
            };
            el.attr_opt(
                attr::MEDIA_ID,
                s.get("image")
                    .and_then(|i| i.get("id"))
                    .filter(|id| !id.is_null() && id.as_str() != Some(""))
                    .cloned(),
            )
            .attr_opt(attr::SRC, nested_str(s, "image", "url"))
            .attr_opt(attr::ALT, nested_str(s, "image", "alt"))
            .attr_opt(attr::SIZE_SLUG, s.get_string("image_size"))
            .attr_opt(attr::CAPTION, s.get_str("caption").filter(|c| !c.is_empty()))
            .attr_opt(attr::URL, url)
            .attr_opt(attr::ALIGN, s.get_string("align"))
        }

        ElementorKind::Button => el
            .attr_opt(attr::URL, nested_str(s, "link", "url"))
            .attr_opt(attr::ALIGN, s.get_string("align"))
            .content(s.get_str("text").unwrap_or("")),

        ElementorKind::Divider => el.attr_opt(attr::STYLE, s.get_string("style")),

        ElementorKind::Spacer => el.attr(
            attr::HEIGHT,
            s.get("space")
                .and_then(dimension)
                .unwrap_or_else(|| DEFAULT_SPACER_HEIGHT.to_string()),
        ),

        ElementorKind::Video => {
            let src = match s.get_str("video_type").unwrap_or("youtube") {
                "hosted" => nested_str(s, "hosted_url", "url").map(str::to_string),
                other => s.get_string(&format!("{other}_url")),
            };
            el.attr_opt(attr::SRC, src)
        }

        ElementorKind::Html => el.content(s.get_str("html").unwrap_or("")),
    }
}

fn trim_float(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        let s = format!("{v:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

// ---------------------------------------------------------------------------
// Reverse
// ---------------------------------------------------------------------------

pub(crate) struct Applier {
    same_builder: bool,
    ids: IdGenerator,
    pub diagnostics: Diagnostics,
    pub total: usize,
    pub converted: usize,
}

impl Applier {
    pub fn new(same_builder: bool) -> Self {
        Self {
            same_builder,
            ids: IdGenerator::default(),
            diagnostics: Diagnostics::new(),
            total: 0,
            converted: 0,
        }
    }

    /// Top-level elements must be sections or containers; runs of bare
    /// widgets are collected into a container.
    pub fn document(&mut self, elements: &[NeutralElement]) -> Vec<ElementorElement> {
        let root = ElementPath::root();
        let mut out = Vec::new();
        let mut loose: Vec<ElementorElement> = Vec::new();

        for (i, el) in elements.iter().enumerate() {
            for native in self.element(el, &root.child(i), 0) {
                if native.el_type == "widget" {
                    loose.push(native);
                } else {
                    self.flush_loose(&mut out, &mut loose);
                    out.push(native);
                }
            }
        }
        self.flush_loose(&mut out, &mut loose);
        out
    }

    fn flush_loose(&mut self, out: &mut Vec<ElementorElement>, loose: &mut Vec<ElementorElement>) {
        if loose.is_empty() {
            return;
        }
        let mut container = ElementorElement::new(self.ids.next_id(), "container");
        container.elements = std::mem::take(loose);
        out.push(container);
    }

    fn children(
        &mut self,
        elements: &[NeutralElement],
        path: &ElementPath,
        depth: usize,
    ) -> Vec<ElementorElement> {
        elements
            .iter()
            .enumerate()
            .flat_map(|(i, el)| self.element(el, &path.child(i), depth + 1))
            .collect()
    }

    fn element(
        &mut self,
        el: &NeutralElement,
        path: &ElementPath,
        depth: usize,
    ) -> Vec<ElementorElement> {
        self.total += 1;
        let preserved = el.builder_data();
        let id = preserved
            .as_ref()
            .and_then(|d| d.id.clone())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.ids.next_id());

        let mut native = match &el.kind {
            ElementType::Row => {
                let mut section = ElementorElement::new(id, "section");
                section.is_inner = depth > 0;
                section.elements = self.columns(&el.children, path, depth);
                section
            }
            ElementType::Column => {
                let mut column = ElementorElement::new(id, "column");
                if let Some(width) = el.attrs.get_str(attr::WIDTH) {
                    let size = width.trim_end_matches('%').trim().parse::<f64>().ok();
                    if let Some(size) = size {
                        column = column.setting("_column_size", size.round() as i64);
                        if size.fract() != 0.0 {
                            column = column.setting("_inline_size", size);
                        }
                    }
                }
                column.elements = self.children(&el.children, path, depth);
                column
            }
            ElementType::Section | ElementType::Buttons => {
                if el.kind == ElementType::Buttons {
                    self.simplified(el, path, "button group written as a container");
                }
                let mut container = ElementorElement::new(id, "container");
                container.is_inner = depth > 0;
                container.elements = self.children(&el.children, path, depth);
                container
            }
            ElementType::Heading => {
                let level = el.attrs.get_i64(attr::LEVEL).unwrap_or(2).clamp(1, 6);
                ElementorElement::widget(id, "heading")
                    .setting("title", content(el))
                    .setting("header_size", format!("h{level}"))
            }
            ElementType::Paragraph => ElementorElement::widget(id, "text-editor")
                .setting("editor", format!("<p>{}</p>", content(el))),
            ElementType::Image => {
                let mut image = Map::new();
                image.insert(
                    "url".into(),
                    Value::from(el.attrs.get_str(attr::SRC).unwrap_or("")),
                );
                if let Some(id) = el.attrs.get(attr::MEDIA_ID) {
                    image.insert("id".into(), id.clone());
                }
                if let Some(alt) = el.attrs.get_str(attr::ALT) {
                    image.insert("alt".into(), Value::from(alt));
                }
                let mut widget = ElementorElement::widget(id, "image").setting("image", image);
                if let Some(size) = el.attrs.get_str(attr::SIZE_SLUG) {
                    widget = widget.setting("image_size", size);
                }
                if let Some(caption) = el.attrs.get_str(attr::CAPTION) {
                    widget = widget
                        .setting("caption_source", "custom")
                        .setting("caption", caption);
                }
                if let Some(url) = el.attrs.get_str(attr::URL) {
                    widget = widget
                        .setting("link_to", "custom")
                        .setting("link", json!({"url": url}));
                }
                widget
            }
            ElementType::Button => {
                let mut widget =
                    ElementorElement::widget(id, "button").setting("text", content(el));
                if let Some(url) = el.attrs.get_str(attr::URL) {
                    widget = widget.setting("link", json!({"url": url}));
                }
                widget
            }
            ElementType::Separator => {
                let mut widget = ElementorElement::widget(id, "divider");
                if let Some(style) = el.attrs.get_str(attr::STYLE) {
                    widget = widget.setting("style", style);
                }
                widget
            }
            ElementType::Spacer => {
                let height = el
                    .attrs
                    .get_string(attr::HEIGHT)
                    .unwrap_or_else(|| DEFAULT_SPACER_HEIGHT.to_string());
                ElementorElement::widget(id, "spacer").setting("space", split_dimension(&height))
            }
            ElementType::Video => {
                let src = el.attrs.get_str(attr::SRC).unwrap_or("");
                video_widget(id, src)
            }
            ElementType::Embed => {
                let url = el.attrs.get_str(attr::URL).unwrap_or("");
                let provider = el.attrs.get_str(attr::PROVIDER).unwrap_or("");
                if matches!(provider, "youtube" | "vimeo") {
                    video_widget(id, url)
                } else {
                    self.simplified(el, path, "embed written as a link");
                    ElementorElement::widget(id, "html").setting(
                        "html",
                        format!("<a href=\"{}\">{}</a>", escape_attr(url), url),
                    )
                }
            }
            ElementType::List => {
                self.simplified(el, path, "list written as text");
                let tag = if el.attrs.get_bool(attr::ORDERED).unwrap_or(false) {
                    "ol"
                } else {
                    "ul"
                };
                let items: String = el
                    .children
                    .iter()
                    .map(|item| format!("<li>{}</li>", item.text()))
                    .collect();
                let body = if items.is_empty() { content(el) } else { items };
                self.flattened(el);
                return vec![ElementorElement::widget(id, "text-editor")
                    .setting("editor", format!("<{tag}>{body}</{tag}>"))];
            }
            ElementType::ListItem => ElementorElement::widget(id, "text-editor")
                .setting("editor", format!("<p>{}</p>", content(el))),
            ElementType::Quote => {
                self.simplified(el, path, "quote written as text");
                let cite = el
                    .attrs
                    .get_str(attr::CITATION)
                    .map(|c| format!("<cite>{c}</cite>"))
                    .unwrap_or_default();
                let body: String = match &el.content {
                    Some(c) => c.clone(),
                    None => el
                        .children
                        .iter()
                        .map(|c| format!("<p>{}</p>", c.text()))
                        .collect(),
                };
                self.flattened(el);
                return vec![ElementorElement::widget(id, "text-editor")
                    .setting("editor", format!("<blockquote>{body}{cite}</blockquote>"))];
            }
            ElementType::Code => ElementorElement::widget(id, "html").setting(
                "html",
                format!("<pre><code>{}</code></pre>", content(el)),
            ),
            ElementType::Html => ElementorElement::widget(id, "html").setting("html", content(el)),
            ElementType::Unknown | ElementType::Other(_) => return self.unmapped(el, path, depth),
        };

        if let Some(data) = preserved.filter(|d| d.block_name == native.native_name()) {
            let semantic = std::mem::take(&mut native.settings);
            native.settings = data.attrs;
            native.settings.extend(semantic);
        }

        self.converted += 1;
        let mut out = vec![native];
        if out[0].el_type == "widget" && !el.children.is_empty() {
            self.simplified(el, path, "children written after the widget");
            out.extend(self.children(&el.children, path, depth));
        }
        out
    }

    /// Sections hold columns only.
    fn columns(
        &mut self,
        children: &[NeutralElement],
        path: &ElementPath,
        depth: usize,
    ) -> Vec<ElementorElement> {
        let mut out = Vec::new();
        for native in self.children(children, path, depth) {
            if native.el_type == "column" {
                out.push(native);
            } else {
                let mut column = ElementorElement::new(self.ids.next_id(), "column")
                    .setting("_column_size", 100);
                column.elements.push(native);
                out.push(column);
            }
        }
        out
    }

    fn unmapped(
        &mut self,
        el: &NeutralElement,
        path: &ElementPath,
        depth: usize,
    ) -> Vec<ElementorElement> {
        if self.same_builder
            && el.builder_data().is_some()
            && let Some(raw) = &el.content
            && let Ok(native) = serde_json::from_str::<ElementorElement>(raw)
        {
            self.converted += 1;
            return vec![native];
        }

        let native = el
            .builder_data()
            .map(|d| d.block_name)
            .unwrap_or_else(|| el.kind.to_string());
        self.diagnostics.unsupported_elements.insert(native.clone());
        self.diagnostics.warn(
            ConversionWarning::new(
                Severity::Major,
                WarningKind::UnsupportedElement(native.clone()),
                format!("'{native}' has no Elementor equivalent, written as HTML"),
            )
            .at(path.clone()),
        );
        let html = ElementorElement::widget(self.ids.next_id(), "html")
            .setting("html", el.content.clone().unwrap_or_default());
        let mut out = vec![html];
        out.extend(self.children(&el.children, path, depth));
        out
    }

    /// Count an element whose children were folded into its own markup.
    fn flattened(&mut self, el: &NeutralElement) {
        let (nested, nested_converted) = count_all(&el.children);
        self.total += nested;
        self.converted += nested_converted + 1;
    }

    fn simplified(&mut self, el: &NeutralElement, path: &ElementPath, message: &str) {
        self.diagnostics.warn(
            ConversionWarning::new(
                Severity::Minor,
                WarningKind::Simplified(el.kind.to_string()),
                message,
            )
            .at(path.clone()),
        );
    }
}

fn content(el: &NeutralElement) -> String {
    el.content.clone().unwrap_or_default()
}

fn video_widget(id: String, src: &str) -> ElementorElement {
    let widget = ElementorElement::widget(id, "video");
    if src.contains("vimeo.com") {
        widget.setting("video_type", "vimeo").setting("vimeo_url", src)
    } else if src.contains("youtube.com") || src.contains("youtu.be") {
        widget.setting("video_type", "youtube").setting("youtube_url", src)
    } else {
        widget
            .setting("video_type", "hosted")
            .setting("hosted_url", json!({"url": src}))
    }
}
