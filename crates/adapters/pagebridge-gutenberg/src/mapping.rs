//! Block ↔ neutral element mapping tables.
//!
//! Both directions dispatch on [`BlockKind`], so adding a block kind forces
//! every table to handle it.

use pagebridge_core::markup::{
    class_tokens, css_property, escape_attr, inner_of, style_variant, tag_attr, tag_inner,
    unwrap_element,
};
use pagebridge_core::{
    AttrsExt, BuilderData, ConversionWarning, Diagnostics, ElementPath, ElementType,
    ExtractOptions, NeutralElement, Severity, WarningKind, attr,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::serializer::serialize_block;
use crate::tokenizer::{Block, FREEFORM};

/// Nesting beyond this depth is kept verbatim instead of mapped.
pub const MAX_DEPTH: usize = 256;

/// Default heading level when a heading block carries none.
pub const DEFAULT_HEADING_LEVEL: i64 = 2;

/// Default spacer height.
pub const DEFAULT_SPACER_HEIGHT: &str = "100px";

/// Block kinds with a neutral mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading,
    Image,
    Button,
    Buttons,
    Separator,
    Spacer,
    Columns,
    Column,
    Group,
    List,
    ListItem,
    Quote,
    Code,
    Html,
    Freeform,
    Video,
    Embed,
}

impl BlockKind {
    pub const ALL: &'static [BlockKind] = &[
        BlockKind::Paragraph,
        BlockKind::Heading,
        BlockKind::Image,
        BlockKind::Button,
        BlockKind::Buttons,
        BlockKind::Separator,
        BlockKind::Spacer,
        BlockKind::Columns,
        BlockKind::Column,
        BlockKind::Group,
        BlockKind::List,
        BlockKind::ListItem,
        BlockKind::Quote,
        BlockKind::Code,
        BlockKind::Html,
        BlockKind::Freeform,
        BlockKind::Video,
        BlockKind::Embed,
    ];

    pub fn block_name(self) -> &'static str {
        match self {
            BlockKind::Paragraph => "core/paragraph",
            BlockKind::Heading => "core/heading",
            BlockKind::Image => "core/image",
            BlockKind::Button => "core/button",
            BlockKind::Buttons => "core/buttons",
            BlockKind::Separator => "core/separator",
            BlockKind::Spacer => "core/spacer",
            BlockKind::Columns => "core/columns",
            BlockKind::Column => "core/column",
            BlockKind::Group => "core/group",
            BlockKind::List => "core/list",
            BlockKind::ListItem => "core/list-item",
            BlockKind::Quote => "core/quote",
            BlockKind::Code => "core/code",
            BlockKind::Html => "core/html",
            BlockKind::Freeform => FREEFORM,
            BlockKind::Video => "core/video",
            BlockKind::Embed => "core/embed",
        }
    }

    pub fn from_block_name(name: &str) -> Option<Self> {
        BlockKind::ALL
            .iter()
            .copied()
            .find(|k| k.block_name() == name)
    }

    /// Neutral type produced by this block kind.
    pub fn element_type(self) -> ElementType {
        match self {
            BlockKind::Paragraph => ElementType::Paragraph,
            BlockKind::Heading => ElementType::Heading,
            BlockKind::Image => ElementType::Image,
            BlockKind::Button => ElementType::Button,
            BlockKind::Buttons => ElementType::Buttons,
            BlockKind::Separator => ElementType::Separator,
            BlockKind::Spacer => ElementType::Spacer,
            BlockKind::Columns => ElementType::Row,
            BlockKind::Column => ElementType::Column,
            BlockKind::Group => ElementType::Section,
            BlockKind::List => ElementType::List,
            BlockKind::ListItem => ElementType::ListItem,
            BlockKind::Quote => ElementType::Quote,
            BlockKind::Code => ElementType::Code,
            BlockKind::Html | BlockKind::Freeform => ElementType::Html,
            BlockKind::Video => ElementType::Video,
            BlockKind::Embed => ElementType::Embed,
        }
    }

    /// Block kind that serializes a neutral type, if any.
    pub fn for_element(kind: &ElementType) -> Option<Self> {
        match kind {
            ElementType::Paragraph => Some(BlockKind::Paragraph),
            ElementType::Heading => Some(BlockKind::Heading),
            ElementType::Image => Some(BlockKind::Image),
            ElementType::Button => Some(BlockKind::Button),
            ElementType::Buttons => Some(BlockKind::Buttons),
            ElementType::Separator => Some(BlockKind::Separator),
            ElementType::Spacer => Some(BlockKind::Spacer),
            ElementType::Row => Some(BlockKind::Columns),
            ElementType::Column => Some(BlockKind::Column),
            ElementType::Section => Some(BlockKind::Group),
            ElementType::List => Some(BlockKind::List),
            ElementType::ListItem => Some(BlockKind::ListItem),
            ElementType::Quote => Some(BlockKind::Quote),
            ElementType::Code => Some(BlockKind::Code),
            ElementType::Html => Some(BlockKind::Html),
            ElementType::Video => Some(BlockKind::Video),
            ElementType::Embed => Some(BlockKind::Embed),
            ElementType::Unknown | ElementType::Other(_) => None,
        }
    }

    /// Whether inner blocks of this kind map to neutral children.
    fn has_children(self) -> bool {
        matches!(
            self,
            BlockKind::Buttons
                | BlockKind::Columns
                | BlockKind::Column
                | BlockKind::Group
                | BlockKind::List
                | BlockKind::ListItem
                | BlockKind::Quote
        )
    }
}

// ---------------------------------------------------------------------------
// Forward: Block → NeutralElement
// ---------------------------------------------------------------------------

/// Walks a block tree and produces neutral elements.
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

    pub fn blocks(&mut self, blocks: &[Block], path: &ElementPath) -> Vec<NeutralElement> {
        let mut out = Vec::with_capacity(blocks.len());
        for block in blocks {
            self.block(block, path, &mut out);
        }
        out
    }

    /// Map one block into `out`. Inner blocks of a kind that holds no
    /// children are mapped too, as siblings following it.
    fn block(&mut self, block: &Block, parent: &ElementPath, out: &mut Vec<NeutralElement>) {
        let path = parent.child(out.len());
        out.push(self.element(block, &path));

        let Some(kind) = BlockKind::from_block_name(&block.name) else {
            return;
        };
        if kind.has_children() || block.inner_blocks.is_empty() || path.0.len() > MAX_DEPTH {
            return;
        }
        self.diagnostics.warn(
            ConversionWarning::new(
                Severity::Minor,
                WarningKind::Simplified(block.name.clone()),
                format!("nested blocks inside '{}' moved after it", block.name),
            )
            .at(path),
        );
        for inner in &block.inner_blocks {
            self.block(inner, parent, out);
        }
    }

    fn element(&mut self, block: &Block, path: &ElementPath) -> NeutralElement {
        let Some(kind) = BlockKind::from_block_name(&block.name) else {
            debug!(block = %block.name, %path, "unsupported block");
            self.diagnostics.unsupported(&block.name, path);
            return unknown_element(block);
        };

        if path.0.len() > MAX_DEPTH {
            self.diagnostics.warn(
                ConversionWarning::new(
                    Severity::Major,
                    WarningKind::Simplified(block.name.clone()),
                    format!("nesting deeper than {MAX_DEPTH} kept as raw HTML"),
                )
                .at(path.clone()),
            );
            return NeutralElement::new(ElementType::Html).content(serialize_block(block));
        }

        let children = if kind.has_children() {
            self.blocks(&block.inner_blocks, path)
        } else {
            Vec::new()
        };

        let element = to_element(kind, block).children(children);
        if self.options.preserve_builder_data {
            element.with_builder_data(BuilderData::new(&block.name, block.attrs.clone()))
        } else {
            element
        }
    }
}

/// An unmapped block, carrying its full markup so it can be written back.
fn unknown_element(block: &Block) -> NeutralElement {
    NeutralElement::new(ElementType::Unknown)
        .content(serialize_block(block))
        .with_builder_data(BuilderData::new(&block.name, block.attrs.clone()))
}

/// Forward table: one pure handler per block kind.
fn to_element(kind: BlockKind, block: &Block) -> NeutralElement {
    let a = &block.attrs;
    let html = block.inner_html.as_str();
    let el = NeutralElement::new(kind.element_type());

    match kind {
        BlockKind::Paragraph => el
            .attr_opt(attr::ALIGN, a.get_string("align"))
            .content(inner_of(html, &["p"])),

        BlockKind::Heading => {
            let level = a
                .get_i64("level")
                .or_else(|| {
                    unwrap_element(html)
                        .and_then(|w| w.tag.strip_prefix('h').and_then(|n| n.parse().ok()))
                })
                .unwrap_or(DEFAULT_HEADING_LEVEL);
            el.attr(attr::LEVEL, level)
                .attr_opt(attr::ALIGN, a.get_string("textAlign"))
                .content(inner_of(html, &["h1", "h2", "h3", "h4", "h5", "h6"]))
        }

        BlockKind::Image => el
            .attr_opt(attr::MEDIA_ID, a.get("id").cloned())
            .attr_opt(attr::SIZE_SLUG, a.get_string("sizeSlug"))
            .attr_opt(
                attr::SRC,
                a.get_string("url").or_else(|| tag_attr(html, "img", "src")),
            )
            .attr_opt(
                attr::ALT,
                a.get_string("alt").or_else(|| tag_attr(html, "img", "alt")),
            )
            .attr_opt(attr::CAPTION, tag_inner(html, "figcaption").map(str::trim))
            .attr_opt(
                attr::URL,
                a.get_string("href").or_else(|| tag_attr(html, "a", "href")),
            )
            .attr_opt(attr::ALIGN, a.get_string("align")),

        BlockKind::Button => {
            let text = a
                .get_string("text")
                .or_else(|| tag_inner(html, "a").map(|s| s.trim().to_string()))
                .unwrap_or_default();
            el.attr_opt(
                attr::URL,
                a.get_string("url").or_else(|| tag_attr(html, "a", "href")),
            )
            .content(text)
        }

        BlockKind::Separator => {
            let mut classes: Vec<String> = a
                .get_str("className")
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            classes.extend(class_tokens(html));
            el.attr_opt(
                attr::STYLE,
                style_variant(classes.iter().map(String::as_str)),
            )
        }

        BlockKind::Spacer => {
            let height = match a.get("height") {
                Some(Value::Number(n)) => Some(format!("{n}px")),
                Some(Value::String(s)) => Some(s.clone()),
                _ => tag_attr(html, "div", "style").and_then(|s| css_property(&s, "height")),
            };
            el.attr(
                attr::HEIGHT,
                height.unwrap_or_else(|| DEFAULT_SPACER_HEIGHT.to_string()),
            )
        }

        BlockKind::Columns | BlockKind::Buttons => {
            el.attr_opt(attr::ALIGN, a.get_string("align"))
        }

        BlockKind::Column => {
            let width = match a.get("width") {
                Some(Value::Number(n)) => Some(format!("{n}%")),
                Some(Value::String(s)) => Some(s.clone()),
                _ => tag_attr(html, "div", "style").and_then(|s| css_property(&s, "flex-basis")),
            };
            el.attr_opt(attr::WIDTH, width)
        }

        BlockKind::Group => el.attr_opt(attr::ALIGN, a.get_string("align")),

        BlockKind::List => {
            let ordered = a.get_bool("ordered").unwrap_or_else(|| {
                unwrap_element(html).is_some_and(|w| w.tag == "ol")
            });
            let el = el.attr(attr::ORDERED, ordered);
            if block.inner_blocks.is_empty() {
                el.content(inner_of(html, &["ul", "ol"]))
            } else {
                el
            }
        }

        BlockKind::ListItem => el.content(inner_of(html, &["li"])),

        BlockKind::Quote => {
            let citation = a
                .get_string("citation")
                .or_else(|| tag_inner(html, "cite").map(|s| s.trim().to_string()))
                .filter(|c| !c.is_empty());
            let el = el.attr_opt(attr::CITATION, citation);
            if block.inner_blocks.is_empty() {
                let body = inner_of(html, &["blockquote"]);
                let body = match body.to_ascii_lowercase().find("<cite") {
                    Some(pos) => &body[..pos],
                    None => body,
                };
                el.content(body.trim())
            } else {
                el
            }
        }

        BlockKind::Code => {
            let code = tag_inner(html, "code").unwrap_or_else(|| inner_of(html, &["pre"]));
            el.attr_opt(attr::LANGUAGE, a.get_string("language"))
                .content(code)
        }

        BlockKind::Html | BlockKind::Freeform => el.content(html.trim_matches('\n')),

        BlockKind::Video => el
            .attr_opt(attr::MEDIA_ID, a.get("id").cloned())
            .attr_opt(
                attr::SRC,
                a.get_string("src").or_else(|| tag_attr(html, "video", "src")),
            )
            .attr_opt(attr::CAPTION, tag_inner(html, "figcaption").map(str::trim)),

        BlockKind::Embed => el
            .attr_opt(attr::URL, a.get_string("url"))
            .attr_opt(attr::PROVIDER, a.get_string("providerNameSlug"))
            .attr_opt(attr::CAPTION, tag_inner(html, "figcaption").map(str::trim)),
    }
}

// ---------------------------------------------------------------------------
// Reverse: NeutralElement → Block
// ---------------------------------------------------------------------------

/// Walks neutral elements and produces blocks.
pub(crate) struct Applier {
    /// Whether the layout was extracted by this adapter.
    same_builder: bool,
    pub diagnostics: Diagnostics,
    pub total: usize,
    pub converted: usize,
}

impl Applier {
    pub fn new(same_builder: bool) -> Self {
        Self {
            same_builder,
            diagnostics: Diagnostics::new(),
            total: 0,
            converted: 0,
        }
    }

    pub fn elements(&mut self, elements: &[NeutralElement], path: &ElementPath) -> Vec<Block> {
        elements
            .iter()
            .enumerate()
            .filter_map(|(i, el)| self.element(el, &path.child(i)))
            .collect()
    }

    fn element(&mut self, el: &NeutralElement, path: &ElementPath) -> Option<Block> {
        self.total += 1;

        let Some(kind) = BlockKind::for_element(&el.kind) else {
            return self.unmapped(el, path);
        };

        let children = match kind {
            BlockKind::Columns => self.columns(&el.children, path),
            _ => self.elements(&el.children, path),
        };
        if !kind.has_children() && !children.is_empty() {
            self.diagnostics.warn(
                ConversionWarning::new(
                    Severity::Minor,
                    WarningKind::Simplified(el.kind.to_string()),
                    format!("children of '{}' written after it", el.kind),
                )
                .at(path.clone()),
            );
        }

        self.converted += 1;
        Some(to_block(kind, el, children))
    }

    /// Columns only hold columns; wrap anything else in one.
    fn columns(&mut self, children: &[NeutralElement], path: &ElementPath) -> Vec<Block> {
        let mut blocks = Vec::new();
        for (i, child) in children.iter().enumerate() {
            let child_path = path.child(i);
            let Some(block) = self.element(child, &child_path) else {
                continue;
            };
            if block.name == BlockKind::Column.block_name() {
                blocks.push(block);
            } else {
                self.diagnostics.warn(
                    ConversionWarning::new(
                        Severity::Info,
                        WarningKind::Simplified(child.kind.to_string()),
                        format!("'{}' inside a row wrapped in a column", child.kind),
                    )
                    .at(child_path),
                );
                blocks.push(container(
                    BlockKind::Column.block_name(),
                    Map::new(),
                    "\n<div class=\"wp-block-column\">".to_string(),
                    vec![block],
                    "</div>\n".to_string(),
                ));
            }
        }
        blocks
    }

    fn unmapped(&mut self, el: &NeutralElement, path: &ElementPath) -> Option<Block> {
        if self.same_builder
            && el.builder_data().is_some()
            && let Some(markup) = &el.content
        {
            self.converted += 1;
            return Some(Block::freeform(markup.clone()));
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
                format!("'{native}' has no block equivalent, written as HTML"),
            )
            .at(path.clone()),
        );

        let children = self.elements(&el.children, path);
        let html = el.content.clone().unwrap_or_default();
        if children.is_empty() {
            let mut block = Block::new(BlockKind::Html.block_name(), Map::new());
            block.push_html(&format!("\n{html}\n"));
            return Some(block);
        }
        Some(container(
            BlockKind::Group.block_name(),
            Map::new(),
            format!("\n<div class=\"wp-block-group\">{html}"),
            children,
            "</div>\n".to_string(),
        ))
    }
}

/// Native attributes to start from: preserved ones when they belong to this block.
fn base_attrs(el: &NeutralElement, block_name: &str) -> Map<String, Value> {
    el.builder_data()
        .filter(|d| d.block_name == block_name)
        .map(|d| d.attrs)
        .unwrap_or_default()
}

fn leaf(name: &str, attrs: Map<String, Value>, html: String) -> Block {
    let mut block = Block::new(name, attrs);
    block.push_html(&format!("\n{html}\n"));
    block
}

fn container(
    name: &str,
    attrs: Map<String, Value>,
    open: String,
    children: Vec<Block>,
    close: String,
) -> Block {
    let mut block = Block::new(name, attrs);
    block.push_html(&open);
    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        block.push_block(child);
        if i + 1 < count {
            block.push_html("\n\n");
        }
    }
    block.push_html(&close);
    block
}

fn class_attr(classes: &[&str]) -> String {
    let joined = classes
        .iter()
        .filter(|c| !c.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if joined.is_empty() {
        String::new()
    } else {
        format!(" class=\"{}\"", escape_attr(&joined))
    }
}

fn figcaption(el: &NeutralElement) -> String {
    el.attrs
        .get_str(attr::CAPTION)
        .map(|c| format!("<figcaption class=\"wp-element-caption\">{c}</figcaption>"))
        .unwrap_or_default()
}

/// Reverse table: one pure handler per block kind.
fn to_block(kind: BlockKind, el: &NeutralElement, children: Vec<Block>) -> Block {
    let name = kind.block_name();
    let mut a = base_attrs(el, name);
    let content = el.content.as_deref().unwrap_or("");
    let align = el.attrs.get_string(attr::ALIGN);

    match kind {
        BlockKind::Paragraph => {
            let class = align.as_deref().map(|al| format!("has-text-align-{al}"));
            if let Some(al) = &align {
                a.insert("align".into(), Value::from(al.as_str()));
            }
            let mut block = leaf(
                name,
                a,
                format!("<p{}>{content}</p>", class_attr(&[class.as_deref().unwrap_or("")])),
            );
            append_children(&mut block, children);
            block
        }

        BlockKind::Heading => {
            let level = el
                .attrs
                .get_i64(attr::LEVEL)
                .unwrap_or(DEFAULT_HEADING_LEVEL)
                .clamp(1, 6);
            a.insert("level".into(), Value::from(level));
            let class = align.as_deref().map(|al| format!("has-text-align-{al}"));
            if let Some(al) = &align {
                a.insert("textAlign".into(), Value::from(al.as_str()));
            }
            let mut block = leaf(
                name,
                a,
                format!(
                    "<h{level}{}>{content}</h{level}>",
                    class_attr(&[class.as_deref().unwrap_or("")])
                ),
            );
            append_children(&mut block, children);
            block
        }

        BlockKind::Image => {
            let id = el.attrs.get_i64(attr::MEDIA_ID);
            if let Some(id) = id {
                a.insert("id".into(), Value::from(id));
            }
            let size = el.attrs.get_string(attr::SIZE_SLUG);
            if let Some(size) = &size {
                a.insert("sizeSlug".into(), Value::from(size.as_str()));
            }
            if let Some(al) = &align {
                a.insert("align".into(), Value::from(al.as_str()));
            }
            let src = el.attrs.get_string(attr::SRC).unwrap_or_default();
            let alt = el.attrs.get_string(attr::ALT).unwrap_or_default();
            let img_class = id.map(|id| format!("wp-image-{id}")).unwrap_or_default();
            let mut img = format!(
                "<img src=\"{}\" alt=\"{}\"{}/>",
                escape_attr(&src),
                escape_attr(&alt),
                class_attr(&[img_class.as_str()])
            );
            if let Some(href) = el.attrs.get_str(attr::URL) {
                img = format!("<a href=\"{}\">{img}</a>", escape_attr(href));
            }
            let size_class = size.map(|s| format!("size-{s}")).unwrap_or_default();
            let align_class = align.map(|al| format!("align{al}")).unwrap_or_default();
            let mut block = leaf(
                name,
                a,
                format!(
                    "<figure{}>{img}{}</figure>",
                    class_attr(&["wp-block-image", align_class.as_str(), size_class.as_str()]),
                    figcaption(el)
                ),
            );
            append_children(&mut block, children);
            block
        }

        BlockKind::Button => {
            let href = el
                .attrs
                .get_str(attr::URL)
                .map(|u| format!(" href=\"{}\"", escape_attr(u)))
                .unwrap_or_default();
            let mut block = leaf(
                name,
                a,
                format!(
                    "<div class=\"wp-block-button\"><a class=\"wp-block-button__link wp-element-button\"{href}>{content}</a></div>"
                ),
            );
            append_children(&mut block, children);
            block
        }

        BlockKind::Buttons => container(
            name,
            a,
            "\n<div class=\"wp-block-buttons\">".to_string(),
            children,
            "</div>\n".to_string(),
        ),

        BlockKind::Separator => {
            let style = el
                .attrs
                .get_string(attr::STYLE)
                .map(|s| format!("is-style-{s}"));
            if let Some(style) = &style {
                a.insert("className".into(), Value::from(style.as_str()));
            }
            let mut block = leaf(
                name,
                a,
                format!(
                    "<hr{}/>",
                    class_attr(&[
                        "wp-block-separator",
                        "has-alpha-channel-opacity",
                        style.as_deref().unwrap_or("")
                    ])
                ),
            );
            append_children(&mut block, children);
            block
        }

        BlockKind::Spacer => {
            let height = el
                .attrs
                .get_string(attr::HEIGHT)
                .map(|h| {
                    if h.chars().all(|c| c.is_ascii_digit()) {
                        format!("{h}px")
                    } else {
                        h
                    }
                })
                .unwrap_or_else(|| DEFAULT_SPACER_HEIGHT.to_string());
            a.insert("height".into(), Value::from(height.as_str()));
            let mut block = leaf(
                name,
                a,
                format!(
                    "<div style=\"height:{}\" aria-hidden=\"true\" class=\"wp-block-spacer\"></div>",
                    escape_attr(&height)
                ),
            );
            append_children(&mut block, children);
            block
        }

        BlockKind::Columns => {
            if let Some(al) = &align {
                a.insert("align".into(), Value::from(al.as_str()));
            }
            container(
                name,
                a,
                "\n<div class=\"wp-block-columns\">".to_string(),
                children,
                "</div>\n".to_string(),
            )
        }

        BlockKind::Column => {
            let width = el.attrs.get_string(attr::WIDTH);
            let style = match &width {
                Some(w) => {
                    a.insert("width".into(), Value::from(w.as_str()));
                    format!(" style=\"flex-basis:{}\"", escape_attr(w))
                }
                None => String::new(),
            };
            container(
                name,
                a,
                format!("\n<div class=\"wp-block-column\"{style}>"),
                children,
                "</div>\n".to_string(),
            )
        }

        BlockKind::Group => {
            if let Some(al) = &align {
                a.insert("align".into(), Value::from(al.as_str()));
            }
            let mut open = "\n<div class=\"wp-block-group\">".to_string();
            open.push_str(content);
            container(name, a, open, children, "</div>\n".to_string())
        }

        BlockKind::List => {
            let ordered = el.attrs.get_bool(attr::ORDERED).unwrap_or(false);
            let tag = if ordered { "ol" } else { "ul" };
            if ordered {
                a.insert("ordered".into(), Value::Bool(true));
            }
            if children.is_empty() {
                leaf(name, a, format!("<{tag} class=\"wp-block-list\">{content}</{tag}>"))
            } else {
                container(
                    name,
                    a,
                    format!("\n<{tag} class=\"wp-block-list\">"),
                    children,
                    format!("</{tag}>\n"),
                )
            }
        }

        BlockKind::ListItem => {
            if children.is_empty() {
                let mut block = Block::new(name, a);
                block.push_html(&format!("\n<li>{content}</li>\n"));
                block
            } else {
                container(name, a, format!("\n<li>{content}"), children, "</li>\n".to_string())
            }
        }

        BlockKind::Quote => {
            let cite = el
                .attrs
                .get_str(attr::CITATION)
                .map(|c| format!("<cite>{c}</cite>"))
                .unwrap_or_default();
            container(
                name,
                a,
                format!("\n<blockquote class=\"wp-block-quote\">{content}"),
                children,
                format!("{cite}</blockquote>\n"),
            )
        }

        BlockKind::Code => {
            if let Some(lang) = el.attrs.get_str(attr::LANGUAGE) {
                a.insert("language".into(), Value::from(lang));
            }
            let mut block = leaf(
                name,
                a,
                format!("<pre class=\"wp-block-code\"><code>{content}</code></pre>"),
            );
            append_children(&mut block, children);
            block
        }

        BlockKind::Html | BlockKind::Freeform => {
            let restores_freeform = el
                .builder_data()
                .is_some_and(|d| d.block_name == FREEFORM);
            let mut block = if restores_freeform {
                Block::freeform(content)
            } else {
                leaf(BlockKind::Html.block_name(), a, content.to_string())
            };
            append_children(&mut block, children);
            block
        }

        BlockKind::Video => {
            if let Some(id) = el.attrs.get_i64(attr::MEDIA_ID) {
                a.insert("id".into(), Value::from(id));
            }
            let src = el.attrs.get_string(attr::SRC).unwrap_or_default();
            let mut block = leaf(
                name,
                a,
                format!(
                    "<figure class=\"wp-block-video\"><video controls src=\"{}\"></video>{}</figure>",
                    escape_attr(&src),
                    figcaption(el)
                ),
            );
            append_children(&mut block, children);
            block
        }

        BlockKind::Embed => {
            let url = el.attrs.get_string(attr::URL).unwrap_or_default();
            a.insert("url".into(), Value::from(url.as_str()));
            let provider = el.attrs.get_string(attr::PROVIDER);
            if let Some(p) = &provider {
                a.insert("providerNameSlug".into(), Value::from(p.as_str()));
            }
            let provider_classes = provider
                .map(|p| format!("is-provider-{p} wp-block-embed-{p}"))
                .unwrap_or_default();
            let mut block = leaf(
                name,
                a,
                format!(
                    "<figure{}><div class=\"wp-block-embed__wrapper\">\n{}\n</div>{}</figure>",
                    class_attr(&["wp-block-embed", provider_classes.as_str()]),
                    url,
                    figcaption(el)
                ),
            );
            append_children(&mut block, children);
            block
        }
    }
}

/// Leaf kinds cannot hold blocks; emitted children follow as siblings inside.
fn append_children(block: &mut Block, children: Vec<Block>) {
    for child in children {
        block.push_block(child);
        block.push_html("\n");
    }
}
