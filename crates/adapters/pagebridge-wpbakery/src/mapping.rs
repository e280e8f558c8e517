//! Shortcode ↔ neutral element mapping tables.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pagebridge_core::markup::{escape_attr, inner_of};
use pagebridge_core::{
    AttrsExt, BuilderData, ConversionWarning, Diagnostics, ElementPath, ElementType,
    ExtractOptions, NeutralElement, Severity, WarningKind, attr, count_all,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::tokenizer::{Node, Shortcode, serialize_shortcode, unescape_attr_value};

/// Nesting beyond this depth is kept verbatim instead of mapped.
pub const MAX_DEPTH: usize = 256;

/// WPBakery's default empty space height.
pub const DEFAULT_SPACER_HEIGHT: &str = "32px";

/// Shortcodes with a neutral mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcodeKind {
    Row,
    RowInner,
    Column,
    ColumnInner,
    Section,
    ColumnText,
    CustomHeading,
    SingleImage,
    Button,
    Separator,
    EmptySpace,
    RawHtml,
    Video,
}

impl ShortcodeKind {
    pub const ALL: &'static [ShortcodeKind] = &[
        ShortcodeKind::Row,
        ShortcodeKind::RowInner,
        ShortcodeKind::Column,
        ShortcodeKind::ColumnInner,
        ShortcodeKind::Section,
        ShortcodeKind::ColumnText,
        ShortcodeKind::CustomHeading,
        ShortcodeKind::SingleImage,
        ShortcodeKind::Button,
        ShortcodeKind::Separator,
        ShortcodeKind::EmptySpace,
        ShortcodeKind::RawHtml,
        ShortcodeKind::Video,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ShortcodeKind::Row => "vc_row",
            ShortcodeKind::RowInner => "vc_row_inner",
            ShortcodeKind::Column => "vc_column",
            ShortcodeKind::ColumnInner => "vc_column_inner",
            ShortcodeKind::Section => "vc_section",
            ShortcodeKind::ColumnText => "vc_column_text",
            ShortcodeKind::CustomHeading => "vc_custom_heading",
            ShortcodeKind::SingleImage => "vc_single_image",
            ShortcodeKind::Button => "vc_btn",
            ShortcodeKind::Separator => "vc_separator",
            ShortcodeKind::EmptySpace => "vc_empty_space",
            ShortcodeKind::RawHtml => "vc_raw_html",
            ShortcodeKind::Video => "vc_video",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        ShortcodeKind::ALL.iter().copied().find(|k| k.tag() == tag)
    }

    pub fn element_type(self) -> ElementType {
        match self {
            ShortcodeKind::Row | ShortcodeKind::RowInner => ElementType::Row,
            ShortcodeKind::Column | ShortcodeKind::ColumnInner => ElementType::Column,
            ShortcodeKind::Section => ElementType::Section,
            ShortcodeKind::ColumnText => ElementType::Paragraph,
            ShortcodeKind::CustomHeading => ElementType::Heading,
            ShortcodeKind::SingleImage => ElementType::Image,
            ShortcodeKind::Button => ElementType::Button,
            ShortcodeKind::Separator => ElementType::Separator,
            ShortcodeKind::EmptySpace => ElementType::Spacer,
            ShortcodeKind::RawHtml => ElementType::Html,
            ShortcodeKind::Video => ElementType::Video,
        }
    }

    fn has_children(self) -> bool {
        matches!(
            self,
            ShortcodeKind::Row
                | ShortcodeKind::RowInner
                | ShortcodeKind::Column
                | ShortcodeKind::ColumnInner
                | ShortcodeKind::Section
        )
    }
}

/// `key:value|key:value` with url-encoded values, as used by `link` and
/// `font_container`.
pub fn parse_pairs(value: &str) -> Vec<(String, String)> {
    value
        .split('|')
        .filter_map(|pair| {
            let (k, v) = pair.split_once(':')?;
            let v = urlencoding::decode(v).map_or_else(|_| v.to_string(), |d| d.into_owned());
            Some((k.trim().to_string(), v))
        })
        .collect()
}

fn pair_value(value: &str, key: &str) -> Option<String> {
    parse_pairs(value)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

fn write_pairs(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}:{}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("|")
}

/// `"1/2"` → `"50%"`.
pub fn fraction_to_percent(fraction: &str) -> Option<String> {
    let (num, den) = fraction.trim().split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den <= 0.0 {
        return None;
    }
    let pct = num * 100.0 / den;
    let text = format!("{pct:.2}");
    Some(format!("{}%", text.trim_end_matches('0').trim_end_matches('.')))
}

/// `"50%"` → `"1/2"`, snapping to twelfths or fifths.
pub fn percent_to_fraction(width: &str) -> Option<String> {
    let pct: f64 = width.trim().trim_end_matches('%').trim().parse().ok()?;
    if pct <= 0.0 {
        return None;
    }
    for den in [12u32, 5] {
        let num = pct * f64::from(den) / 100.0;
        if (num - num.round()).abs() < 0.05 && num.round() >= 1.0 {
            return Some(reduce(num.round() as u32, den));
        }
    }
    let twelfths = (pct * 12.0 / 100.0).round().clamp(1.0, 12.0) as u32;
    Some(reduce(twelfths, 12))
}

fn reduce(num: u32, den: u32) -> String {
    fn gcd(a: u32, b: u32) -> u32 {
        if b == 0 { a } else { gcd(b, a % b) }
    }
    let g = gcd(num, den).max(1);
    format!("{}/{}", num / g, den / g)
}

/// `vc_raw_html` bodies are base64 inside url encoding; hand-written ones are plain.
pub fn decode_raw_html(content: &str) -> String {
    let trimmed = content.trim();
    urlencoding::decode(trimmed)
        .ok()
        .and_then(|decoded| STANDARD.decode(decoded.as_bytes()).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| content.to_string())
}

pub fn encode_raw_html(html: &str) -> String {
    urlencoding::encode(&STANDARD.encode(html)).into_owned()
}

fn attrs_map(shortcode: &Shortcode) -> Map<String, Value> {
    shortcode
        .attrs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
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

    pub fn nodes(&mut self, nodes: &[Node], path: &ElementPath) -> Vec<NeutralElement> {
        let mut out = Vec::new();
        for node in nodes {
            let child_path = path.child(out.len());
            match node {
                Node::Text(text) if text.trim().is_empty() => {}
                Node::Text(text) => {
                    out.push(NeutralElement::new(ElementType::Html).content(text.trim()))
                }
                Node::Shortcode(s) => out.push(self.shortcode(s, &child_path)),
            }
        }
        out
    }

    fn shortcode(&mut self, s: &Shortcode, path: &ElementPath) -> NeutralElement {
        let Some(kind) = ShortcodeKind::from_tag(&s.name) else {
            debug!(shortcode = %s.name, %path, "unsupported shortcode");
            self.diagnostics.unsupported(&s.name, path);
            return NeutralElement::new(ElementType::Unknown)
                .content(serialize_shortcode(s))
                .with_builder_data(BuilderData::new(&s.name, attrs_map(s)));
        };

        if path.0.len() > MAX_DEPTH {
            self.diagnostics.warn(
                ConversionWarning::new(
                    Severity::Major,
                    WarningKind::Simplified(s.name.clone()),
                    format!("nesting deeper than {MAX_DEPTH} kept as raw markup"),
                )
                .at(path.clone()),
            );
            return NeutralElement::new(ElementType::Html).content(serialize_shortcode(s));
        }

        let children = if kind.has_children() {
            self.nodes(&s.children, path)
        } else {
            Vec::new()
        };
        let element = to_element(kind, s).children(children);
        if self.options.preserve_builder_data {
            element.with_builder_data(BuilderData::new(&s.name, attrs_map(s)))
        } else {
            element
        }
    }
}

/// Forward table.
fn to_element(kind: ShortcodeKind, s: &Shortcode) -> NeutralElement {
    let el = NeutralElement::new(kind.element_type());
    match kind {
        ShortcodeKind::Row | ShortcodeKind::RowInner | ShortcodeKind::Section => el,

        ShortcodeKind::Column | ShortcodeKind::ColumnInner => {
            el.attr_opt(attr::WIDTH, s.attr("width").and_then(fraction_to_percent))
        }

        ShortcodeKind::ColumnText => el.content(inner_of(&s.content(), &["p"])),

        ShortcodeKind::CustomHeading => {
            let font = s.attr("font_container").unwrap_or("");
            let level = pair_value(font, "tag")
                .and_then(|t| t.strip_prefix('h').and_then(|n| n.parse::<i64>().ok()))
                .unwrap_or(2);
            el.attr(attr::LEVEL, level)
                .attr_opt(attr::ALIGN, pair_value(font, "text_align"))
                .content(unescape_attr_value(s.attr("text").unwrap_or("")))
        }

        ShortcodeKind::SingleImage => {
            let media_id = s.attr("image").map(|id| match id.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::from(id),
            });
            let src = match s.attr("source") {
                Some("external_link") => s.attr("custom_src"),
                _ => None,
            };
            el.attr_opt(attr::MEDIA_ID, media_id)
                .attr_opt(attr::SRC, src)
                .attr_opt(attr::SIZE_SLUG, s.attr("img_size"))
                .attr_opt(attr::ALIGN, s.attr("alignment"))
                .attr_opt(attr::URL, s.attr("link"))
        }

        ShortcodeKind::Button => el
            .attr_opt(attr::URL, s.attr("link").and_then(|l| pair_value(l, "url")))
            .attr_opt(attr::ALIGN, s.attr("align"))
            .content(unescape_attr_value(s.attr("title").unwrap_or(""))),

        ShortcodeKind::Separator => el.attr_opt(attr::STYLE, s.attr("style")),

        ShortcodeKind::EmptySpace => {
            let height = s.attr("height").map(|h| {
                if h.bytes().all(|b| b.is_ascii_digit()) {
                    format!("{h}px")
                } else {
                    h.to_string()
                }
            });
            el.attr(
                attr::HEIGHT,
                height.unwrap_or_else(|| DEFAULT_SPACER_HEIGHT.to_string()),
            )
        }

        ShortcodeKind::RawHtml => el.content(decode_raw_html(&s.content())),

        ShortcodeKind::Video => el.attr_opt(attr::SRC, s.attr("link")),
    }
}

// ---------------------------------------------------------------------------
// Reverse
// ---------------------------------------------------------------------------

pub(crate) struct Applier {
    same_builder: bool,
    /// How many columns enclose the element being written.
    column_depth: usize,
    pub diagnostics: Diagnostics,
    pub total: usize,
    pub converted: usize,
}

impl Applier {
    pub fn new(same_builder: bool) -> Self {
        Self {
            same_builder,
            column_depth: 0,
            diagnostics: Diagnostics::new(),
            total: 0,
            converted: 0,
        }
    }

    /// Content must sit in `vc_row > vc_column`; runs of loose elements are
    /// wrapped in one.
    pub fn document(&mut self, elements: &[NeutralElement]) -> Vec<Node> {
        let root = ElementPath::root();
        let mut out = Vec::new();
        let mut loose: Vec<Node> = Vec::new();

        for (i, el) in elements.iter().enumerate() {
            for node in self.element(el, &root.child(i), 0) {
                let top_level = matches!(
                    &node,
                    Node::Shortcode(s) if s.name == "vc_row" || s.name == "vc_section"
                );
                if top_level || matches!(node, Node::Text(_)) {
                    flush_loose(&mut out, &mut loose);
                    out.push(node);
                } else {
                    loose.push(node);
                }
            }
        }
        flush_loose(&mut out, &mut loose);
        out
    }

    fn children(
        &mut self,
        elements: &[NeutralElement],
        path: &ElementPath,
        depth: usize,
    ) -> Vec<Node> {
        elements
            .iter()
            .enumerate()
            .flat_map(|(i, el)| self.element(el, &path.child(i), depth + 1))
            .collect()
    }

    fn element(&mut self, el: &NeutralElement, path: &ElementPath, depth: usize) -> Vec<Node> {
        self.total += 1;
        let preserved = el.builder_data();

        let mut shortcode = match &el.kind {
            ElementType::Row => {
                let inner = self.column_depth > 0;
                let tag = if inner { "vc_row_inner" } else { "vc_row" };
                let columns = self.columns(&el.children, path, depth, inner);
                Shortcode::enclosing(tag, columns)
            }
            ElementType::Column => {
                self.column_depth += 1;
                let children = self.children(&el.children, path, depth);
                self.column_depth -= 1;
                let mut column = Shortcode::enclosing("vc_column", children);
                let width = el.attrs.get_str(attr::WIDTH).and_then(percent_to_fraction);
                if let Some(fraction) = width {
                    column.set_attr("width", fraction);
                }
                column
            }
            ElementType::Section => {
                let children = self.children(&el.children, path, depth);
                if depth > 0 {
                    self.simplified(el, path, "nested section flattened");
                    self.converted += 1;
                    return children;
                }
                Shortcode::enclosing("vc_section", children)
            }
            ElementType::Buttons => {
                self.simplified(el, path, "button group flattened");
                self.converted += 1;
                return self.children(&el.children, path, depth);
            }
            ElementType::Heading => {
                let level = el.attrs.get_i64(attr::LEVEL).unwrap_or(2).clamp(1, 6);
                let tag = format!("h{level}");
                let mut font = vec![("tag", tag.as_str())];
                let align = el.attrs.get_string(attr::ALIGN);
                if let Some(align) = &align {
                    font.push(("text_align", align.as_str()));
                }
                Shortcode::new("vc_custom_heading")
                    .with_attr("text", content(el))
                    .with_attr("font_container", write_pairs(&font))
            }
            ElementType::Paragraph => text_block(format!("<p>{}</p>", content(el))),
            ElementType::ListItem => text_block(format!("<p>{}</p>", content(el))),
            ElementType::Image => {
                let mut image = Shortcode::new("vc_single_image");
                match el.attrs.get_string(attr::MEDIA_ID) {
                    Some(id) => image.set_attr("image", id),
                    None => {
                        if let Some(src) = el.attrs.get_str(attr::SRC) {
                            image.set_attr("source", "external_link");
                            image.set_attr("custom_src", src);
                        }
                    }
                }
                if let Some(size) = el.attrs.get_str(attr::SIZE_SLUG) {
                    image.set_attr("img_size", size);
                }
                if let Some(align) = el.attrs.get_str(attr::ALIGN) {
                    image.set_attr("alignment", align);
                }
                if let Some(url) = el.attrs.get_str(attr::URL) {
                    image.set_attr("onclick", "custom_link");
                    image.set_attr("link", url);
                }
                image
            }
            ElementType::Button => {
                let text = content(el);
                let mut button = Shortcode::new("vc_btn").with_attr("title", text.as_str());
                if let Some(url) = el.attrs.get_str(attr::URL) {
                    button.set_attr("link", write_pairs(&[("url", url), ("title", text.as_str())]));
                }
                if let Some(align) = el.attrs.get_str(attr::ALIGN) {
                    button.set_attr("align", align);
                }
                button
            }
            ElementType::Separator => {
                let mut sep = Shortcode::new("vc_separator");
                if let Some(style) = el.attrs.get_str(attr::STYLE) {
                    sep.set_attr("style", style);
                }
                sep
            }
            ElementType::Spacer => Shortcode::new("vc_empty_space").with_attr(
                "height",
                el.attrs
                    .get_string(attr::HEIGHT)
                    .unwrap_or_else(|| DEFAULT_SPACER_HEIGHT.to_string()),
            ),
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
                return vec![Node::Shortcode(text_block(format!("<{tag}>{body}</{tag}>")))];
            }
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
                return vec![Node::Shortcode(text_block(format!(
                    "<blockquote>{body}{cite}</blockquote>"
                )))];
            }
            ElementType::Code => raw_html(&format!("<pre><code>{}</code></pre>", content(el))),
            // Loose text between top-level shortcodes.
            ElementType::Html if depth == 0 && self.same_builder => {
                self.converted += 1;
                return vec![Node::Text(content(el))];
            }
            ElementType::Html => raw_html(&content(el)),
            ElementType::Video => {
                let mut video = Shortcode::new("vc_video");
                if let Some(src) = el.attrs.get_str(attr::SRC) {
                    video.set_attr("link", src);
                }
                video
            }
            ElementType::Embed => {
                let url = el.attrs.get_str(attr::URL).unwrap_or("");
                if matches!(el.attrs.get_str(attr::PROVIDER), Some("youtube" | "vimeo")) {
                    Shortcode::new("vc_video").with_attr("link", url)
                } else {
                    self.simplified(el, path, "embed written as a link");
                    raw_html(&format!("<a href=\"{}\">{}</a>", escape_attr(url), url))
                }
            }
            ElementType::Unknown | ElementType::Other(_) => {
                return self.unmapped(el, path, depth);
            }
        };

        if let Some(data) = preserved.filter(|d| d.block_name == shortcode.name) {
            let semantic = std::mem::take(&mut shortcode.attrs);
            for (key, value) in data.attrs {
                let value = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                shortcode.set_attr(key, value);
            }
            for (key, value) in semantic {
                shortcode.set_attr(key, value);
            }
        }

        self.converted += 1;
        let leaf = !matches!(
            el.kind,
            ElementType::Row | ElementType::Column | ElementType::Section
        );
        let mut out = vec![Node::Shortcode(shortcode)];
        if leaf && !el.children.is_empty() {
            self.simplified(el, path, "children written after the element");
            out.extend(self.children(&el.children, path, depth));
        }
        out
    }

    /// Rows hold columns only.
    fn columns(
        &mut self,
        children: &[NeutralElement],
        path: &ElementPath,
        depth: usize,
        inner: bool,
    ) -> Vec<Node> {
        let column_tag = if inner { "vc_column_inner" } else { "vc_column" };
        let mut out = Vec::new();
        let mut loose = Vec::new();
        for node in self.children(children, path, depth) {
            match node {
                Node::Shortcode(mut s) if s.name == "vc_column" => {
                    if !loose.is_empty() {
                        out.push(Node::Shortcode(Shortcode::enclosing(
                            column_tag,
                            std::mem::take(&mut loose),
                        )));
                    }
                    s.name = column_tag.to_string();
                    out.push(Node::Shortcode(s));
                }
                other => loose.push(other),
            }
        }
        if !loose.is_empty() {
            out.push(Node::Shortcode(Shortcode::enclosing(column_tag, loose)));
        }
        out
    }

    fn unmapped(&mut self, el: &NeutralElement, path: &ElementPath, depth: usize) -> Vec<Node> {
        if self.same_builder
            && el.builder_data().is_some()
            && let Some(markup) = &el.content
        {
            self.converted += 1;
            return vec![Node::Text(markup.clone())];
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
                format!("'{native}' has no WPBakery equivalent, written as raw HTML"),
            )
            .at(path.clone()),
        );
        let mut out = vec![Node::Shortcode(raw_html(el.content.as_deref().unwrap_or("")))];
        out.extend(self.children(&el.children, path, depth));
        out
    }

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

fn flush_loose(out: &mut Vec<Node>, loose: &mut Vec<Node>) {
    if loose.is_empty() {
        return;
    }
    let column = Shortcode::enclosing("vc_column", std::mem::take(loose));
    out.push(Node::Shortcode(Shortcode::enclosing(
        "vc_row",
        vec![Node::Shortcode(column)],
    )));
}

fn content(el: &NeutralElement) -> String {
    el.content.clone().unwrap_or_default()
}

fn text_block(html: String) -> Shortcode {
    Shortcode::enclosing("vc_column_text", vec![Node::Text(html)])
}

fn raw_html(html: &str) -> Shortcode {
    Shortcode::enclosing("vc_raw_html", vec![Node::Text(encode_raw_html(html))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractions() {
        assert_eq!(fraction_to_percent("1/2").as_deref(), Some("50%"));
        assert_eq!(fraction_to_percent("1/3").as_deref(), Some("33.33%"));
        assert_eq!(fraction_to_percent("2/5").as_deref(), Some("40%"));
        assert_eq!(fraction_to_percent("1/0"), None);
        assert_eq!(fraction_to_percent("wide"), None);

        assert_eq!(percent_to_fraction("50%").as_deref(), Some("1/2"));
        assert_eq!(percent_to_fraction("33.33%").as_deref(), Some("1/3"));
        assert_eq!(percent_to_fraction("100%").as_deref(), Some("1/1"));
        assert_eq!(percent_to_fraction("20%").as_deref(), Some("1/5"));
        assert_eq!(percent_to_fraction("auto"), None);
    }

    #[test]
    fn test_pairs() {
        let pairs = parse_pairs("url:https%3A%2F%2Fx.test%2Fa|title:Go%20now|target:_blank");
        assert_eq!(pairs[0], ("url".to_string(), "https://x.test/a".to_string()));
        assert_eq!(pairs[1].1, "Go now");
        assert_eq!(
            write_pairs(&[("url", "https://x.test/a")]),
            "url:https%3A%2F%2Fx.test%2Fa"
        );
    }

    #[test]
    fn test_raw_html_codec() {
        let html = "<div class=\"x\">a & b</div>";
        assert_eq!(decode_raw_html(&encode_raw_html(html)), html);
        assert_eq!(decode_raw_html("<b>plain</b>"), "<b>plain</b>");
    }

    #[test]
    fn test_every_kind_has_a_tag() {
        for kind in ShortcodeKind::ALL {
            assert_eq!(ShortcodeKind::from_tag(kind.tag()), Some(*kind));
        }
    }
}
