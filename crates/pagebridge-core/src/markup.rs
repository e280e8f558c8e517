//! Small helpers for reading and writing rendered HTML fragments.
//!
//! Builders store their rendered output next to their own attributes. These
//! helpers pull the few facts the mapping tables need out of that HTML
//! (an `<img>` src, a class token, a `flex-basis`) without a full DOM.

use std::sync::LazyLock;

use regex::Regex;

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*<([a-zA-Z][a-zA-Z0-9]*)\b([^>]*)>").expect("open tag regex")
});

static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<([a-zA-Z][a-zA-Z0-9]*)\b([^>]*?)/?>").expect("any tag regex")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("attribute regex")
});

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]+>").expect("markup regex"));

/// An element whose open and close tags wrap a whole fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapped<'a> {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub inner: &'a str,
}

impl Wrapped<'_> {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Split `<tag attrs>inner</tag>` when one element spans the whole fragment.
pub fn unwrap_element(html: &str) -> Option<Wrapped<'_>> {
    let caps = OPEN_TAG.captures(html)?;
    let whole = caps.get(0)?;
    let tag = caps.get(1)?.as_str().to_ascii_lowercase();
    let rest = html[whole.end()..].trim_end();
    let close = format!("</{tag}>");
    if rest.len() < close.len() {
        return None;
    }
    let split = rest.len() - close.len();
    if !rest.is_char_boundary(split) || !rest[split..].eq_ignore_ascii_case(&close) {
        return None;
    }
    let inner = &rest[..split];
    // `<p>a</p><p>b</p>` starts and ends with p but is two elements.
    if count_open(inner, &tag) != count_close(inner, &tag) {
        return None;
    }
    Some(Wrapped {
        attrs: parse_attrs(caps.get(2).map_or("", |m| m.as_str())),
        tag,
        inner,
    })
}

/// Inner HTML of the fragment when wrapped by one of `tags`, else the trimmed fragment.
pub fn inner_of<'a>(html: &'a str, tags: &[&str]) -> &'a str {
    match unwrap_element(html) {
        Some(w) if tags.iter().any(|t| t.eq_ignore_ascii_case(&w.tag)) => w.inner.trim(),
        _ => html.trim(),
    }
}

/// Attributes of the first `<tag>` in the fragment.
pub fn find_tag(html: &str, tag: &str) -> Option<Vec<(String, String)>> {
    ANY_TAG
        .captures_iter(html)
        .find(|c| c[1].eq_ignore_ascii_case(tag))
        .map(|c| parse_attrs(c.get(2).map_or("", |m| m.as_str())))
}

/// Value of `attr` on the first `<tag>` in the fragment.
pub fn tag_attr(html: &str, tag: &str, attr: &str) -> Option<String> {
    find_tag(html, tag)?
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(attr))
        .map(|(_, v)| unescape(&v))
}

/// Inner HTML of the first `<tag>…</tag>` in the fragment.
pub fn tag_inner<'a>(html: &'a str, tag: &str) -> Option<&'a str> {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let mut from = 0;
    while let Some(pos) = lower[from..].find(&open) {
        let start = from + pos;
        let after = start + open.len();
        let boundary = lower[after..].chars().next();
        if matches!(boundary, Some(c) if c == '>' || c == '/' || c.is_whitespace()) {
            let body_start = after + lower[after..].find('>')? + 1;
            let close = format!("</{tag}>");
            let end = body_start + lower[body_start..].find(&close)?;
            return Some(&html[body_start..end]);
        }
        from = after;
    }
    None
}

/// All class tokens across every tag in the fragment.
pub fn class_tokens(html: &str) -> Vec<String> {
    ANY_TAG
        .captures_iter(html)
        .flat_map(|c| parse_attrs(c.get(2).map_or("", |m| m.as_str())))
        .filter(|(k, _)| k.eq_ignore_ascii_case("class"))
        .flat_map(|(_, v)| {
            v.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// The `<name>` of the first `is-style-<name>` token in a class list.
pub fn style_variant<'a>(classes: impl IntoIterator<Item = &'a str>) -> Option<String> {
    classes
        .into_iter()
        .find_map(|c| c.strip_prefix("is-style-"))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Value of a CSS property in an inline `style` attribute.
pub fn css_property(style: &str, property: &str) -> Option<String> {
    style.split(';').find_map(|decl| {
        let (name, value) = decl.split_once(':')?;
        (name.trim().eq_ignore_ascii_case(property)).then(|| value.trim().to_string())
    })
}

/// Text content with tags and comments removed and entities decoded.
pub fn strip_tags(html: &str) -> String {
    unescape(&MARKUP.replace_all(html, ""))
}

/// Escape text for use inside an element.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text for use inside a double-quoted attribute.
pub fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

/// Decode the handful of entities the escapers above produce.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn parse_attrs(source: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(source)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map_or("", |m| m.as_str());
            (c[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

fn count_open(html: &str, tag: &str) -> usize {
    ANY_TAG
        .captures_iter(html)
        .filter(|c| c[1].eq_ignore_ascii_case(tag))
        .count()
}

fn count_close(html: &str, tag: &str) -> usize {
    html.to_ascii_lowercase().matches(&format!("</{tag}>")).count()
}
