//! Shortcode tokenizer.
//!
//! Recognizes `[name attrs]`, `[name attrs /]` and `[/name]`. Tags are lexed
//! into a flat token list, openers are paired with closers in one pass, and
//! the tree is assembled with an explicit stack.
//!
//! An opener without a closer is a self-contained shortcode, as in WordPress.
//! A closer without an opener stays in the output as text. `[[name]]` is the
//! WordPress escape for a literal tag and is never parsed.
//!
//! The tree is at most [`MAX_NESTING`] shortcodes deep. An enclosing
//! shortcode that would open below that depth stays in its parent as text.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([\w-]+)\s*=\s*"([^"]*)"(?:\s|$)|([\w-]+)\s*=\s*'([^']*)'(?:\s|$)|([\w-]+)\s*=\s*([^\s'"]+)(?:\s|$)|"([^"]*)"(?:\s|$)|'([^']*)'(?:\s|$)|(\S+)(?:\s|$)"#,
    )
    .expect("shortcode attribute regex")
});

/// Deepest shortcode nesting the parser builds.
pub const MAX_NESTING: usize = 512;

/// A node of shortcode content.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Shortcode(Shortcode),
}

/// A parsed shortcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Shortcode {
    pub name: String,
    /// Attributes in source order. Positional values use their index as key.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
    /// Written as `[name /]`.
    pub self_closing: bool,
    /// Has a matching `[/name]`.
    pub enclosing: bool,
}

impl Shortcode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            enclosing: false,
        }
    }

    /// An enclosing shortcode with the given children.
    pub fn enclosing(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            children,
            enclosing: true,
            ..Self::new(name)
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Replace an attribute in place, or append it.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((key, value)),
        }
    }

    /// Markup between the open and close tags.
    pub fn content(&self) -> String {
        serialize_nodes(&self.children)
    }

    /// Nested shortcodes, skipping text.
    pub fn shortcodes(&self) -> impl Iterator<Item = &Shortcode> {
        self.children.iter().filter_map(|n| match n {
            Node::Shortcode(s) => Some(s),
            Node::Text(_) => None,
        })
    }
}

/// A closing tag with no opener, kept as text.
#[derive(Debug, Clone, PartialEq)]
pub struct StrayCloser {
    pub name: String,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Open,
    SelfClosing,
    Close,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    name: String,
    attrs: Vec<(String, String)>,
    start: usize,
    end: usize,
}

/// Parse content into nodes.
pub fn parse(raw: &str) -> Vec<Node> {
    parse_with_report(raw).0
}

/// Parse content into nodes, also returning closers that were kept as text.
pub fn parse_with_report(raw: &str) -> (Vec<Node>, Vec<StrayCloser>) {
    let tokens = lex(raw);
    let partner = pair(&tokens);
    let mut stray = Vec::new();

    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Shortcode> = Vec::new();
    let mut cursor = 0;
    // Closer that ends a span being kept as text.
    let mut verbatim_until: Option<usize> = None;

    for (i, token) in tokens.iter().enumerate() {
        if let Some(end) = verbatim_until {
            if i == end {
                verbatim_until = None;
            }
            continue;
        }
        if token.kind == TokenKind::Open && partner[i].is_some() && stack.len() >= MAX_NESTING {
            verbatim_until = partner[i];
            continue;
        }

        if token.kind == TokenKind::Close && partner[i].is_none() {
            stray.push(StrayCloser {
                name: token.name.clone(),
                offset: token.start,
            });
            continue;
        }

        push_text(&mut stack, &mut root, &raw[cursor..token.start]);
        cursor = token.end;

        let mut shortcode = Shortcode::new(token.name.clone());
        shortcode.attrs = token.attrs.clone();
        match token.kind {
            TokenKind::Open if partner[i].is_some() => {
                shortcode.enclosing = true;
                stack.push(shortcode);
            }
            TokenKind::Open => attach(&mut stack, &mut root, shortcode),
            TokenKind::SelfClosing => {
                shortcode.self_closing = true;
                attach(&mut stack, &mut root, shortcode);
            }
            TokenKind::Close => {
                if let Some(done) = stack.pop() {
                    attach(&mut stack, &mut root, done);
                }
            }
        }
    }

    push_text(&mut stack, &mut root, &raw[cursor..]);
    (root, stray)
}

fn push_text(stack: &mut [Shortcode], root: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    let nodes = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => root,
    };
    match nodes.last_mut() {
        Some(Node::Text(prev)) => prev.push_str(text),
        _ => nodes.push(Node::Text(text.to_string())),
    }
}

fn attach(stack: &mut [Shortcode], root: &mut Vec<Node>, shortcode: Shortcode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Shortcode(shortcode)),
        None => root.push(Node::Shortcode(shortcode)),
    }
}

/// Count openers (including self-closing ones) whose name starts with `prefix`.
pub fn count_openers(raw: &str, prefix: &str) -> usize {
    lex(raw)
        .iter()
        .filter(|t| t.kind != TokenKind::Close && t.name.starts_with(prefix))
        .count()
}

fn lex(raw: &str) -> Vec<Token> {
    let bytes = raw.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while let Some(offset) = raw[i..].find('[') {
        let start = i + offset;
        if bytes.get(start + 1) == Some(&b'[') {
            // `[[name]]` is a literal tag.
            i = start + 2;
            continue;
        }
        match lex_tag(raw, start) {
            Some(token) => {
                i = token.end;
                tokens.push(token);
            }
            None => i = start + 1,
        }
    }
    tokens
}

fn lex_tag(raw: &str, start: usize) -> Option<Token> {
    let bytes = raw.as_bytes();
    let mut pos = start + 1;
    let closer = bytes.get(pos) == Some(&b'/');
    if closer {
        pos += 1;
    }

    let name_start = pos;
    match bytes.get(pos) {
        Some(c) if c.is_ascii_alphabetic() || *c == b'_' => pos += 1,
        _ => return None,
    }
    while matches!(bytes.get(pos), Some(c) if c.is_ascii_alphanumeric() || *c == b'_' || *c == b'-')
    {
        pos += 1;
    }
    let name = raw[name_start..pos].to_string();

    if closer {
        while matches!(bytes.get(pos), Some(c) if c.is_ascii_whitespace()) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b']') {
            return None;
        }
        return Some(Token {
            kind: TokenKind::Close,
            name,
            attrs: Vec::new(),
            start,
            end: pos + 1,
        });
    }

    match bytes.get(pos) {
        Some(b']' | b'/') => {}
        Some(c) if c.is_ascii_whitespace() => {}
        _ => return None,
    }
    let close = pos + raw[pos..].find(']')?;
    let mut body = raw[pos..close].trim();
    let self_closing = body.ends_with('/');
    if self_closing {
        body = body[..body.len() - 1].trim_end();
    }

    Some(Token {
        kind: if self_closing {
            TokenKind::SelfClosing
        } else {
            TokenKind::Open
        },
        name,
        attrs: parse_attrs(body),
        start,
        end: close + 1,
    })
}

/// Parse shortcode attributes the way WordPress does.
pub fn parse_attrs(text: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut positional = 0;
    for caps in ATTRIBUTE.captures_iter(text) {
        let named = [(1, 2), (3, 4), (5, 6)]
            .into_iter()
            .find_map(|(k, v)| Some((caps.get(k)?, caps.get(v)?)));
        match named {
            Some((key, value)) => {
                attrs.push((key.as_str().to_ascii_lowercase(), value.as_str().to_string()))
            }
            None => {
                let value = [7, 8, 9].into_iter().find_map(|g| caps.get(g));
                if let Some(value) = value {
                    attrs.push((positional.to_string(), value.as_str().to_string()));
                    positional += 1;
                }
            }
        }
    }
    attrs
}

/// Pair each closer with the nearest open opener of the same name.
fn pair(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut partner = vec![None; tokens.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut open_by_name: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::SelfClosing => {}
            TokenKind::Open => {
                open_by_name
                    .entry(token.name.as_str())
                    .or_default()
                    .push(stack.len());
                stack.push(i);
            }
            TokenKind::Close => {
                let Some(depth) = open_by_name
                    .get(token.name.as_str())
                    .and_then(|positions| positions.last().copied())
                else {
                    continue;
                };
                let Some(&opener) = stack.get(depth) else {
                    continue;
                };
                while stack.len() > depth {
                    if let Some(top) = stack.pop()
                        && let Some(positions) = open_by_name.get_mut(tokens[top].name.as_str())
                    {
                        positions.pop();
                    }
                }
                partner[i] = Some(opener);
                partner[opener] = Some(i);
            }
        }
    }
    partner
}

/// Serialize nodes back to shortcode markup.
pub fn serialize_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

pub fn serialize_shortcode(shortcode: &Shortcode) -> String {
    let mut out = String::new();
    write_shortcode(shortcode, &mut out);
    out
}

/// Quotes and brackets would end the attribute or the tag.
fn escape_attr_value(value: &str) -> String {
    value
        .replace('"', "&quot;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Inverse of the escaping applied when attributes are written.
pub fn unescape_attr_value(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Shortcode(s) => write_shortcode(s, out),
    }
}

fn write_shortcode(s: &Shortcode, out: &mut String) {
    out.push('[');
    out.push_str(&s.name);
    for (key, value) in &s.attrs {
        out.push(' ');
        let value = escape_attr_value(value);
        if key.bytes().all(|b| b.is_ascii_digit()) {
            out.push('"');
            out.push_str(&value);
            out.push('"');
        } else {
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&value);
            out.push('"');
        }
    }
    if s.self_closing {
        out.push_str(" /]");
        return;
    }
    out.push(']');
    if s.enclosing {
        for child in &s.children {
            write_node(child, out);
        }
        out.push_str("[/");
        out.push_str(&s.name);
        out.push(']');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shortcode(node: &Node) -> &Shortcode {
        match node {
            Node::Shortcode(s) => s,
            Node::Text(t) => panic!("expected shortcode, got text {t:?}"),
        }
    }

    #[test]
    fn test_empty() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("hello [world"), vec![Node::Text("hello [world".into())]);
    }

    #[test]
    fn test_nested_rows() {
        let nodes = parse(
            "[vc_row][vc_column width=\"1/2\"][vc_column_text]<p>Hi</p>[/vc_column_text][/vc_column][/vc_row]",
        );
        assert_eq!(nodes.len(), 1);
        let row = shortcode(&nodes[0]);
        assert_eq!(row.name, "vc_row");
        assert!(row.enclosing);
        let column = row.shortcodes().next().unwrap();
        assert_eq!(column.attr("width"), Some("1/2"));
        let text = column.shortcodes().next().unwrap();
        assert_eq!(text.content(), "<p>Hi</p>");
    }

    #[test]
    fn test_attribute_forms() {
        let attrs = parse_attrs(r#"a="1" b='two' c=3 "pos" D="x y""#);
        assert_eq!(
            attrs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string()),
                ("c".to_string(), "3".to_string()),
                ("0".to_string(), "pos".to_string()),
                ("d".to_string(), "x y".to_string()),
            ]
        );
    }

    #[test]
    fn test_self_closing() {
        let nodes = parse("[vc_separator style=\"dashed\" /]");
        let sep = shortcode(&nodes[0]);
        assert!(sep.self_closing);
        assert_eq!(sep.attr("style"), Some("dashed"));
    }

    #[test]
    fn test_unpaired_opener_is_void() {
        let nodes = parse("[vc_row][vc_empty_space height=\"32px\"]after[/vc_row]");
        let row = shortcode(&nodes[0]);
        assert_eq!(row.children.len(), 2);
        let space = shortcode(&row.children[0]);
        assert!(!space.enclosing);
        assert!(space.children.is_empty());
        assert_eq!(row.children[1], Node::Text("after".into()));
    }

    #[test]
    fn test_stray_closer_is_text() {
        let (nodes, stray) = parse_with_report("a[/vc_row]b");
        assert_eq!(nodes, vec![Node::Text("a[/vc_row]b".into())]);
        assert_eq!(stray[0].name, "vc_row");
        assert_eq!(stray[0].offset, 1);
    }

    #[test]
    fn test_same_name_nesting() {
        let nodes = parse("[box][box]inner[/box]outer[/box]");
        let outer = shortcode(&nodes[0]);
        let inner = shortcode(&outer.children[0]);
        assert_eq!(inner.content(), "inner");
        assert_eq!(outer.children[1], Node::Text("outer".into()));
    }

    #[test]
    fn test_escaped_tag() {
        let nodes = parse("[[vc_row]]");
        assert_eq!(nodes, vec![Node::Text("[[vc_row]]".into())]);
    }

    #[test]
    fn test_count_openers() {
        let raw = "[vc_row][vc_column][/vc_column][/vc_row][gallery ids=\"1\"]";
        assert_eq!(count_openers(raw, "vc_"), 2);
        assert_eq!(count_openers("no shortcodes", "vc_"), 0);
    }

    #[test]
    fn test_reserialize() {
        let raw = "[vc_row el_class=\"x\"][vc_column width=\"1/3\"][vc_separator /][/vc_column][/vc_row]";
        assert_eq!(serialize_nodes(&parse(raw)), raw);
    }

    #[test]
    fn test_attr_escaping() {
        let s = Shortcode::new("vc_custom_heading").with_attr("text", "say \"hi\" [now]");
        let raw = serialize_shortcode(&s);
        let parsed = parse(&raw);
        let back = shortcode(&parsed[0]);
        assert_eq!(unescape_attr_value(back.attr("text").unwrap()), "say \"hi\" [now]");
    }

    #[test]
    fn test_unicode_text() {
        let raw = "héllo [vc_column_text]wörld — ✓[/vc_column_text] ünd";
        let nodes = parse(raw);
        assert_eq!(nodes.len(), 3);
        assert_eq!(serialize_nodes(&nodes), raw);
    }

    fn nesting(depth: usize) -> String {
        format!("{}x{}", "[d]".repeat(depth), "[/d]".repeat(depth))
    }

    fn innermost(nodes: &[Node]) -> (usize, &Shortcode) {
        let Node::Shortcode(first) = &nodes[0] else {
            panic!("expected a shortcode");
        };
        let mut s = first;
        let mut seen = 1;
        while let Some(inner) = s.shortcodes().next() {
            s = inner;
            seen += 1;
        }
        (seen, s)
    }

    #[test]
    fn test_deep_nesting() {
        let nodes = parse(&nesting(1000));
        assert_eq!(nodes.len(), 1);
        let (seen, _) = innermost(&nodes);
        assert_eq!(seen, MAX_NESTING);
    }

    #[test]
    fn test_nesting_past_limit_is_text() {
        let depth = 200_000;
        let raw = nesting(depth);
        let nodes = parse(&raw);
        let (seen, s) = innermost(&nodes);
        assert_eq!(seen, MAX_NESTING);
        assert_eq!(s.children, vec![Node::Text(nesting(depth - MAX_NESTING))]);
        assert_eq!(serialize_nodes(&nodes), raw);
    }
}
