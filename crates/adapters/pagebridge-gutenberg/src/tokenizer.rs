//! Block-comment tokenizer.
//!
//! Turns post content into a tree of [`Block`]s. Parsing happens in three
//! linear passes:
//!
//! 1. **Lex** every `<!-- wp:… -->` marker into a token arena. Comments that
//!    look like markers but do not parse (bad name, JSON that is not an
//!    object, missing terminator) are not tokens and stay as text.
//! 2. **Pair** openers with closers. Each block name keeps its own stack of
//!    open positions, so a closer finds the innermost opener of the *same*
//!    name even when blocks of that name nest. Openers skipped over by a
//!    closer, and closers with no opener, are left unpaired.
//! 3. **Build** the tree with an explicit stack. Unpaired markers are treated
//!    as ordinary text, so malformed input degrades instead of failing.
//!
//! No pass recurses. The built tree is at most [`MAX_NESTING`] blocks deep:
//! a block that would open below that depth is kept, markers and all, as
//! text of its parent.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Namespace implied when a marker omits one.
pub const DEFAULT_NAMESPACE: &str = "core";

/// Name given to text that sits outside any block at the document root.
pub const FREEFORM: &str = "core/freeform";

/// Deepest block nesting the tokenizer builds.
pub const MAX_NESTING: usize = 512;

/// A parsed block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Namespaced name, e.g. `core/paragraph`.
    pub name: String,
    pub attrs: Map<String, Value>,
    pub inner_blocks: Vec<Block>,
    /// Markup between the markers with nested blocks removed.
    pub inner_html: String,
    /// HTML fragments interleaved with nested block placeholders.
    pub inner_content: Vec<ContentPart>,
}

/// One piece of a block's inner content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Html(String),
    /// Placeholder for `inner_blocks[index]`.
    Block(usize),
}

impl Block {
    pub fn new(name: impl Into<String>, attrs: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            attrs,
            inner_blocks: Vec::new(),
            inner_html: String::new(),
            inner_content: Vec::new(),
        }
    }

    /// Text outside any block, kept verbatim.
    pub fn freeform(html: impl Into<String>) -> Self {
        let html = html.into();
        let mut block = Self::new(FREEFORM, Map::new());
        block.push_html(&html);
        block
    }

    pub fn is_freeform(&self) -> bool {
        self.name == FREEFORM
    }

    /// Append markup to the inner content.
    pub fn push_html(&mut self, html: &str) {
        if html.is_empty() {
            return;
        }
        self.inner_html.push_str(html);
        match self.inner_content.last_mut() {
            Some(ContentPart::Html(last)) => last.push_str(html),
            _ => self.inner_content.push(ContentPart::Html(html.to_string())),
        }
    }

    /// Append a nested block and its placeholder.
    pub fn push_block(&mut self, block: Block) {
        self.inner_content
            .push(ContentPart::Block(self.inner_blocks.len()));
        self.inner_blocks.push(block);
    }

    /// Whether the block has neither markup nor nested blocks.
    pub fn is_void(&self) -> bool {
        self.inner_content.is_empty()
    }
}

/// A marker that could not be paired and was kept as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrayMarker {
    pub name: String,
    /// Byte offset of the marker in the input.
    pub offset: usize,
    pub closer: bool,
}

/// Parse content into blocks.
pub fn tokenize(raw: &str) -> Vec<Block> {
    tokenize_with_report(raw).0
}

/// Parse content into blocks, also returning markers that were kept as text.
pub fn tokenize_with_report(raw: &str) -> (Vec<Block>, Vec<StrayMarker>) {
    let tokens = lex(raw);
    let partner = pair(&tokens);
    let mut stray = Vec::new();

    let mut root: Vec<Block> = Vec::new();
    let mut root_text = String::new();
    let mut stack: Vec<Block> = Vec::new();
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

        let structural = match token.kind {
            TokenKind::Void => true,
            TokenKind::Open | TokenKind::Close => partner[i].is_some(),
        };
        if !structural {
            stray.push(StrayMarker {
                name: token.name.clone(),
                offset: token.start,
                closer: token.kind == TokenKind::Close,
            });
            continue;
        }

        if token.kind == TokenKind::Open && stack.len() >= MAX_NESTING {
            verbatim_until = partner[i];
            continue;
        }

        let text = &raw[cursor..token.start];
        match stack.last_mut() {
            Some(open) => open.push_html(text),
            None => root_text.push_str(text),
        }
        cursor = token.end;

        match token.kind {
            TokenKind::Open => {
                flush_root_text(&mut root, &mut root_text, stack.is_empty());
                stack.push(Block::new(token.name.clone(), token.attrs.clone()));
            }
            TokenKind::Void => {
                let block = Block::new(token.name.clone(), token.attrs.clone());
                attach(&mut stack, &mut root, &mut root_text, block);
            }
            TokenKind::Close => {
                // Pairing guarantees the innermost open block is ours.
                if let Some(block) = stack.pop() {
                    attach(&mut stack, &mut root, &mut root_text, block);
                }
            }
        }
    }

    root_text.push_str(&raw[cursor..]);
    flush_root_text(&mut root, &mut root_text, true);
    (root, stray)
}

fn attach(stack: &mut [Block], root: &mut Vec<Block>, root_text: &mut String, block: Block) {
    match stack.last_mut() {
        Some(parent) => parent.push_block(block),
        None => {
            flush_root_text(root, root_text, true);
            root.push(block);
        }
    }
}

fn flush_root_text(root: &mut Vec<Block>, text: &mut String, at_root: bool) {
    if !at_root {
        return;
    }
    if !text.trim().is_empty() {
        root.push(Block::freeform(text.trim_matches('\n')));
    }
    text.clear();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Open,
    Void,
    Close,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    name: String,
    attrs: Map<String, Value>,
    start: usize,
    end: usize,
}

/// Count block openers (including self-closing ones) in the content.
pub fn count_markers(raw: &str) -> usize {
    lex(raw)
        .iter()
        .filter(|t| t.kind != TokenKind::Close)
        .count()
}

fn lex(raw: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(found) = raw[pos..].find("<!--") {
        let start = pos + found;
        match parse_marker(raw, start) {
            Some(token) => {
                pos = token.end;
                tokens.push(token);
            }
            None => pos = start + 4,
        }
    }
    tokens
}

fn parse_marker(raw: &str, start: usize) -> Option<Token> {
    let bytes = raw.as_bytes();
    let mut i = start + 4;

    let ws = skip_whitespace(bytes, i);
    if ws == i {
        return None;
    }
    i = ws;

    let closer = bytes.get(i) == Some(&b'/');
    if closer {
        i += 1;
    }
    if !raw[i..].starts_with("wp:") {
        return None;
    }
    i += 3;

    let (name, after_name) = parse_name(raw, i)?;
    i = skip_whitespace(bytes, after_name);
    if i == after_name {
        return None;
    }

    if closer {
        return raw[i..].starts_with("-->").then(|| Token {
            kind: TokenKind::Close,
            name,
            attrs: Map::new(),
            start,
            end: i + 3,
        });
    }

    let mut attrs = Map::new();
    if bytes.get(i) == Some(&b'{') {
        let mut stream = serde_json::Deserializer::from_str(&raw[i..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => attrs = map,
            _ => return None,
        }
        let after_json = i + stream.byte_offset();
        i = skip_whitespace(bytes, after_json);
        if i == after_json {
            return None;
        }
    }

    let (kind, end) = if raw[i..].starts_with("/-->") {
        (TokenKind::Void, i + 4)
    } else if raw[i..].starts_with("-->") {
        (TokenKind::Open, i + 3)
    } else {
        return None;
    };

    Some(Token {
        kind,
        name,
        attrs,
        start,
        end,
    })
}

/// Parse `name` or `namespace/name`, defaulting the namespace.
fn parse_name(raw: &str, start: usize) -> Option<(String, usize)> {
    let first = ident_end(raw, start)?;
    if raw[first..].starts_with('/')
        && let Some(second) = ident_end(raw, first + 1)
    {
        return Some((raw[start..second].to_string(), second));
    }
    Some((
        format!("{DEFAULT_NAMESPACE}/{}", &raw[start..first]),
        first,
    ))
}

/// End of an identifier matching `[a-z][a-z0-9_-]*`.
fn ident_end(raw: &str, start: usize) -> Option<usize> {
    let bytes = raw.as_bytes();
    if !bytes.get(start)?.is_ascii_lowercase() {
        return None;
    }
    let len = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || **b == b'_' || **b == b'-')
        .count();
    Some(start + len)
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
        i += 1;
    }
    i
}

/// Match every closer with the innermost open block of the same name.
fn pair(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut partner = vec![None; tokens.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut open_by_name: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Void => {}
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
                // Pops the opener too; anything above it never closed.
                while stack.len() > depth {
                    if let Some(j) = stack.pop()
                        && let Some(positions) = open_by_name.get_mut(tokens[j].name.as_str())
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
