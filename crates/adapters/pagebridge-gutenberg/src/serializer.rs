//! Block serializer - the inverse of the tokenizer.

use serde_json::{Map, Value};

use crate::tokenizer::{Block, ContentPart, DEFAULT_NAMESPACE};

/// Serialize top-level blocks, separated by blank lines.
pub fn serialize_blocks(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(serialize_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Serialize a single block and its descendants.
///
/// Freeform blocks are written verbatim. Blocks with no inner content are
/// written in self-closing form.
pub fn serialize_block(block: &Block) -> String {
    let mut out = String::new();
    write_block(block, &mut out);
    out
}

fn write_block(block: &Block, out: &mut String) {
    if block.is_freeform() {
        out.push_str(&block.inner_html);
        return;
    }

    let name = short_name(&block.name);
    out.push_str("<!-- wp:");
    out.push_str(name);
    out.push(' ');
    if !block.attrs.is_empty() {
        out.push_str(&serialize_attrs(&block.attrs));
        out.push(' ');
    }
    if block.is_void() {
        out.push_str("/-->");
        return;
    }
    out.push_str("-->");

    for part in &block.inner_content {
        match part {
            ContentPart::Html(html) => out.push_str(html),
            ContentPart::Block(index) => {
                if let Some(inner) = block.inner_blocks.get(*index) {
                    write_block(inner, out);
                }
            }
        }
    }

    out.push_str("<!-- /wp:");
    out.push_str(name);
    out.push_str(" -->");
}

/// Drop the implied `core/` namespace.
fn short_name(name: &str) -> &str {
    name.strip_prefix(DEFAULT_NAMESPACE)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
}

/// Serialize attributes as JSON that is safe inside an HTML comment.
///
/// Keys come out sorted, so equal attribute maps always produce equal text.
/// `--`, `<`, `>` and `&` only occur inside JSON strings, where the unicode
/// escapes decode back to the same characters.
pub fn serialize_attrs(attrs: &Map<String, Value>) -> String {
    let json = Value::Object(attrs.clone()).to_string();
    json.replace("--", "\\u002d\\u002d")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
