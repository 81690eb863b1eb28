//! Tool-call extraction from free-form model output.
//!
//! A call is a delimited block, either `<tool_call>` … `</tool_call>` or
//! `<call>` … `</call>`:
//!
//! ```text
//! <tool_call>
//! name: read_file
//! arguments:
//!   file_path: src/main.rs
//!   limit: 40
//! </tool_call>
//! ```
//!
//! The grammar is deliberately permissive. Blocks that cannot be understood
//! are dropped, never reported: free text with no blocks is the normal
//! "final answer" case.

use thinkact_core::tool::{ToolArguments, ToolCallRequest};

/// Recognized delimiter pairs.
const DELIMITERS: [(&str, &str); 2] = [("<tool_call>", "</tool_call>"), ("<call>", "</call>")];

/// Byte range of one delimited block within the source text.
struct Block {
    /// Start of the opening tag
    start: usize,
    /// End of the closing tag
    end: usize,
    body_start: usize,
    body_end: usize,
}

/// Find the earliest opening tag at or after `from`.
fn next_open(text: &str, from: usize) -> Option<(usize, usize)> {
    DELIMITERS
        .iter()
        .enumerate()
        .filter_map(|(kind, (open, _))| text[from..].find(open).map(|i| (from + i, kind)))
        .min_by_key(|(pos, _)| *pos)
}

/// Scan for terminated blocks in document order.
///
/// Returns the blocks plus the start offset of a trailing unterminated
/// block, if any.
fn scan_blocks(text: &str) -> (Vec<Block>, Option<usize>) {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some((start, kind)) = next_open(text, pos) {
        let (open, close) = DELIMITERS[kind];
        let body_start = start + open.len();
        let close_at = text[body_start..].find(close).map(|i| body_start + i);
        let reopened = next_open(text, body_start).map(|(p, _)| p);

        match (close_at, reopened) {
            // Another block opens before this one closes: drop this one.
            (Some(c), Some(r)) if r < c => pos = r,
            (None, Some(r)) => pos = r,
            (None, None) => return (blocks, Some(start)),
            (Some(c), _) => {
                blocks.push(Block {
                    start,
                    end: c + close.len(),
                    body_start,
                    body_end: c,
                });
                pos = c + close.len();
            }
        }
    }
    (blocks, None)
}

fn is_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Split `key: value` on the first colon. `None` if the key is not a plain
/// identifier.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    is_key(key).then_some((key, value.trim()))
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Drop up to `indent` leading whitespace characters.
fn strip_indent(line: &str, indent: usize) -> &str {
    let mut rest = line;
    for _ in 0..indent {
        match rest.strip_prefix(|c: char| c.is_whitespace()) {
            Some(r) => rest = r,
            None => break,
        }
    }
    rest
}

/// Parse one block body into a name and its arguments.
///
/// Lines that are not `key: value` continue the previous argument's value,
/// so multi-line content survives. Continuation lines lose the indentation
/// of the line that opened the argument.
fn parse_body(body: &str) -> Option<(String, ToolArguments)> {
    let mut name: Option<String> = None;
    let mut arguments = ToolArguments::new();
    let mut in_arguments = false;
    // argument being continued, and the indent of its `key:` line
    let mut current: Option<(String, usize)> = None;

    for raw in body.lines() {
        let line = raw.trim();
        match split_field(line) {
            Some(("arguments", "")) if !in_arguments => {
                in_arguments = true;
                current = None;
            }
            Some(("name", value)) if !in_arguments => {
                name = Some(value.to_string());
                current = None;
            }
            Some((key, value)) => {
                arguments.insert(key.to_string(), value.to_string());
                current = Some((key.to_string(), indent_of(raw)));
            }
            None => {
                if let Some((key, indent)) = &current {
                    if let Some(value) = arguments.get_mut(key) {
                        value.push('\n');
                        value.push_str(strip_indent(raw.trim_end(), *indent));
                    }
                }
            }
        }
    }

    for value in arguments.values_mut() {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    Some((name, arguments))
}

/// Extract tool calls from a model response, in document order.
///
/// Ids are `call_0`, `call_1`, … over the accepted blocks of this response
/// only. Never fails; unparseable blocks are skipped.
pub fn parse_tool_calls(text: &str) -> Vec<ToolCallRequest> {
    let (blocks, _) = scan_blocks(text);
    blocks
        .iter()
        .filter_map(|b| parse_body(&text[b.body_start..b.body_end]))
        .enumerate()
        .map(|(i, (name, arguments))| ToolCallRequest::new(format!("call_{i}"), name, arguments))
        .collect()
}

/// Remove every call block (and a trailing unterminated one), leaving the
/// surrounding narrative.
pub fn strip_tool_calls(text: &str) -> String {
    let (blocks, unterminated) = scan_blocks(text);
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for block in &blocks {
        out.push_str(&text[pos..block.start]);
        pos = block.end;
    }
    let tail_end = unterminated.filter(|&u| u >= pos).unwrap_or(text.len());
    out.push_str(&text[pos..tail_end]);
    out.trim().to_string()
}
