/*
 * comments.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Comment extraction and attachment.
//!
//! The event parser drops comments entirely, so after a document tree is
//! built this pass rescans the document's line range and attaches each
//! `#` comment to a node: comment-only blocks become the head comment of
//! the node owning the next content line, trailing comments become line
//! comments, and a block with no following content becomes the foot
//! comment of the document's content node.

use std::collections::HashMap;

use crate::node::{Document, NodeId, NodeKind, ScalarStyle};
use crate::source::SourceMap;

pub(crate) fn attach_comments(doc: &mut Document, map: &SourceMap<'_>, first_document: bool) {
    let doc_line = doc.node(doc.root).line;
    let owners = line_owners(doc);
    let opaque = opaque_lines(doc, map);

    let mut pending: Vec<String> = Vec::new();
    // The first document also owns whatever precedes its `---` marker.
    let mut line = if first_document { 1 } else { doc_line };
    while line <= map.line_count() {
        if line > doc_line && is_document_boundary(map, line) {
            break;
        }
        if opaque.contains(&line) || map.is_blank_line(line) {
            line += 1;
            continue;
        }
        let span = line_text(map, line);
        if map.is_comment_line(line) {
            let start = span.find('#').unwrap_or(0);
            pending.push(span[start..].trim_end().to_string());
            line += 1;
            continue;
        }
        // A content line: flush any pending block as the head comment of
        // the line's owner, then look for a trailing comment.
        if let Some(&(_, owner)) = owners.get(&line) {
            if !pending.is_empty() {
                let node = doc.node_mut(owner);
                node.head_comment = join_block(&node.head_comment, &pending.join("\n"));
                pending.clear();
            }
        }
        if let Some(start) = trailing_comment_start(span) {
            let text = span[start..].trim_end().to_string();
            let target = owners
                .get(&line)
                .map(|&(_, id)| id)
                .or_else(|| last_node_on_or_before(doc, line));
            if let Some(id) = target {
                let node = doc.node_mut(id);
                node.line_comment = join_block(&node.line_comment, &text);
            }
        }
        line += 1;
    }

    if !pending.is_empty() {
        let root_content = doc.node(doc.root).content.first().copied();
        if let Some(id) = root_content {
            let node = doc.node_mut(id);
            node.foot_comment = join_block(&node.foot_comment, &pending.join("\n"));
        }
    }
}

fn join_block(existing: &str, incoming: &str) -> String {
    if existing.is_empty() {
        incoming.to_string()
    } else {
        format!("{existing}\n{incoming}")
    }
}

/// Maps each line to the node owning it: the earliest leaf (scalar or
/// alias) starting on the line, so a mapping pair's comments land on its
/// key and a sequence entry's on its element. Lines holding only
/// container starts fall back to the earliest container, innermost on
/// ties.
fn line_owners(doc: &Document) -> HashMap<usize, (usize, NodeId)> {
    let mut leaves: HashMap<usize, (usize, NodeId)> = HashMap::new();
    let mut containers: HashMap<usize, (usize, NodeId)> = HashMap::new();
    for id in doc.ids() {
        let node = doc.node(id);
        let slot = match node.kind {
            NodeKind::Document => continue,
            NodeKind::Scalar | NodeKind::Alias(_) => &mut leaves,
            NodeKind::Sequence | NodeKind::Mapping => &mut containers,
        };
        slot.entry(node.line)
            .and_modify(|best: &mut (usize, NodeId)| {
                if node.offset <= best.0 {
                    *best = (node.offset, id);
                }
            })
            .or_insert((node.offset, id));
    }
    for (line, slot) in containers {
        leaves.entry(line).or_insert(slot);
    }
    leaves
}

fn last_node_on_or_before(doc: &Document, line: usize) -> Option<NodeId> {
    doc.ids()
        .filter(|&id| {
            let n = doc.node(id);
            n.kind != NodeKind::Document && n.line <= line
        })
        .max_by_key(|&id| doc.node(id).offset)
}

/// Lines whose text belongs to a multi-line scalar, where `#` is content
/// rather than a comment.
fn opaque_lines(doc: &Document, map: &SourceMap<'_>) -> std::collections::HashSet<usize> {
    let mut opaque = std::collections::HashSet::new();
    for id in doc.ids() {
        let node = doc.node(id);
        if node.kind != NodeKind::Scalar {
            continue;
        }
        match node.style {
            ScalarStyle::DoubleQuoted | ScalarStyle::SingleQuoted => {
                let quote = if node.style == ScalarStyle::DoubleQuoted {
                    b'"'
                } else {
                    b'\''
                };
                if let Some(end) = quoted_end(map.src(), node.offset, quote) {
                    let end_line = map.offset_to_line(end);
                    for l in node.line + 1..=end_line {
                        opaque.insert(l);
                    }
                }
            }
            ScalarStyle::Literal | ScalarStyle::Folded => {
                // Block scalar content keeps the indentation fixed by its
                // first non-blank line.
                let mut l = node.line + 1;
                let mut content_indent = None;
                while l <= map.line_count() {
                    if map.is_blank_line(l) {
                        opaque.insert(l);
                        l += 1;
                        continue;
                    }
                    let indent = line_indent(map, l);
                    match content_indent {
                        None => content_indent = Some(indent),
                        Some(base) if indent < base => break,
                        Some(_) => {}
                    }
                    opaque.insert(l);
                    l += 1;
                }
            }
            ScalarStyle::Plain => {}
        }
    }
    opaque
}

fn line_indent(map: &SourceMap<'_>, line: usize) -> usize {
    line_text(map, line)
        .bytes()
        .take_while(|b| matches!(b, b' ' | b'\t'))
        .count()
}

fn line_text<'a>(map: &SourceMap<'a>, line: usize) -> &'a str {
    let start = map.line_start(line);
    let end = map.line_start(line + 1);
    map.src()[start..end].trim_end_matches(['\n', '\r'])
}

/// Finds the closing quote of a quoted scalar starting at `start`.
/// Tolerates a marker that points just past the opening quote.
fn quoted_end(src: &str, start: usize, quote: u8) -> Option<usize> {
    let bytes = src.as_bytes();
    let start = if bytes.get(start) == Some(&quote) {
        start
    } else if start > 0 && bytes.get(start - 1) == Some(&quote) {
        start - 1
    } else {
        return None;
    };
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && quote == b'"' {
            i += 2;
            continue;
        }
        if b == quote {
            if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Scans a content line for a trailing `#` comment, skipping quoted
/// spans. A `#` only opens a comment after whitespace.
fn trailing_comment_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        i += 1;
                    } else if bytes[i] == b'"' {
                        break;
                    }
                    i += 1;
                }
            }
            b'\'' => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if bytes.get(i + 1) == Some(&b'\'') {
                            i += 1;
                        } else {
                            break;
                        }
                    }
                    i += 1;
                }
            }
            b'#' if i > 0 && matches!(bytes[i - 1], b' ' | b'\t') => {
                return Some(i);
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn is_document_boundary(map: &SourceMap<'_>, line: usize) -> bool {
    let text = line_text(map, line);
    for marker in ["---", "..."] {
        if let Some(rest) = text.strip_prefix(marker) {
            if rest.is_empty() || rest.starts_with([' ', '\t']) {
                return true;
            }
        }
    }
    false
}
