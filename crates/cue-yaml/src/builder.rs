/*
 * builder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Builds YAML document trees from `yaml-rust2` parser events.
//!
//! The event stream is flat and omits several things the decoder needs:
//! anchor and alias names (only numeric ids are reported), whether a
//! collection was written in flow style, and the resolved tag of plain
//! scalars. This module recovers all three, the names by scanning the
//! source around the event marker, since the scanner does not report
//! where node properties start.

use std::collections::HashMap;
use std::str::Chars;
use std::sync::OnceLock;

use regex::Regex;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, ScanError, TScalarStyle};

use crate::node::{
    Document, Node, NodeId, NodeKind, ScalarStyle, BOOL_TAG, FLOAT_TAG, INT_TAG, MAP_TAG,
    MERGE_TAG, NULL_TAG, SEQ_TAG, STR_TAG, TIMESTAMP_TAG,
};
use crate::source::SourceMap;

/// Pulls the next document off the parser, or `None` at end of stream.
pub(crate) fn load_next_document<'s>(
    parser: &mut Parser<Chars<'s>>,
    src: &'s str,
    map: &SourceMap<'s>,
) -> Result<Option<Document>, ScanError> {
    let mut builder = DocumentBuilder::new(src, map);
    parser.load(&mut builder, false)?;
    Ok(builder.finish())
}

struct DocumentBuilder<'a> {
    src: &'a str,
    map: &'a SourceMap<'a>,
    doc: Option<Document>,
    /// Open containers, innermost last. The document node sits at the
    /// bottom of the stack for the duration of its events.
    stack: Vec<NodeId>,
    anchors: HashMap<usize, NodeId>,
    anchor_names: HashMap<usize, String>,
}

impl<'a> DocumentBuilder<'a> {
    fn new(src: &'a str, map: &'a SourceMap<'a>) -> DocumentBuilder<'a> {
        DocumentBuilder {
            src,
            map,
            doc: None,
            stack: Vec::new(),
            anchors: HashMap::new(),
            anchor_names: HashMap::new(),
        }
    }

    fn finish(self) -> Option<Document> {
        self.doc
    }

    fn new_node(&self, kind: NodeKind, offset: usize) -> Node {
        let offset = offset.min(self.src.len());
        let line = self.map.offset_to_line(offset);
        let column = offset - self.map.line_start(line) + 1;
        Node::new(kind, offset, line, column)
    }

    /// Moves an anchored node's position back onto its `&` and records the
    /// anchor name for later alias lookups.
    fn apply_anchor(&mut self, node: &mut Node, aid: usize) {
        if aid == 0 {
            return;
        }
        if let Some((amp, name)) = find_anchor_before(self.src, node.offset) {
            node.offset = amp;
            node.line = self.map.offset_to_line(amp);
            node.column = amp - self.map.line_start(node.line) + 1;
            node.anchor = Some(name.clone());
            self.anchor_names.insert(aid, name);
        }
    }

    fn push_complete(&mut self, id: NodeId) {
        if let (Some(doc), Some(&parent)) = (self.doc.as_mut(), self.stack.last()) {
            doc.node_mut(parent).content.push(id);
        }
    }

    fn alloc(&mut self, node: Node) -> Option<NodeId> {
        self.doc.as_mut().map(|doc| doc.push(node))
    }

    fn start_collection(
        &mut self,
        kind: NodeKind,
        aid: usize,
        raw_tag: Option<String>,
        marker: Marker,
    ) {
        let offset = marker.index().min(self.src.len());
        let flow = matches!(
            self.src.as_bytes().get(offset),
            Some(b'[') | Some(b'{')
        );
        let mut node = self.new_node(kind, offset);
        node.flow = flow;
        node.tag = match kind {
            NodeKind::Sequence => SEQ_TAG.to_string(),
            _ => MAP_TAG.to_string(),
        };
        if let Some(raw) = raw_tag {
            node.explicit_tag = raw != "!";
            node.raw_tag = Some(raw);
        }
        self.apply_anchor(&mut node, aid);
        let Some(id) = self.alloc(node) else { return };
        if aid > 0 {
            self.anchors.insert(aid, id);
        }
        self.push_complete(id);
        self.stack.push(id);
    }
}

impl MarkedEventReceiver for DocumentBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        match ev {
            Event::Nothing | Event::StreamStart | Event::StreamEnd => {}

            Event::DocumentStart => {
                let node = self.new_node(NodeKind::Document, marker.index());
                let doc = Document::with_root(node);
                let root = doc.root;
                self.doc = Some(doc);
                self.stack.push(root);
            }

            Event::DocumentEnd => {
                self.stack.pop();
                // An empty document still decodes as a null scalar.
                if let Some(doc) = self.doc.as_mut() {
                    let root = doc.root;
                    if doc.node(root).content.is_empty() {
                        let offset = doc.node(root).offset;
                        let line = doc.node(root).line;
                        let column = doc.node(root).column;
                        let mut null = Node::new(NodeKind::Scalar, offset, line, column);
                        null.tag = NULL_TAG.to_string();
                        let id = doc.push(null);
                        doc.node_mut(root).content.push(id);
                    }
                }
            }

            Event::Scalar(value, style, aid, tag) => {
                let mut node = self.new_node(NodeKind::Scalar, marker.index());
                node.style = scalar_style(style);
                match tag.as_ref().map(|t| short_tag(&t.handle, &t.suffix)) {
                    Some(raw) => {
                        node.explicit_tag = raw != "!";
                        node.tag = if raw == "!" {
                            STR_TAG.to_string()
                        } else {
                            raw.clone()
                        };
                        node.raw_tag = Some(raw);
                    }
                    None => {
                        node.tag = if node.style == ScalarStyle::Plain {
                            resolve_plain(&value).to_string()
                        } else {
                            STR_TAG.to_string()
                        };
                    }
                }
                node.value = value;
                self.apply_anchor(&mut node, aid);
                let Some(id) = self.alloc(node) else { return };
                if aid > 0 {
                    self.anchors.insert(aid, id);
                }
                self.push_complete(id);
            }

            Event::SequenceStart(aid, tag) => {
                let raw = tag.as_ref().map(|t| short_tag(&t.handle, &t.suffix));
                self.start_collection(NodeKind::Sequence, aid, raw, marker);
            }
            Event::SequenceEnd => {
                self.stack.pop();
            }

            Event::MappingStart(aid, tag) => {
                let raw = tag.as_ref().map(|t| short_tag(&t.handle, &t.suffix));
                self.start_collection(NodeKind::Mapping, aid, raw, marker);
            }
            Event::MappingEnd => {
                self.stack.pop();
            }

            Event::Alias(aid) => {
                let offset = alias_star_offset(self.src, marker.index());
                let Some(&target) = self.anchors.get(&aid) else {
                    // The parser rejects unknown anchors before we get
                    // here; keep a null scalar as a defensive fallback.
                    let mut node = self.new_node(NodeKind::Scalar, marker.index());
                    node.tag = NULL_TAG.to_string();
                    if let Some(id) = self.alloc(node) {
                        self.push_complete(id);
                    }
                    return;
                };
                let mut node = self.new_node(NodeKind::Alias(target), offset);
                node.value = self
                    .anchor_names
                    .get(&aid)
                    .cloned()
                    .unwrap_or_else(|| read_alias_name(self.src, offset));
                if let Some(id) = self.alloc(node) {
                    self.push_complete(id);
                }
            }
        }
    }
}

fn scalar_style(style: TScalarStyle) -> ScalarStyle {
    match style {
        TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
        TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        TScalarStyle::Literal => ScalarStyle::Literal,
        TScalarStyle::Folded => ScalarStyle::Folded,
        _ => ScalarStyle::Plain,
    }
}

/// Normalizes a parser tag to its short form (`!!int`, `!local`, `!`).
fn short_tag(handle: &str, suffix: &str) -> String {
    match handle {
        "tag:yaml.org,2002:" => format!("!!{suffix}"),
        "!" if suffix.is_empty() => "!".to_string(),
        "!" => format!("!{suffix}"),
        "" if suffix.is_empty() => "!".to_string(),
        handle => format!("{handle}{suffix}"),
    }
}

fn is_anchor_char(b: u8) -> bool {
    !matches!(
        b,
        b' ' | b'\t' | b'\r' | b'\n' | b',' | b'[' | b']' | b'{' | b'}'
    )
}

/// Locates the `&name` property preceding a node that the parser reported
/// as anchored. Walks whitespace-separated tokens backwards, stepping over
/// an optional tag property, then falls back to a bounded window scan.
fn find_anchor_before(src: &str, offset: usize) -> Option<(usize, String)> {
    let bytes = src.as_bytes();
    let mut end = offset.min(bytes.len());
    loop {
        while end > 0 && matches!(bytes[end - 1], b' ' | b'\t' | b'\r' | b'\n') {
            end -= 1;
        }
        if end == 0 {
            break;
        }
        let mut start = end;
        while start > 0 && !matches!(bytes[start - 1], b' ' | b'\t' | b'\r' | b'\n') {
            start -= 1;
        }
        match bytes[start] {
            b'&' if end > start + 1 => {
                return Some((start, src[start + 1..end].to_string()));
            }
            b'!' => end = start,
            _ => break,
        }
    }

    // Flow input can glue the anchor to a delimiter (`[&x 1]`), which the
    // token walk above does not separate.
    let window_start = offset.saturating_sub(200);
    let window = &src[window_start..offset.min(src.len())];
    let amp = window_start + window.rfind('&')?;
    let mut name_end = amp + 1;
    while name_end < bytes.len() && is_anchor_char(bytes[name_end]) {
        name_end += 1;
    }
    (name_end > amp + 1).then(|| (amp, src[amp + 1..name_end].to_string()))
}

/// Byte offset of the `*` introducing an alias near the event marker.
fn alias_star_offset(src: &str, marker: usize) -> usize {
    let bytes = src.as_bytes();
    if bytes.is_empty() {
        return 0;
    }
    let at = marker.min(bytes.len() - 1);
    if bytes[at] == b'*' {
        return at;
    }
    let mut i = at;
    while i > 0 && bytes[i - 1] != b'\n' {
        i -= 1;
        if bytes[i] == b'*' {
            return i;
        }
    }
    marker.min(bytes.len())
}

fn read_alias_name(src: &str, star: usize) -> String {
    let bytes = src.as_bytes();
    let mut end = star + 1;
    while end < bytes.len() && is_anchor_char(bytes[end]) {
        end += 1;
    }
    src.get(star + 1..end).unwrap_or("").to_string()
}

/// Resolves the tag of a plain, untagged scalar.
///
/// The table mirrors the resolution the decoder's scalar rules assume:
/// notably, a leading-zero literal with digits past 7 is not an integer
/// but still parses as a number, so it resolves to a float.
fn resolve_plain(value: &str) -> &'static str {
    match value {
        "" | "~" | "null" | "Null" | "NULL" => return NULL_TAG,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return BOOL_TAG,
        "<<" => return MERGE_TAG,
        _ => {}
    }
    if is_yaml_int(value) {
        INT_TAG
    } else if is_inf_or_nan(value) || is_yaml_float(value) {
        FLOAT_TAG
    } else if rx_timestamp().is_match(value) {
        TIMESTAMP_TAG
    } else {
        STR_TAG
    }
}

fn is_inf_or_nan(value: &str) -> bool {
    let t = value.strip_prefix(['+', '-']).unwrap_or(value);
    matches!(
        t,
        ".inf" | ".Inf" | ".INF" | ".nan" | ".NaN" | ".NAN"
    )
}

fn is_yaml_int(value: &str) -> bool {
    let t = value.strip_prefix(['+', '-']).unwrap_or(value);
    if t.is_empty() {
        return false;
    }
    let digit_run = |s: &str, pred: fn(u8) -> bool| {
        !s.is_empty() && s.bytes().any(pred) && s.bytes().all(|b| pred(b) || b == b'_')
    };
    if let Some(rest) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        return digit_run(rest, |b| b.is_ascii_hexdigit());
    }
    if let Some(rest) = t.strip_prefix("0o") {
        return digit_run(rest, |b| (b'0'..=b'7').contains(&b));
    }
    if let Some(rest) = t.strip_prefix("0b") {
        return digit_run(rest, |b| matches!(b, b'0' | b'1'));
    }
    if t.len() > 1 && t.as_bytes()[0] == b'0' {
        // Leading zero means base 8 under the 1.1 rules.
        return digit_run(&t[1..], |b| (b'0'..=b'7').contains(&b));
    }
    t.as_bytes()[0].is_ascii_digit() && digit_run(t, |b| b.is_ascii_digit())
}

fn is_yaml_float(value: &str) -> bool {
    let t = value.strip_prefix(['+', '-']).unwrap_or(value);
    let bytes = t.as_bytes();
    let mut i = 0;
    let mut digits = 0;
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
        if bytes[i].is_ascii_digit() {
            digits += 1;
        }
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'_') {
            if bytes[i].is_ascii_digit() {
                digits += 1;
            }
            i += 1;
        }
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

fn rx_timestamp() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| {
        Regex::new(
            r"^\d{4}-\d{1,2}-\d{1,2}(([Tt]|[ \t]+)\d{1,2}:\d{2}:\d{2}(\.\d*)?([ \t]*(Z|[-+]\d{1,2}(:\d{2})?))?)?$",
        )
        .expect("timestamp pattern is valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(src: &str) -> Document {
        let map = SourceMap::new(src);
        let mut parser = Parser::new_from_str(src);
        load_next_document(&mut parser, src, &map)
            .expect("parse failed")
            .expect("no document")
    }

    fn root_content(doc: &Document) -> &Node {
        let root = doc.node(doc.root);
        doc.node(root.content[0])
    }

    #[test]
    fn test_resolve_plain_nulls_and_bools() {
        assert_eq!(resolve_plain(""), NULL_TAG);
        assert_eq!(resolve_plain("~"), NULL_TAG);
        assert_eq!(resolve_plain("null"), NULL_TAG);
        assert_eq!(resolve_plain("true"), BOOL_TAG);
        assert_eq!(resolve_plain("FALSE"), BOOL_TAG);
        // 1.1 booleans like yes/no stay strings.
        assert_eq!(resolve_plain("yes"), STR_TAG);
    }

    #[test]
    fn test_resolve_plain_numbers() {
        assert_eq!(resolve_plain("123"), INT_TAG);
        assert_eq!(resolve_plain("-7"), INT_TAG);
        assert_eq!(resolve_plain("017"), INT_TAG);
        assert_eq!(resolve_plain("0x1F"), INT_TAG);
        assert_eq!(resolve_plain("0o17"), INT_TAG);
        assert_eq!(resolve_plain("1.5"), FLOAT_TAG);
        assert_eq!(resolve_plain("1e3"), FLOAT_TAG);
        assert_eq!(resolve_plain(".inf"), FLOAT_TAG);
        assert_eq!(resolve_plain("-.nan"), FLOAT_TAG);
        // Looks decimal, fails the octal reading, still parses as a number.
        assert_eq!(resolve_plain("01289"), FLOAT_TAG);
        assert_eq!(resolve_plain("1.2.3"), STR_TAG);
    }

    #[test]
    fn test_resolve_plain_timestamp_and_merge() {
        assert_eq!(resolve_plain("2015-02-24"), TIMESTAMP_TAG);
        assert_eq!(resolve_plain("2015-02-24T18:19:39Z"), TIMESTAMP_TAG);
        assert_eq!(resolve_plain("2015-02-24 18:19:39"), TIMESTAMP_TAG);
        assert_eq!(resolve_plain("<<"), MERGE_TAG);
    }

    #[test]
    fn test_build_simple_mapping() {
        let doc = parse_one("a: 1\nb: two\n");
        let mapping = root_content(&doc);
        assert_eq!(mapping.kind, NodeKind::Mapping);
        assert!(!mapping.flow);
        assert_eq!(mapping.content.len(), 4);
        let key = doc.node(mapping.content[0]);
        assert_eq!(key.value, "a");
        assert_eq!(key.tag, STR_TAG);
        assert_eq!((key.line, key.column), (1, 1));
        let value = doc.node(mapping.content[1]);
        assert_eq!(value.tag, INT_TAG);
        assert_eq!(value.offset, 3);
    }

    #[test]
    fn test_build_flow_styles() {
        let doc = parse_one("a: {x: 1}\nb: [1, 2]\n");
        let mapping = root_content(&doc);
        let inner = doc.node(mapping.content[1]);
        assert_eq!(inner.kind, NodeKind::Mapping);
        assert!(inner.flow);
        let seq = doc.node(mapping.content[3]);
        assert_eq!(seq.kind, NodeKind::Sequence);
        assert!(seq.flow);
    }

    #[test]
    fn test_anchor_and_alias_names() {
        let src = "a: &x 1\nb: *x\n";
        let doc = parse_one(src);
        let mapping = root_content(&doc);
        let anchored = doc.node(mapping.content[1]);
        assert_eq!(anchored.anchor.as_deref(), Some("x"));
        // The anchored node is positioned at its `&`.
        assert_eq!(anchored.offset, src.find('&').unwrap());
        let alias = doc.node(mapping.content[3]);
        let NodeKind::Alias(target) = alias.kind else {
            panic!("expected alias, got {:?}", alias.kind);
        };
        assert_eq!(doc.node(target).value, "1");
        assert_eq!(alias.value, "x");
        assert_eq!(alias.offset, src.find('*').unwrap());
    }

    #[test]
    fn test_self_referencing_anchor_builds() {
        let doc = parse_one("a: &x\n  b: *x\n");
        let mapping = root_content(&doc);
        let anchored = doc.node(mapping.content[1]);
        assert_eq!(anchored.kind, NodeKind::Mapping);
        let alias = doc.node(anchored.content[1]);
        match alias.kind {
            NodeKind::Alias(target) => assert_eq!(target, mapping.content[1]),
            other => panic!("expected alias, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_tag() {
        let doc = parse_one("a: !!float 123\n");
        let mapping = root_content(&doc);
        let value = doc.node(mapping.content[1]);
        assert_eq!(value.tag, FLOAT_TAG);
        assert!(value.explicit_tag);
    }

    #[test]
    fn test_quoted_scalar_is_str() {
        let doc = parse_one("a: \"123\"\n");
        let mapping = root_content(&doc);
        let value = doc.node(mapping.content[1]);
        assert_eq!(value.tag, STR_TAG);
        assert_eq!(value.style, ScalarStyle::DoubleQuoted);
    }

    #[test]
    fn test_empty_document_marker() {
        let doc = parse_one("---\n");
        let content = root_content(&doc);
        assert_eq!(content.kind, NodeKind::Scalar);
        assert_eq!(content.tag, NULL_TAG);
    }
}
