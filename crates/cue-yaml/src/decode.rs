/*
 * decode.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The YAML-to-CUE decoder.
//!
//! [`Decoder`] pulls one YAML document at a time from the parser and
//! translates it into a CUE expression, preserving source positions,
//! comments, and blank-line sections. Struct braces and list brackets
//! have no counterpart in block-style YAML, so their positions are
//! computed from the scope of the surrounding node.

use std::collections::HashSet;
use std::str::Chars;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::Regex;
use yaml_rust2::parser::Parser;

use cue_syntax::ast::{
    self, BasicLit, BinaryExpr, Comment, CommentGroup, Expr, Field, Ident, Label, LitKind, Node as _,
    Op, StructLit, UnaryExpr,
};
use cue_syntax::literal;
use cue_syntax::token::{Pos, RelPos};

use crate::builder::load_next_document;
use crate::comments::attach_comments;
use crate::error::{Error, ErrorKind, Result};
use crate::node::{
    Document, Node, NodeId, NodeKind, BINARY_TAG, BOOL_TAG, FLOAT_TAG, INT_TAG, MERGE_TAG,
    NULL_TAG, STR_TAG, TIMESTAMP_TAG,
};
use crate::source::SourceMap;

/// The implicit-resolution shape of base-8 integers under the 1.1 rules,
/// widened to the 8 and 9 digits that are not valid octal. A plain scalar
/// matching this pattern but typed as a float was a literal like `01289`.
fn rx_any_octal_yaml11() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"^[-+]?0[0-9_]+$").expect("octal pattern is valid"))
}

/// Terminal state of a decoder, latched after the first occurrence.
#[derive(Debug, Clone)]
enum Terminal {
    Eof,
    Failed(Error),
}

/// Decodes YAML documents into CUE expressions.
///
/// One decoder owns one source buffer. [`Decoder::decode`] returns
/// `Ok(Some(expr))` per document, then `Ok(None)` at end of stream; both
/// end of stream and errors are sticky.
pub struct Decoder<'src> {
    src: &'src str,
    map: SourceMap<'src>,
    filename: String,
    parser: Parser<Chars<'src>>,

    /// True once the parser has produced a document, so an empty stream
    /// can be told apart from an exhausted one.
    yaml_non_empty: bool,
    terminal: Option<Terminal>,

    /// Head comments gathered ahead of the syntax node that will own
    /// them. Comments appear before the node they document, so they are
    /// collected before the node exists and flushed at creation.
    pending_head_comments: Vec<Comment>,

    /// Alias nodes currently being expanded, for cycle detection.
    extracting_aliases: HashSet<NodeId>,

    /// Byte offset of the last position handed out. Positions move
    /// forward through the file; `None` means nothing was emitted yet.
    last_offset: Option<usize>,

    /// Forces the next position onto a new line.
    force_newline: bool,

    /// Exclusive byte offset bounding the current node's extent, used to
    /// place closing braces for block-style structs.
    scope_end: usize,
}

impl<'src> Decoder<'src> {
    /// Creates a decoder for the given source. The filename is used in
    /// error messages only.
    pub fn new(filename: &str, src: &'src str) -> Decoder<'src> {
        Decoder {
            src,
            map: SourceMap::new(src),
            filename: filename.to_string(),
            parser: Parser::new_from_str(src),
            yaml_non_empty: false,
            terminal: None,
            pending_head_comments: Vec::new(),
            extracting_aliases: HashSet::new(),
            last_offset: None,
            force_newline: false,
            scope_end: src.len(),
        }
    }

    /// Decodes the next YAML document into a CUE expression.
    ///
    /// Returns `Ok(None)` once no more documents are available. An empty
    /// input stream yields a single `*null | _` expression before the end
    /// of the stream.
    pub fn decode(&mut self) -> Result<Option<Expr>> {
        match &self.terminal {
            Some(Terminal::Eof) => return Ok(None),
            Some(Terminal::Failed(err)) => return Err(err.clone()),
            None => {}
        }
        let doc = match load_next_document(&mut self.parser, self.src, &self.map) {
            Ok(doc) => doc,
            Err(scan) => {
                let err = Error::from_scan(&self.filename, &scan);
                self.terminal = Some(Terminal::Failed(err.clone()));
                return Err(err);
            }
        };
        let Some(mut doc) = doc else {
            self.terminal = Some(Terminal::Eof);
            if !self.yaml_non_empty {
                // An empty stream decodes to `*null | _`. A lone `---`
                // instead produces a document holding a null scalar and
                // never reaches this branch.
                return Ok(Some(empty_stream_expr()));
            }
            return Ok(None);
        };
        attach_comments(&mut doc, &self.map, !self.yaml_non_empty);
        self.yaml_non_empty = true;
        match self.extract(&doc, doc.root) {
            Ok(expr) => Ok(Some(expr)),
            Err(err) => {
                self.terminal = Some(Terminal::Failed(err.clone()));
                Err(err)
            }
        }
    }

    fn extract(&mut self, doc: &Document, id: NodeId) -> Result<Expr> {
        let yn = doc.node(id);
        self.add_head_comments_to_pending(yn);
        let mut expr = match yn.kind {
            NodeKind::Document => self.document(doc, id)?,
            NodeKind::Sequence => self.sequence(doc, id)?,
            NodeKind::Mapping => self.mapping(doc, id)?,
            NodeKind::Scalar => self.scalar(yn)?,
            NodeKind::Alias(target) => self.alias(doc, id, target)?,
        };
        let is_struct = matches!(expr, Expr::Struct(_));
        self.flush_comments_onto(expr.comments_mut(), is_struct, yn, 1);
        Ok(expr)
    }

    fn document(&mut self, doc: &Document, id: NodeId) -> Result<Expr> {
        let yn = doc.node(id);
        match yn.content.first() {
            Some(&content) => self.extract(doc, content),
            None => {
                // The builder fills empty documents with a null scalar.
                let pos = self.pos(yn.offset);
                Ok(Expr::Basic(BasicLit::new(
                    LitKind::Null,
                    pos.with_rel(RelPos::Blank),
                    "null",
                )))
            }
        }
    }

    /// Splits a newline-delimited blob of `#` comments into CUE comments.
    fn comments_from(blob: &str) -> Vec<Comment> {
        if blob.is_empty() {
            return Vec::new();
        }
        blob.split('\n')
            .filter(|line| !line.is_empty())
            .map(|line| Comment {
                slash: Pos::NONE,
                text: format!("//{}", line.strip_prefix('#').unwrap_or(line)),
            })
            .collect()
    }

    /// Parses a node's head comments into the pending list, marking the
    /// first one as a section start when blank lines separate it from the
    /// previous content.
    fn add_head_comments_to_pending(&mut self, yn: &Node) {
        let mut comments = Self::comments_from(&yn.head_comment);
        // The parser does not report comment positions, so the block's
        // first line is approximated by counting comment lines upwards
        // from the node.
        if self.pending_head_comments.is_empty() && !comments.is_empty() {
            if let Some(last) = self.last_offset {
                let prev_line = self.map.offset_to_line(last) as i64;
                let first_comment_line = yn.line as i64 - comments.len() as i64;
                if first_comment_line - prev_line >= 2 {
                    comments[0].slash = comments[0].slash.with_rel(RelPos::NewSection);
                }
            }
        }
        self.pending_head_comments.append(&mut comments);
    }

    /// Attaches any pending head comments, plus the node's line and foot
    /// comments, to a syntax node's comment list.
    ///
    /// Trailing comments cannot follow arbitrary nodes in the syntax
    /// tree, so foot comments of anything but a struct literal are pushed
    /// into the pending list and surface ahead of the next node instead.
    fn flush_comments_onto(
        &mut self,
        groups: &mut Vec<CommentGroup>,
        is_struct: bool,
        yn: &Node,
        line_pos: i8,
    ) {
        let pending = std::mem::take(&mut self.pending_head_comments);
        if !pending.is_empty() {
            groups.push(CommentGroup {
                doc: true,
                line: false,
                position: 0,
                list: pending,
            });
        }
        let line = Self::comments_from(&yn.line_comment);
        if !line.is_empty() {
            groups.push(CommentGroup {
                doc: false,
                line: true,
                position: line_pos,
                list: line,
            });
        }
        let foot = Self::comments_from(&yn.foot_comment);
        if !foot.is_empty() {
            if is_struct {
                // Past every token of the node, so the group trails it.
                groups.push(CommentGroup {
                    doc: false,
                    line: false,
                    position: 100,
                    list: foot,
                });
            } else {
                self.pending_head_comments = foot;
            }
        }
    }

    fn error(&self, yn: &Node, kind: ErrorKind) -> Error {
        Error::new(&self.filename, Some(yn.line), kind)
    }

    /// Converts a byte offset to a position, classifying the whitespace
    /// between it and the previously emitted position. Offsets are
    /// expected in increasing order; a backward offset yields the invalid
    /// position and is logged for inspection.
    fn pos(&mut self, offset: usize) -> Pos {
        let mut pos = Pos::new(offset, RelPos::NoRel);
        if self.force_newline {
            self.force_newline = false;
            pos = pos.with_rel(RelPos::Newline);
        } else if let Some(last) = self.last_offset {
            let last_line = self.map.offset_to_line(last);
            let cur_line = self.map.offset_to_line(offset);
            pos = pos.with_rel(if cur_line >= last_line + 2 {
                RelPos::NewSection
            } else if cur_line == last_line + 1 {
                RelPos::Newline
            } else if offset > last {
                RelPos::Blank
            } else {
                RelPos::NoSpace
            });
            if offset < last {
                tracing::debug!(offset, last_offset = last, "position offset moved backwards");
                return Pos::NONE;
            }
        }
        self.last_offset = Some(offset);
        pos
    }

    /// Scans forward from `start` for the closing delimiter of a flow
    /// collection, skipping quoted strings and comments.
    fn find_closing(&self, start: usize, close: u8) -> usize {
        let bytes = self.src.as_bytes();
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                b if b == close => return i,
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
                b'#' => {
                    // In flow context a `#` opens a comment only after
                    // whitespace or at the start of the scan region.
                    if i == start || matches!(bytes[i - 1], b' ' | b'\t') {
                        while i < bytes.len() && bytes[i] != b'\n' {
                            i += 1;
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
        bytes.len()
    }

    /// Byte offset where a node's own content starts, skipping a leading
    /// `&name` anchor. Flow nodes advance to the opening delimiter; block
    /// nodes stop after the first newline or at the first non-blank.
    fn content_offset(&self, yn: &Node, open: u8) -> usize {
        let mut offset = yn.offset;
        let Some(anchor) = yn.anchor.as_deref() else {
            return offset;
        };
        let bytes = self.src.as_bytes();
        if yn.flow {
            while offset < bytes.len() && bytes[offset] != open {
                offset += 1;
            }
            return offset;
        }
        offset += 1 + anchor.len();
        let mut newline_seen = false;
        while offset < bytes.len() {
            if newline_seen {
                return offset;
            }
            match bytes[offset] {
                b' ' | b'\t' => {}
                b'\n' | b'\r' => newline_seen = true,
                _ => return offset,
            }
            offset += 1;
        }
        offset
    }

    /// The scope end just before the given node, excluding its head
    /// comments and the blank lines around them, so comments belonging to
    /// the next sibling are not swallowed by the current node's scope.
    fn scope_end_before(&self, doc: &Document, id: NodeId) -> usize {
        let yn = doc.node(id);
        if yn.head_comment.is_empty() {
            return self.map.line_start(yn.line);
        }
        let mut line = yn.line - 1;
        while line >= 1 && self.map.is_blank_line(line) {
            line -= 1;
        }
        while line >= 1 && self.map.is_comment_line(line) {
            line -= 1;
        }
        self.map.line_start(line + 1)
    }

    fn sequence(&mut self, doc: &Document, id: NodeId) -> Result<Expr> {
        let yn = doc.node(id);
        let parent_scope_end = self.scope_end;
        // Brackets are a CUE concept with no counterpart in block-style
        // YAML, so the position is computed directly rather than through
        // pos() and its cursor.
        let lbrack = Pos::new(self.content_offset(yn, b'['), RelPos::Blank);

        // Elements are extracted directly, so advance the cursor onto the
        // sequence itself first; element positions are then measured
        // against the sequence rather than whatever preceded it.
        if self.last_offset.is_none_or(|last| yn.offset >= last) {
            self.last_offset = Some(yn.offset);
        }

        let multiline = yn
            .content
            .last()
            .is_some_and(|&last| yn.line < doc.node(last).line);

        // An empty list, or one ending in a struct, closes on the same line.
        let mut close_same_line = true;
        let mut elts = Vec::with_capacity(yn.content.len());
        for (i, &child) in yn.content.iter().enumerate() {
            self.force_newline = multiline;
            self.scope_end = match yn.content.get(i + 1) {
                Some(&next) => self.scope_end_before(doc, next),
                None => parent_scope_end,
            };
            let elem = self.extract(doc, child)?;
            close_same_line = matches!(elem, Expr::Struct(_));
            elts.push(elem);
        }

        let rbrack = if yn.flow {
            let start = if yn.content.is_empty() {
                lbrack.offset() + 1
            } else {
                self.last_offset.unwrap_or(lbrack.offset() + 1)
            };
            let off = self.find_closing(start, b']');
            // Step past the bracket so an enclosing flow scan resumes
            // after this collection.
            self.last_offset = Some(off + 1);
            Pos::new(off, RelPos::Blank)
        } else if !yn.content.is_empty() {
            // No explicit bracket exists, so close as late as possible:
            // one byte before the end of the parent's extent.
            let rel = if multiline && !close_same_line {
                RelPos::Newline
            } else {
                RelPos::Blank
            };
            Pos::new(parent_scope_end.saturating_sub(1), rel)
        } else {
            lbrack
        };
        Ok(Expr::List(ast::ListLit {
            lbrack,
            elts,
            rbrack,
            comments: Vec::new(),
        }))
    }

    fn mapping(&mut self, doc: &Document, id: NodeId) -> Result<Expr> {
        let yn = doc.node(id);
        let parent_scope_end = self.scope_end;
        let lbrace = Pos::new(self.content_offset(yn, b'{'), RelPos::Blank);
        let multiline = yn
            .content
            .last()
            .is_some_and(|&last| yn.line < doc.node(last).line);

        let mut strct = StructLit {
            lbrace,
            fields: Vec::new(),
            rbrace: Pos::NONE,
            comments: Vec::new(),
        };
        self.insert_map(doc, id, &mut strct, multiline, false)?;

        strct.rbrace = if yn.flow {
            let start = if yn.content.is_empty() {
                lbrace.offset() + 1
            } else {
                self.last_offset.unwrap_or(lbrace.offset() + 1)
            };
            let off = self.find_closing(start, b'}');
            self.last_offset = Some(off + 1);
            Pos::new(off, RelPos::Blank)
        } else if !yn.content.is_empty() {
            let rel = if multiline {
                RelPos::Newline
            } else {
                RelPos::Blank
            };
            Pos::new(parent_scope_end.saturating_sub(1), rel)
        } else {
            lbrace
        };
        Ok(Expr::Struct(strct))
    }

    fn insert_map(
        &mut self,
        doc: &Document,
        id: NodeId,
        strct: &mut StructLit,
        multiline: bool,
        mut merge_values: bool,
    ) -> Result<()> {
        let parent_scope_end = self.scope_end;
        let content = &doc.node(id).content;
        let len = content.len();
        let mut i = 0;
        while i + 1 < len {
            if multiline {
                self.force_newline = true;
            }
            let (yk_id, yv_id) = (content[i], content[i + 1]);
            i += 2;
            let yk = doc.node(yk_id);
            self.add_head_comments_to_pending(yk);
            if is_merge(yk) {
                merge_values = true;
                self.merge(doc, yv_id, strct, multiline)?;
                continue;
            }

            let label = self.label(doc, yk_id)?;
            let mut field_comments = Vec::new();
            self.flush_comments_onto(&mut field_comments, false, yk, 2);

            // Scope the value we are about to extract.
            self.scope_end = match content.get(i) {
                Some(&next_key) => self.scope_end_before(doc, next_key),
                None => parent_scope_end,
            };

            if merge_values {
                let key = label.name();
                if key.is_some() {
                    if let Some(idx) = strct
                        .fields
                        .iter()
                        .position(|field| field.label.name() == key)
                    {
                        strct.fields[idx].value = self.extract(doc, yv_id)?;
                        continue;
                    }
                }
            }

            let value = self.extract(doc, yv_id)?;
            strct.fields.push(Field {
                label,
                value,
                comments: field_comments,
            });
        }
        Ok(())
    }

    fn merge(
        &mut self,
        doc: &Document,
        id: NodeId,
        strct: &mut StructLit,
        multiline: bool,
    ) -> Result<()> {
        let yn = doc.node(id);
        match yn.kind {
            NodeKind::Mapping => self.insert_map(doc, id, strct, multiline, true),
            NodeKind::Alias(target) => {
                if doc.node(target).kind == NodeKind::Mapping {
                    self.insert_map(doc, target, strct, multiline, true)
                } else {
                    Err(self.error(yn, ErrorKind::InvalidMerge))
                }
            }
            NodeKind::Sequence => {
                // Earlier entries take precedence, so merge back to front.
                for &child in yn.content.iter().rev() {
                    self.merge(doc, child, strct, multiline)?;
                }
                Ok(())
            }
            _ => Err(self.error(yn, ErrorKind::InvalidMerge)),
        }
    }

    fn label(&mut self, doc: &Document, id: NodeId) -> Result<Label> {
        let yn = doc.node(id);
        let pos = self.pos(yn.offset);

        let (expr, value) = match yn.kind {
            NodeKind::Scalar => (self.scalar(yn)?, yn.value.clone()),
            NodeKind::Alias(target) => {
                let aliased = doc.node(target);
                if aliased.kind != NodeKind::Scalar {
                    return Err(self.error(
                        yn,
                        ErrorKind::InvalidKey {
                            tag: aliased.tag.clone(),
                        },
                    ));
                }
                let value = aliased.value.clone();
                (self.alias(doc, id, target)?, value)
            }
            _ => {
                return Err(self.error(
                    yn,
                    ErrorKind::InvalidKey {
                        tag: yn.tag.clone(),
                    },
                ))
            }
        };

        match expr {
            Expr::Basic(lit) => {
                // Keys like `Null:` normalize to their literal spelling.
                let value = if lit.kind != LitKind::Str {
                    lit.value
                } else {
                    value
                };
                Ok(ast::new_string_label(&value, pos))
            }
            _ => Err(self.error(yn, ErrorKind::InvalidLabel { label: value })),
        }
    }

    fn scalar(&mut self, yn: &Node) -> Result<Expr> {
        let mut tag = yn.tag.as_str();
        // An untagged scalar that resolved to a float but reads like a
        // base-8 literal was something like `01289`. Most decoders fall
        // back to a string there, so do the same.
        if !yn.explicit_tag && tag == FLOAT_TAG && rx_any_octal_yaml11().is_match(&yn.value) {
            tag = STR_TAG;
        }
        let pos = self.pos(yn.offset);
        match tag {
            TIMESTAMP_TAG => Ok(Expr::Basic(BasicLit::new(
                LitKind::Str,
                pos,
                literal::STRING.quote(&yn.value),
            ))),
            STR_TAG => Ok(Expr::Basic(BasicLit::new(
                LitKind::Str,
                pos,
                literal::STRING.with_optional_tab_indent(1).quote(&yn.value),
            ))),
            BINARY_TAG => {
                let cleaned: String = yn
                    .value
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                let data = BASE64
                    .decode(cleaned.as_bytes())
                    .map_err(|_| self.error(yn, ErrorKind::InvalidBase64))?;
                Ok(Expr::Basic(BasicLit::new(
                    LitKind::Str,
                    pos,
                    literal::quote_bytes(&data),
                )))
            }
            BOOL_TAG => {
                let value = matches!(yn.value.as_str(), "true" | "True" | "TRUE");
                Ok(Expr::Basic(ast::new_bool(value, pos)))
            }
            INT_TAG => {
                // Base-8 literals written with a bare leading zero become
                // explicit. Anything else invalid is rejected here rather
                // than handed to the formatter.
                let mut value = yn.value.clone();
                let bytes = value.as_bytes();
                if bytes.len() > 1 && bytes[0] == b'0' && bytes[1] <= b'9' {
                    value = format!("0o{}", &value[1..]);
                }
                match literal::parse_num(&value) {
                    Err(err) => Err(self.error(
                        yn,
                        ErrorKind::MalformedNumber {
                            value,
                            tag: tag.to_string(),
                            reason: err.to_string(),
                        },
                    )),
                    Ok(info) if !info.is_int() => Err(self.error(
                        yn,
                        ErrorKind::MalformedNumber {
                            value,
                            tag: tag.to_string(),
                            reason: "not a literal number".to_string(),
                        },
                    )),
                    Ok(_) => Ok(make_num(pos, &value, LitKind::Int)),
                }
            }
            FLOAT_TAG => {
                let mut value = yn.value.clone();
                match value.as_str() {
                    ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
                        value = "+Inf".to_string();
                    }
                    "-.inf" | "-.Inf" | "-.INF" => value = "-Inf".to_string(),
                    ".nan" | ".NaN" | ".NAN" => value = "NaN".to_string(),
                    "-.nan" | "-.NaN" | "-.NAN" => value = "-NaN".to_string(),
                    _ => {
                        if let Err(err) = literal::parse_num(&value) {
                            return Err(self.error(
                                yn,
                                ErrorKind::MalformedNumber {
                                    value,
                                    tag: tag.to_string(),
                                    reason: err.to_string(),
                                },
                            ));
                        }
                        // A float-tagged literal that reads like an
                        // integer keeps a record of its representation.
                        // `float & 123` would be an error, so unify with
                        // `number` instead.
                        if yn.explicit_tag
                            && !value.contains(['.', 'e', 'E', 'i', 'I', 'n', 'N'])
                        {
                            value = format!("number & {value}");
                        }
                    }
                }
                Ok(make_num(pos, &value, LitKind::Float))
            }
            NULL_TAG => Ok(Expr::Basic(BasicLit::new(
                LitKind::Null,
                pos.with_rel(RelPos::Blank),
                "null",
            ))),
            other => Err(self.error(
                yn,
                ErrorKind::UnsupportedTag {
                    tag: other.to_string(),
                },
            )),
        }
    }

    fn alias(&mut self, doc: &Document, id: NodeId, target: NodeId) -> Result<Expr> {
        let yn = doc.node(id);
        if !self.extracting_aliases.insert(id) {
            return Err(self.error(
                yn,
                ErrorKind::AnchorCycle {
                    anchor: yn.value.clone(),
                },
            ));
        }

        tracing::debug!(anchor = %yn.value, line = yn.line, "expanding alias");

        // The anchored value usually sits earlier in the source, so the
        // cursor state is saved and reset around the expansion; reusing
        // the outer cursor would start later flow-close scans past the
        // aliased content.
        let saved_last_offset = self.last_offset;
        let saved_force_newline = self.force_newline;
        let saved_scope_end = self.scope_end;
        self.last_offset = None;
        self.force_newline = false;

        let result = self.extract(doc, target);

        self.last_offset = saved_last_offset;
        self.force_newline = saved_force_newline;
        self.scope_end = saved_scope_end;
        self.extracting_aliases.remove(&id);

        let mut expr = result?;

        // Containers keep the brace positions of the reference site, not
        // the definition site; the alias is where the value appears.
        let alias_start = yn.offset;
        let alias_end = alias_start + yn.value.len();
        match &mut expr {
            Expr::Struct(strct) => {
                strct.lbrace = Pos::new(alias_start, RelPos::Blank);
                strct.rbrace = Pos::new(alias_end, RelPos::Blank);
            }
            Expr::List(list) => {
                list.lbrack = Pos::new(alias_start, RelPos::Blank);
                list.rbrack = Pos::new(alias_end, RelPos::Blank);
            }
            _ => {}
        }
        Ok(expr)
    }
}

fn is_merge(yn: &Node) -> bool {
    yn.kind == NodeKind::Scalar
        && yn.value == "<<"
        && (yn.raw_tag.is_none() || yn.raw_tag.as_deref() == Some("!") || yn.tag == MERGE_TAG)
}

/// Wraps negative numbers in a unary minus around a positive literal.
fn make_num(pos: Pos, value: &str, kind: LitKind) -> Expr {
    match value.strip_prefix('-') {
        Some(positive) => Expr::Unary(UnaryExpr {
            op: Op::Sub,
            op_pos: pos,
            x: Box::new(Expr::Basic(BasicLit::new(kind, pos, positive))),
            comments: Vec::new(),
        }),
        None => Expr::Basic(BasicLit::new(kind, pos, value)),
    }
}

/// The expression produced for an entirely empty stream: `*null | _`.
fn empty_stream_expr() -> Expr {
    let pos = Pos::new(0, RelPos::NoRel);
    Expr::Binary(BinaryExpr {
        op: Op::Or,
        op_pos: pos,
        x: Box::new(Expr::Unary(UnaryExpr {
            op: Op::Mul,
            op_pos: pos,
            x: Box::new(Expr::Basic(BasicLit::new(LitKind::Null, pos, "null"))),
            comments: Vec::new(),
        })),
        y: Box::new(Expr::Ident(Ident::new("_", pos))),
        comments: Vec::new(),
    })
}

/// Parses a single YAML document to a CUE expression.
///
/// Returns `Ok(None)` only when decoding yields nothing at all; an empty
/// input produces the `*null | _` expression. Inputs holding more than
/// one document are rejected.
pub fn unmarshal(filename: &str, src: &str) -> Result<Option<Expr>> {
    let mut decoder = Decoder::new(filename, src);
    let Some(expr) = decoder.decode()? else {
        return Ok(None);
    };
    match decoder.decode() {
        Ok(None) => Ok(Some(expr)),
        Ok(Some(second)) => {
            let pos = second.pos();
            let line = pos
                .is_valid()
                .then(|| decoder.map.offset_to_line(pos.offset()));
            Err(Error::new(filename, line, ErrorKind::MultipleDocuments))
        }
        Err(err) => Err(Error::new(
            filename,
            None,
            ErrorKind::Syntax(format!("expected a single YAML document: {err}")),
        )),
    }
}
