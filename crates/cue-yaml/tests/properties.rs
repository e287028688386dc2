/*
 * properties.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Property suites over generated documents: position monotonicity,
//! brace containment, comment preservation, and number handling.

use cue_syntax::ast::{Expr, LitKind, Op};
use cue_yaml::Decoder;
use proptest::prelude::*;

fn decode_one(src: &str) -> Expr {
    let mut decoder = Decoder::new("prop.yaml", src);
    decoder
        .decode()
        .unwrap_or_else(|e| panic!("decode failed for {src:?}: {e}"))
        .expect("expected a document")
}

/// Collects valid token positions in source order, checking brace
/// containment along the way.
fn collect_positions(expr: &Expr, out: &mut Vec<usize>) {
    match expr {
        Expr::Basic(lit) => {
            if lit.value_pos.is_valid() {
                out.push(lit.value_pos.offset());
            }
        }
        Expr::Ident(ident) => {
            if ident.name_pos.is_valid() {
                out.push(ident.name_pos.offset());
            }
        }
        Expr::Unary(unary) => {
            if unary.op_pos.is_valid() {
                out.push(unary.op_pos.offset());
            }
            collect_positions(&unary.x, out);
        }
        Expr::Binary(binary) => {
            collect_positions(&binary.x, out);
            collect_positions(&binary.y, out);
        }
        Expr::Struct(strct) => {
            if strct.lbrace.is_valid() && strct.rbrace.is_valid() {
                assert!(
                    strct.lbrace.offset() <= strct.rbrace.offset(),
                    "struct braces out of order: {} > {}",
                    strct.lbrace.offset(),
                    strct.rbrace.offset()
                );
            }
            if strct.lbrace.is_valid() {
                out.push(strct.lbrace.offset());
            }
            for field in &strct.fields {
                if field.label.pos().is_valid() {
                    out.push(field.label.pos().offset());
                }
                collect_positions(&field.value, out);
            }
            if strct.rbrace.is_valid() {
                out.push(strct.rbrace.offset());
            }
        }
        Expr::List(list) => {
            if list.lbrack.is_valid() && list.rbrack.is_valid() {
                assert!(
                    list.lbrack.offset() <= list.rbrack.offset(),
                    "list brackets out of order"
                );
            }
            if list.lbrack.is_valid() {
                out.push(list.lbrack.offset());
            }
            for elt in &list.elts {
                collect_positions(elt, out);
            }
            if list.rbrack.is_valid() {
                out.push(list.rbrack.offset());
            }
        }
    }
}

fn collect_comment_bodies(expr: &Expr, out: &mut Vec<String>) {
    fn from_groups(groups: &[cue_syntax::ast::CommentGroup], out: &mut Vec<String>) {
        for group in groups {
            for comment in &group.list {
                let body = comment
                    .text
                    .strip_prefix("//")
                    .unwrap_or(&comment.text)
                    .trim()
                    .to_string();
                out.push(body);
            }
        }
    }
    match expr {
        Expr::Basic(lit) => from_groups(&lit.comments, out),
        Expr::Ident(ident) => from_groups(&ident.comments, out),
        Expr::Unary(unary) => {
            from_groups(&unary.comments, out);
            collect_comment_bodies(&unary.x, out);
        }
        Expr::Binary(binary) => {
            from_groups(&binary.comments, out);
            collect_comment_bodies(&binary.x, out);
            collect_comment_bodies(&binary.y, out);
        }
        Expr::Struct(strct) => {
            from_groups(&strct.comments, out);
            for field in &strct.fields {
                from_groups(&field.comments, out);
                collect_comment_bodies(&field.value, out);
            }
        }
        Expr::List(list) => {
            from_groups(&list.comments, out);
            for elt in &list.elts {
                collect_comment_bodies(elt, out);
            }
        }
    }
}

#[derive(Debug, Clone)]
enum GenValue {
    Int(i64),
    Str(String),
    List(Vec<GenValue>),
    Map(Vec<(String, GenValue)>),
}

fn gen_value() -> impl Strategy<Value = GenValue> {
    let leaf = prop_oneof![
        (0i64..1000).prop_map(GenValue::Int),
        "[a-z]{1,6}".prop_map(GenValue::Str),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(GenValue::List),
            proptest::collection::vec(("[a-z]{1,4}", inner), 1..4).prop_map(GenValue::Map),
        ]
    })
}

fn flow(value: &GenValue) -> String {
    match value {
        GenValue::Int(n) => n.to_string(),
        GenValue::Str(s) => s.clone(),
        GenValue::List(items) => {
            let inner: Vec<String> = items.iter().map(flow).collect();
            format!("[{}]", inner.join(", "))
        }
        GenValue::Map(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{k}: {}", flow(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn render_map(entries: &[(String, GenValue)], indent: usize, out: &mut String) {
    for (key, value) in entries {
        out.push_str(&" ".repeat(indent));
        out.push_str(key);
        out.push(':');
        match value {
            GenValue::Int(n) => {
                out.push(' ');
                out.push_str(&n.to_string());
                out.push('\n');
            }
            GenValue::Str(s) => {
                out.push(' ');
                out.push_str(s);
                out.push('\n');
            }
            GenValue::List(items) if items.is_empty() => out.push_str(" []\n"),
            GenValue::List(items) => {
                out.push('\n');
                for item in items {
                    out.push_str(&" ".repeat(indent));
                    out.push_str("- ");
                    out.push_str(&flow(item));
                    out.push('\n');
                }
            }
            GenValue::Map(inner) if inner.is_empty() => out.push_str(" {}\n"),
            GenValue::Map(inner) => {
                out.push('\n');
                render_map(inner, indent + 2, out);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_documents_keep_position_invariants(
        entries in proptest::collection::vec(("[a-z]{1,4}", gen_value()), 1..5),
    ) {
        let mut src = String::new();
        render_map(&entries, 0, &mut src);
        let expr = decode_one(&src);

        let mut positions = Vec::new();
        collect_positions(&expr, &mut positions);
        for window in positions.windows(2) {
            prop_assert!(
                window[0] <= window[1],
                "positions went backwards in {src:?}: {positions:?}"
            );
        }
    }

    #[test]
    fn comments_are_preserved_exactly_once(
        entries in proptest::collection::vec(
            (any::<bool>(), "[a-z]{1,8}", any::<bool>(), "[a-z]{1,8}"),
            1..6,
        ),
    ) {
        let mut src = String::new();
        let mut expected = Vec::new();
        for (i, (head, head_body, line, line_body)) in entries.iter().enumerate() {
            if *head {
                src.push_str(&format!("# {head_body}\n"));
                expected.push(head_body.clone());
            }
            src.push_str(&format!("k{i}: {i}"));
            if *line {
                src.push_str(&format!(" # {line_body}"));
                expected.push(line_body.clone());
            }
            src.push('\n');
        }
        let expr = decode_one(&src);
        let mut found = Vec::new();
        collect_comment_bodies(&expr, &mut found);
        expected.sort();
        found.sort();
        prop_assert_eq!(expected, found, "comment mismatch for {:?}", src);
    }
}

proptest! {
    #[test]
    fn octal_literals_keep_their_value(digits in "[0-7]{1,10}") {
        let src = format!("x: 0{digits}\n");
        let expr = decode_one(&src);
        let Expr::Struct(strct) = &expr else {
            panic!("expected struct");
        };
        let Expr::Basic(lit) = &strct.fields[0].value else {
            panic!("expected literal, got {:?}", strct.fields[0].value);
        };
        prop_assert_eq!(lit.kind, LitKind::Int);
        prop_assert_eq!(&lit.value, &format!("0o{digits}"));
        let decoded = i128::from_str_radix(&lit.value[2..], 8).unwrap();
        let original = i128::from_str_radix(&digits, 8).unwrap();
        prop_assert_eq!(decoded, original);
    }

    #[test]
    fn negative_numbers_wrap_a_positive_literal(n in 1u64..=u64::MAX / 2) {
        let src = format!("x: -{n}\n");
        let expr = decode_one(&src);
        let Expr::Struct(strct) = &expr else {
            panic!("expected struct");
        };
        let Expr::Unary(unary) = &strct.fields[0].value else {
            panic!("expected unary, got {:?}", strct.fields[0].value);
        };
        prop_assert_eq!(unary.op, Op::Sub);
        let Expr::Basic(lit) = unary.x.as_ref() else {
            panic!("expected literal operand");
        };
        prop_assert_eq!(&lit.value, &n.to_string());
    }
}
