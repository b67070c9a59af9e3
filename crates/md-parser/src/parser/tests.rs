use super::*;
use crate::dialect::{gruber, maruku};
use serde_json::{Value, json};
use std::collections::VecDeque;

fn tree(source: &str, dialect: &Dialect) -> Value {
    serde_json::to_value(parse(source, dialect)).unwrap()
}

fn gruber_tree(source: &str) -> Value {
    tree(source, gruber())
}

fn maruku_tree(source: &str) -> Value {
    tree(source, maruku())
}

#[test]
fn test_atx_and_setext_headers() {
    assert_eq!(
        gruber_tree("# Hello\n\nWorld\n==="),
        json!([
            "markdown",
            ["header", {"level": "1"}, "Hello"],
            ["header", {"level": "1"}, "World"]
        ])
    );
    assert_eq!(
        gruber_tree("Sub\n---"),
        json!(["markdown", ["header", {"level": "2"}, "Sub"]])
    );
}

#[test]
fn test_atx_header_closing_hashes() {
    insta::assert_snapshot!(
        serde_json::to_string(&parse("### Three ###", gruber())).unwrap(),
        @r#"["markdown",["header",{"level":"3"},"Three"]]"#
    );
}

#[test]
fn test_code_blocks_merge_across_blank_lines() {
    assert_eq!(
        gruber_tree("    a\n    b\n\n\n    c"),
        json!(["markdown", ["code_block", "a\nb\n\n\nc"]])
    );
}

#[test]
fn test_code_then_paragraph_in_one_block() {
    assert_eq!(
        gruber_tree("    code\ntext"),
        json!(["markdown", ["code_block", "code"], ["para", "text"]])
    );
}

#[test]
fn test_horizontal_rule_splits_off_text_above() {
    assert_eq!(
        gruber_tree("para\n* * *"),
        json!(["markdown", ["para", "para"], ["hr"]])
    );
}

#[test]
fn test_nested_tight_list() {
    assert_eq!(
        gruber_tree("* one\n    * one.one\n* two"),
        json!([
            "markdown",
            [
                "bulletlist",
                ["listitem", "one", ["bulletlist", ["listitem", "one.one"]]],
                ["listitem", "two"]
            ]
        ])
    );
}

#[test]
fn test_loose_list_wraps_items_in_paragraphs() {
    assert_eq!(
        gruber_tree("* a\n\n* b"),
        json!([
            "markdown",
            ["bulletlist", ["listitem", ["para", "a"]], ["listitem", ["para", "b"]]]
        ])
    );
}

#[test]
fn test_numbered_list() {
    assert_eq!(
        gruber_tree("1. x\n2. y"),
        json!(["markdown", ["numberlist", ["listitem", "x"], ["listitem", "y"]]])
    );
}

#[test]
fn test_blockquote() {
    assert_eq!(
        gruber_tree("> quote\n> more"),
        json!(["markdown", ["blockquote", ["para", "quote\nmore"]]])
    );
}

#[test]
fn test_reference_definitions_collected_on_root() {
    assert_eq!(
        gruber_tree("[x][1]\n\n[1]: /url \"T\""),
        json!([
            "markdown",
            {"references": {"1": {"href": "/url", "title": "T"}}},
            ["para", ["link_ref", {"ref": "1", "original": "[x][1]"}, "x"]]
        ])
    );
}

#[test]
fn test_references_in_blockquote_are_global() {
    let root = parse("> [a]: /a\n> text", gruber());
    assert_eq!(
        root.attrs.references().and_then(|r| r.get("a")).map(|r| r.href.as_str()),
        Some("/a")
    );
    let quote = root.children[0].as_element().unwrap();
    assert!(quote.attrs.is_empty());
}

#[test]
fn test_nested_emphasis() {
    assert_eq!(
        gruber_tree("*a **b** c*"),
        json!(["markdown", ["para", ["em", "a ", ["strong", "b"], " c"]]])
    );
}

#[test]
fn test_unclosed_emphasis_is_literal() {
    assert_eq!(gruber_tree("*a *b"), json!(["markdown", ["para", "*a *b"]]));
}

#[test]
fn test_deep_emphasis_degrades_to_text() {
    let options = ParseOptions {
        max_inline_depth: 8,
        ..ParseOptions::default()
    };
    let source = "*a ".repeat(30);
    let source = source.trim_end();
    let root = Parser::new(gruber(), options).parse(source);
    assert_eq!(
        serde_json::to_value(root).unwrap(),
        json!(["markdown", ["para", source]])
    );
}

#[test]
fn test_inline_link_and_image() {
    assert_eq!(
        gruber_tree("[t](/u \"T\") ![alt](/i.png)"),
        json!([
            "markdown",
            [
                "para",
                ["link", {"href": "/u", "title": "T"}, "t"],
                " ",
                ["img", {"alt": "alt", "href": "/i.png"}]
            ]
        ])
    );
}

#[test]
fn test_link_url_parentheses_balance() {
    assert_eq!(
        gruber_tree("[t](/u) more (x)"),
        json!(["markdown", ["para", ["link", {"href": "/u"}, "t"], " more (x)"]])
    );
}

#[test]
fn test_autolinks() {
    assert_eq!(
        gruber_tree("<http://x.org> <a@b.com>"),
        json!([
            "markdown",
            [
                "para",
                ["link", {"href": "http://x.org"}, "http://x.org"],
                " ",
                ["link", {"href": "mailto:a@b.com"}, "a@b.com"]
            ]
        ])
    );
}

#[test]
fn test_inline_code_escapes_and_breaks() {
    assert_eq!(
        gruber_tree("``a`b`` \\*not\\* a  \nb"),
        json!([
            "markdown",
            ["para", ["inlinecode", "a`b"], " *not* a", ["linebreak"], "b"]
        ])
    );
}

#[test]
fn test_block_depth_limit() {
    let options = ParseOptions {
        max_block_depth: 1,
        ..ParseOptions::default()
    };
    let root = Parser::new(gruber(), options).parse("> > > deep");
    assert_eq!(
        serde_json::to_value(root).unwrap(),
        json!(["markdown", ["blockquote", ["blockquote", ["para", "> deep"]]]])
    );
}

#[test]
fn test_parses_are_independent() {
    let first = gruber_tree("*a* [x][1]\n\n[1]: /one");
    let second = gruber_tree("*a* [x][1]\n\n[1]: /one");
    assert_eq!(first, second);
    assert_eq!(
        gruber_tree("plain"),
        json!(["markdown", ["para", "plain"]])
    );
}

#[test]
fn test_maruku_document_meta() {
    assert_eq!(
        maruku_tree("Title: Foo\nAuthor: Bar\n\nBody"),
        json!(["markdown", {"title": "Foo", "author": "Bar"}, ["para", "Body"]])
    );
}

#[test]
fn test_maruku_table_alignment() {
    let source = "| a | b | c | d |\n| :-- | --: | :-: | --- |\n| 1 | 2 | 3 | 4 |";
    assert_eq!(
        maruku_tree(source),
        json!([
            "markdown",
            [
                "table",
                [
                    "thead",
                    [
                        "tr",
                        ["th", {"align": "left"}, "a"],
                        ["th", {"align": "right"}, "b"],
                        ["th", {"align": "center"}, "c"],
                        ["th", "d"]
                    ]
                ],
                [
                    "tbody",
                    [
                        "tr",
                        ["td", {"align": "left"}, "1"],
                        ["td", {"align": "right"}, "2"],
                        ["td", {"align": "center"}, "3"],
                        ["td", "4"]
                    ]
                ]
            ]
        ])
    );
}

#[test]
fn test_maruku_table_without_leading_pipe() {
    assert_eq!(
        maruku_tree("a | b\n--|--\n1 | 2\\|3"),
        json!([
            "markdown",
            [
                "table",
                ["thead", ["tr", ["th", "a"], ["th", "b"]]],
                ["tbody", ["tr", ["td", "1"], ["td", "2|3"]]]
            ]
        ])
    );
}

#[test]
fn test_maruku_definition_list() {
    assert_eq!(
        maruku_tree("Apple\nPear\n:   A fruit\n:   Tasty"),
        json!([
            "markdown",
            ["dl", ["dt", "Apple"], ["dt", "Pear"], ["dd", "A fruit"], ["dd", "Tasty"]]
        ])
    );
}

#[test]
fn test_maruku_block_meta() {
    assert_eq!(
        maruku_tree("A paragraph\n{: #intro .lead}"),
        json!(["markdown", ["para", {"id": "intro", "class": "lead"}, "A paragraph"]])
    );
    assert_eq!(
        maruku_tree("# Title\n\n{: .big}"),
        json!(["markdown", ["header", {"level": "1", "class": "big"}, "Title"]])
    );
}

#[test]
fn test_maruku_inline_meta() {
    assert_eq!(
        maruku_tree("*hi*{: .x} there"),
        json!(["markdown", ["para", ["em", {"class": "x"}, "hi"], " there"]])
    );
}

#[test]
fn test_gruber_ignores_maruku_syntax() {
    assert_eq!(
        gruber_tree("Title: Foo"),
        json!(["markdown", ["para", "Title: Foo"]])
    );
}

#[test]
fn test_header_line_then_paragraph() {
    assert_eq!(
        gruber_tree("# B\npara"),
        json!(["markdown", ["header", {"level": "1"}, "B"], ["para", "para"]])
    );
}

#[test]
fn test_list_deeper_indent_nests_one_level() {
    assert_eq!(
        gruber_tree("* one\n   * two\n    * three\n  * four"),
        json!([
            "markdown",
            ["bulletlist",
                ["listitem", "one",
                    ["bulletlist",
                        ["listitem", "two", ["bulletlist", ["listitem", "three"]]],
                        ["listitem", "four"]]]]
        ])
    );
}

#[test]
fn test_list_type_follows_first_marker() {
    assert_eq!(
        gruber_tree("1. one\n* two"),
        json!(["markdown", ["numberlist", ["listitem", "one"], ["listitem", "two"]]])
    );
}

#[test]
fn test_rule_after_list_ends_it() {
    let expected = json!(["markdown", ["bulletlist", ["listitem", "a"]], ["hr"]]);
    assert_eq!(gruber_tree("* a\n\n* * *"), expected);
    assert_eq!(gruber_tree("* a\n\n---"), expected);
}

#[test]
fn test_indented_paragraph_makes_list_loose() {
    assert_eq!(
        gruber_tree("* a\n\n    para\n\n* b"),
        json!([
            "markdown",
            ["bulletlist",
                ["listitem", ["para", "a"], ["para", "para"]],
                ["listitem", ["para", "b"]]]
        ])
    );
}

fn numbered(_: &mut Parser<'_>, block: &Block, _: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    block.starts_with("text").then(|| {
        vec![Node::element(
            "para",
            vec![Node::text(format!("{}:{}", block.line_number, block.text))],
        )]
    })
}

#[test]
fn test_requeued_remainder_line_numbers() {
    let dialect = Dialect::extend(gruber())
        .block_rule("numbered", numbered)
        .build()
        .unwrap();
    let tree = |source: &str| {
        serde_json::to_value(Parser::new(&dialect, ParseOptions::default()).parse(source)).unwrap()
    };

    assert_eq!(
        tree("# H\ntext"),
        json!(["markdown", ["header", {"level": "1"}, "H"], ["para", "3:text"]])
    );
    assert_eq!(tree("---\ntext"), json!(["markdown", ["hr"], ["para", "2:text"]]));
}
