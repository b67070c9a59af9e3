use super::*;
use crate::pipeline::{Options, to_html, to_html_tree};
use jsonml::{RenderOptions, render_tree};

fn gruber_html(source: &str) -> String {
    to_html(source, "default", &Options::default()).unwrap()
}

fn maruku_html(source: &str) -> String {
    to_html(source, "Maruku", &Options::default()).unwrap()
}

#[test]
fn test_simple_conversion() {
    insta::assert_snapshot!(
        gruber_html("# Hello\n\nSome *text*"),
        @r"
    <h1>Hello</h1>

    <p>Some <em>text</em></p>
    "
    );
}

#[test]
fn test_reference_links() {
    insta::assert_snapshot!(
        gruber_html("[x][1]\n\n[1]: /url \"T\""),
        @r#"<p><a href="/url" title="T">x</a></p>"#
    );
}

#[test]
fn test_unresolved_reference_is_source_text() {
    insta::assert_snapshot!(gruber_html("[x][2]"), @"<p>[x][2]</p>");
}

#[test]
fn test_image_reference() {
    insta::assert_snapshot!(
        gruber_html("![alt][logo]\n\n[logo]: /l.png"),
        @r#"<p><img alt="alt" src="/l.png"/></p>"#
    );
}

#[test]
fn test_inline_image_uses_src() {
    insta::assert_snapshot!(
        gruber_html("![a](/i.png \"Pic\")"),
        @r#"<p><img alt="a" title="Pic" src="/i.png"/></p>"#
    );
}

#[test]
fn test_code_block_then_paragraph() {
    insta::assert_snapshot!(
        gruber_html("    a < b\n\npara"),
        @r"
    <pre><code>a &lt; b</code></pre>

    <p>para</p>
    "
    );
}

#[test]
fn test_nested_list() {
    insta::assert_snapshot!(
        gruber_html("* one\n    * one.one\n* two"),
        @"<ul><li>one<ul><li>one.one</li></ul></li><li>two</li></ul>"
    );
}

#[test]
fn test_blockquote_references_resolve_and_vanish() {
    insta::assert_snapshot!(
        gruber_html("> [a]: /a\n> see [it][a]"),
        @r#"<blockquote><p>see <a href="/a">it</a></p></blockquote>"#
    );
}

#[test]
fn test_text_is_escaped_once() {
    insta::assert_snapshot!(gruber_html("a & b < c"), @"<p>a &amp; b &lt; c</p>");
}

#[test]
fn test_table_alignment() {
    insta::assert_snapshot!(
        maruku_html("| a | b |\n|:-|-:|\n| 1 | 2 |"),
        @r#"<table><thead><tr><th align="left">a</th><th align="right">b</th></tr></thead><tbody><tr><td align="left">1</td><td align="right">2</td></tr></tbody></table>"#
    );
}

#[test]
fn test_document_meta_on_root() {
    let html = to_html_tree("Title: Foo\n\nBody", "Maruku", &Options::default()).unwrap();
    let rendered = render_tree(&html, &RenderOptions { root: true });
    insta::assert_snapshot!(rendered, @r#"<html title="Foo"><p>Body</p></html>"#);
}

#[test]
fn test_references_removed_from_root() {
    let html = to_html_tree("[x][1]\n\n[1]: /u", "default", &Options::default()).unwrap();
    assert_eq!(html.tag, "html");
    assert!(html.attrs.is_empty());
}

#[test]
fn test_preprocess_hook_sees_every_node() {
    let options = Options {
        convert: ConvertOptions {
            preprocess: Some(Arc::new(|node: Node, _: &References| match node {
                Node::Text(text) => Node::Text(text.to_uppercase()),
                other => other,
            })),
        },
        ..Options::default()
    };
    let html = to_html("hello *world*", "default", &options).unwrap();
    insta::assert_snapshot!(html, @"<p>HELLO <em>WORLD</em></p>");
}

#[test]
fn test_preprocess_hook_receives_references() {
    let options = Options {
        convert: ConvertOptions {
            preprocess: Some(Arc::new(|node: Node, references: &References| {
                if node.is_tag("link_ref") && references.contains_key("1") {
                    Node::text("handled")
                } else {
                    node
                }
            })),
        },
        ..Options::default()
    };
    let html = to_html("[x][1]\n\n[1]: /u", "default", &options).unwrap();
    insta::assert_snapshot!(html, @"<p>handled</p>");
}

#[test]
fn test_adjacent_text_is_merged() {
    let para = Node::element(
        "para",
        vec![
            Node::text("a"),
            Node::element("link_ref", vec![Node::text("x")]),
            Node::text("b"),
        ],
    );
    let html = md_tree_to_html(Element::new("markdown").with_children(vec![para]));
    // The unresolved reference has no source text recorded, so it vanishes
    assert_eq!(
        html,
        Element::new("html").with_children(vec![Node::element("p", vec![Node::text("ab")])])
    );
}

#[test]
fn test_meta_hash_key_with_markup_is_not_rendered() {
    insta::assert_snapshot!(
        maruku_html("para\n{: a>b=c .lead}"),
        @r#"<p class="lead">para</p>"#
    );
}
