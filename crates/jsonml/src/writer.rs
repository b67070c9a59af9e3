//! JsonML to markup writer
//!
//! Renders an HTML-shaped JsonML tree into a well-formed markup string.

use crate::tree::{AttrValue, Element, Node};

/// Options for the markup writer
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Include the root element itself instead of only its children
    pub root: bool,
}

/// Render a tree to markup
///
/// Without `root`, the children of `tree` are rendered one after another,
/// separated by a blank line.
pub fn render_tree(tree: &Element, options: &RenderOptions) -> String {
    let mut writer = Writer::new();
    if options.root {
        writer.write_element(tree);
    } else {
        for (i, child) in tree.children.iter().enumerate() {
            if i > 0 {
                writer.output.push_str("\n\n");
            }
            writer.write_node(child);
        }
    }
    writer.output
}

/// Render a single node to markup
pub fn render_node(node: &Node) -> String {
    let mut writer = Writer::new();
    writer.write_node(node);
    writer.output
}

/// Escape `& < > " '` for text and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Merge adjacent text children, recursively
pub fn merge_text_nodes(element: &mut Element) {
    let children = std::mem::take(&mut element.children);
    for child in children {
        match child {
            Node::Text(s) => match element.children.last_mut() {
                Some(Node::Text(prev)) => prev.push_str(&s),
                _ => element.children.push(Node::Text(s)),
            },
            Node::Element(mut e) => {
                merge_text_nodes(&mut e);
                element.children.push(Node::Element(e));
            }
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "br" | "hr")
}

/// Markup writer state
struct Writer {
    output: String,
}

impl Writer {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn write_node(&mut self, node: &Node) {
        match node {
            Node::Text(s) => self.output.push_str(&escape_html(s)),
            Node::Element(e) => self.write_element(e),
        }
    }

    fn write_element(&mut self, e: &Element) {
        self.output.push('<');
        self.output.push_str(&e.tag);
        for (key, value) in e.attrs.iter() {
            // Reference maps are bookkeeping and never rendered
            let AttrValue::Text(value) = value else {
                continue;
            };
            if !is_attr_name(key) {
                continue;
            }
            self.output.push(' ');
            self.output.push_str(key);
            self.output.push_str("=\"");
            self.output.push_str(&escape_html(value));
            self.output.push('"');
        }

        // No whitespace is added around children: inline content is exact
        if is_void(&e.tag) {
            self.output.push_str("/>");
            return;
        }
        self.output.push('>');
        for child in &e.children {
            self.write_node(child);
        }
        self.output.push_str("</");
        self.output.push_str(&e.tag);
        self.output.push('>');
    }
}

/// Names that cannot break out of the tag they are written into
fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '<' | '>' | '=' | '/')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(children: Vec<Node>) -> Node {
        Node::element("p", children)
    }

    #[test]
    fn test_escape_plain_text_unchanged() {
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_escape_is_not_reapplied() {
        // Already-escaped input is text like any other
        assert_eq!(escape_html("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_render_children_joined_by_blank_line() {
        let html = Element::new("html").with_children(vec![
            p(vec![Node::text("one")]),
            p(vec![Node::text("two")]),
        ]);
        assert_eq!(
            render_tree(&html, &RenderOptions::default()),
            "<p>one</p>\n\n<p>two</p>"
        );
    }

    #[test]
    fn test_render_with_root() {
        let html = Element::new("html")
            .with_attr("lang", "en")
            .with_children(vec![p(vec![Node::text("x")])]);
        assert_eq!(
            render_tree(&html, &RenderOptions { root: true }),
            r#"<html lang="en"><p>x</p></html>"#
        );
    }

    #[test]
    fn test_void_elements_self_close() {
        let img = Element::new("img")
            .with_attr("alt", "a \"quoted\" alt")
            .with_attr("src", "/i.png");
        assert_eq!(
            render_node(&img.into()),
            r#"<img alt="a &quot;quoted&quot; alt" src="/i.png"/>"#
        );
        assert_eq!(render_node(&Node::element("br", vec![])), "<br/>");
        assert_eq!(render_node(&Node::element("hr", vec![])), "<hr/>");
    }

    #[test]
    fn test_whitespace_is_preserved() {
        let node = p(vec![
            Node::text("a "),
            Node::element("em", vec![Node::text("b")]),
            Node::text(" c"),
        ]);
        assert_eq!(render_node(&node), "<p>a <em>b</em> c</p>");
    }

    #[test]
    fn test_merge_text_nodes() {
        let mut el = Element::new("p").with_children(vec![
            Node::text("a"),
            Node::text("b"),
            Node::element("em", vec![Node::text("c"), Node::text("d")]),
            Node::text("e"),
            Node::text("f"),
            Node::text("g"),
        ]);
        merge_text_nodes(&mut el);
        assert_eq!(
            el.children,
            vec![
                Node::text("ab"),
                Node::element("em", vec![Node::text("cd")]),
                Node::text("efg"),
            ]
        );
    }

    #[test]
    fn test_unsafe_attribute_names_are_skipped() {
        let node = Element::new("p")
            .with_attr("a>b", "c")
            .with_attr("id", "x")
            .with_attr("on click", "y")
            .with_attr("", "z")
            .with_attr("x\"=", "w")
            .with_children(vec![Node::text("t")]);
        assert_eq!(render_node(&node.into()), r#"<p id="x">t</p>"#);
    }
}
