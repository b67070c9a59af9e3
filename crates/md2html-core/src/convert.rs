//! Markdown tree to HTML tree conversion
//!
//! Renames the parser's node tags to HTML tags and resolves `link_ref` and
//! `img_ref` nodes against the reference definitions stored on the root.

use std::fmt;
use std::sync::Arc;

use jsonml::{Element, Node, Reference, References, merge_text_nodes};

/// Hook run on every node before it is converted
///
/// Receives the node and the document's references and returns the node to
/// convert in its place.
pub type Preprocess = Arc<dyn Fn(Node, &References) -> Node + Send + Sync>;

/// Options for Markdown tree to HTML tree conversion
#[derive(Clone, Default)]
pub struct ConvertOptions {
    pub preprocess: Option<Preprocess>,
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("preprocess", &self.preprocess.is_some())
            .finish()
    }
}

/// Convert a Markdown tree to an HTML tree
pub fn md_tree_to_html(tree: Element) -> Element {
    md_tree_to_html_with_options(tree, &ConvertOptions::default())
}

/// Convert a Markdown tree to an HTML tree with options
///
/// Adjacent text nodes in the result are merged.
pub fn md_tree_to_html_with_options(tree: Element, options: &ConvertOptions) -> Element {
    let references = tree.attrs.references().cloned().unwrap_or_default();
    let converter = Converter {
        references: &references,
        options,
    };

    let mut html = match converter.convert_node(tree.into()) {
        Node::Element(e) => e,
        // Only a hook can turn the root into text
        text => Element::new("html").with_children(vec![text]),
    };
    merge_text_nodes(&mut html);
    html
}

/// Converter state
struct Converter<'a> {
    references: &'a References,
    options: &'a ConvertOptions,
}

impl Converter<'_> {
    fn convert_node(&self, node: Node) -> Node {
        let node = match &self.options.preprocess {
            Some(preprocess) => preprocess(node, self.references),
            None => node,
        };
        match node {
            Node::Element(e) => self.convert_element(e),
            text => text,
        }
    }

    fn convert_element(&self, mut e: Element) -> Node {
        match e.tag.as_str() {
            "header" => {
                let level = e.attrs.take_str("level").unwrap_or_else(|| "1".to_string());
                e.tag = format!("h{level}");
            }
            "bulletlist" => e.tag = "ul".into(),
            "numberlist" => e.tag = "ol".into(),
            "listitem" => e.tag = "li".into(),
            "para" => e.tag = "p".into(),
            "markdown" => {
                e.tag = "html".into();
                e.attrs.remove("references");
            }
            "code_block" => {
                e.tag = "pre".into();
                let code = std::mem::take(&mut e.children);
                e.children = vec![Node::element("code", code)];
            }
            "inlinecode" => e.tag = "code".into(),
            "img" => {
                if let Some(href) = e.attrs.remove("href") {
                    e.attrs.insert("src", href);
                }
            }
            "linebreak" => e.tag = "br".into(),
            "link" => e.tag = "a".into(),
            "link_ref" => match self.lookup(&e) {
                Some(reference) => {
                    e.tag = "a".into();
                    resolve(&mut e, "href", reference);
                }
                None => return unresolved(e),
            },
            "img_ref" => match self.lookup(&e) {
                Some(reference) => {
                    e.tag = "img".into();
                    resolve(&mut e, "src", reference);
                }
                None => return unresolved(e),
            },
            _ => {}
        }

        e.children = std::mem::take(&mut e.children)
            .into_iter()
            .map(|child| self.convert_node(child))
            .collect();
        e.into()
    }

    fn lookup(&self, e: &Element) -> Option<&Reference> {
        self.references.get(e.attrs.get_str("ref")?)
    }
}

/// Swap the bookkeeping attributes of a reference node for the definition
fn resolve(e: &mut Element, url_attr: &str, reference: &Reference) {
    e.attrs.remove("ref");
    e.attrs.insert(url_attr, reference.href.as_str());
    if let Some(title) = reference.title.as_deref().filter(|t| !t.is_empty()) {
        e.attrs.insert("title", title);
    }
    e.attrs.remove("original");
}

/// A reference with no definition falls back to its source text
fn unresolved(mut e: Element) -> Node {
    let original = e.attrs.take_str("original").unwrap_or_default();
    tracing::trace!(
        reference = e.attrs.get_str("ref").unwrap_or_default(),
        "unresolved reference, keeping source text"
    );
    Node::Text(original)
}

#[cfg(test)]
mod tests;
