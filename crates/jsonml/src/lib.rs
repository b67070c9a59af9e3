//! jsonml: JsonML tree types and markup serializer for md2html
//!
//! This crate provides:
//! - The tagged-node tree shared by the Markdown and HTML stages
//! - JsonML (`["tag", {attrs}, children...]`) serialization via serde
//! - Text-node merging and escaping markup serialization
//!
//! ## Example
//!
//! ```rust
//! use jsonml::{Element, Node, RenderOptions, render_tree};
//!
//! let html = Element::new("html").with_children(vec![
//!     Node::element("h1", vec![Node::text("Hello")]),
//!     Node::element("p", vec![Node::text("Fish & Chips")]),
//! ]);
//!
//! let out = render_tree(&html, &RenderOptions::default());
//! assert_eq!(out, "<h1>Hello</h1>\n\n<p>Fish &amp; Chips</p>");
//! ```

pub mod tree;
pub mod writer;

pub use tree::{AttrValue, Attributes, Element, Node, Reference, References, text_content};
pub use writer::{RenderOptions, escape_html, merge_text_nodes, render_node, render_tree};
