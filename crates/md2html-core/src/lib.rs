//! md2html-core: Core library for converting Markdown to HTML
//!
//! This crate provides:
//! - Markdown parsing into a JsonML Markdown tree (via `md-parser`)
//! - Markdown tree to HTML tree conversion, including reference resolution
//! - HTML tree rendering to markup (via `jsonml`)
//! - Slide deck splitting and rendering
//!
//! # Example
//!
//! ```
//! use md2html_core::{Options, to_html};
//!
//! let html = to_html("Hello *world*", "default", &Options::default()).unwrap();
//! assert_eq!(html, "<p>Hello <em>world</em></p>");
//! ```

pub mod convert;
pub mod pipeline;
pub mod slides;

pub use convert::{ConvertOptions, Preprocess, md_tree_to_html, md_tree_to_html_with_options};
pub use jsonml::{Element, Node, RenderOptions, render_tree};
pub use md_parser::{DIALECT_NAMES, Dialect, ParseError, ParseOptions, ParseResult};
pub use pipeline::{DialectRef, Input, Options, parse, parse_with_options, to_html, to_html_tree};
pub use slides::{slides_to_html, split_slides};
