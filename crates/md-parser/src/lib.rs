//! md-parser: Markdown to JsonML parser
//!
//! This crate provides:
//! - Block splitting with source line numbers
//! - A rule-driven block processor and inline tokenizer
//! - The Gruber (markdown.pl) and Maruku dialects
//! - A builder for custom dialects layered over the built-in ones
//!
//! The output is a [`jsonml::Element`] rooted at `markdown`, with reference
//! definitions collected in its `references` attribute.
//!
//! # Example
//!
//! ```
//! use md_parser::{gruber, parse};
//!
//! let tree = parse("# Hello\n\nSome *text*", gruber());
//! assert_eq!(tree.tag, "markdown");
//! assert_eq!(tree.children.len(), 2);
//! assert!(tree.children[0].is_tag("header"));
//! ```

pub mod block;
pub mod dialect;
mod gruber;
mod inline;
mod lists;
mod maruku;
pub mod parser;

// Re-export main types for convenient access
pub use block::{Block, normalize_newlines, split_blocks};
pub use dialect::{
    BlockDispatch, BlockMatcher, BlockOverride, BlockRule, DIALECT_NAMES, Dialect, DialectBuilder,
    InlineHandler, InlineRule, gruber, lookup, maruku,
};
pub use parser::{Close, Cursor, ParseError, ParseOptions, ParseResult, Parser, Step, parse};
