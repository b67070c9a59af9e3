//! Markdown to HTML pipeline
//!
//! Text is parsed into a Markdown tree, converted to an HTML tree and
//! rendered to markup. Each stage is available on its own.

use jsonml::{Element, RenderOptions, render_tree};
use md_parser::{Dialect, ParseOptions, ParseResult, Parser, gruber, lookup};

use crate::convert::{ConvertOptions, md_tree_to_html_with_options};

/// A dialect given by name or as a value
#[derive(Debug, Clone, Copy)]
pub enum DialectRef<'a> {
    Name(&'a str),
    Dialect(&'a Dialect),
}

impl<'a> DialectRef<'a> {
    /// Resolve a name against the built-in dialects
    pub fn resolve(self) -> ParseResult<&'a Dialect> {
        match self {
            DialectRef::Name(name) => lookup(name),
            DialectRef::Dialect(dialect) => Ok(dialect),
        }
    }
}

impl Default for DialectRef<'_> {
    fn default() -> Self {
        DialectRef::Dialect(gruber())
    }
}

impl<'a> From<&'a str> for DialectRef<'a> {
    fn from(name: &'a str) -> Self {
        DialectRef::Name(name)
    }
}

impl<'a> From<&'a String> for DialectRef<'a> {
    fn from(name: &'a String) -> Self {
        DialectRef::Name(name)
    }
}

impl<'a> From<&'a Dialect> for DialectRef<'a> {
    fn from(dialect: &'a Dialect) -> Self {
        DialectRef::Dialect(dialect)
    }
}

/// Markdown source or an already parsed Markdown tree
#[derive(Debug, Clone)]
pub enum Input<'a> {
    Markdown(&'a str),
    Tree(Element),
}

impl<'a> From<&'a str> for Input<'a> {
    fn from(source: &'a str) -> Self {
        Input::Markdown(source)
    }
}

impl<'a> From<&'a String> for Input<'a> {
    fn from(source: &'a String) -> Self {
        Input::Markdown(source)
    }
}

impl From<Element> for Input<'_> {
    fn from(tree: Element) -> Self {
        Input::Tree(tree)
    }
}

/// Options for the whole pipeline
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub parse: ParseOptions,
    pub convert: ConvertOptions,
}

/// Parse Markdown into a Markdown tree
pub fn parse<'d>(source: &str, dialect: impl Into<DialectRef<'d>>) -> ParseResult<Element> {
    parse_with_options(source, dialect, &ParseOptions::default())
}

/// Parse Markdown into a Markdown tree with explicit limits
pub fn parse_with_options<'d>(
    source: &str,
    dialect: impl Into<DialectRef<'d>>,
    options: &ParseOptions,
) -> ParseResult<Element> {
    let dialect = dialect.into().resolve()?;
    tracing::debug!(dialect = dialect.name(), bytes = source.len(), "parsing markdown");
    Ok(Parser::new(dialect, *options).parse(source))
}

/// Convert Markdown, or a Markdown tree, to an HTML tree
///
/// The dialect is resolved even for tree input, so an unknown name is
/// always an error.
pub fn to_html_tree<'a, 'd>(
    input: impl Into<Input<'a>>,
    dialect: impl Into<DialectRef<'d>>,
    options: &Options,
) -> ParseResult<Element> {
    let dialect = dialect.into().resolve()?;
    let tree = match input.into() {
        Input::Markdown(source) => parse_with_options(source, dialect, &options.parse)?,
        Input::Tree(tree) => tree,
    };
    Ok(md_tree_to_html_with_options(tree, &options.convert))
}

/// Convert Markdown, or a Markdown tree, to an HTML fragment
///
/// Top-level elements are separated by a blank line.
pub fn to_html<'a, 'd>(
    input: impl Into<Input<'a>>,
    dialect: impl Into<DialectRef<'d>>,
    options: &Options,
) -> ParseResult<String> {
    let html = to_html_tree(input, dialect, options)?;
    Ok(render_tree(&html, &RenderOptions::default()))
}
