//! Parser session
//!
//! A [`Parser`] owns everything one parse of one document needs: the tree
//! under construction, the collected reference definitions and the open
//! emphasis markers. Dialect rules receive the session by `&mut` and drive
//! block dispatch and inline tokenization through it.

use std::collections::{HashSet, VecDeque};

use jsonml::{Element, Node, References};
use thiserror::Error;

use crate::block::{Block, split_blocks};
use crate::dialect::{BlockDispatch, Dialect};

/// Parser errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unknown Markdown dialect '{name}'")]
    UnknownDialect { name: String },

    #[error("Invalid inline trigger pattern: {0}")]
    InvalidTrigger(#[from] regex::Error),
}

/// Parse result type
pub type ParseResult<T> = Result<T, ParseError>;

/// Recursion limits for adversarial input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum nesting of recursively parsed containers
    /// (blockquotes, list item bodies, text before a rule)
    pub max_block_depth: usize,
    /// Maximum nesting of emphasis and link text
    pub max_inline_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_block_depth: 32,
            max_inline_depth: 128,
        }
    }
}

/// Result of a single inline handler invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `len` bytes were consumed, producing `nodes`
    Nodes { len: usize, nodes: Vec<Node> },
    /// An open emphasis marker was closed
    Close(Close),
}

impl Step {
    /// Consume `text` verbatim
    pub fn text(text: &str) -> Self {
        Step::Nodes {
            len: text.len(),
            nodes: vec![Node::text(text)],
        }
    }

    pub fn node(len: usize, node: impl Into<Node>) -> Self {
        Step::Nodes {
            len,
            nodes: vec![node.into()],
        }
    }
}

/// Closing emphasis marker signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Close {
    pub marker: &'static str,
    /// Bytes of input left after the closing marker
    pub remaining: usize,
}

/// Position of an inline handler within the text being tokenized
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    pub fn new(src: &'s str, pos: usize) -> Self {
        Self { src, pos }
    }

    /// The whole text being tokenized
    pub fn src(&self) -> &'s str {
        self.src
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Text from the trigger to the end of input
    pub fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    /// Character immediately before the trigger
    pub fn before(&self) -> Option<char> {
        self.src[..self.pos].chars().next_back()
    }
}

/// Open emphasis markers, most recent last
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub(crate) struct EmphasisState {
    pub em: Vec<&'static str>,
    pub strong: Vec<&'static str>,
}

/// A speculative emphasis open that failed to close
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct FailedOpen {
    pub remaining: usize,
    pub marker: &'static str,
    pub depth: usize,
    pub state: EmphasisState,
}

/// Parse session for one document
pub struct Parser<'d> {
    dialect: &'d Dialect,
    options: ParseOptions,
    tree: Element,
    references: References,
    pub(crate) emphasis: EmphasisState,
    pub(crate) failed_opens: HashSet<FailedOpen>,
    pub(crate) inline_depth: usize,
    block_depth: usize,
    limit_reported: bool,
}

impl<'d> Parser<'d> {
    pub fn new(dialect: &'d Dialect, options: ParseOptions) -> Self {
        Self {
            dialect,
            options,
            tree: Element::new("markdown"),
            references: References::new(),
            emphasis: EmphasisState::default(),
            failed_opens: HashSet::new(),
            inline_depth: 0,
            block_depth: 0,
            limit_reported: false,
        }
    }

    /// Parse a whole document into a tree rooted at `markdown`
    ///
    /// Reference definitions, if any, are stored in the root's `references`
    /// attribute.
    pub fn parse(mut self, source: &str) -> Element {
        let blocks = split_blocks(source);
        let mut root = self.to_tree(blocks, Element::new("markdown"));
        if !self.references.is_empty() {
            root.attrs
                .insert("references", std::mem::take(&mut self.references));
        }
        root
    }

    pub fn dialect(&self) -> &'d Dialect {
        self.dialect
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The tree currently being built
    pub fn tree(&self) -> &Element {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Element {
        &mut self.tree
    }

    /// Reference definitions collected so far
    pub fn references_mut(&mut self) -> &mut References {
        &mut self.references
    }

    /// Process `blocks` in order, appending the output to `root`
    ///
    /// `root` is the current tree while the blocks are processed.
    pub fn to_tree(&mut self, blocks: Vec<Block>, root: Element) -> Element {
        let mut queue: VecDeque<Block> = blocks.into();
        let outer = std::mem::replace(&mut self.tree, root);
        while let Some(block) = queue.pop_front() {
            let nodes = self.process_block(&block, &mut queue);
            self.tree.children.extend(nodes);
        }
        std::mem::replace(&mut self.tree, outer)
    }

    /// Like [`Parser::to_tree`] for nested containers, bounded by
    /// `max_block_depth`
    ///
    /// Past the limit every block becomes a plain paragraph.
    pub fn nested_tree(&mut self, blocks: Vec<Block>, mut root: Element) -> Element {
        if self.block_depth >= self.options.max_block_depth {
            self.report_limit("block nesting");
            for block in blocks {
                let children = self.process_inline(&block);
                root.children.push(Node::element("para", children));
            }
            return root;
        }
        self.block_depth += 1;
        let tree = self.to_tree(blocks, root);
        self.block_depth -= 1;
        tree
    }

    /// Nodes produced by parsing `blocks` as a detached fragment
    pub fn nested_nodes(&mut self, blocks: Vec<Block>) -> Vec<Node> {
        self.nested_tree(blocks, Element::new("fragment")).children
    }

    /// Run the dialect's block rules over `block`
    ///
    /// The first rule that returns `Some` claims the block. Rules may push
    /// leftover text to the front of `next` or consume blocks from it.
    pub fn process_block(&mut self, block: &Block, next: &mut VecDeque<Block>) -> Vec<Node> {
        let dialect = self.dialect;
        match dialect.block_dispatch() {
            BlockDispatch::Override(process) => process(self, block, next),
            BlockDispatch::Rules(rules) => {
                for rule in rules {
                    if let Some(nodes) = (rule.matcher)(self, block, next) {
                        return nodes;
                    }
                }
                tracing::debug!(
                    line = block.line_number,
                    dialect = dialect.name(),
                    "no block rule claimed block, dropping it"
                );
                Vec::new()
            }
        }
    }

    /// Tokenize `text` into inline nodes
    pub fn process_inline(&mut self, text: &str) -> Vec<Node> {
        self.failed_opens.clear();
        let (nodes, _) = self.inline_run(text, 0);
        nodes
    }

    /// Tokenize `src` from `start` until the input ends or an emphasis
    /// close is signalled
    pub(crate) fn inline_run(&mut self, src: &str, start: usize) -> (Vec<Node>, Option<Close>) {
        let mut out = Vec::new();
        let mut pos = start;
        while pos < src.len() {
            match self.one_element(src, pos, &mut out) {
                Step::Nodes { len, nodes } => {
                    pos += len;
                    for node in nodes {
                        push_inline(&mut out, node);
                    }
                }
                Step::Close(close) => return (out, Some(close)),
            }
        }
        (out, None)
    }

    /// Consume one chunk of `src` at `pos`: either the plain text up to the
    /// next trigger or whatever the trigger's handler produces
    pub(crate) fn one_element(&mut self, src: &str, pos: usize, out: &mut Vec<Node>) -> Step {
        let dialect = self.dialect;
        let rest = &src[pos..];
        let Some(m) = dialect.inline_pattern().and_then(|re| re.find(rest)) else {
            return Step::text(rest);
        };
        if m.start() > 0 {
            return Step::text(&rest[..m.start()]);
        }

        let trigger = m.as_str();
        let step = dialect
            .inline_handler(trigger)
            .and_then(|handler| handler(self, Cursor::new(src, pos), out));
        match step {
            Some(Step::Nodes { len: 0, .. }) | None => Step::text(trigger),
            Some(step) => step,
        }
    }

    /// Tokenize from `start` until the character `want`
    ///
    /// Returns the bytes consumed including `want`, and the nodes before it.
    /// `None` when the input ends first or an emphasis close intervenes.
    pub fn inline_until_char(
        &mut self,
        src: &str,
        start: usize,
        want: char,
    ) -> Option<(usize, Vec<Node>)> {
        let mut nodes = Vec::new();
        let mut pos = start;
        loop {
            if src[pos..].starts_with(want) {
                return Some((pos + want.len_utf8() - start, nodes));
            }
            if pos >= src.len() {
                return None;
            }
            match self.one_element(src, pos, &mut nodes) {
                Step::Nodes { len, nodes: found } => {
                    pos += len;
                    for node in found {
                        push_inline(&mut nodes, node);
                    }
                }
                Step::Close(_) => return None,
            }
        }
    }

    /// Resolve backslash escapes only
    pub fn unescape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(&next) = chars.peek().filter(|&&n| self.dialect.is_escapable(n)) {
                    out.push(next);
                    chars.next();
                    continue;
                }
            }
            out.push(c);
        }
        out
    }

    /// Whether another level of emphasis or link text may be opened
    pub(crate) fn enter_inline(&mut self) -> bool {
        if self.inline_depth >= self.options.max_inline_depth {
            self.report_limit("inline nesting");
            return false;
        }
        self.inline_depth += 1;
        true
    }

    pub(crate) fn leave_inline(&mut self) {
        self.inline_depth -= 1;
    }

    fn report_limit(&mut self, what: &str) {
        if !self.limit_reported {
            tracing::warn!(
                max_block_depth = self.options.max_block_depth,
                max_inline_depth = self.options.max_inline_depth,
                "{what} limit reached, nested content degrades to plain text"
            );
            self.limit_reported = true;
        }
    }
}

/// Parse `source` with `dialect` and default limits
pub fn parse(source: &str, dialect: &Dialect) -> Element {
    Parser::new(dialect, ParseOptions::default()).parse(source)
}

/// Append an inline node, merging adjacent text
pub(crate) fn push_inline(out: &mut Vec<Node>, node: Node) {
    match node {
        Node::Text(s) if s.is_empty() => {}
        Node::Text(s) => match out.last_mut() {
            Some(Node::Text(prev)) => prev.push_str(&s),
            _ => out.push(Node::Text(s)),
        },
        node => out.push(node),
    }
}

#[cfg(test)]
mod tests;
