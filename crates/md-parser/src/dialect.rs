//! Dialects: named, composable rule tables
//!
//! A dialect is an ordered list of block rules plus a table of inline
//! handlers keyed by trigger substring. Dialects are immutable once built;
//! [`Dialect::extend`] copies a base dialect's tables and layers new rules on
//! top without touching the base.

use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

use jsonml::Node;
use regex::Regex;

use crate::block::Block;
use crate::parser::{Cursor, ParseError, ParseResult, Parser, Step};
use crate::gruber as gruber_rules;
use crate::maruku as maruku_rules;

/// A block rule: `Some(nodes)` claims the block, `None` passes it on
pub type BlockMatcher = fn(&mut Parser<'_>, &Block, &mut VecDeque<Block>) -> Option<Vec<Node>>;

/// Replaces rule-by-rule dispatch for a whole dialect
pub type BlockOverride = fn(&mut Parser<'_>, &Block, &mut VecDeque<Block>) -> Vec<Node>;

/// An inline handler, invoked with the cursor at its trigger and the output
/// produced so far in the current run
///
/// `None` means the trigger is emitted as literal text.
pub type InlineHandler = fn(&mut Parser<'_>, Cursor<'_>, &mut Vec<Node>) -> Option<Step>;

/// A named block rule
#[derive(Clone)]
pub struct BlockRule {
    pub name: String,
    pub matcher: BlockMatcher,
}

/// How blocks are dispatched
#[derive(Clone)]
pub enum BlockDispatch {
    /// Try each rule in order
    Rules(Vec<BlockRule>),
    /// A single function handles every block
    Override(BlockOverride),
}

/// An inline handler keyed by its trigger substring
#[derive(Clone)]
pub struct InlineRule {
    pub trigger: String,
    pub handler: InlineHandler,
}

/// A built, immutable dialect
#[derive(Clone)]
pub struct Dialect {
    name: String,
    block: BlockDispatch,
    inline: Vec<InlineRule>,
    escapable: Vec<char>,
    pattern: Option<Regex>,
}

static GRUBER: LazyLock<Dialect> =
    LazyLock::new(|| gruber_rules::dialect().expect("Gruber triggers form a valid pattern"));

static MARUKU: LazyLock<Dialect> =
    LazyLock::new(|| maruku_rules::dialect(&GRUBER).expect("Maruku triggers form a valid pattern"));

/// Names of the built-in dialects
pub const DIALECT_NAMES: &[&str] = &["Gruber", "Maruku"];

/// The base grammar following markdown.pl
pub fn gruber() -> &'static Dialect {
    &GRUBER
}

/// The extended grammar: metadata, attribute lists, tables and definition
/// lists on top of Gruber
pub fn maruku() -> &'static Dialect {
    &MARUKU
}

/// Look up a built-in dialect by name
///
/// `"default"` is an alias for Gruber. Exact names are tried first, then a
/// case-insensitive match.
pub fn lookup(name: &str) -> ParseResult<&'static Dialect> {
    let exact = match name {
        "Gruber" | "default" => Some(gruber()),
        "Maruku" => Some(maruku()),
        _ => None,
    };
    if let Some(dialect) = exact {
        return Ok(dialect);
    }

    if name.eq_ignore_ascii_case("gruber") || name.eq_ignore_ascii_case("default") {
        Ok(gruber())
    } else if name.eq_ignore_ascii_case("maruku") {
        Ok(maruku())
    } else {
        Err(ParseError::UnknownDialect {
            name: name.to_string(),
        })
    }
}

impl Dialect {
    /// Start a dialect from scratch
    pub fn builder(name: impl Into<String>) -> DialectBuilder {
        DialectBuilder {
            name: name.into(),
            base: None,
            block: Vec::new(),
            block_override: None,
            inline: Vec::new(),
            escapable: None,
        }
    }

    /// Start a dialect layered over `base`
    ///
    /// Rules added to the builder take precedence over, and are tried
    /// before, the inherited ones. A rule with an inherited name shadows it.
    pub fn extend(base: &Dialect) -> DialectBuilder {
        let mut builder = Dialect::builder(format!("{}+", base.name));
        builder.base = Some(base.clone());
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_dispatch(&self) -> &BlockDispatch {
        &self.block
    }

    /// Block rule names in dispatch order
    pub fn block_order(&self) -> Vec<&str> {
        match &self.block {
            BlockDispatch::Rules(rules) => rules.iter().map(|r| r.name.as_str()).collect(),
            BlockDispatch::Override(_) => Vec::new(),
        }
    }

    /// Find a block rule by name
    pub fn block_rule(&self, name: &str) -> Option<BlockMatcher> {
        match &self.block {
            BlockDispatch::Rules(rules) => rules.iter().find(|r| r.name == name).map(|r| r.matcher),
            BlockDispatch::Override(_) => None,
        }
    }

    pub fn inline_rules(&self) -> &[InlineRule] {
        &self.inline
    }

    pub(crate) fn inline_handler(&self, trigger: &str) -> Option<InlineHandler> {
        self.inline
            .iter()
            .find(|r| r.trigger == trigger)
            .map(|r| r.handler)
    }

    /// Alternation of every trigger, in rule order
    pub fn inline_pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Whether `\c` is an escape in this dialect
    pub fn is_escapable(&self, c: char) -> bool {
        self.escapable.contains(&c)
    }
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let triggers: Vec<&str> = self.inline.iter().map(|r| r.trigger.as_str()).collect();
        f.debug_struct("Dialect")
            .field("name", &self.name)
            .field("block", &self.block_order())
            .field("inline", &triggers)
            .finish()
    }
}

/// Builder for [`Dialect`]
pub struct DialectBuilder {
    name: String,
    base: Option<Dialect>,
    block: Vec<BlockRule>,
    block_override: Option<BlockOverride>,
    inline: Vec<InlineRule>,
    escapable: Option<Vec<char>>,
}

impl DialectBuilder {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a block rule, replacing an earlier one of the same name
    pub fn block_rule(mut self, name: impl Into<String>, matcher: BlockMatcher) -> Self {
        let name = name.into();
        match self.block.iter_mut().find(|r| r.name == name) {
            Some(rule) => rule.matcher = matcher,
            None => self.block.push(BlockRule { name, matcher }),
        }
        self
    }

    /// Handle every block with one function instead of the rule list
    pub fn block_override(mut self, process: BlockOverride) -> Self {
        self.block_override = Some(process);
        self
    }

    /// Add an inline handler, replacing an earlier one with the same trigger
    pub fn inline_rule(mut self, trigger: impl Into<String>, handler: InlineHandler) -> Self {
        let trigger = trigger.into();
        if trigger.is_empty() {
            return self;
        }
        match self.inline.iter_mut().find(|r| r.trigger == trigger) {
            Some(rule) => rule.handler = handler,
            None => self.inline.push(InlineRule { trigger, handler }),
        }
        self
    }

    /// Characters that a backslash escapes
    pub fn escapable(mut self, chars: &str) -> Self {
        self.escapable = Some(chars.chars().collect());
        self
    }

    pub fn build(self) -> ParseResult<Dialect> {
        let DialectBuilder {
            name,
            base,
            block: own_block,
            block_override,
            inline: own_inline,
            escapable,
        } = self;

        let (base_block, base_inline, base_escapable) = match base {
            Some(base) => (Some(base.block), base.inline, base.escapable),
            None => (None, Vec::new(), Vec::new()),
        };

        let block = match (block_override, base_block) {
            (Some(process), _) | (None, Some(BlockDispatch::Override(process))) => {
                BlockDispatch::Override(process)
            }
            (None, Some(BlockDispatch::Rules(inherited))) => {
                let mut rules = own_block;
                let shadowed: Vec<String> = rules.iter().map(|r| r.name.clone()).collect();
                rules.extend(inherited.into_iter().filter(|r| !shadowed.contains(&r.name)));
                BlockDispatch::Rules(rules)
            }
            (None, None) => BlockDispatch::Rules(own_block),
        };

        let mut inline = own_inline;
        let shadowed: Vec<String> = inline.iter().map(|r| r.trigger.clone()).collect();
        inline.extend(
            base_inline
                .into_iter()
                .filter(|r| !shadowed.contains(&r.trigger)),
        );

        let pattern = if inline.is_empty() {
            None
        } else {
            Some(Regex::new(&trigger_pattern(&inline))?)
        };

        Ok(Dialect {
            name,
            block,
            inline,
            escapable: escapable.unwrap_or(base_escapable),
            pattern,
        })
    }
}

/// Single-character triggers stay bare, longer ones are grouped
fn trigger_pattern(rules: &[InlineRule]) -> String {
    rules
        .iter()
        .map(|rule| {
            let escaped = regex::escape(&rule.trigger);
            if rule.trigger.chars().count() == 1 {
                escaped
            } else {
                format!("(?:{escaped})")
            }
        })
        .collect::<Vec<_>>()
        .join("|")
}
