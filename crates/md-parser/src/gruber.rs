//! Gruber dialect
//!
//! The base grammar, following the behaviour of John Gruber's markdown.pl
//! (which in places differs from its syntax page).

use std::collections::VecDeque;
use std::sync::LazyLock;

use jsonml::{Element, Node, Reference};
use regex::Regex;

use crate::block::{Block, count_lines, split_blocks};
use crate::dialect::Dialect;
use crate::inline;
use crate::lists;
use crate::parser::{ParseResult, Parser};

/// Characters a backslash escapes
pub(crate) const ESCAPABLE: &str = "\\`*_{}[]()#+.!-";

static ATX_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s*(.*?)\s*#*\s*(?:\n|$)").unwrap());

static CODE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?: {0,3}\t| {4})(.*)\n?").unwrap());

static QUOTE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>").unwrap());

static QUOTE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^> ?").unwrap());

static REFERENCE_DEFN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\[(.*?)\]:\s*(\S+)(?:\s+(?:"(.*?)"|'(.*?)'|\((.*?)\)))?\n?"#).unwrap()
});

pub(crate) fn dialect() -> ParseResult<Dialect> {
    Dialect::builder("Gruber")
        .block_rule("atx_header", atx_header)
        .block_rule("setext_header", setext_header)
        .block_rule("code", code)
        .block_rule("horiz_rule", horiz_rule)
        .block_rule("lists", lists::lists)
        .block_rule("blockquote", blockquote)
        .block_rule("reference_defn", reference_defn)
        .block_rule("para", para)
        // Interesting elsewhere; keeps them out of plain text runs
        .inline_rule("]", inline::literal)
        .inline_rule("}", inline::literal)
        .inline_rule("\\", inline::escaped)
        .inline_rule("![", inline::image)
        .inline_rule("[", inline::link)
        .inline_rule("<", inline::autolink)
        .inline_rule("`", inline::inline_code)
        .inline_rule("  \n", inline::line_break)
        .inline_rule("**", inline::strong_star)
        .inline_rule("__", inline::strong_underscore)
        .inline_rule("*", inline::em_star)
        .inline_rule("_", inline::em_underscore)
        .escapable(ESCAPABLE)
        .build()
}

fn header(level: usize, children: Vec<Node>) -> Node {
    Element::new("header")
        .with_attr("level", level.to_string())
        .with_children(children)
        .into()
}

fn atx_header(p: &mut Parser<'_>, block: &Block, next: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    let m = ATX_HEADER.captures(block)?;
    let consumed = m[0].len();
    let node = header(m[1].len(), p.process_inline(&m[2]));

    if consumed < block.len() {
        next.push_front(Block::new(
            &block[consumed..],
            block.trailing.as_str(),
            block.line_number + 2,
        ));
    }
    Some(vec![node])
}

fn setext_header(
    p: &mut Parser<'_>,
    block: &Block,
    next: &mut VecDeque<Block>,
) -> Option<Vec<Node>> {
    let nl = block.find('\n')?;
    let underline = &block[nl + 1..];
    let marker = underline.chars().next().filter(|c| matches!(c, '=' | '-'))?;
    let run = underline.len() - underline.trim_start_matches(marker).len();
    if run < 3 {
        return None;
    }
    let after = &underline[run..];
    let consumed = match after.strip_prefix('\n') {
        Some(_) => nl + 1 + run + 1,
        None if after.is_empty() => nl + 1 + run,
        None => return None,
    };

    let level = if marker == '=' { 1 } else { 2 };
    let node = header(level, p.process_inline(&block[..nl]));

    if consumed < block.len() {
        next.push_front(Block::new(
            &block[consumed..],
            block.trailing.as_str(),
            block.line_number + 2,
        ));
    }
    Some(vec![node])
}

/// Indented code, merged with directly following indented blocks
fn code(_: &mut Parser<'_>, block: &Block, next: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    if !CODE_LINE.is_match(block) {
        return None;
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = block.clone();
    loop {
        let mut rest = current.as_str();
        while !rest.is_empty() {
            let Some(m) = CODE_LINE.captures(rest) else {
                break;
            };
            lines.push(m[1].to_string());
            rest = &rest[m[0].len()..];
        }

        if !rest.is_empty() {
            // `    foo\nbar` is code followed by a paragraph
            let line = current.line_number + count_lines(&current[..current.len() - rest.len()]);
            next.push_front(Block::new(rest, current.trailing.as_str(), line));
            break;
        }
        match next.front() {
            Some(following) if CODE_LINE.is_match(following) => {
                // Blank lines between the blocks, less the two the join adds
                let blanks = count_lines(&current.trailing).saturating_sub(2);
                lines.push("\n".repeat(blanks));
                if let Some(following) = next.pop_front() {
                    current = following;
                }
            }
            _ => break,
        }
    }

    Some(vec![Node::element(
        "code_block",
        vec![Node::text(lines.join("\n"))],
    )])
}

/// The line a horizontal rule occupies, as `(prefix, suffix)` around it
///
/// Rule lines preceded by text win over a rule on the first line.
fn find_rule(text: &str) -> Option<(Option<&str>, Option<&str>)> {
    for (nl, _) in text.match_indices('\n') {
        if let Some(suffix) = rule_at(text, nl + 1) {
            return Some((Some(&text[..nl]), suffix));
        }
    }
    rule_at(text, 0).map(|suffix| (None, suffix))
}

/// If the line starting at `from` is a rule, the text after it
fn rule_at(text: &str, from: usize) -> Option<Option<&str>> {
    let line_end = text[from..].find('\n').map_or(text.len(), |i| from + i);
    if !is_rule_line(&text[from..line_end]) {
        return None;
    }
    Some((line_end < text.len()).then(|| &text[line_end + 1..]))
}

/// Three or more of the same `-`, `_` or `*`, optionally space separated
pub(crate) fn is_rule_line(line: &str) -> bool {
    let mut marks = line.chars().filter(|c| !matches!(c, ' ' | '\t'));
    let Some(mark) = marks.next() else {
        return false;
    };
    if !matches!(mark, '-' | '_' | '*') {
        return false;
    }
    let mut count = 1;
    for c in marks {
        if c != mark {
            return false;
        }
        count += 1;
    }
    count >= 3
}

pub(crate) fn horiz_rule(
    p: &mut Parser<'_>,
    block: &Block,
    next: &mut VecDeque<Block>,
) -> Option<Vec<Node>> {
    let (prefix, suffix) = find_rule(block)?;

    let mut nodes = Vec::new();
    // Text abutting the rule above is a block of its own
    if let Some(prefix) = prefix.filter(|s| !s.is_empty()) {
        let contained = Block::new(prefix, "", block.line_number);
        nodes.extend(p.nested_nodes(vec![contained]));
    }
    nodes.push(Node::element("hr", vec![]));

    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        next.push_front(Block::new(
            suffix,
            block.trailing.as_str(),
            block.line_number + 1,
        ));
    }
    Some(nodes)
}

fn blockquote(p: &mut Parser<'_>, block: &Block, next: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    if !QUOTE_LINE.is_match(block) {
        return None;
    }

    let mut nodes = Vec::new();
    let mut quote = block.clone();

    // Lines before the first `>` are processed as a sibling block
    if !block.starts_with('>') {
        let lines: Vec<&str> = block.split('\n').collect();
        let first_quote = lines
            .iter()
            .position(|l| l.starts_with('>'))
            .unwrap_or(lines.len());
        let abutting = Block::new(lines[..first_quote].join("\n"), "\n", block.line_number);
        nodes.extend(p.process_block(&abutting, &mut VecDeque::new()));
        quote = Block::new(
            lines[first_quote..].join("\n"),
            block.trailing.as_str(),
            block.line_number + first_quote,
        );
    }

    while next.front().is_some_and(|b| b.starts_with('>')) {
        let Some(b) = next.pop_front() else { break };
        let text = format!("{}{}{}", quote.text, quote.trailing, b.text);
        quote = Block::new(text, b.trailing, quote.line_number);
    }

    let input = QUOTE_PREFIX.replace_all(&quote, "");
    let mut tree = p.nested_tree(split_blocks(&input), Element::new("blockquote"));
    // References are document-wide and never stay on the quote
    tree.attrs.remove("references");
    nodes.push(tree.into());
    Some(nodes)
}

fn reference_defn(
    p: &mut Parser<'_>,
    block: &Block,
    next: &mut VecDeque<Block>,
) -> Option<Vec<Node>> {
    if !REFERENCE_DEFN.is_match(block) {
        return None;
    }

    let mut rest = block.as_str();
    while !rest.is_empty() {
        let Some(m) = REFERENCE_DEFN.captures(rest) else {
            break;
        };
        let mut href = &m[2];
        if href.len() >= 2 && href.starts_with('<') && href.ends_with('>') {
            href = &href[1..href.len() - 1];
        }
        let title = m
            .get(3)
            .or_else(|| m.get(4))
            .or_else(|| m.get(5))
            .map(|t| t.as_str().to_string());
        p.references_mut().insert(
            m[1].to_lowercase(),
            Reference {
                href: href.to_string(),
                title,
            },
        );
        rest = &rest[m[0].len()..];
    }

    if !rest.is_empty() {
        next.push_front(Block::new(
            rest,
            block.trailing.as_str(),
            block.line_number + count_lines(&block[..block.len() - rest.len()]),
        ));
    }
    Some(Vec::new())
}

/// Everything else is a paragraph
fn para(p: &mut Parser<'_>, block: &Block, _: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    Some(vec![Node::element("para", p.process_inline(block))])
}
