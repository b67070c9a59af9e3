//! Maruku dialect
//!
//! Gruber plus document metadata, `{: ...}` attribute lists on blocks and
//! inline elements, definition lists and pipe tables.

use std::collections::VecDeque;
use std::sync::LazyLock;

use jsonml::{Attributes, Element, Node};
use regex::Regex;

use crate::block::Block;
use crate::dialect::Dialect;
use crate::gruber::ESCAPABLE;
use crate::parser::{Cursor, ParseResult, Parser, Step};

static DOCUMENT_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_]+:.*\n)*[A-Za-z0-9_]+:.*$").unwrap()
});

static META_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9_]+):\s*(.*)$").unwrap());

static BLOCK_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|\n) {0,3}\{:\s*((?:\\\}|[^}])*)\s*\}$").unwrap()
});

static INLINE_META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{:\s*((?:\\\}|[^}])*)\s*\}").unwrap());

static LAST_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n.*$").unwrap());

static DEFINITION_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^((?:[^\s:].*\n)+):\s+([\s\S]+)$").unwrap());

static DEFINITION_SEP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n:\s+").unwrap());

static DEFINITION_INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\n)\s+").unwrap());

static TABLE_LEADING_PIPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}\|(.+)\n {0,3}\|\s*([\-:]+[\-| :]*)\n((?:\s*\|.*(?:\n|$))*)").unwrap()
});

static TABLE_NO_LEADING_PIPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^ {0,3}(\S(?:\\.|[^\\|])*\|.*)\n {0,3}([\-:]+\s*\|[\-| :]*)\n((?:(?:\\.|[^\\|])*\|.*(?:\n|$))*)",
    )
    .unwrap()
});

static ROW_LEADING_PIPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\|").unwrap());

static TRAILING_PIPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|\s*$").unwrap());

static ROW_TRAILING_PIPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)\|\s*$").unwrap());

static ALIGN_RIGHT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*-+:\s*$").unwrap());

static ALIGN_LEFT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*:-+\s*$").unwrap());

static ALIGN_CENTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*:-+:\s*$").unwrap());

pub(crate) fn dialect(base: &Dialect) -> ParseResult<Dialect> {
    Dialect::extend(base)
        .named("Maruku")
        .block_rule("document_meta", document_meta)
        .block_rule("block_meta", block_meta)
        .block_rule("definition_list", definition_list)
        .block_rule("table", table)
        .inline_rule("{:", inline_meta)
        .escapable(&format!("{ESCAPABLE}|:"))
        .build()
}

/// Parse the inside of a `{: ...}` attribute list
///
/// `#foo` sets the id, `.foo` adds a class and `key=value` sets an
/// attribute. Quotes group words containing spaces; a backslash takes the
/// next character literally.
pub(crate) fn process_meta_hash(meta: &str) -> Attributes {
    let mut attrs = Attributes::new();
    for part in split_meta_hash(meta) {
        if let Some(id) = part.strip_prefix('#') {
            attrs.insert("id", id);
        } else if let Some(class) = part.strip_prefix('.') {
            let class = match attrs.get_str("class") {
                Some(existing) => format!("{existing} {class}"),
                None => class.to_string(),
            };
            attrs.insert("class", class);
        } else if part.contains('=') {
            let mut kv = part.split('=');
            let key = kv.next().unwrap_or_default();
            let value = kv.next().unwrap_or_default();
            attrs.insert(key, value);
        }
    }
    attrs
}

fn split_meta_hash(meta: &str) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut in_quotes = false;
    let mut chars = meta.chars();

    while let Some(c) = chars.next() {
        match c {
            ' ' if !in_quotes => parts.push(String::new()),
            '\'' | '"' => in_quotes = !in_quotes,
            '\\' => {
                if let (Some(part), Some(escaped)) = (parts.last_mut(), chars.next()) {
                    part.push(escaped);
                }
            }
            c => {
                if let Some(part) = parts.last_mut() {
                    part.push(c);
                }
            }
        }
    }
    parts
}

/// `Key: value` lines in the first block become root attributes
fn document_meta(p: &mut Parser<'_>, block: &Block, _: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    if block.line_number > 1 || !DOCUMENT_META.is_match(block) {
        return None;
    }

    for line in block.split('\n') {
        if let Some(m) = META_PAIR.captures(line) {
            p.tree_mut().attrs.insert(m[1].to_lowercase(), &m[2]);
        }
    }
    Some(Vec::new())
}

/// A trailing `{: ...}` line annotates the block it ends, or on its own
/// the block before it
fn block_meta(p: &mut Parser<'_>, block: &Block, _: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    let m = BLOCK_META.captures(block)?;
    let attrs = process_meta_hash(&m[2]);

    if m[1].is_empty() {
        let previous = p.tree_mut().children.last_mut()?.as_element_mut()?;
        previous.attrs.extend(attrs);
        return Some(Vec::new());
    }

    let content = Block::new(
        LAST_LINE.replace(block, ""),
        block.trailing.as_str(),
        block.line_number,
    );
    let mut nodes = p.process_block(&content, &mut VecDeque::new());
    if let Some(first) = nodes.first_mut().and_then(Node::as_element_mut) {
        first.attrs.extend(attrs);
    }
    Some(nodes)
}

/// Tight definition lists: term lines, then `: ` definitions
fn definition_list(
    p: &mut Parser<'_>,
    block: &Block,
    next: &mut VecDeque<Block>,
) -> Option<Vec<Node>> {
    if !DEFINITION_LIST.is_match(block) {
        return None;
    }

    let mut blocks = vec![block.clone()];
    while next.front().is_some_and(|b| DEFINITION_LIST.is_match(b)) {
        blocks.extend(next.pop_front());
    }

    let mut list = Element::new("dl");
    for b in &blocks {
        let Some(m) = DEFINITION_LIST.captures(b) else {
            continue;
        };
        let terms = m[1].strip_suffix('\n').unwrap_or(&m[1]);
        for term in terms.split('\n') {
            list.push(Node::element("dt", vec![Node::text(term)]));
        }
        for definition in DEFINITION_SEP.split(&m[2]) {
            let definition = DEFINITION_INDENT.replace(definition, "$1");
            list.push(Node::element("dd", p.process_inline(&definition)));
        }
    }
    Some(vec![list.into()])
}

/// Split on `sep` unless it is backslash escaped
fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == sep {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

fn alignment(spec: &str) -> Option<&'static str> {
    if ALIGN_RIGHT.is_match(spec) {
        Some("right")
    } else if ALIGN_LEFT.is_match(spec) {
        Some("left")
    } else if ALIGN_CENTER.is_match(spec) {
        Some("center")
    } else {
        None
    }
}

fn cell(p: &mut Parser<'_>, tag: &str, text: &str, align: Option<&str>) -> Node {
    let mut cell = Element::new(tag).with_children(p.process_inline(text.trim()));
    if let Some(align) = align {
        cell.attrs.insert("align", align);
    }
    cell.into()
}

/// Pipe tables, with or without leading pipes
///
/// The second row sets column alignment: `:--` left, `--:` right, `:-:`
/// center.
fn table(p: &mut Parser<'_>, block: &Block, _: &mut VecDeque<Block>) -> Option<Vec<Node>> {
    // The table must run to the end of the block or to a line break
    let ends_cleanly = |end: usize| end == block.len() || block[end..].starts_with('\n');

    let (header, align_row, body) = match TABLE_LEADING_PIPE.captures(block) {
        Some(m) if ends_cleanly(m[0].len()) => (
            m[1].to_string(),
            m[2].to_string(),
            ROW_LEADING_PIPE.replace_all(&m[3], "").into_owned(),
        ),
        _ => {
            let m = TABLE_NO_LEADING_PIPE
                .captures(block)
                .filter(|m| ends_cleanly(m[0].len()))?;
            (m[1].to_string(), m[2].to_string(), m[3].to_string())
        }
    };

    let aligns: Vec<Option<&str>> = TRAILING_PIPE
        .replace(&align_row, "")
        .split('|')
        .map(alignment)
        .collect();
    let align = |i: usize| aligns.get(i).copied().flatten();

    let header = TRAILING_PIPE.replace(&header, "");
    let mut head_row = Element::new("tr");
    for (i, text) in split_unescaped(&header, '|').into_iter().enumerate() {
        head_row.push(cell(p, "th", text, align(i)));
    }

    let mut tbody = Element::new("tbody");
    let body = ROW_TRAILING_PIPE.replace_all(&body, "");
    for row in body.split('\n').filter(|row| !row.is_empty()) {
        let mut tr = Element::new("tr");
        for (i, text) in split_unescaped(row, '|').into_iter().enumerate() {
            tr.push(cell(p, "td", text, align(i)));
        }
        tbody.push(tr);
    }

    let table = Element::new("table").with_children(vec![
        Node::element("thead", vec![head_row.into()]),
        tbody.into(),
    ]);
    Some(vec![table.into()])
}

/// `{: ...}` right after an inline element annotates it
fn inline_meta(_: &mut Parser<'_>, cursor: Cursor<'_>, out: &mut Vec<Node>) -> Option<Step> {
    let previous = out.last_mut()?.as_element_mut()?;
    let m = INLINE_META.captures(cursor.rest())?;
    previous.attrs.extend(process_meta_hash(&m[1]));
    Some(Step::Nodes {
        len: m[0].len(),
        nodes: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_hash() {
        let attrs = process_meta_hash("#intro .lead .wide data-x=1 ");
        assert_eq!(attrs.get_str("id"), Some("intro"));
        assert_eq!(attrs.get_str("class"), Some("lead wide"));
        assert_eq!(attrs.get_str("data-x"), Some("1"));
        assert_eq!(attrs.len(), 3);
    }

    #[test]
    fn test_meta_hash_quotes_and_escapes() {
        assert_eq!(
            split_meta_hash(r#"title="two words" a\ b"#),
            vec!["title=two words", "a b"]
        );
        let attrs = process_meta_hash("a=b=c");
        assert_eq!(attrs.get_str("a"), Some("b"));
    }

    #[test]
    fn test_split_unescaped() {
        assert_eq!(split_unescaped(r"a | b\|c | d", '|'), vec!["a ", r" b\|c ", " d"]);
        assert_eq!(split_unescaped("abc", '|'), vec!["abc"]);
        assert_eq!(split_unescaped("a|", '|'), vec!["a", ""]);
    }

    #[test]
    fn test_alignment() {
        assert_eq!(alignment(" :-- "), Some("left"));
        assert_eq!(alignment(" --: "), Some("right"));
        assert_eq!(alignment(" :-: "), Some("center"));
        assert_eq!(alignment(" --- "), None);
    }
}
